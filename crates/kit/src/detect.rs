//! Recognising what an input stream is before trying to parse it.
//!
//! Compressed initramfs images are common, but decompression happens
//! outside this crate; sniffing lets callers say so up front instead of
//! reporting a bad magic deep inside the archive.

/// Bytes needed to tell every known format apart.
pub const SNIFF_LEN: usize = 6;

/// What the first bytes of an input look like.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum InputKind {
    /// newc CPIO (`070701`), the only format we rewrite.
    Newc,
    /// newc with checksums (`070702`).
    #[strum(serialize = "newc-crc")]
    NewcCrc,
    /// Old portable ASCII CPIO (`070707`).
    Odc,
    /// gzip.
    Gzip,
    /// xz.
    Xz,
    /// Zstandard.
    Zstd,
    /// bzip2.
    Bzip2,
    /// LZ4, legacy or frame format.
    Lz4,
    /// Raw LZMA ("lzma alone").
    Lzma,
    /// Anything else.
    Unknown,
}

const SIGNATURES: &[(&[u8], InputKind)] = &[
    (b"070701", InputKind::Newc),
    (b"070702", InputKind::NewcCrc),
    (b"070707", InputKind::Odc),
    (&[0x1f, 0x8b], InputKind::Gzip),
    (&[0xfd, b'7', b'z', b'X', b'Z', 0x00], InputKind::Xz),
    (&[0x28, 0xb5, 0x2f, 0xfd], InputKind::Zstd),
    (b"BZh", InputKind::Bzip2),
    (&[0x02, 0x21, 0x4c, 0x18], InputKind::Lz4),
    (&[0x04, 0x22, 0x4d, 0x18], InputKind::Lz4),
    (&[0x5d, 0x00, 0x00], InputKind::Lzma),
];

/// Classify an input by its leading bytes.
pub fn sniff(prefix: &[u8]) -> InputKind {
    SIGNATURES
        .iter()
        .find(|(magic, _)| prefix.starts_with(magic))
        .map(|&(_, kind)| kind)
        .unwrap_or(InputKind::Unknown)
}

impl InputKind {
    /// Whether this is a compression container rather than an archive.
    pub fn is_compressed(&self) -> bool {
        matches!(
            self,
            InputKind::Gzip
                | InputKind::Xz
                | InputKind::Zstd
                | InputKind::Bzip2
                | InputKind::Lz4
                | InputKind::Lzma
        )
    }
}
