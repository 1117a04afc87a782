//! The newc ("new ASCII", SVR4) header codec.
//!
//! A header is 110 bytes: the magic `070701` followed by thirteen
//! 8-character ASCII-hex fields. The filename (with its trailing NUL)
//! follows immediately, then zero padding up to a 4-byte boundary
//! measured from the start of the header.
//!
//! See <https://www.kernel.org/doc/html/latest/driver-api/early-userspace/buffer-format.html>

use std::io::Write as _;

use crate::align::pad4;
use crate::error::{Error, Result};

/// newc magic number.
pub const MAGIC: &[u8; 6] = b"070701";

/// Length of the fixed part of a header, magic included.
pub const HEADER_LEN: usize = 110;

/// Filename of the end-of-archive record.
pub const TRAILER_NAME: &[u8] = b"TRAILER!!!";

/// Inode number given to records we synthesize, so they never collide
/// with inodes assigned by the archive's creator.
pub const SYNTHETIC_INO: u32 = u32::MAX;

/// File type mask of `mode`.
pub const S_IFMT: u32 = 0o170000;

/// Regular file type bits.
pub const S_IFREG: u32 = 0o100000;

const FIELD_LEN: usize = 8;

const FIELD_NAMES: [&str; 13] = [
    "ino",
    "mode",
    "uid",
    "gid",
    "nlink",
    "mtime",
    "filesize",
    "devmajor",
    "devminor",
    "rdevmajor",
    "rdevminor",
    "namesize",
    "check",
];

/// The numeric fields of a newc header.
///
/// `namesize` is not stored here; it is derived from the filename when
/// encoding and returned separately when decoding. Every field is a
/// `u32`, which is the ceiling the format allows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Header {
    /// Inode number.
    pub ino: u32,
    /// File mode, type bits included.
    pub mode: u32,
    /// Owner.
    pub uid: u32,
    /// Group.
    pub gid: u32,
    /// Link count.
    pub nlink: u32,
    /// Modification time in seconds.
    pub mtime: u32,
    /// Body length in bytes.
    pub filesize: u32,
    /// Device major of the containing filesystem.
    pub devmajor: u32,
    /// Device minor of the containing filesystem.
    pub devminor: u32,
    /// Device major for special files.
    pub rdevmajor: u32,
    /// Device minor for special files.
    pub rdevminor: u32,
    /// Checksum, always zero for newc. Read but never interpreted.
    pub check: u32,
}

/// Bytes occupied by header, filename, NUL and the padding after them.
pub fn head_len(namesize: u32) -> usize {
    let unpadded = HEADER_LEN + namesize as usize;
    unpadded + pad4(unpadded as u64)
}

/// Total extent of a record: head plus body plus body padding.
pub fn record_len(namesize: u32, filesize: u32) -> u64 {
    head_len(namesize) as u64 + filesize as u64 + pad4(filesize as u64) as u64
}

fn parse_hex(field: &[u8]) -> Option<u32> {
    field.iter().try_fold(0u32, |acc, &b| {
        let digit = (b as char).to_digit(16)?;
        Some((acc << 4) | digit)
    })
}

impl Header {
    /// Header of the end-of-archive record: all zero except the link count.
    pub fn trailer() -> Self {
        Header {
            nlink: 1,
            ..Default::default()
        }
    }

    /// Whether the file type bits say "regular file".
    pub fn is_regular(&self) -> bool {
        self.mode & S_IFMT == S_IFREG
    }

    /// Encode this header with `name`, producing the header, the filename,
    /// its NUL terminator and the alignment padding.
    ///
    /// Fields are written as lowercase, zero-padded hex.
    pub fn encode(&self, name: &[u8]) -> Result<Vec<u8>> {
        if name.contains(&0) {
            return Err(Error::InvalidField(format!(
                "filename {:?} contains a NUL byte",
                String::from_utf8_lossy(name)
            )));
        }
        let namesize = u32::try_from(name.len() + 1)
            .map_err(|_| Error::InvalidField(format!("filename of {} bytes", name.len())))?;

        let mut buf = Vec::with_capacity(head_len(namesize));
        buf.extend_from_slice(MAGIC);
        for value in [
            self.ino,
            self.mode,
            self.uid,
            self.gid,
            self.nlink,
            self.mtime,
            self.filesize,
            self.devmajor,
            self.devminor,
            self.rdevmajor,
            self.rdevminor,
            namesize,
            self.check,
        ] {
            write!(buf, "{value:08x}")?;
        }
        buf.extend_from_slice(name);
        buf.push(0);
        buf.resize(head_len(namesize), 0);
        Ok(buf)
    }

    /// Decode the fixed 110-byte part of a header.
    ///
    /// Returns the header and the declared namesize so that callers can
    /// slice out the filename. Errors carry offset 0; callers rebase them.
    pub fn decode(bytes: &[u8]) -> Result<(Self, u32)> {
        if bytes.len() < HEADER_LEN {
            return Err(Error::TruncatedArchive { offset: 0 });
        }
        if &bytes[..MAGIC.len()] != MAGIC {
            return Err(Error::BadMagic { offset: 0 });
        }

        let mut fields = [0u32; 13];
        for (i, (slot, field)) in fields.iter_mut().zip(FIELD_NAMES).enumerate() {
            let start = MAGIC.len() + i * FIELD_LEN;
            *slot = parse_hex(&bytes[start..start + FIELD_LEN])
                .ok_or(Error::BadField { offset: 0, field })?;
        }
        let [ino, mode, uid, gid, nlink, mtime, filesize, devmajor, devminor, rdevmajor, rdevminor, namesize, check] =
            fields;

        // Every name carries at least its NUL.
        if namesize == 0 {
            return Err(Error::BadField {
                offset: 0,
                field: "namesize",
            });
        }

        let header = Header {
            ino,
            mode,
            uid,
            gid,
            nlink,
            mtime,
            filesize,
            devmajor,
            devminor,
            rdevmajor,
            rdevminor,
            check,
        };
        Ok((header, namesize))
    }
}

/// Caller-chosen metadata for the record we append.
///
/// Size fields are derived from the payload and the filename; the inode
/// is always [`SYNTHETIC_INO`] and the link count 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeaderTemplate {
    /// File mode. The type bits must say "regular file".
    pub mode: u32,
    /// Modification time in seconds since the epoch.
    pub mtime: u32,
    /// Owner.
    pub uid: u32,
    /// Group.
    pub gid: u32,
}

impl HeaderTemplate {
    /// A root-owned regular file with mode 0755.
    pub fn executable(mtime: u32) -> Self {
        Self {
            mode: S_IFREG | 0o755,
            mtime,
            uid: 0,
            gid: 0,
        }
    }

    /// Reject templates that cannot describe an init binary.
    pub fn validate(&self) -> Result<()> {
        if self.mode & S_IFMT != S_IFREG {
            return Err(Error::InvalidField(format!(
                "mode {:o} is not a regular file",
                self.mode
            )));
        }
        Ok(())
    }

    /// The full header for a body of `filesize` bytes.
    pub fn to_header(&self, filesize: u32) -> Header {
        Header {
            ino: SYNTHETIC_INO,
            mode: self.mode,
            uid: self.uid,
            gid: self.gid,
            nlink: 1,
            mtime: self.mtime,
            filesize,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use similar_asserts::assert_eq;

    fn sample() -> Header {
        Header {
            ino: 0x1234,
            mode: 0o100644,
            uid: 1000,
            gid: 100,
            nlink: 1,
            mtime: 0x6500_0000,
            filesize: 18,
            devmajor: 8,
            devminor: 1,
            ..Default::default()
        }
    }

    #[test]
    fn test_encode_layout() {
        let buf = sample().encode(b"init").unwrap();
        // 110 + 5 rounds up to 116
        assert_eq!(buf.len(), 116);
        assert_eq!(
            std::str::from_utf8(&buf[..HEADER_LEN]).unwrap(),
            "070701\
             00001234\
             000081a4\
             000003e8\
             00000064\
             00000001\
             65000000\
             00000012\
             00000008\
             00000001\
             00000000\
             00000000\
             00000005\
             00000000"
        );
        assert_eq!(&buf[HEADER_LEN..], b"init\0\0");
    }

    #[test]
    fn test_encode_lowercase_hex() {
        let header = Header {
            ino: SYNTHETIC_INO,
            mode: 0o100755,
            ..Default::default()
        };
        let buf = header.encode(b"x").unwrap();
        let text = std::str::from_utf8(&buf[..HEADER_LEN]).unwrap();
        assert!(text.contains("ffffffff"));
        assert!(text.contains("000081ed"));
        assert!(!text.contains("FFFFFFFF"));
    }

    #[test]
    fn test_encode_rejects_embedded_nul() {
        let err = sample().encode(b"in\0it").unwrap_err();
        assert!(matches!(err, Error::InvalidField(_)));
    }

    #[test]
    fn test_decode_roundtrip() {
        let header = sample();
        let buf = header.encode(b"usr/lib/modules").unwrap();
        let (decoded, namesize) = Header::decode(&buf).unwrap();
        assert_eq!(decoded, header);
        assert_eq!(namesize, 16);
        assert_eq!(head_len(namesize), buf.len());
    }

    #[test]
    fn test_decode_accepts_uppercase() {
        let mut buf = sample().encode(b"init").unwrap();
        buf[6..14].copy_from_slice(b"0000ABCD");
        let (decoded, _) = Header::decode(&buf).unwrap();
        assert_eq!(decoded.ino, 0xabcd);
    }

    #[test]
    fn test_decode_bad_magic() {
        let mut buf = sample().encode(b"init").unwrap();
        buf[5] = b'7';
        assert!(matches!(
            Header::decode(&buf),
            Err(Error::BadMagic { offset: 0 })
        ));
    }

    #[test]
    fn test_decode_bad_field() {
        let mut buf = sample().encode(b"init").unwrap();
        // First byte of the mode field
        buf[14] = b'g';
        assert!(matches!(
            Header::decode(&buf),
            Err(Error::BadField { field: "mode", .. })
        ));

        // from_str_radix would take a leading '+'
        let mut buf = sample().encode(b"init").unwrap();
        buf[54] = b'+';
        assert!(matches!(
            Header::decode(&buf),
            Err(Error::BadField {
                field: "filesize",
                ..
            })
        ));
    }

    #[test]
    fn test_decode_zero_namesize() {
        let mut buf = sample().encode(b"init").unwrap();
        buf[94..102].copy_from_slice(b"00000000");
        assert!(matches!(
            Header::decode(&buf),
            Err(Error::BadField {
                field: "namesize",
                ..
            })
        ));
    }

    #[test]
    fn test_decode_short() {
        assert!(matches!(
            Header::decode(b"070701"),
            Err(Error::TruncatedArchive { .. })
        ));
    }

    #[test]
    fn test_record_len() {
        // header + "init\0" + pad, 18 byte body + 2 pad
        assert_eq!(record_len(5, 18), 116 + 20);
        // trailer
        assert_eq!(record_len(11, 0), 124);
    }

    #[test]
    fn test_template() {
        let template = HeaderTemplate::executable(42);
        template.validate().unwrap();
        let header = template.to_header(4);
        assert!(header.is_regular());
        assert_eq!(header.ino, SYNTHETIC_INO);
        assert_eq!(header.nlink, 1);
        assert_eq!(header.mtime, 42);
        assert_eq!(header.filesize, 4);

        let dir = HeaderTemplate {
            mode: 0o040755,
            ..template
        };
        assert!(matches!(dir.validate(), Err(Error::InvalidField(_))));
        // Permission bits alone are not enough
        let bare = HeaderTemplate {
            mode: 0o755,
            ..template
        };
        assert!(bare.validate().is_err());
    }
}
