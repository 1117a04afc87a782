//! Summaries of archive contents, for display.

use serde::Serialize;

use crate::error::{Error, Result};
use crate::header::S_IFMT;
use crate::record::{Record, Records};

/// File type from the `mode` type bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum FileType {
    /// Regular file.
    File,
    /// Directory.
    Dir,
    /// Symbolic link.
    Symlink,
    /// Character device.
    Char,
    /// Block device.
    Block,
    /// Named pipe.
    Fifo,
    /// Socket.
    Socket,
    /// Type bits we do not know (the trailer has none).
    Other,
}

impl FileType {
    /// Decode the type bits of `mode`.
    pub fn from_mode(mode: u32) -> Self {
        match mode & S_IFMT {
            0o100000 => FileType::File,
            0o040000 => FileType::Dir,
            0o120000 => FileType::Symlink,
            0o020000 => FileType::Char,
            0o060000 => FileType::Block,
            0o010000 => FileType::Fifo,
            0o140000 => FileType::Socket,
            _ => FileType::Other,
        }
    }
}

/// One line of an archive listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntrySummary {
    /// Header offset.
    pub offset: u64,
    /// Filename, lossily decoded.
    pub name: String,
    /// File type.
    pub kind: FileType,
    /// Permission bits (without the type).
    pub perm: u32,
    /// Inode.
    pub ino: u32,
    /// Owner.
    pub uid: u32,
    /// Group.
    pub gid: u32,
    /// Link count.
    pub nlink: u32,
    /// Modification time, seconds since the epoch.
    pub mtime: u32,
    /// Body size in bytes.
    pub size: u32,
}

impl From<&Record<'_>> for EntrySummary {
    fn from(record: &Record<'_>) -> Self {
        let header = record.header();
        Self {
            offset: record.offset() as u64,
            name: String::from_utf8_lossy(record.name()).into_owned(),
            kind: FileType::from_mode(header.mode),
            perm: header.mode & !S_IFMT,
            ino: header.ino,
            uid: header.uid,
            gid: header.gid,
            nlink: header.nlink,
            mtime: header.mtime,
            size: header.filesize,
        }
    }
}

/// List every record up to and including the trailer.
///
/// Like the rewriters, an archive without a trailer is an error.
pub fn list(buf: &[u8]) -> Result<Vec<EntrySummary>> {
    let mut records = Records::new(buf);
    let mut entries = Vec::new();
    for record in records.by_ref() {
        let record = record?;
        entries.push(EntrySummary::from(&record));
        if record.is_trailer() {
            return Ok(entries);
        }
    }
    Err(Error::TruncatedArchive {
        offset: records.offset() as u64,
    })
}
