//! Locating the target entry and the trailer in one pass.

use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::record::Records;

/// Where things are in an in-memory archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scan {
    /// Header offsets of every entry whose name is exactly the target, in
    /// archive order. Usually zero or one.
    pub targets: Vec<usize>,
    /// Header offset of the `TRAILER!!!` record.
    pub trailer: usize,
    /// Offset one past the trailer record's padding.
    pub end: usize,
    /// Number of bytes after [`Scan::end`], which are not part of the
    /// archive.
    pub trailing: usize,
}

impl Scan {
    /// Header offset of the first target entry, if any.
    pub fn target(&self) -> Option<usize> {
        self.targets.first().copied()
    }
}

/// Walk `buf` once, recording entries named exactly `target` and the
/// trailer.
///
/// Names are compared byte for byte on the whole filename: `sbin/init`
/// does not match `init`. An archive without a trailer is truncated.
pub fn scan(buf: &[u8], target: &[u8]) -> Result<Scan> {
    let mut targets = Vec::new();
    let mut records = Records::new(buf);
    for record in records.by_ref() {
        let record = record?;
        if record.is_trailer() {
            let end = record.end();
            let trailing = &buf[end..];
            if trailing.iter().any(|&b| b != 0) {
                warn!(
                    "discarding {} bytes after the trailer at {}, including non-zero data",
                    trailing.len(),
                    record.offset()
                );
            }
            debug!(
                "trailer at {}, {} target entries, {} trailing bytes",
                record.offset(),
                targets.len(),
                trailing.len()
            );
            return Ok(Scan {
                targets,
                trailer: record.offset(),
                end,
                trailing: trailing.len(),
            });
        }
        if record.name() == target {
            debug!("found target entry at {}", record.offset());
            targets.push(record.offset());
        }
    }
    Err(Error::TruncatedArchive {
        offset: records.offset() as u64,
    })
}
