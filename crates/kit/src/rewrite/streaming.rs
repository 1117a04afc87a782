//! Single-pass rewrite from a reader to a writer.

use std::io::{Read, Write};

use tracing::{debug, instrument};

use super::Injector;
use crate::error::{Error, Result};
use crate::record::StreamRecords;

impl Injector {
    /// Rewrite an archive read from `src`, writing the result to `dst` as
    /// records are read.
    ///
    /// Only the current record's header and name are held in memory. Target
    /// entries are renamed before their heads are written; the new record is
    /// emitted right before the trailer, and nothing after the trailer is
    /// read. If the source ends first this fails with
    /// [`Error::TruncatedArchive`] and the partial output must be discarded.
    #[instrument(skip_all, fields(payload = payload.len()))]
    pub fn rewrite_streaming<R: Read, W: Write>(
        &self,
        src: R,
        mut dst: W,
        payload: &[u8],
    ) -> Result<()> {
        // Validated before anything is written.
        let head = self.new_record_head(payload.len() as u64)?;
        let mut records = StreamRecords::new(src);
        let mut renamed = 0usize;

        while let Some(mut entry) = records.next_entry()? {
            if entry.is_trailer() {
                if renamed == 0 {
                    debug!(
                        "no {} entry, appending without rename",
                        String::from_utf8_lossy(&self.target)
                    );
                }
                self.write_new_record(&head, payload, &mut dst)?;
                dst.write_all(entry.head())?;
                records.forward_body(&mut dst)?;
                dst.flush()?;
                debug!(
                    "trailer at {}, {} bytes consumed",
                    entry.offset(),
                    records.position()
                );
                return Ok(());
            }

            if entry.name() == self.target.as_slice() {
                debug!("renaming entry at {}", entry.offset());
                self.rename(entry.head_mut());
                renamed += 1;
            }
            dst.write_all(entry.head())?;
            records.forward_body(&mut dst)?;
        }

        Err(Error::TruncatedArchive {
            offset: records.current_offset(),
        })
    }
}
