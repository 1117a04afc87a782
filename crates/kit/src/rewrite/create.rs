//! Building an archive that holds nothing but the new record.

use std::io::Write;

use tracing::{debug, instrument};

use super::Injector;
use crate::error::Result;
use crate::header::{Header, TRAILER_NAME};

impl Injector {
    /// Write a complete archive to `dst`: the new record followed by a
    /// trailer.
    ///
    /// Used when there is no initramfs to extend. The result is an ordinary
    /// archive: rewriting it later renames the created init like any other.
    #[instrument(skip_all, fields(payload = payload.len()))]
    pub fn create<W: Write>(&self, mut dst: W, payload: &[u8]) -> Result<()> {
        let head = self.new_record_head(payload.len() as u64)?;
        let trailer = Header::trailer().encode(TRAILER_NAME)?;
        self.write_new_record(&head, payload, &mut dst)?;
        dst.write_all(&trailer)?;
        dst.flush()?;
        debug!(
            "created archive with a {} byte {}",
            payload.len(),
            String::from_utf8_lossy(&self.target)
        );
        Ok(())
    }
}
