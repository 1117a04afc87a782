//! Injecting a replacement `init` into a newc archive.
//!
//! The existing entry named `init` is renamed in place to `iniz` (same
//! length, so nothing shifts) and a new `init` record carrying the payload
//! is spliced in just before the trailer. Everything after the trailer is
//! dropped.
//!
//! Two implementations produce byte-identical output:
//!
//! - [`Injector::rewrite_buffered`] works on an archive already in memory.
//! - [`Injector::rewrite_streaming`] forwards records from a reader to a
//!   writer as they are read.
//!
//! [`Injector::create`] builds a fresh archive holding only the new record,
//! for when there is no initramfs to extend.

use std::io::{self, Read, Write};

use crate::align::{pad4, write_padding};
use crate::error::{Error, Result};
use crate::header::{HeaderTemplate, HEADER_LEN};

mod buffered;
mod create;
mod streaming;

/// Name of the entry the kernel executes as PID 1.
pub const DEFAULT_TARGET: &str = "init";

/// Name the original `init` is moved to.
pub const DEFAULT_RENAME: &str = "iniz";

/// A configured injection: what to rename, what to append.
#[derive(Debug, Clone)]
pub struct Injector {
    template: HeaderTemplate,
    target: Vec<u8>,
    rename_to: Vec<u8>,
}

fn check_name(kind: &str, name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::InvalidField(format!("{kind} name is empty")));
    }
    if name.bytes().any(|b| b == 0 || b == b'/') {
        return Err(Error::InvalidField(format!(
            "{kind} name {name:?} must be a single path component without NUL"
        )));
    }
    Ok(())
}

impl Injector {
    /// Inject with the default `init` → `iniz` names.
    pub fn new(template: HeaderTemplate) -> Result<Self> {
        template.validate()?;
        Ok(Self {
            template,
            target: DEFAULT_TARGET.as_bytes().to_vec(),
            rename_to: DEFAULT_RENAME.as_bytes().to_vec(),
        })
    }

    /// Use other names. Both must have the same byte length so the rename
    /// leaves the archive layout untouched.
    pub fn with_names(mut self, target: &str, rename_to: &str) -> Result<Self> {
        check_name("target", target)?;
        check_name("rename", rename_to)?;
        if target.len() != rename_to.len() {
            return Err(Error::InvalidField(format!(
                "cannot rename {target:?} to {rename_to:?}: names differ in length"
            )));
        }
        if target == rename_to {
            return Err(Error::InvalidField(format!(
                "rename target {rename_to:?} is the same as the entry name"
            )));
        }
        self.target = target.as_bytes().to_vec();
        self.rename_to = rename_to.as_bytes().to_vec();
        Ok(self)
    }

    /// Name of the entry being replaced.
    pub fn target(&self) -> &[u8] {
        &self.target
    }

    /// Name the replaced entry is moved to.
    pub fn rename_to(&self) -> &[u8] {
        &self.rename_to
    }

    /// Metadata for the appended record.
    pub fn template(&self) -> &HeaderTemplate {
        &self.template
    }

    /// Encoded header, name and padding of the appended record.
    ///
    /// Fails if the payload does not fit the 32-bit filesize field.
    pub fn new_record_head(&self, payload_len: u64) -> Result<Vec<u8>> {
        let filesize = u32::try_from(payload_len).map_err(|_| {
            Error::InvalidField(format!(
                "payload of {payload_len} bytes exceeds the newc limit of {} bytes",
                u32::MAX
            ))
        })?;
        self.template.to_header(filesize).encode(&self.target)
    }

    /// Full extent of the appended record, padding included.
    pub fn new_record_len(&self, payload_len: u64) -> Result<u64> {
        let head = self.new_record_head(payload_len)?;
        Ok(head.len() as u64 + payload_len + pad4(payload_len) as u64)
    }

    fn write_new_record<W: Write + ?Sized>(
        &self,
        head: &[u8],
        payload: &[u8],
        dst: &mut W,
    ) -> io::Result<()> {
        dst.write_all(head)?;
        dst.write_all(payload)?;
        write_padding(dst, payload.len() as u64)
    }

    /// Overwrite the filename in a raw record head that starts at `head[0]`.
    fn rename(&self, head: &mut [u8]) {
        let name = &mut head[HEADER_LEN..HEADER_LEN + self.target.len()];
        debug_assert_eq!(name, self.target.as_slice());
        name.copy_from_slice(&self.rename_to);
    }
}

/// Build a standalone archive holding an `init` with `payload` and a trailer.
pub fn create_archive(payload: &[u8], template: &HeaderTemplate) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    Injector::new(*template)?.create(&mut out, payload)?;
    Ok(out)
}

/// Rewrite an in-memory archive with the default names.
pub fn rewrite_buffered(input: &[u8], payload: &[u8], template: &HeaderTemplate) -> Result<Vec<u8>> {
    Injector::new(*template)?.rewrite_buffered(input, payload)
}

/// Rewrite an archive from `src` into `dst` with the default names.
///
/// On error, whatever was already written to `dst` is not a valid archive
/// and must be discarded.
pub fn rewrite_streaming<R: Read, W: Write>(
    src: R,
    dst: W,
    payload: &[u8],
    template: &HeaderTemplate,
) -> Result<()> {
    Injector::new(*template)?.rewrite_streaming(src, dst, payload)
}
