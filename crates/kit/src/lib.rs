//! Streaming newc CPIO rewriter for injecting a replacement `init` into a
//! Linux initramfs.
//!
//! Given an uncompressed newc archive and a payload, the existing `init`
//! entry is renamed in place to `iniz` and a new `init` holding the
//! payload is inserted just before the `TRAILER!!!` record. The guest's
//! new PID 1 can then hand off to the original via `/iniz`.
//!
//! ```
//! use initramfs_inject::{rewrite_buffered, HeaderTemplate};
//!
//! # fn example(initramfs: &[u8], payload: &[u8]) -> initramfs_inject::Result<()> {
//! let out = rewrite_buffered(initramfs, payload, &HeaderTemplate::executable(0))?;
//! # let _ = out;
//! # Ok(())
//! # }
//! ```
//!
//! Without an existing initramfs, [`create_archive`] produces one holding
//! only the new `init`.
//!
//! Compression is handled outside this crate; [`detect::sniff`] can tell
//! callers when their input still needs decompressing.

pub mod align;
pub mod detect;
pub mod error;
pub mod header;
pub mod inspect;
pub mod record;
pub mod rewrite;
pub mod scan;

pub use error::{Error, Result};
pub use header::{Header, HeaderTemplate};
pub use rewrite::{create_archive, rewrite_buffered, rewrite_streaming, Injector};
