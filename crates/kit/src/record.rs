//! Walking the records of a newc archive.
//!
//! Two flavors share the same framing rules:
//!
//! - [`Records`] iterates an archive that is already in memory and hands
//!   out borrowed slices for names and bodies.
//! - [`StreamRecords`] pulls the exact byte counts from a [`Read`]er. Only
//!   the header and filename of the current record are held; the body is
//!   read through [`StreamRecords::body`], forwarded with
//!   [`StreamRecords::forward_body`], or skipped.
//!
//! Both stop after yielding the `TRAILER!!!` record, and both treat a run
//! of zero bytes at a header boundary that lasts until the end of input as
//! padding rather than a record.

use std::fmt;
use std::io::{self, Read, Write};

use tracing::trace;

use crate::align::pad4;
use crate::error::{Error, Result};
use crate::header::{head_len, record_len, Header, HEADER_LEN, TRAILER_NAME};

const DEFAULT_COPY_BUFFER: usize = 64 * 1024;

/// Most name bytes reserved before any are read (the kernel's `PATH_MAX`).
/// Longer names grow the buffer only as their bytes arrive.
const NAME_PREALLOC: usize = 4096;

/// The filename is read as a C string: the first NUL ends it. Extra NULs
/// up to `namesize` are padding (dracut pads names this way); anything
/// else after the terminator is rejected.
fn name_of(head: &[u8], namesize: u32, offset: u64) -> Result<&[u8]> {
    let raw = &head[HEADER_LEN..HEADER_LEN + namesize as usize];
    let bad_name = || Error::BadField {
        offset,
        field: "name",
    };
    let nul = raw.iter().position(|&b| b == 0).ok_or_else(bad_name)?;
    if raw[nul..].iter().any(|&b| b != 0) {
        return Err(bad_name());
    }
    Ok(&raw[..nul])
}

/// One record of an in-memory archive.
#[derive(Debug, Clone, Copy)]
pub struct Record<'a> {
    offset: usize,
    header: Header,
    namesize: u32,
    name: &'a [u8],
    body_offset: usize,
    body: &'a [u8],
}

impl<'a> Record<'a> {
    /// Offset of the header within the archive.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// The decoded header.
    pub fn header(&self) -> &Header {
        &self.header
    }

    /// Declared namesize, NUL included.
    pub fn namesize(&self) -> u32 {
        self.namesize
    }

    /// Filename without its NUL terminator.
    pub fn name(&self) -> &'a [u8] {
        self.name
    }

    /// Offset of the first filename byte within the archive.
    pub fn name_offset(&self) -> usize {
        self.offset + HEADER_LEN
    }

    /// Offset of the body within the archive.
    pub fn body_offset(&self) -> usize {
        self.body_offset
    }

    /// The body bytes.
    pub fn body(&self) -> &'a [u8] {
        self.body
    }

    /// Offset one past the body padding, where the next header starts.
    pub fn end(&self) -> usize {
        self.offset + record_len(self.namesize, self.header.filesize) as usize
    }

    /// Whether this is the end-of-archive record.
    pub fn is_trailer(&self) -> bool {
        self.name == TRAILER_NAME
    }
}

/// Iterator over the records of an in-memory archive.
#[derive(Debug, Clone)]
pub struct Records<'a> {
    buf: &'a [u8],
    cursor: usize,
    done: bool,
}

impl<'a> Records<'a> {
    /// Start iterating at the beginning of `buf`.
    pub fn new(buf: &'a [u8]) -> Self {
        Self {
            buf,
            cursor: 0,
            done: false,
        }
    }

    /// Offset of the next header to be read.
    pub fn offset(&self) -> usize {
        self.cursor
    }

    fn read_record(&mut self) -> Result<Option<Record<'a>>> {
        let offset = self.cursor;
        let rest = &self.buf[offset..];
        if rest.iter().all(|&b| b == 0) {
            return Ok(None);
        }
        let err_offset = offset as u64;

        let (header, namesize) = Header::decode(rest).map_err(|e| e.rebase(err_offset))?;
        let len = record_len(namesize, header.filesize);
        if (rest.len() as u64) < len {
            return Err(Error::TruncatedArchive { offset: err_offset });
        }
        let name = name_of(rest, namesize, err_offset)?;
        let body_start = head_len(namesize);
        let body = &rest[body_start..body_start + header.filesize as usize];

        trace!(
            "record at {offset}: {} ({} bytes)",
            String::from_utf8_lossy(name),
            header.filesize
        );
        self.cursor = offset + len as usize;
        Ok(Some(Record {
            offset,
            header,
            namesize,
            name,
            body_offset: offset + body_start,
            body,
        }))
    }
}

impl<'a> Iterator for Records<'a> {
    type Item = Result<Record<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.read_record() {
            Ok(Some(record)) => {
                self.done = record.is_trailer();
                Some(Ok(record))
            }
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

/// Header and filename of a record read from a stream.
///
/// The raw bytes are kept exactly as read (header, name, NUL and padding)
/// so they can be forwarded unchanged.
#[derive(Debug, Clone)]
pub struct StreamEntry {
    offset: u64,
    header: Header,
    namesize: u32,
    name_len: usize,
    head: Vec<u8>,
}

impl StreamEntry {
    /// Offset of the header within the source stream.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// The decoded header.
    pub fn header(&self) -> &Header {
        &self.header
    }

    /// Declared namesize, NUL included.
    pub fn namesize(&self) -> u32 {
        self.namesize
    }

    /// Filename without its NUL terminator.
    pub fn name(&self) -> &[u8] {
        &self.head[HEADER_LEN..HEADER_LEN + self.name_len]
    }

    /// Whether this is the end-of-archive record.
    pub fn is_trailer(&self) -> bool {
        self.name() == TRAILER_NAME
    }

    /// Raw header, filename and padding.
    pub fn head(&self) -> &[u8] {
        &self.head
    }

    /// Mutable access to the raw head, for in-place renames.
    pub fn head_mut(&mut self) -> &mut [u8] {
        &mut self.head
    }

    /// Full extent of this record in the source.
    pub fn extent(&self) -> u64 {
        record_len(self.namesize, self.header.filesize)
    }
}

/// Stream-mode record iterator.
///
/// The body of the current record must be consumed before the next header
/// can be read; whatever is left of it (and its padding) is skipped by
/// [`StreamRecords::next_entry`].
pub struct StreamRecords<R> {
    inner: R,
    position: u64,
    current: u64,
    pending_body: u64,
    pending_pad: u64,
    copy_buf: Vec<u8>,
    done: bool,
}

impl<R> fmt::Debug for StreamRecords<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamRecords")
            .field("position", &self.position)
            .field("current", &self.current)
            .field("pending_body", &self.pending_body)
            .field("pending_pad", &self.pending_pad)
            .field("done", &self.done)
            .finish_non_exhaustive()
    }
}

/// Fill `buf` from `src`, stopping early only at end of input.
fn read_full<R: Read + ?Sized>(src: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match src.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

impl<R: Read> StreamRecords<R> {
    /// Wrap `inner`, forwarding bodies through a 64 KiB buffer.
    pub fn new(inner: R) -> Self {
        Self::with_buffer_size(inner, DEFAULT_COPY_BUFFER)
    }

    /// Wrap `inner`, forwarding bodies through a buffer of `size` bytes.
    pub fn with_buffer_size(inner: R, size: usize) -> Self {
        Self {
            inner,
            position: 0,
            current: 0,
            pending_body: 0,
            pending_pad: 0,
            copy_buf: vec![0; size.max(1)],
            done: false,
        }
    }

    /// Number of bytes consumed from the source so far.
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Offset of the most recent header (or the point where one was
    /// expected but the source ended).
    pub fn current_offset(&self) -> u64 {
        self.current
    }

    /// Give back the source.
    pub fn into_inner(self) -> R {
        self.inner
    }

    /// Read the next header and filename.
    ///
    /// Returns `None` after the trailer, or when the source ends (possibly
    /// after a run of zero bytes) at a header boundary.
    pub fn next_entry(&mut self) -> Result<Option<StreamEntry>> {
        if self.done {
            return Ok(None);
        }
        self.skip_body()?;

        let offset = self.position;
        self.current = offset;
        let mut fixed = [0u8; HEADER_LEN];
        let n = read_full(&mut self.inner, &mut fixed)?;
        self.position += n as u64;

        if fixed[..n].iter().all(|&b| b == 0) {
            if n == HEADER_LEN && !self.drain_zeroes()? {
                return Err(Error::BadMagic { offset });
            }
            self.done = true;
            return Ok(None);
        }
        if n < HEADER_LEN {
            return Err(Error::TruncatedArchive { offset });
        }

        let (header, namesize) = Header::decode(&fixed).map_err(|e| e.rebase(offset))?;
        let want = head_len(namesize) - HEADER_LEN;
        let mut head = Vec::with_capacity(HEADER_LEN + want.min(NAME_PREALLOC));
        head.extend_from_slice(&fixed);
        let got = (&mut self.inner)
            .take(want as u64)
            .read_to_end(&mut head)
            .map_err(|e| Error::reading(e, offset))?;
        self.position += got as u64;
        if got < want {
            return Err(Error::TruncatedArchive { offset });
        }
        let name_len = name_of(&head, namesize, offset)?.len();

        self.pending_body = header.filesize as u64;
        self.pending_pad = pad4(header.filesize as u64) as u64;

        let entry = StreamEntry {
            offset,
            header,
            namesize,
            name_len,
            head,
        };
        trace!(
            "record at {offset}: {} ({} bytes)",
            String::from_utf8_lossy(entry.name()),
            header.filesize
        );
        self.done = entry.is_trailer();
        Ok(Some(entry))
    }

    /// A reader over the unconsumed part of the current body.
    pub fn body(&mut self) -> Body<'_, R> {
        Body { records: self }
    }

    /// Copy the rest of the current body and its padding, verbatim, to
    /// `dst`. Returns the number of bytes copied.
    pub fn forward_body<W: Write + ?Sized>(&mut self, dst: &mut W) -> Result<u64> {
        let mut remaining = self.pending_body + self.pending_pad;
        let total = remaining;
        while remaining > 0 {
            let chunk = remaining.min(self.copy_buf.len() as u64) as usize;
            let n = match self.inner.read(&mut self.copy_buf[..chunk]) {
                Ok(0) => {
                    return Err(Error::TruncatedArchive {
                        offset: self.current,
                    })
                }
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(Error::reading(e, self.current)),
            };
            dst.write_all(&self.copy_buf[..n])?;
            self.position += n as u64;
            remaining -= n as u64;
            self.consume(n as u64);
        }
        Ok(total)
    }

    /// Discard the rest of the current body and its padding.
    pub fn skip_body(&mut self) -> Result<()> {
        self.forward_body(&mut io::sink())?;
        Ok(())
    }

    fn consume(&mut self, n: u64) {
        let from_body = n.min(self.pending_body);
        self.pending_body -= from_body;
        self.pending_pad -= n - from_body;
    }

    /// Consume the source to its end; true if every byte was zero.
    fn drain_zeroes(&mut self) -> Result<bool> {
        loop {
            let n = match self.inner.read(&mut self.copy_buf) {
                Ok(0) => return Ok(true),
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(Error::Io(e)),
            };
            self.position += n as u64;
            if self.copy_buf[..n].iter().any(|&b| b != 0) {
                return Ok(false);
            }
        }
    }
}

/// Reader over the body of the current stream record.
///
/// Yields exactly the declared number of body bytes; a source that ends
/// early produces an [`io::ErrorKind::UnexpectedEof`] error.
#[derive(Debug)]
pub struct Body<'a, R> {
    records: &'a mut StreamRecords<R>,
}

impl<R: Read> Read for Body<'_, R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let records = &mut *self.records;
        let max = buf.len().min(records.pending_body.min(usize::MAX as u64) as usize);
        if max == 0 {
            return Ok(0);
        }
        let n = records.inner.read(&mut buf[..max])?;
        if n == 0 {
            return Err(io::ErrorKind::UnexpectedEof.into());
        }
        records.position += n as u64;
        records.pending_body -= n as u64;
        Ok(n)
    }
}
