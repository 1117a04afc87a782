//! In-memory rewrite.

use tracing::{debug, instrument};

use super::Injector;
use crate::error::Result;
use crate::scan::scan;

impl Injector {
    /// Rewrite a complete in-memory archive.
    ///
    /// The output is `input` up to the trailer (with target entries
    /// renamed), then the new record, then the trailer record itself.
    /// Bytes following the trailer in `input` are not copied.
    #[instrument(skip_all, fields(input = input.len(), payload = payload.len()))]
    pub fn rewrite_buffered(&self, input: &[u8], payload: &[u8]) -> Result<Vec<u8>> {
        // Validated before looking at the input at all.
        let head = self.new_record_head(payload.len() as u64)?;
        let scan = scan(input, &self.target)?;
        if scan.targets.is_empty() {
            debug!(
                "no {} entry, appending without rename",
                String::from_utf8_lossy(&self.target)
            );
        }

        let new_len = self.new_record_len(payload.len() as u64)? as usize;
        let mut out = Vec::with_capacity(scan.end + new_len);
        out.extend_from_slice(&input[..scan.trailer]);
        for &offset in &scan.targets {
            self.rename(&mut out[offset..]);
        }
        self.write_new_record(&head, payload, &mut out)?;
        out.extend_from_slice(&input[scan.trailer..scan.end]);

        debug!(
            "rewrote {} byte archive into {} bytes ({} trailing bytes dropped)",
            input.len(),
            out.len(),
            scan.trailing
        );
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::align::pad4;
    use crate::error::Error;
    use crate::header::{Header, HeaderTemplate, TRAILER_NAME};
    use crate::record::Records;
    use similar_asserts::assert_eq;

    fn archive(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let mut buf = Vec::new();
        for (ino, (name, body)) in entries.iter().enumerate() {
            let header = Header {
                ino: ino as u32 + 1,
                mode: 0o100644,
                nlink: 1,
                filesize: body.len() as u32,
                ..Default::default()
            };
            buf.extend(header.encode(name.as_bytes()).unwrap());
            buf.extend_from_slice(body);
            buf.resize(buf.len() + pad4(body.len() as u64), 0);
        }
        let trailer = Header {
            nlink: 1,
            ..Default::default()
        };
        buf.extend(trailer.encode(TRAILER_NAME).unwrap());
        buf
    }

    fn injector() -> Injector {
        Injector::new(HeaderTemplate::executable(1_700_000_000)).unwrap()
    }

    #[test]
    fn test_rename_and_append() {
        let input = archive(&[("init", b"#!/bin/sh\necho old\n")]);
        let out = injector().rewrite_buffered(&input, b"NEW\n").unwrap();

        let trailer = input.len() - 124;
        let differing: Vec<_> = input[..trailer]
            .iter()
            .zip(&out[..trailer])
            .enumerate()
            .filter(|(_, (a, b))| a != b)
            .map(|(i, _)| i)
            .collect();
        assert_eq!(differing, vec![110 + 3]);
        assert_eq!(out[113], b'z');

        let records = Records::new(&out).collect::<Result<Vec<_>>>().unwrap();
        let names: Vec<_> = records.iter().map(|r| r.name()).collect();
        assert_eq!(names, vec![&b"iniz"[..], b"init", TRAILER_NAME]);
        assert_eq!(records[0].body(), b"#!/bin/sh\necho old\n");
        assert_eq!(records[1].body(), b"NEW\n");
        assert_eq!(records[1].header().ino, u32::MAX);
        assert_eq!(records[1].header().mode, 0o100755);
        assert_eq!(records[1].header().mtime, 1_700_000_000);
        assert_eq!(out.len(), input.len() + 120);
    }

    #[test]
    fn test_trailer_copied_verbatim() {
        let input = archive(&[("bin/sh", b"sh")]);
        let out = injector().rewrite_buffered(&input, b"X").unwrap();
        assert_eq!(&out[out.len() - 124..], &input[input.len() - 124..]);
    }

    #[test]
    fn test_trailing_zeroes_dropped() {
        let mut input = archive(&[("init", b"old")]);
        let clean = injector().rewrite_buffered(&input, b"P").unwrap();
        input.extend([0u8; 512]);
        let padded = injector().rewrite_buffered(&input, b"P").unwrap();
        assert_eq!(clean, padded);
        assert_eq!(padded.len(), input.len() - 512 + 120);
    }

    #[test]
    fn test_payload_checked_before_scan() {
        // Not an archive at all, but the injector refuses the template first
        let template = HeaderTemplate {
            mode: 0o040755,
            ..HeaderTemplate::executable(0)
        };
        assert!(matches!(
            crate::rewrite::rewrite_buffered(b"garbage", b"x", &template),
            Err(Error::InvalidField(_))
        ));
    }

    #[test]
    fn test_truncated() {
        let input = archive(&[("init", b"0123456789"), ("etc/hosts", b"127.0.0.1")]);
        let err = injector()
            .rewrite_buffered(&input[..200], b"P")
            .unwrap_err();
        assert!(matches!(err, Error::TruncatedArchive { offset: 128 }));
    }
}
