//! 4-byte alignment arithmetic for newc archives.

use std::io::{self, Write};

/// The only alignment newc knows about.
pub const ALIGN: u64 = 4;

const ZEROES: [u8; ALIGN as usize] = [0; ALIGN as usize];

/// Number of bytes needed to round `n` up to a multiple of `align`.
pub fn pad(n: u64, align: u64) -> u64 {
    (align - (n % align)) % align
}

/// [`pad`] with the newc alignment.
pub fn pad4(n: u64) -> usize {
    pad(n, ALIGN) as usize
}

/// Write the zero padding that follows a region of `len` bytes.
pub(crate) fn write_padding<W: Write + ?Sized>(dst: &mut W, len: u64) -> io::Result<()> {
    dst.write_all(&ZEROES[..pad4(len)])
}
