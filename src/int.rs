//! Fixed-width unsigned integer encode/decode (1/2/3/4/8 bytes, either endian).

use crate::queue::ByteView;
use byteorder::{BigEndian, ByteOrder, LittleEndian};
use std::fmt;

/// Byte order for multi-byte integers. Width-1 integers ignore it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endianness {
    Big,
    Little,
}

/// Field width in bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IntWidth {
    One,
    Two,
    Three,
    Four,
    Eight,
}

impl IntWidth {
    pub fn bytes(self) -> usize {
        match self {
            IntWidth::One => 1,
            IntWidth::Two => 2,
            IntWidth::Three => 3,
            IntWidth::Four => 4,
            IntWidth::Eight => 8,
        }
    }
}

/// A fixed-width unsigned integer field: width times byte order.
///
/// Decoded values are always carried as plain `u64`; width and endianness are
/// purely wire-level concerns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IntSpec {
    pub width: IntWidth,
    pub endian: Endianness,
}

impl IntSpec {
    pub const fn new(width: IntWidth, endian: Endianness) -> Self {
        IntSpec { width, endian }
    }

    pub fn bytes(self) -> usize {
        self.width.bytes()
    }

    /// Bit mask covering the field, e.g. `0x00ff_ffff` for width 3.
    pub fn mask(self) -> u64 {
        match self.width {
            IntWidth::Eight => u64::MAX,
            w => (1u64 << (8 * w.bytes())) - 1,
        }
    }
}

impl fmt::Display for IntSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "u{}", 8 * self.bytes())?;
        if self.width != IntWidth::One {
            f.write_str(match self.endian {
                Endianness::Big => "be",
                Endianness::Little => "le",
            })?;
        }
        Ok(())
    }
}

/// Decode `spec.width` bytes from the front of `view`, zero-extended to u64.
///
/// The view must hold at least `spec.bytes()` bytes; this is the bounded
/// (<= 8 byte) linearization path.
pub fn decode_int(view: &ByteView, spec: IntSpec) -> u64 {
    let n = spec.bytes();
    let mut buf = [0u8; 8];
    view.copy_into(&mut buf[..n]);
    match spec.endian {
        Endianness::Big => BigEndian::read_uint(&buf[..n], n),
        Endianness::Little => LittleEndian::read_uint(&buf[..n], n),
    }
}

/// Encode `value` into exactly `dst` (`dst.len()` must equal `spec.bytes()`).
/// Out-of-range values are truncated bitwise, so width 3 keeps the low 24 bits.
pub fn write_int(value: u64, spec: IntSpec, dst: &mut [u8]) {
    let n = spec.bytes();
    debug_assert_eq!(dst.len(), n);
    let value = value & spec.mask();
    match spec.endian {
        Endianness::Big => BigEndian::write_uint(dst, value, n),
        Endianness::Little => LittleEndian::write_uint(dst, value, n),
    }
}

/// Encode `value` and append it to `out`.
pub fn append_int(value: u64, spec: IntSpec, out: &mut Vec<u8>) {
    let mut buf = [0u8; 8];
    let n = spec.bytes();
    write_int(value, spec, &mut buf[..n]);
    out.extend_from_slice(&buf[..n]);
}
