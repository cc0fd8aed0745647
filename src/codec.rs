//! Byte-level helpers shared by the serializer and the frame parser.

use crate::error::FramingError;

pub const EXTENDED_START_FLAG: u8 = 0xF0;
pub const START_FLAG: u8 = 0xF1;
pub const STOP_FLAG: u8 = 0xF2;
pub const ESCAPE: u8 = 0xF3;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Endian {
    /// CSAFE's native order.
    #[default]
    Little,
    /// Used by the PM-specific configuration blocks.
    Big,
}

fn is_reserved(b: u8) -> bool {
    (EXTENDED_START_FLAG..=ESCAPE).contains(&b)
}

/// Escape every flag byte (0xF0..=0xF3) as `[0xF3, b & 0x03]`.
pub fn stuff(bytes: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(bytes.len() + bytes.len() / 8);
    for &b in bytes {
        if is_reserved(b) {
            out.push(ESCAPE);
            out.push(b & 0x03);
        } else {
            out.push(b);
        }
    }
    out
}

/// Undo [`stuff`] in a single forward pass. An escaped byte is emitted as-is and
/// never looked at again.
pub fn unstuff(bytes: &[u8]) -> Result<Vec<u8>, FramingError> {
    let mut out = Vec::with_capacity(bytes.len());
    let mut it = bytes.iter().copied();
    while let Some(b) = it.next() {
        if b == ESCAPE {
            let next = it.next().ok_or(FramingError::TrailingEscape)?;
            out.push(next | EXTENDED_START_FLAG);
        } else {
            out.push(b);
        }
    }
    Ok(out)
}

pub fn checksum(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0, |acc, b| acc ^ b)
}

/// Pack the low `width` bytes of `value`.
pub fn write_int(value: u64, width: usize, endian: Endian) -> Vec<u8> {
    let le = (0..width).map(|i| {
        if i < 8 {
            ((value >> (8 * i)) & 0xFF) as u8
        } else {
            0
        }
    });
    match endian {
        Endian::Little => le.collect(),
        Endian::Big => {
            let mut v: Vec<u8> = le.collect();
            v.reverse();
            v
        }
    }
}

/// Inverse of [`write_int`]; bytes beyond the eighth are ignored.
pub fn read_int(bytes: &[u8], endian: Endian) -> u64 {
    let fold = |acc: u64, (i, b): (usize, &u8)| {
        if i < 8 { acc | (u64::from(*b) << (8 * i)) } else { acc }
    };
    match endian {
        Endian::Little => bytes.iter().enumerate().fold(0, fold),
        Endian::Big => bytes.iter().rev().enumerate().fold(0, fold),
    }
}

pub fn hex(bytes: &[u8]) -> String {
    use std::fmt::Write;
    let mut s = String::with_capacity(bytes.len() * 3);
    for (i, b) in bytes.iter().enumerate() {
        if i > 0 {
            s.push(' ');
        }
        let _ = write!(s, "{:02X}", b);
    }
    s
}
