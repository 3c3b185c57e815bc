//! Read-only bit-addressable sequences.

use core::ops::{Index, Range};

use thiserror::Error;

/// An index past the end of a sequence.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("Index {index} out of range for length {len}.")]
pub struct IndexOutOfRange {
    pub index: usize,
    pub len: usize,
}

/// A sequence of bits borrowed from a byte slice.
///
/// Bit `0` is the most-significant bit of the first byte. The length is
/// counted in bits and need not fill the final byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BitArray<'a> {
    r: &'a [u8],
    offset: usize,
    len: usize,
}

impl<'a> BitArray<'a> {
    /// View every bit of `r`.
    pub fn new(r: &'a [u8]) -> Self {
        Self {
            r,
            offset: 0,
            len: r.len() * 8,
        }
    }

    /// View the first `len` bits of `r`, or `None` if `r` holds fewer.
    pub fn with_len(r: &'a [u8], len: usize) -> Option<Self> {
        if len > r.len().saturating_mul(8) {
            return None;
        }

        let r = &r[..len.div_ceil(8)];
        Some(Self { r, offset: 0, len })
    }

    /// Number of bits.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The backing bytes, which may begin mid-byte for a slice.
    pub fn as_bytes(&self) -> &'a [u8] {
        self.r
    }

    /// Read bit `i` as `0` or `1`.
    pub fn get(&self, i: usize) -> Result<u8, IndexOutOfRange> {
        if i >= self.len {
            Err(IndexOutOfRange {
                index: i,
                len: self.len,
            })?;
        }

        let i = self.offset + i;
        Ok((self.r[i / 8] >> (7 - (i % 8))) & 1)
    }

    /// A narrower view over `range`, or `None` if it exceeds this one.
    pub fn slice(&self, range: Range<usize>) -> Option<Self> {
        if range.start > range.end || range.end > self.len {
            return None;
        }

        let start = self.offset + range.start;
        let end = self.offset + range.end;
        let r = &self.r[start / 8..end.div_ceil(8)];

        Some(Self {
            r,
            offset: start % 8,
            len: range.end - range.start,
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = u8> + '_ {
        (0..self.len).filter_map(|i| self.get(i).ok())
    }
}

impl Index<usize> for BitArray<'_> {
    type Output = u8;

    /// Panics if `i` is out of range, as slices do.
    fn index(&self, i: usize) -> &u8 {
        const BITS: [u8; 2] = [0, 1];

        match self.get(i) {
            Ok(bit) => &BITS[bit as usize],
            Err(err) => panic!("{err}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn msb_first() {
        let bits = BitArray::new(&[0b1010_0000, 0b0000_0001]);
        assert_eq!(bits.len(), 16);
        assert_eq!(bits.get(0), Ok(1));
        assert_eq!(bits.get(1), Ok(0));
        assert_eq!(bits.get(2), Ok(1));
        assert_eq!(bits.get(15), Ok(1));
        assert_eq!(bits[14], 0);
    }

    #[test]
    fn length_ignores_padding() {
        let bits = BitArray::with_len(&[0xFF, 0xFF], 11).unwrap();
        assert_eq!(bits.len(), 11);
        assert_eq!(bits.as_bytes().len(), 2);
        assert_eq!(bits.get(10), Ok(1));
        assert_eq!(bits.get(11), Err(IndexOutOfRange { index: 11, len: 11 }));
        assert!(BitArray::with_len(&[0xFF], 9).is_none());
    }

    #[test]
    fn slice_mid_byte() {
        let bits = BitArray::new(&[0b0001_1100, 0b1000_0000]);
        let slice = bits.slice(3..9).unwrap();
        assert_eq!(slice.iter().collect::<Vec<_>>(), [1, 1, 1, 0, 0, 1]);
        assert!(bits.slice(3..17).is_none());
    }

    #[test]
    #[should_panic]
    fn index_past_end() {
        let bits = BitArray::new(&[0]);
        let _ = bits[8];
    }
}
