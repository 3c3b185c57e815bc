//! Format codes and element geometry.
//!
//! A format code is two ASCII characters. The first gives the number of
//! scalars in each atom (`S`calar, `C`omplex, `V`ector, ...), the second the
//! storage type of each scalar (`B`yte, `I`nteger, `F`loat, ...). The tables
//! here are plain `const fn` matches, shared by every decode.

use thiserror::Error;

/// An error resolving a format code.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum FormatError {
    /// A character of the format code has no entry in its table.
    #[error("Unsupported format character ({0:?}).")]
    UnsupportedFormat(char),
}

/// Storage type of a single scalar, with the strategy used to read it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarCodec {
    /// `P`: one bit, most-significant bit first.
    Bit,
    /// `A`: one byte of text.
    Ascii,
    /// `O`: `u8`.
    UnsignedByte,
    /// `B`: `i8`.
    Byte,
    /// `I`: `i16`.
    Short,
    /// `L`: `i32`.
    Int,
    /// `X`: `i64`.
    Long,
    /// `F`: `f32`.
    Float,
    /// `D`: `f64`.
    Double,
}

impl ScalarCodec {
    /// Look up the codec for a storage character.
    pub const fn from_char(c: u8) -> Option<Self> {
        Some(match c {
            b'P' => Self::Bit,
            b'A' => Self::Ascii,
            b'O' => Self::UnsignedByte,
            b'B' => Self::Byte,
            b'I' => Self::Short,
            b'L' => Self::Int,
            b'X' => Self::Long,
            b'F' => Self::Float,
            b'D' => Self::Double,
            _ => return None,
        })
    }

    /// The storage character for this codec.
    pub const fn to_char(self) -> u8 {
        match self {
            Self::Bit => b'P',
            Self::Ascii => b'A',
            Self::UnsignedByte => b'O',
            Self::Byte => b'B',
            Self::Short => b'I',
            Self::Int => b'L',
            Self::Long => b'X',
            Self::Float => b'F',
            Self::Double => b'D',
        }
    }

    /// Width of one scalar in bits.
    pub const fn bits(self) -> usize {
        match self {
            Self::Bit => 1,
            Self::Ascii | Self::UnsignedByte | Self::Byte => 8,
            Self::Short => 16,
            Self::Int | Self::Float => 32,
            Self::Long | Self::Double => 64,
        }
    }

    /// Width of one scalar in whole bytes, or `None` for bit-packed storage.
    pub const fn width(self) -> Option<usize> {
        match self {
            Self::Bit => None,
            _ => Some(self.bits() / 8),
        }
    }

    /// Decode the scalar starting at `offset` in `r`.
    ///
    /// Returns `None` for bit-packed storage, or if `r` is too short.
    pub fn decode(self, r: &[u8], offset: usize, is_le: bool) -> Option<Scalar> {
        macro_rules! read {
            ($t:ty) => {{
                let end = offset.checked_add(size_of::<$t>())?;
                let bytes = r.get(offset..end)?.try_into().ok()?;
                if is_le {
                    <$t>::from_le_bytes(bytes)
                } else {
                    <$t>::from_be_bytes(bytes)
                }
            }};
        }

        Some(match self {
            Self::Bit => return None,
            Self::Ascii | Self::UnsignedByte => Scalar::U8(read!(u8)),
            Self::Byte => Scalar::I8(read!(i8)),
            Self::Short => Scalar::I16(read!(i16)),
            Self::Int => Scalar::I32(read!(i32)),
            Self::Long => Scalar::I64(read!(i64)),
            Self::Float => Scalar::F32(read!(f32)),
            Self::Double => Scalar::F64(read!(f64)),
        })
    }
}

/// A single decoded scalar, kept at its stored precision.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize), serde(untagged))]
pub enum Scalar {
    U8(u8),
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    F32(f32),
    F64(f64),
}

impl Scalar {
    /// Widen to `f64`. Lossy for `I64` values beyond 2^53.
    pub fn to_f64(self) -> f64 {
        match self {
            Self::U8(x) => x as f64,
            Self::I8(x) => x as f64,
            Self::I16(x) => x as f64,
            Self::I32(x) => x as f64,
            Self::I64(x) => x as f64,
            Self::F32(x) => x as f64,
            Self::F64(x) => x,
        }
    }

    /// Widen to `i64` if the scalar is an integer.
    pub fn to_i64(self) -> Option<i64> {
        match self {
            Self::U8(x) => Some(x as i64),
            Self::I8(x) => Some(x as i64),
            Self::I16(x) => Some(x as i64),
            Self::I32(x) => Some(x as i64),
            Self::I64(x) => Some(x),
            Self::F32(_) | Self::F64(_) => None,
        }
    }
}

impl core::fmt::Display for Scalar {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::U8(x) => write!(f, "{x}"),
            Self::I8(x) => write!(f, "{x}"),
            Self::I16(x) => write!(f, "{x}"),
            Self::I32(x) => write!(f, "{x}"),
            Self::I64(x) => write!(f, "{x}"),
            Self::F32(x) => write!(f, "{x}"),
            Self::F64(x) => write!(f, "{x}"),
        }
    }
}

/// Number of scalars in an atom for a structure character.
pub const fn scalars_per_atom(c: u8) -> Option<usize> {
    Some(match c {
        b'S' | b'U' => 1,
        b'C' => 2,
        b'V' => 3,
        b'Q' => 4,
        b'M' => 9,
        b'X' => 10,
        b'T' => 16,
        b'1'..=b'9' => (c - b'0') as usize,
        _ => return None,
    })
}

/// A two-character format code, such as `SD` or `CF`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FormatCode(pub [u8; 2]);

impl FormatCode {
    /// Resolve both characters into an atom geometry.
    pub fn resolve(self) -> Result<Geometry, FormatError> {
        let [structure, storage] = self.0;

        let scalars_per_atom = scalars_per_atom(structure)
            .ok_or(FormatError::UnsupportedFormat(structure as char))?;
        let codec = ScalarCodec::from_char(storage)
            .ok_or(FormatError::UnsupportedFormat(storage as char))?;

        Ok(Geometry {
            scalars_per_atom,
            codec,
        })
    }
}

impl core::fmt::Display for FormatCode {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}{}", self.0[0] as char, self.0[1] as char)
    }
}

/// Shape of one atom.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    pub scalars_per_atom: usize,
    pub codec: ScalarCodec,
}

impl Geometry {
    /// Bytes per scalar; `0.125` for bit-packed storage.
    pub fn bytes_per_scalar(&self) -> f64 {
        self.codec.bits() as f64 / 8.0
    }

    /// Bytes per atom; fractional for bit-packed storage.
    pub fn bytes_per_atom(&self) -> f64 {
        self.scalars_per_atom as f64 * self.bytes_per_scalar()
    }

    /// Bits per atom.
    pub const fn bits_per_atom(&self) -> usize {
        self.scalars_per_atom * self.codec.bits()
    }
}

/// Shape of one element: an atom geometry repeated `atoms_per_element` times.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Layout {
    pub geometry: Geometry,
    pub atoms_per_element: usize,
}

impl Layout {
    /// Scalars in one element.
    pub const fn scalars_per_element(&self) -> usize {
        self.geometry.scalars_per_atom * self.atoms_per_element
    }

    /// Bits in one element.
    pub const fn bits_per_element(&self) -> usize {
        self.scalars_per_element() * self.geometry.codec.bits()
    }

    /// Bytes per element; fractional for bit-packed storage.
    pub fn bytes_per_element(&self) -> f64 {
        self.atoms_per_element as f64 * self.geometry.bytes_per_atom()
    }

    /// Number of whole elements held in `data_size` bytes.
    pub const fn element_count(&self, data_size: usize) -> usize {
        match self.bits_per_element() {
            0 => 0,
            bits => data_size.saturating_mul(8) / bits,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_complex_float() {
        let geometry = FormatCode(*b"CF").resolve().unwrap();
        assert_eq!(geometry.scalars_per_atom, 2);
        assert_eq!(geometry.codec, ScalarCodec::Float);
        assert_eq!(geometry.bytes_per_scalar(), 4.0);
        assert_eq!(geometry.bytes_per_atom(), 8.0);
    }

    #[test]
    fn resolve_bit_packed() {
        let geometry = FormatCode(*b"SP").resolve().unwrap();
        assert_eq!(geometry.bytes_per_scalar(), 0.125);
        assert_eq!(geometry.codec.width(), None);
    }

    #[test]
    fn resolve_digit_structure() {
        let geometry = FormatCode(*b"7I").resolve().unwrap();
        assert_eq!(geometry.scalars_per_atom, 7);
        assert_eq!(geometry.bits_per_atom(), 7 * 16);
    }

    #[test]
    fn reject_unknown_characters() {
        assert_eq!(
            FormatCode(*b"ZD").resolve(),
            Err(FormatError::UnsupportedFormat('Z'))
        );
        assert_eq!(
            FormatCode(*b"SZ").resolve(),
            Err(FormatError::UnsupportedFormat('Z'))
        );
    }

    #[test]
    fn element_count_two_dimensional() {
        let layout = Layout {
            geometry: FormatCode(*b"SD").resolve().unwrap(),
            atoms_per_element: 128,
        };
        assert_eq!(layout.element_count(16 * 128 * 8), 16);
        assert_eq!(layout.bytes_per_element(), 1024.0);
    }

    #[test]
    fn decode_under_both_orders() {
        let r = [0x3F, 0xF0, 0, 0, 0, 0, 0, 0];
        assert_eq!(ScalarCodec::Double.decode(&r, 0, false), Some(Scalar::F64(1.0)));

        let r = [0x00, 0x01, 0x02];
        assert_eq!(ScalarCodec::Short.decode(&r, 1, true), Some(Scalar::I16(0x0201)));
        assert_eq!(ScalarCodec::Short.decode(&r, 2, true), None);
        assert_eq!(ScalarCodec::Bit.decode(&r, 0, true), None);
    }
}
