//! Zero-copy views over a data segment.
//!
//! Multi-byte scalars are viewed through `zerocopy`'s unaligned native-endian
//! wrappers, so the stored bytes are read in place. Byte swapping is not
//! performed: a segment whose declared order differs from the host's is
//! refused for any scalar wider than one byte.

use core::ops::Range;

use thiserror::Error;
use zerocopy::{
    FromBytes, Immutable, KnownLayout,
    byteorder::{F32, F64, I16, I32, I64, NativeEndian},
};

use super::{
    bits::BitArray,
    format::{Layout, Scalar, ScalarCodec},
};

/// An error constructing a view.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ViewError {
    /// The data byte order differs from the host's.
    #[error("{width}-byte scalars stored {} cannot be viewed on a {} host.", order(*data_little_endian), order(!*data_little_endian))]
    UnsupportedEndianness {
        width: usize,
        data_little_endian: bool,
    },
    /// The segment is too short for the requested element count.
    #[error("Data segment of {len} bytes is too short for {count} elements.")]
    OutOfBounds { count: usize, len: usize },
}

fn order(is_le: bool) -> &'static str {
    if is_le { "little-endian" } else { "big-endian" }
}

/// Uniform indexed access over any sample view.
pub trait Indexed {
    /// Number of addressable items.
    fn len(&self) -> usize;

    /// Read item `i` as a scalar.
    fn value(&self, i: usize) -> Option<Scalar>;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Indexed for BitArray<'_> {
    fn len(&self) -> usize {
        BitArray::len(self)
    }

    fn value(&self, i: usize) -> Option<Scalar> {
        self.get(i).ok().map(Scalar::U8)
    }
}

/// A flat run of scalars of one storage type, borrowed from the buffer.
#[derive(Debug, Clone, Copy)]
pub enum ScalarView<'a> {
    Bit(BitArray<'a>),
    Ascii(&'a [u8]),
    UnsignedByte(&'a [u8]),
    Byte(&'a [i8]),
    Short(&'a [I16<NativeEndian>]),
    Int(&'a [I32<NativeEndian>]),
    Long(&'a [I64<NativeEndian>]),
    Float(&'a [F32<NativeEndian>]),
    Double(&'a [F64<NativeEndian>]),
}

impl<'a> ScalarView<'a> {
    /// View `count` scalars of `codec` at the start of `r`.
    pub fn new(
        r: &'a [u8],
        codec: ScalarCodec,
        count: usize,
        data_little_endian: bool,
    ) -> Result<Self, ViewError> {
        let out_of_bounds = ViewError::OutOfBounds {
            count,
            len: r.len(),
        };

        let len = match codec.width() {
            Some(width) if width > 1 && data_little_endian != cfg!(target_endian = "little") => {
                Err(ViewError::UnsupportedEndianness {
                    width,
                    data_little_endian,
                })?
            }
            Some(width) => count.checked_mul(width),
            None => Some(count.div_ceil(8)),
        };

        let r = len.and_then(|n| r.get(..n)).ok_or(out_of_bounds)?;

        fn cast<T: FromBytes + KnownLayout + Immutable + ?Sized>(
            r: &[u8],
            err: ViewError,
        ) -> Result<&T, ViewError> {
            T::ref_from_bytes(r).map_err(|_| err)
        }

        Ok(match codec {
            ScalarCodec::Bit => Self::Bit(BitArray::with_len(r, count).ok_or(out_of_bounds)?),
            ScalarCodec::Ascii => Self::Ascii(r),
            ScalarCodec::UnsignedByte => Self::UnsignedByte(r),
            ScalarCodec::Byte => Self::Byte(cast(r, out_of_bounds)?),
            ScalarCodec::Short => Self::Short(cast(r, out_of_bounds)?),
            ScalarCodec::Int => Self::Int(cast(r, out_of_bounds)?),
            ScalarCodec::Long => Self::Long(cast(r, out_of_bounds)?),
            ScalarCodec::Float => Self::Float(cast(r, out_of_bounds)?),
            ScalarCodec::Double => Self::Double(cast(r, out_of_bounds)?),
        })
    }

    /// Number of scalars.
    pub fn len(&self) -> usize {
        match self {
            Self::Bit(b) => b.len(),
            Self::Ascii(s) | Self::UnsignedByte(s) => s.len(),
            Self::Byte(s) => s.len(),
            Self::Short(s) => s.len(),
            Self::Int(s) => s.len(),
            Self::Long(s) => s.len(),
            Self::Float(s) => s.len(),
            Self::Double(s) => s.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Read scalar `i`.
    pub fn get(&self, i: usize) -> Option<Scalar> {
        Some(match self {
            Self::Bit(b) => Scalar::U8(b.get(i).ok()?),
            Self::Ascii(s) | Self::UnsignedByte(s) => Scalar::U8(*s.get(i)?),
            Self::Byte(s) => Scalar::I8(*s.get(i)?),
            Self::Short(s) => Scalar::I16(s.get(i)?.get()),
            Self::Int(s) => Scalar::I32(s.get(i)?.get()),
            Self::Long(s) => Scalar::I64(s.get(i)?.get()),
            Self::Float(s) => Scalar::F32(s.get(i)?.get()),
            Self::Double(s) => Scalar::F64(s.get(i)?.get()),
        })
    }

    /// A narrower view over `range`, or `None` if it exceeds this one.
    pub fn slice(&self, range: Range<usize>) -> Option<Self> {
        Some(match self {
            Self::Bit(b) => Self::Bit(b.slice(range)?),
            Self::Ascii(s) => Self::Ascii(s.get(range)?),
            Self::UnsignedByte(s) => Self::UnsignedByte(s.get(range)?),
            Self::Byte(s) => Self::Byte(s.get(range)?),
            Self::Short(s) => Self::Short(s.get(range)?),
            Self::Int(s) => Self::Int(s.get(range)?),
            Self::Long(s) => Self::Long(s.get(range)?),
            Self::Float(s) => Self::Float(s.get(range)?),
            Self::Double(s) => Self::Double(s.get(range)?),
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = Scalar> + '_ {
        (0..self.len()).filter_map(|i| self.get(i))
    }
}

impl Indexed for ScalarView<'_> {
    fn len(&self) -> usize {
        ScalarView::len(self)
    }

    fn value(&self, i: usize) -> Option<Scalar> {
        self.get(i)
    }
}

/// A data segment viewed as a sequence of elements.
///
/// An element is one atom for one-dimensional data, or one row of atoms for
/// two-dimensional data.
#[derive(Debug, Clone, Copy)]
pub struct DataView<'a> {
    scalars: ScalarView<'a>,
    scalars_per_element: usize,
}

impl<'a> DataView<'a> {
    /// View every whole element of `layout` held in `r`.
    pub fn new(r: &'a [u8], layout: &Layout, data_little_endian: bool) -> Result<Self, ViewError> {
        let count = layout.element_count(r.len());
        let scalars_per_element = layout.scalars_per_element();

        let scalars = ScalarView::new(
            r,
            layout.geometry.codec,
            count * scalars_per_element,
            data_little_endian,
        )?;

        Ok(Self {
            scalars,
            scalars_per_element,
        })
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        match self.scalars_per_element {
            0 => 0,
            n => self.scalars.len() / n,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn scalars_per_element(&self) -> usize {
        self.scalars_per_element
    }

    /// Every scalar of the segment, flattened.
    pub fn scalars(&self) -> &ScalarView<'a> {
        &self.scalars
    }

    /// The scalars of element `i`.
    pub fn element(&self, i: usize) -> Option<ScalarView<'a>> {
        let n = self.scalars_per_element;
        let start = i.checked_mul(n)?;
        self.scalars.slice(start..start.checked_add(n)?)
    }

    pub fn elements(&self) -> impl Iterator<Item = ScalarView<'a>> + '_ {
        (0..self.len()).filter_map(|i| self.element(i))
    }
}

impl Indexed for DataView<'_> {
    fn len(&self) -> usize {
        DataView::len(self)
    }

    /// The first scalar of element `i`.
    fn value(&self, i: usize) -> Option<Scalar> {
        self.element(i)?.get(0)
    }
}
