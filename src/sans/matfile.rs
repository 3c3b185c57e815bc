//! Level 5 MAT-file decoding.
//!
//! A MAT-file opens with 116 bytes of descriptive text, an 8-byte subsystem
//! offset, a 2-byte version and a 2-byte endian indicator. Tagged data
//! elements follow from offset 128. Each numeric `miMATRIX` element holds, in
//! order, array flags, dimensions, a name, the real part and (if complex) the
//! imaginary part.
//!
//! Only the location of the sample data is extracted here. Views over it are
//! built by the caller from the returned byte ranges.

use alloc::{string::String, vec::Vec};
use core::ops::Range;

use log::debug;
use tartan_bitfield::bitfield;
use thiserror::Error;
use zerocopy::FromBytes;

use super::format::{FormatCode, ScalarCodec};

/// An error decoding a MAT-file.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MatError {
    /// The buffer is shorter than the fixed header and first tag.
    #[error("MAT-file header needs {needed} bytes, found {found}.")]
    TooShort { needed: usize, found: usize },
    /// A header field holds a value the decoder does not recognise.
    #[error("Unrecognised MAT-file {field} ({value:?}).")]
    Unrecognised {
        field: &'static str,
        value: [u8; 2],
    },
    /// A data element runs past the end of its container.
    #[error("Data element at offset {0} is truncated.")]
    Truncated(usize),
    /// Every numeric variable is compressed.
    #[error("Compressed MAT-file variables are not supported.")]
    Compressed,
    /// The sample storage type has no format code.
    #[error("Unsupported MAT-file storage type ({0}).")]
    UnsupportedStorage(u32),
    /// No numeric array was found.
    #[error("No numeric array in MAT-file.")]
    NoNumericArray,
}

const MI_INT8: u32 = 1;
const MI_UINT8: u32 = 2;
const MI_INT16: u32 = 3;
const MI_INT32: u32 = 5;
const MI_SINGLE: u32 = 7;
const MI_DOUBLE: u32 = 9;
const MI_INT64: u32 = 12;
const MI_MATRIX: u32 = 14;
const MI_COMPRESSED: u32 = 15;

const MX_DOUBLE: u8 = 6;
const MX_UINT64: u8 = 15;

#[repr(C, packed)]
#[derive(FromBytes)]
struct FixedHeader {
    text: [u8; 116],
    _subsystem: [u8; 8],
    version: [u8; 2],
    endian: [u8; 2],
}

bitfield! {
    struct SmallTag(u32) {
        [0..16] data_type: u16,
        [16..32] byte_count: u16,
    }
}

bitfield! {
    struct ArrayFlags(u32) {
        [0..8] class: u8,
        [9] is_logical,
        [11] is_complex,
    }
}

/// A decoded MAT-file header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatHeader {
    /// Descriptive text, with trailing padding removed.
    pub text: String,
    pub version: u16,
    pub little_endian: bool,
}

impl MatHeader {
    /// Size of the fixed header in bytes.
    pub const SIZE: usize = 128;

    /// Whether `r` carries a MAT-file endian indicator.
    pub fn sniff(r: &[u8]) -> bool {
        matches!(r.get(126..128), Some(b"IM" | b"MI"))
    }

    /// Decode the fixed header at the start of `r`.
    pub fn decode(r: &[u8]) -> Result<Self, MatError> {
        // The fixed header plus the smallest element tag.
        const NEEDED: usize = MatHeader::SIZE + 4;

        let Some(header) = r.first_chunk::<{ Self::SIZE }>().filter(|_| r.len() >= NEEDED) else {
            Err(MatError::TooShort {
                needed: NEEDED,
                found: r.len(),
            })?
        };

        let FixedHeader {
            text,
            version,
            endian,
            ..
        } = zerocopy::transmute!(*header);

        let little_endian = match &endian {
            b"IM" => true,
            b"MI" => false,
            _ => Err(MatError::Unrecognised {
                field: "endian indicator",
                value: endian,
            })?,
        };

        let version_number = if little_endian {
            u16::from_le_bytes(version)
        } else {
            u16::from_be_bytes(version)
        };

        if version_number != 0x0100 {
            Err(MatError::Unrecognised {
                field: "version",
                value: version,
            })?;
        }

        let text = text
            .iter()
            .map(|b| *b as char)
            .collect::<String>()
            .trim_end_matches([' ', '\0'])
            .into();

        Ok(Self {
            text,
            version: version_number,
            little_endian,
        })
    }
}

/// Location and shape of a numeric array.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatVariable {
    pub name: String,
    pub dimensions: Vec<usize>,
    pub codec: ScalarCodec,
    pub is_logical: bool,
    /// Byte range of the real part within the file.
    pub real: Range<usize>,
    /// Byte range of the imaginary part within the file.
    pub imaginary: Option<Range<usize>>,
}

impl MatVariable {
    /// Format code of each part.
    pub fn format(&self) -> FormatCode {
        FormatCode([b'S', self.codec.to_char()])
    }

    /// Total number of values in each part.
    pub fn len(&self) -> usize {
        self.dimensions.iter().product()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Length of the first dimension, which is contiguous in storage.
    pub fn rows(&self) -> usize {
        self.dimensions.first().copied().unwrap_or(0)
    }

    /// Whether at most one dimension exceeds one.
    pub fn is_vector(&self) -> bool {
        self.dimensions.iter().filter(|d| **d > 1).count() <= 1
    }
}

/// A tagged data element.
struct Element {
    data_type: u32,
    /// Byte range of the element's data within the file.
    data: Range<usize>,
    /// Offset of the following element.
    next: usize,
}

fn u32_at(r: &[u8], i: usize, is_le: bool) -> Option<u32> {
    let bytes = *r.get(i..)?.first_chunk::<4>()?;
    Some(if is_le {
        u32::from_le_bytes(bytes)
    } else {
        u32::from_be_bytes(bytes)
    })
}

/// Read the element tagged at `i`, which must end by `end`.
fn element(r: &[u8], i: usize, end: usize, is_le: bool) -> Result<Element, MatError> {
    let truncated = MatError::Truncated(i);
    let word = u32_at(r, i, is_le).ok_or(truncated.clone())?;

    let small = SmallTag(word);
    let (data_type, data, next) = if small.byte_count() != 0 {
        let start = i + 4;
        let len = small.byte_count() as usize;
        (small.data_type() as u32, start..start + len, i + 8)
    } else {
        let len = u32_at(r, i + 4, is_le).ok_or(truncated.clone())? as usize;
        let start = i + 8;
        let stored = if word == MI_COMPRESSED {
            len
        } else {
            len.div_ceil(8) * 8
        };
        (word, start..start + len, start + stored)
    };

    if data.end > end {
        Err(truncated)?;
    }

    Ok(Element {
        data_type,
        data,
        next: next.min(end),
    })
}

fn storage_codec(data_type: u32) -> Result<ScalarCodec, MatError> {
    Ok(match data_type {
        MI_INT8 => ScalarCodec::Byte,
        MI_UINT8 => ScalarCodec::UnsignedByte,
        MI_INT16 => ScalarCodec::Short,
        MI_INT32 => ScalarCodec::Int,
        MI_INT64 => ScalarCodec::Long,
        MI_SINGLE => ScalarCodec::Float,
        MI_DOUBLE => ScalarCodec::Double,
        _ => Err(MatError::UnsupportedStorage(data_type))?,
    })
}

/// Find the first uncompressed numeric array in a MAT-file.
pub fn first_variable(r: &[u8], header: &MatHeader) -> Result<MatVariable, MatError> {
    let is_le = header.little_endian;
    let mut i = MatHeader::SIZE;
    let mut compressed = false;

    while i < r.len() {
        let e = element(r, i, r.len(), is_le)?;

        match e.data_type {
            MI_MATRIX => {
                if let Some(variable) = matrix(r, e.data.clone(), is_le)? {
                    return Ok(variable);
                }
            }
            MI_COMPRESSED => compressed = true,
            other => debug!("Skipping MAT-file element of type {other} at offset {i}."),
        }

        i = e.next;
    }

    Err(if compressed {
        MatError::Compressed
    } else {
        MatError::NoNumericArray
    })
}

/// Decode the subelements of a matrix, or `None` if it is not numeric.
fn matrix(r: &[u8], data: Range<usize>, is_le: bool) -> Result<Option<MatVariable>, MatError> {
    let flags = element(r, data.start, data.end, is_le)?;
    let flags_word = u32_at(r, flags.data.start, is_le).ok_or(MatError::Truncated(data.start))?;
    let flags_word = ArrayFlags(flags_word);

    if !(MX_DOUBLE..=MX_UINT64).contains(&flags_word.class()) {
        debug!("Skipping MAT-file array of class {}.", flags_word.class());
        return Ok(None);
    }

    let dims = element(r, flags.next, data.end, is_le)?;
    let dimensions = r[dims.data.clone()]
        .chunks_exact(4)
        .map(|c| u32_at(c, 0, is_le).unwrap_or(0) as usize)
        .collect();

    let name = element(r, dims.next, data.end, is_le)?;
    let name_text = r[name.data.clone()].iter().map(|b| *b as char).collect();

    let real = element(r, name.next, data.end, is_le)?;
    let codec = storage_codec(real.data_type)?;

    let imaginary = if flags_word.is_complex() {
        let imaginary = element(r, real.next, data.end, is_le)?;
        if storage_codec(imaginary.data_type)? != codec {
            Err(MatError::UnsupportedStorage(imaginary.data_type))?;
        }
        Some(imaginary.data)
    } else {
        None
    };

    Ok(Some(MatVariable {
        name: name_text,
        dimensions,
        codec,
        is_logical: flags_word.is_logical(),
        real: real.data,
        imaginary,
    }))
}
