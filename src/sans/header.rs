//! Fixed Bluefile header decoding.
//!
//! The header occupies the first 512 bytes. Its numeric fields are stored in
//! the order named by the header representation tag, which need not match the
//! order of the data segment. The second 256 bytes hold the adjunct, laid out
//! according to the file class.

use thiserror::Error;
use zerocopy::FromBytes;

use super::{
    extended::{self, KeywordForm, Keywords},
    format::FormatCode,
};

/// An error decoding a fixed header.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HeaderError {
    /// The buffer is shorter than the fixed header.
    #[error("Header needs {needed} bytes, found {found}.")]
    TooShort { needed: usize, found: usize },
    /// A field holds a value the decoder does not recognise.
    #[error("Unrecognised {field} ({value:?}).")]
    Unrecognised {
        field: &'static str,
        value: [u8; 4],
    },
    /// A numeric field is out of range.
    #[error("Invalid {field}.")]
    Invalid { field: &'static str },
}

#[repr(C, packed)]
#[derive(FromBytes)]
struct FixedHeader {
    version: [u8; 4],
    head_rep: [u8; 4],
    data_rep: [u8; 4],
    _detached: [u8; 4],
    _protected: [u8; 4],
    _pipe: [u8; 4],
    ext_start: [u8; 4],
    ext_size: [u8; 4],
    data_start: [u8; 8],
    data_size: [u8; 8],
    type_code: [u8; 4],
    format: [u8; 2],
    _flagmask: [u8; 2],
    timecode: [u8; 8],
    _pipe_state: [u8; 96],
    keylength: [u8; 4],
    keywords: [u8; 92],
    adjunct: [u8; 256],
}

#[repr(C, packed)]
#[derive(FromBytes)]
struct OneDimensional {
    xstart: [u8; 8],
    xdelta: [u8; 8],
    xunits: [u8; 4],
    _rest: [u8; 236],
}

#[repr(C, packed)]
#[derive(FromBytes)]
struct TwoDimensional {
    xstart: [u8; 8],
    xdelta: [u8; 8],
    xunits: [u8; 4],
    subsize: [u8; 4],
    ystart: [u8; 8],
    ydelta: [u8; 8],
    yunits: [u8; 4],
    _rest: [u8; 212],
}

/// Class-specific header fields.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Adjunct {
    /// Class 1: a single sequence of atoms.
    OneDimensional { xstart: f64, xdelta: f64, xunits: i32 },
    /// Class 2: rows of `subsize` atoms.
    TwoDimensional {
        xstart: f64,
        xdelta: f64,
        xunits: i32,
        subsize: i32,
        ystart: f64,
        ydelta: f64,
        yunits: i32,
    },
    /// Any other class; the adjunct is not interpreted.
    Unknown,
}

impl Adjunct {
    pub fn xstart(&self) -> Option<f64> {
        match *self {
            Self::OneDimensional { xstart, .. } | Self::TwoDimensional { xstart, .. } => {
                Some(xstart)
            }
            Self::Unknown => None,
        }
    }

    pub fn xdelta(&self) -> Option<f64> {
        match *self {
            Self::OneDimensional { xdelta, .. } | Self::TwoDimensional { xdelta, .. } => {
                Some(xdelta)
            }
            Self::Unknown => None,
        }
    }

    pub fn xunits(&self) -> Option<i32> {
        match *self {
            Self::OneDimensional { xunits, .. } | Self::TwoDimensional { xunits, .. } => {
                Some(xunits)
            }
            Self::Unknown => None,
        }
    }

    /// Atoms per element: always `1` for class 1.
    pub fn subsize(&self) -> Option<i32> {
        match *self {
            Self::OneDimensional { .. } => Some(1),
            Self::TwoDimensional { subsize, .. } => Some(subsize),
            Self::Unknown => None,
        }
    }

    pub fn ystart(&self) -> Option<f64> {
        match *self {
            Self::TwoDimensional { ystart, .. } => Some(ystart),
            _ => None,
        }
    }

    pub fn ydelta(&self) -> Option<f64> {
        match *self {
            Self::TwoDimensional { ydelta, .. } => Some(ydelta),
            _ => None,
        }
    }

    pub fn yunits(&self) -> Option<i32> {
        match *self {
            Self::TwoDimensional { yunits, .. } => Some(yunits),
            _ => None,
        }
    }
}

/// A decoded fixed header.
#[derive(Debug, Clone, PartialEq)]
pub struct BlueHeader {
    pub version: [u8; 4],
    pub head_little_endian: bool,
    pub data_little_endian: bool,
    /// Extended header offset, in 512-byte blocks.
    pub ext_start: i32,
    /// Extended header length in bytes.
    pub ext_size: i32,
    /// Data segment offset in bytes.
    pub data_start: f64,
    /// Data segment length in bytes.
    pub data_size: f64,
    pub type_code: u32,
    pub format: FormatCode,
    /// Seconds since 1950-01-01.
    pub timecode: f64,
    /// Entries of the main header keyword block.
    pub keywords: Keywords,
    pub adjunct: Adjunct,
}

impl BlueHeader {
    /// Size of the fixed header in bytes.
    pub const SIZE: usize = 512;

    /// Magic version tag.
    pub const VERSION: [u8; 4] = *b"BLUE";

    /// File class, from the type code.
    pub fn class(&self) -> u32 {
        self.type_code / 1000
    }

    /// Byte range of the extended header, if there is one.
    pub fn ext_region(&self) -> Result<Option<core::ops::Range<usize>>, HeaderError> {
        let size = match self.ext_size {
            0 => return Ok(None),
            i32::MIN..=-1 => Err(HeaderError::Invalid { field: "ext_size" })?,
            size => size as usize,
        };

        let invalid_start = HeaderError::Invalid { field: "ext_start" };

        let start = usize::try_from(self.ext_start)
            .ok()
            .and_then(|start| start.checked_mul(512))
            .ok_or(invalid_start.clone())?;
        let end = start.checked_add(size).ok_or(invalid_start)?;

        Ok(Some(start..end))
    }

    /// Decode the fixed header at the start of `r`.
    pub fn decode(r: &[u8], form: KeywordForm) -> Result<Self, HeaderError> {
        let Some(r) = r.first_chunk::<{ Self::SIZE }>() else {
            Err(HeaderError::TooShort {
                needed: Self::SIZE,
                found: r.len(),
            })?
        };

        let FixedHeader {
            version,
            head_rep,
            data_rep,
            ext_start,
            ext_size,
            data_start,
            data_size,
            type_code,
            format,
            timecode,
            keylength,
            keywords,
            adjunct,
            ..
        } = zerocopy::transmute!(*r);

        if version != Self::VERSION {
            Err(HeaderError::Unrecognised {
                field: "version",
                value: version,
            })?;
        }

        let head_little_endian = is_little_endian(head_rep, "header representation")?;
        let data_little_endian = is_little_endian(data_rep, "data representation")?;

        let is_le = head_little_endian;

        macro_rules! read {
            ($t:ty, $r:expr) => {
                if is_le {
                    <$t>::from_le_bytes($r)
                } else {
                    <$t>::from_be_bytes($r)
                }
            };
        }

        let data_start = read!(f64, data_start);
        let data_size = read!(f64, data_size);

        for (field, value) in [("data start", data_start), ("data size", data_size)] {
            if !value.is_finite() || value < 0.0 {
                Err(HeaderError::Invalid { field })?;
            }
        }

        let type_code = read!(u32, type_code);

        let keylength = read!(i32, keylength).clamp(0, keywords.len() as i32) as usize;
        let keywords = extended::main_keywords(&keywords[..keylength], form);

        let adjunct = match type_code / 1000 {
            1 => {
                let OneDimensional {
                    xstart,
                    xdelta,
                    xunits,
                    ..
                } = zerocopy::transmute!(adjunct);

                Adjunct::OneDimensional {
                    xstart: read!(f64, xstart),
                    xdelta: read!(f64, xdelta),
                    xunits: read!(i32, xunits),
                }
            }
            2 => {
                let TwoDimensional {
                    xstart,
                    xdelta,
                    xunits,
                    subsize,
                    ystart,
                    ydelta,
                    yunits,
                    ..
                } = zerocopy::transmute!(adjunct);

                Adjunct::TwoDimensional {
                    xstart: read!(f64, xstart),
                    xdelta: read!(f64, xdelta),
                    xunits: read!(i32, xunits),
                    subsize: read!(i32, subsize),
                    ystart: read!(f64, ystart),
                    ydelta: read!(f64, ydelta),
                    yunits: read!(i32, yunits),
                }
            }
            _ => Adjunct::Unknown,
        };

        Ok(Self {
            version,
            head_little_endian,
            data_little_endian,
            ext_start: read!(i32, ext_start),
            ext_size: read!(i32, ext_size),
            data_start,
            data_size,
            type_code,
            format: FormatCode(format),
            timecode: read!(f64, timecode),
            keywords,
            adjunct,
        })
    }
}

fn is_little_endian(rep: [u8; 4], field: &'static str) -> Result<bool, HeaderError> {
    match &rep {
        b"EEEI" => Ok(true),
        b"IEEE" => Ok(false),
        _ => Err(HeaderError::Unrecognised { field, value: rep }),
    }
}
