//! Convenience interfaces for decoding whole files.
//!
//! [`decode`] takes a fully buffered file, recognises its format, and returns
//! a [`Descriptor`] holding the header fields and a zero-copy view over the
//! samples. Decoding is all-or-nothing: the first structural error aborts it.
//! Only extended header records are decoded on a best-effort basis.
//!
//! With the `std` feature, [`decode_from_source`] first acquires the bytes
//! from a file or reader.

pub mod blue;
pub mod mat;
#[cfg(feature = "std")]
pub mod source;

use alloc::string::String;
use core::ops::Range;

use log::debug;
use thiserror::Error;

use crate::sans::{
    extended::{KeywordForm, Keywords, Value},
    format::{FormatCode, FormatError, Layout},
    header::{Adjunct, HeaderError},
    matfile::MatError,
    units,
    view::{DataView, ViewError},
};

pub use blue::Bluefile;
pub use mat::MatFile;
#[cfg(feature = "std")]
pub use source::{AcquisitionError, ReadSource, Source, acquire, decode_from_source};

/// Errors occurring while decoding a buffer.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    /// Incorrect Bluefile header.
    #[error("Malformed header: {0}")]
    MalformedHeader(#[from] HeaderError),
    /// Incorrect MAT-file structure.
    #[error("Malformed MAT-file: {0}")]
    MalformedMatFile(#[from] MatError),
    /// Unknown format code.
    #[error(transparent)]
    UnsupportedFormat(#[from] FormatError),
    /// The data segment cannot be viewed on this host.
    #[error(transparent)]
    UnsupportedView(#[from] ViewError),
    /// A region declared by the header lies beyond the buffer.
    #[error("The {region} ({start}..{end}) lies beyond a buffer of {len} bytes.")]
    Truncated {
        region: &'static str,
        start: usize,
        end: usize,
        len: usize,
    },
}

/// Decoding options.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize), serde(default))]
pub struct Options {
    /// Representation of extended header keywords.
    #[cfg_attr(feature = "serde", serde(alias = "ext_header_type"))]
    pub ext_header: KeywordForm,
}

impl Options {
    pub fn new(ext_header: KeywordForm) -> Self {
        Self { ext_header }
    }
}

/// A file format the orchestrator can recognise and decode.
pub trait FormatReader {
    /// Whether `r` appears to hold this format.
    fn accepts(&self, r: &[u8]) -> bool;

    /// Decode a complete file.
    fn read<'a>(&self, r: &'a [u8], o: &Options) -> Result<Descriptor<'a>, Error>;
}

/// Decode a buffered file in any supported format.
///
/// Buffers not recognised by any reader are decoded as Bluefiles, so that the
/// error names the offending header field.
pub fn decode<'a>(r: &'a [u8], o: &Options) -> Result<Descriptor<'a>, Error> {
    let readers: [&dyn FormatReader; 2] = [&Bluefile, &MatFile];

    match readers.into_iter().find(|reader| reader.accepts(r)) {
        Some(reader) => reader.read(r, o),
        None => Bluefile.read(r, o),
    }
}

/// The originating file format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Bluefile,
    MatFile,
}

/// Format-independent header fields.
#[derive(Debug, Clone, PartialEq)]
pub struct Header {
    pub kind: FileKind,
    pub version: String,
    pub head_little_endian: bool,
    pub data_little_endian: bool,
    /// Extended header offset, in 512-byte blocks.
    pub ext_start: i32,
    /// Extended header length in bytes.
    pub ext_size: i32,
    pub type_code: u32,
    pub format: FormatCode,
    /// Seconds since 1950-01-01.
    pub timecode: f64,
    /// Data segment offset in bytes.
    pub data_start: usize,
    /// Data segment length in bytes.
    pub data_size: usize,
    pub adjunct: Adjunct,
    /// Main header keywords.
    pub keywords: Keywords,
    /// Extended header keywords, if the file has an extended header.
    pub ext_header: Option<Keywords>,
}

/// A decoded file.
///
/// The sample views borrow from the decoded buffer.
#[derive(Debug, Clone)]
pub struct Descriptor<'a> {
    header: Header,
    layout: Layout,
    data: DataView<'a>,
    imaginary: Option<DataView<'a>>,
}

/// Seconds from 1950-01-01 to 1970-01-01.
const UNIX_EPOCH_OFFSET: f64 = 631_152_000.0;

impl<'a> Descriptor<'a> {
    /// Build the sample views described by `header` and assemble a descriptor.
    ///
    /// `imaginary` locates a separately stored imaginary part with the same
    /// layout as the data segment.
    pub fn assemble(
        r: &'a [u8],
        header: Header,
        imaginary: Option<Range<usize>>,
    ) -> Result<Self, Error> {
        let geometry = header.format.resolve()?;

        let atoms_per_element = match header.adjunct.subsize() {
            Some(n) if n > 0 => n as usize,
            Some(_) => Err(HeaderError::Invalid { field: "subsize" })?,
            None => 1,
        };

        let layout = Layout {
            geometry,
            atoms_per_element,
        };

        let data = header.data_start..header.data_start.saturating_add(header.data_size);
        let data = DataView::new(region(r, data, "data segment")?, &layout, header.data_little_endian)?;

        let imaginary = match imaginary {
            Some(range) => Some(DataView::new(
                region(r, range, "imaginary part")?,
                &layout,
                header.data_little_endian,
            )?),
            None => None,
        };

        debug_assert_eq!(data.len(), layout.element_count(header.data_size));

        debug!(
            "Decoded {:?} file: format {}, class {}, {} elements.",
            header.kind,
            header.format,
            header.type_code / 1000,
            data.len()
        );

        Ok(Self {
            header,
            layout,
            data,
            imaginary,
        })
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    /// The sample view.
    pub fn data(&self) -> &DataView<'a> {
        &self.data
    }

    /// A separately stored imaginary part (MAT-files only).
    pub fn imaginary(&self) -> Option<&DataView<'a>> {
        self.imaginary.as_ref()
    }

    /// File class, from the type code.
    pub fn class(&self) -> u32 {
        self.header.type_code / 1000
    }

    /// Number of elements in the sample view.
    pub fn element_count(&self) -> usize {
        self.data.len()
    }

    /// Abscissa of atom `i`.
    pub fn x_at(&self, i: usize) -> Option<f64> {
        let adjunct = &self.header.adjunct;
        Some(adjunct.xstart()? + i as f64 * adjunct.xdelta()?)
    }

    /// Ordinate of row `i` (class 2 only).
    pub fn y_at(&self, i: usize) -> Option<f64> {
        let adjunct = &self.header.adjunct;
        Some(adjunct.ystart()? + i as f64 * adjunct.ydelta()?)
    }

    /// Names of the abscissa `(quantity, unit)`.
    pub fn x_units(&self) -> Option<(&'static str, &'static str)> {
        units::lookup(self.header.adjunct.xunits()?)
    }

    /// Names of the ordinate `(quantity, unit)` (class 2 only).
    pub fn y_units(&self) -> Option<(&'static str, &'static str)> {
        units::lookup(self.header.adjunct.yunits()?)
    }

    /// The time reference in seconds since the Unix epoch.
    pub fn unix_time(&self) -> f64 {
        self.header.timecode - UNIX_EPOCH_OFFSET
    }

    /// Publish the main and extended header keywords to a receiver.
    pub fn publish_keywords(&self, o: &mut impl FromKeywords) {
        let main = self.header.keywords.iter();
        let extended = self.header.ext_header.iter().flat_map(Keywords::iter);

        for (tag, value) in main.chain(extended) {
            o.add_keyword(tag, value);
        }
    }
}

/// Borrow `range` of `r`, naming `region` if it does not fit.
fn region<'a>(r: &'a [u8], range: Range<usize>, region: &'static str) -> Result<&'a [u8], Error> {
    r.get(range.clone()).ok_or(Error::Truncated {
        region,
        start: range.start,
        end: range.end,
        len: r.len(),
    })
}

/// Derive [`FromKeywords`] for a struct receiving keyword values.
///
/// _Requires Cargo feature `derive`._
///
/// # Examples
///
/// To receive a keyword, add the `keyword("TAG")` attribute to an `Option<T>`
/// field, where `T` implements `TryFrom<&Value>` (`f64`, `i64`, `i32`,
/// `String` and `Vec<f64>` do). Values of another type are ignored, and later
/// records with the same tag replace earlier ones.
///
/// ```
/// #[derive(Debug, Default, FromKeywords)]
/// struct Collection {
///     #[keyword("COLLECTOR")]
///     collector: Option<String>,
///     #[keyword("RF_FREQ")]
///     frequency: Option<f64>,
/// }
/// ```
///
/// To receive values some other way, supply a handler closure taking the
/// field and the value.
///
/// ```
/// #[derive(Debug, Default, FromKeywords)]
/// struct Comments {
///     #[keyword("COMMENT", |v, x| v.extend(x.as_text().map(String::from)))]
///     comments: Vec<String>,
/// }
/// ```
///
/// The generated implementation names `FromKeywords` and `Value`, which must
/// both be in scope.
#[cfg(feature = "derive")]
pub use bluefile_derive::FromKeywords;

/// Receive keyword values.
///
/// See the [`FromKeywords`](macro@FromKeywords) derive macro for an automatic
/// implementation of this trait.
pub trait FromKeywords {
    /// Add a keyword. The default implementation ignores it.
    #[allow(unused_variables)]
    fn add_keyword(&mut self, tag: &str, value: &Value) {}
}
