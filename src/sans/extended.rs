//! Keyword records from the extended header and the main header.
//!
//! The extended header is a run of variable-length records, each laid out as:
//!
//! ```text
//! | length: u32 | trailer: u16 | tag length: u8 | format: u8 | payload | tag | padding |
//! ```
//!
//! `length` spans the whole record and `trailer` spans everything but the
//! payload (the eight control bytes, the tag and any padding). The next record
//! starts `length` bytes after this one.
//!
//! Records with a format character outside the scalar table are skipped with
//! a warning. A record whose lengths do not fit the region ends the scan, as
//! the next record boundary can no longer be found.

use alloc::{collections::BTreeMap, format, string::String, vec::Vec};
use core::{convert::Infallible, str::FromStr};

use either::Either::{Left, Right};
use log::warn;
use thiserror::Error;
use zerocopy::FromBytes;

use super::format::{Scalar, ScalarCodec};

/// A keyword value.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize), serde(untagged))]
pub enum Value {
    /// Text, one character per byte.
    Text(String),
    /// A payload holding exactly one scalar.
    Scalar(Scalar),
    /// A payload holding zero or several scalars, in stored order.
    Sequence(Vec<Scalar>),
}

impl Value {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_scalar(&self) -> Option<Scalar> {
        match self {
            Self::Scalar(x) => Some(*x),
            _ => None,
        }
    }
}

/// A value did not have the shape requested of it.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("Keyword value has a different type.")]
pub struct ValueMismatch;

impl TryFrom<&Value> for f64 {
    type Error = ValueMismatch;

    fn try_from(value: &Value) -> Result<Self, Self::Error> {
        value.as_scalar().map(Scalar::to_f64).ok_or(ValueMismatch)
    }
}

impl TryFrom<&Value> for i64 {
    type Error = ValueMismatch;

    fn try_from(value: &Value) -> Result<Self, Self::Error> {
        value
            .as_scalar()
            .and_then(Scalar::to_i64)
            .ok_or(ValueMismatch)
    }
}

impl TryFrom<&Value> for i32 {
    type Error = ValueMismatch;

    fn try_from(value: &Value) -> Result<Self, Self::Error> {
        i64::try_from(value)?.try_into().map_err(|_| ValueMismatch)
    }
}

impl TryFrom<&Value> for String {
    type Error = ValueMismatch;

    fn try_from(value: &Value) -> Result<Self, Self::Error> {
        value.as_text().map(String::from).ok_or(ValueMismatch)
    }
}

impl TryFrom<&Value> for Vec<f64> {
    type Error = ValueMismatch;

    fn try_from(value: &Value) -> Result<Self, Self::Error> {
        match value {
            Value::Scalar(x) => Ok(alloc::vec![x.to_f64()]),
            Value::Sequence(xs) => Ok(xs.iter().map(|x| x.to_f64()).collect()),
            Value::Text(_) => Err(ValueMismatch),
        }
    }
}

/// A single tagged record.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Keyword {
    pub tag: String,
    pub value: Value,
}

/// Representation chosen for a set of keywords.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Deserialize),
    serde(from = "FormOption")
)]
pub enum KeywordForm {
    /// Unique tags; repeats are renamed `<tag><n>` from the second on.
    #[default]
    Mapping,
    /// Every record verbatim, in file order.
    List,
}

impl KeywordForm {
    /// Select a form from an optional configuration value.
    ///
    /// No value, an empty value, and the names `dict`, `json`, `DICT`, `JSON`
    /// and `XMTable` select the mapping; any other name selects the list.
    pub fn from_option(o: Option<&str>) -> Self {
        match o {
            None | Some("" | "dict" | "json" | "DICT" | "JSON" | "XMTable") => Self::Mapping,
            Some(_) => Self::List,
        }
    }
}

impl FromStr for KeywordForm {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from_option(Some(s)))
    }
}

impl From<Option<String>> for KeywordForm {
    fn from(o: Option<String>) -> Self {
        Self::from_option(o.as_deref())
    }
}

/// A configuration value as written: a name, nothing, or a structure.
#[cfg(feature = "serde")]
#[derive(serde::Deserialize)]
#[serde(untagged)]
enum FormOption {
    Name(Option<String>),
    Structure(BTreeMap<String, serde::de::IgnoredAny>),
    Other(serde::de::IgnoredAny),
}

#[cfg(feature = "serde")]
impl From<FormOption> for KeywordForm {
    /// An empty structure selects the mapping, as no value does.
    fn from(o: FormOption) -> Self {
        match o {
            FormOption::Name(name) => name.into(),
            FormOption::Structure(keys) if keys.is_empty() => Self::Mapping,
            FormOption::Structure(_) | FormOption::Other(_) => Self::List,
        }
    }
}

/// A set of keywords in one of the two representations.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize), serde(untagged))]
pub enum Keywords {
    Mapping(BTreeMap<String, Value>),
    List(Vec<Keyword>),
}

impl Default for Keywords {
    fn default() -> Self {
        Self::Mapping(BTreeMap::new())
    }
}

impl Keywords {
    /// Gather records into the requested representation.
    pub fn collect(form: KeywordForm, records: impl IntoIterator<Item = Keyword>) -> Self {
        match form {
            KeywordForm::List => Self::List(records.into_iter().collect()),
            KeywordForm::Mapping => {
                let mut seen: BTreeMap<String, usize> = BTreeMap::new();
                let mut mapping = BTreeMap::new();

                for Keyword { tag, value } in records {
                    let n = seen.entry(tag.clone()).or_insert(0);
                    *n += 1;

                    let key = if *n == 1 { tag } else { format!("{tag}{n}") };
                    mapping.insert(key, value);
                }

                Self::Mapping(mapping)
            }
        }
    }

    /// Look up a tag. In list form, the first record with the tag is returned.
    pub fn get(&self, tag: &str) -> Option<&Value> {
        match self {
            Self::Mapping(m) => m.get(tag),
            Self::List(l) => l.iter().find(|k| k.tag == tag).map(|k| &k.value),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Mapping(m) => m.len(),
            Self::List(l) => l.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterate `(tag, value)` pairs: sorted by key for a mapping, in file
    /// order for a list.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        match self {
            Self::Mapping(m) => Left(m.iter().map(|(k, v)| (k.as_str(), v))),
            Self::List(l) => Right(l.iter().map(|k| (k.tag.as_str(), &k.value))),
        }
    }
}

#[repr(C, packed)]
#[derive(FromBytes)]
struct RecordControl {
    length: [u8; 4],
    trailer: [u8; 2],
    tag_length: u8,
    format: u8,
}

/// Iterator over the well-formed records of an extended header region.
#[derive(Debug, Clone)]
pub struct Records<'a> {
    r: &'a [u8],
    i: usize,
    is_le: bool,
}

/// Walk the records of an extended header region.
pub fn records(r: &[u8], is_le: bool) -> Records<'_> {
    Records { r, i: 0, is_le }
}

/// Unpack an extended header region into the requested representation.
pub fn unpack(r: &[u8], is_le: bool, form: KeywordForm) -> Keywords {
    Keywords::collect(form, records(r, is_le))
}

impl Iterator for Records<'_> {
    type Item = Keyword;

    fn next(&mut self) -> Option<Keyword> {
        while self.i < self.r.len() {
            let start = self.i;

            let Some(control) = self.r[start..].first_chunk::<8>() else {
                warn!("Truncated keyword record at offset {start}.");
                self.i = self.r.len();
                return None;
            };

            let RecordControl {
                length,
                trailer,
                tag_length,
                format,
            } = zerocopy::transmute!(*control);

            let (length, trailer) = if self.is_le {
                (u32::from_le_bytes(length), u16::from_le_bytes(trailer))
            } else {
                (u32::from_be_bytes(length), u16::from_be_bytes(trailer))
            };

            let (length, trailer, tag_length) =
                (length as usize, trailer as usize, tag_length as usize);

            if trailer < 8 + tag_length || trailer > length || length > self.r.len() - start {
                warn!("Malformed keyword record at offset {start} (length {length}, trailer {trailer}).");
                self.i = self.r.len();
                return None;
            }

            self.i = start + length;

            let payload = start + 8..start + 8 + length - trailer;
            let tag = latin1(&self.r[payload.end..payload.end + tag_length]);

            match decode_value(format, &self.r[payload], self.is_le) {
                Some(value) => return Some(Keyword { tag, value }),
                None => warn!(
                    "Skipping keyword {tag:?} with unsupported format {:?}.",
                    format as char
                ),
            }
        }

        None
    }
}

fn decode_value(format: u8, r: &[u8], is_le: bool) -> Option<Value> {
    if format == b'A' {
        return Some(Value::Text(latin1(r)));
    }

    let codec = ScalarCodec::from_char(format)?;
    let width = codec.width()?;

    if r.len() % width != 0 {
        warn!(
            "Ignoring {} trailing bytes of a {:?} keyword.",
            r.len() % width,
            format as char
        );
    }

    let scalars: Vec<Scalar> = (0..r.len() / width)
        .filter_map(|k| codec.decode(r, k * width, is_le))
        .collect();

    Some(match scalars.as_slice() {
        [x] => Value::Scalar(*x),
        _ => Value::Sequence(scalars),
    })
}

/// Parse a block of `NAME=VALUE` entries separated by NUL bytes.
pub fn main_keywords(r: &[u8], form: KeywordForm) -> Keywords {
    let records = r
        .split(|b| *b == 0)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            let (tag, value) = match entry.iter().position(|b| *b == b'=') {
                Some(k) => (&entry[..k], &entry[k + 1..]),
                None => (entry, &[][..]),
            };

            Keyword {
                tag: latin1(tag),
                value: Value::Text(latin1(value)),
            }
        });

    Keywords::collect(form, records)
}

fn latin1(r: &[u8]) -> String {
    r.iter().map(|b| *b as char).collect()
}
