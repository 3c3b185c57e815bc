//! Acquisition of complete files from paths and readers.
//!
//! _Requires Cargo feature `std`._

use std::{
    fs,
    io::Read,
    path::{Path, PathBuf},
    vec::Vec,
};

use log::error;
use thiserror::Error;

use super::{Descriptor, Options, decode};

extern crate std;

/// Errors occurring while acquiring a file's bytes.
#[derive(Debug, Error)]
pub enum AcquisitionError {
    /// An error from the filesystem or supplied reader.
    #[error(transparent)]
    Io(#[from] std::io::Error),
    /// The source holds no bytes.
    #[error("Source is empty.")]
    Empty,
}

/// A one-shot supplier of a file's complete bytes.
pub trait Source {
    fn acquire(self) -> Result<Vec<u8>, AcquisitionError>;
}

impl Source for &Path {
    fn acquire(self) -> Result<Vec<u8>, AcquisitionError> {
        Ok(fs::read(self)?)
    }
}

impl Source for PathBuf {
    fn acquire(self) -> Result<Vec<u8>, AcquisitionError> {
        self.as_path().acquire()
    }
}

impl Source for &str {
    fn acquire(self) -> Result<Vec<u8>, AcquisitionError> {
        Path::new(self).acquire()
    }
}

/// A source read to its end from any reader.
#[derive(Debug)]
pub struct ReadSource<R: Read>(pub R);

impl<R: Read> Source for ReadSource<R> {
    fn acquire(mut self) -> Result<Vec<u8>, AcquisitionError> {
        let mut buffer = Vec::new();
        self.0.read_to_end(&mut buffer)?;
        Ok(buffer)
    }
}

/// Read the complete bytes of a source, refusing an empty one.
pub fn acquire(source: impl Source) -> Result<Vec<u8>, AcquisitionError> {
    let buffer = source.acquire()?;

    if buffer.is_empty() {
        Err(AcquisitionError::Empty)?;
    }

    Ok(buffer)
}

/// Acquire and decode a source, handing the outcome to `on_complete`.
///
/// `on_complete` is invoked exactly once, with `None` if the source could not
/// be acquired or decoded. The failure is logged. For typed errors, call
/// [`acquire`] and [`decode`] directly.
///
/// This method is also re-exported as `bluefile::avec::decode_from_source`.
pub fn decode_from_source<S, F, T>(source: S, o: &Options, on_complete: F) -> T
where
    S: Source,
    F: for<'a> FnOnce(Option<Descriptor<'a>>) -> T,
{
    let buffer = match acquire(source) {
        Ok(buffer) => buffer,
        Err(err) => {
            error!("Failed to acquire source: {err}");
            return on_complete(None);
        }
    };

    match decode(&buffer, o) {
        Ok(descriptor) => on_complete(Some(descriptor)),
        Err(err) => {
            error!("Failed to decode source: {err}");
            on_complete(None)
        }
    }
}
