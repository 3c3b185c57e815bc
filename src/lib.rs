#![cfg_attr(not(test), no_std)]

//! A zero-copy decoder for Bluefiles: the type 1000 and type 2000 signal
//! files of the X-Midas family.
//!
//! A decoded file is described by a [`avec::Descriptor`] holding the fixed
//! header fields, the main and extended header keywords, and a view over the
//! data segment that reads samples in place from the caller's buffer. Level 5
//! MAT-files holding a numeric array are decoded into the same descriptor.
//!
//! Most users should begin with [`avec::decode`], or [`avec::decode_from_source`]
//! to read from a path or reader. The building blocks it uses, which perform no
//! I/O, live in the [`sans`] module.
//!
//! ## Cargo Features
//!
//! The following crate feature flags are available:
//!
//! - `derive`: enable the `FromKeywords` derive macro (default).
//! - `std`: enable path- and reader-based acquisition (default).
//! - `serde`: enable serialization of keywords and deserialization of
//!   options.

extern crate alloc;

pub mod avec;
pub mod sans;
