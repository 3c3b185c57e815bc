//! Decoding primitives that perform no I/O.
//!
//! Each module handles one component of a file: the fixed header, extended
//! header records, format codes, and views over the data segment. The
//! [`crate::avec`] module combines them into whole-file decoders.
//!
//! Functions here operate on byte slices and never allocate sample storage.
//! Header fields are read in place with `zerocopy`, and sample views borrow
//! from the caller's buffer.

pub mod bits;
pub mod extended;
pub mod format;
pub mod header;
pub mod matfile;
pub mod units;
pub mod view;
