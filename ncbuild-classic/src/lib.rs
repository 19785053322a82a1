//! A storage backend for NetCDF classic files.
//!
//! Supports the CDF-1 and CDF-2 (64 bit offset) variants with fixed size dimensions only.
//! Files are always created with fill values in place.
//!
mod errors;
mod extio;
mod file;
mod header;

#[cfg(test)]
mod testing;

pub use errors::Error;
pub use errors::Result;

pub use file::ClassicBackend;
pub use file::ClassicFile;

pub use header::Version;
