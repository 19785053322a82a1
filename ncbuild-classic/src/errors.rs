use std::io;
use std::result;

use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum Error {
    /// The bytes on disk aren't a well formed classic file
    #[error("malformed classic file: {0}")]
    Format(String),

    /// Well formed, but uses a feature this backend doesn't implement
    #[error("unsupported: {0}")]
    Unsupported(String),

    #[error(transparent)]
    Dataset(#[from] ncbuild::Error),

    #[error(transparent)]
    IO(#[from] io::Error),
}

impl From<Error> for ncbuild::Error {
    fn from(err: Error) -> Self {
        match err {
            Error::Dataset(err) => err,
            Error::IO(err) => Self::IO(err),
            err => Self::Storage(Box::new(err)),
        }
    }
}

pub type Result<T> = result::Result<T, Error>;
