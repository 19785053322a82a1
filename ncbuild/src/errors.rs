use std::io;
use std::result;

use thiserror::Error as ThisError;

use crate::schema::DataType;

#[derive(Debug, ThisError)]
pub enum Error {
    #[error("dimension {name:?} already defined with size {existing}, requested size {requested}")]
    SchemaConflict {
        name: String,
        existing: usize,
        requested: usize,
    },

    #[error("dimension {0:?} has not been defined")]
    UnknownDimension(String),

    #[error("variable {0:?} is already defined")]
    DuplicateVariable(String),

    #[error("schema has been committed and can no longer be changed")]
    SchemaFrozen,

    #[error("invalid range {first}:{last}")]
    InvalidRange { first: i64, last: i64 },

    #[error("can not parse selection {0:?}")]
    UnparsableSelection(String),

    #[error("selection [{selection}] is out of bounds for {variable:?} of shape {shape:?}")]
    RangeOutOfBounds {
        variable: String,
        selection: String,
        shape: Vec<usize>,
    },

    #[error("block of shape {block:?} does not fit {variable:?} of shape {target:?}")]
    ShapeMismatch {
        variable: String,
        block: Vec<usize>,
        target: Vec<usize>,
    },

    #[error("variable {0:?} not found")]
    VariableNotFound(String),

    #[error("can not parse time units {0:?}")]
    UnparsableUnits(String),

    #[error("invalid name {0:?}")]
    InvalidName(String),

    #[error("dimension {name:?} must have a positive size, got {size}")]
    InvalidDimensionSize { name: String, size: i64 },

    #[error("chunk size must be positive")]
    InvalidChunkSize,

    #[error("axis {axis} is out of bounds for {variable:?} of rank {rank}")]
    InvalidAxis {
        variable: String,
        axis: usize,
        rank: usize,
    },

    #[error("expected {expected:?} data for {variable:?}, got {found:?}")]
    TypeMismatch {
        variable: String,
        expected: DataType,
        found: DataType,
    },

    #[error("offset {0} leaves the representable calendar range")]
    DateOutOfRange(i64),

    #[error("storage backend failed: {0}")]
    Storage(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error(transparent)]
    IO(#[from] io::Error),
}

pub type Result<T> = result::Result<T, Error>;
