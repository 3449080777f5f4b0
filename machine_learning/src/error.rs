use std::{
    error::Error,
    fmt::{self, Display},
    io,
};

use ndarray::ShapeError;

/// The result type used in the entire machine learning module.
pub type Result<T> = std::result::Result<T, MlErr>;

/// The machine learning module's error type.
#[derive(Debug)]
pub enum MlErr {
    SizeMismatch {
        what: &'static str,
        got: usize,
        expected: usize,
    },
    LayoutMismatch {
        what: &'static str,
        got: Vec<Vec<usize>>,
        expected: Vec<Vec<usize>>,
    },
    /// A size taken from the outside doesn't fit in memory.
    SizeOverflow {
        what: &'static str,
    },
    InvalidModel(String),
    InvalidInit(String),
    InvalidDataset(String),
    Shape(ShapeError),
    Io(io::Error),
}

impl Display for MlErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MlErr::SizeMismatch {
                what,
                got,
                expected,
            } => write!(
                f,
                "There's a size mismatch for {what}, got {got} and expected {expected}"
            ),
            MlErr::LayoutMismatch {
                what,
                got,
                expected,
            } => write!(
                f,
                "The layout of {what} doesn't match, got {got:?} and expected {expected:?}"
            ),
            MlErr::SizeOverflow { what } => write!(f, "the size of {what} overflows"),
            MlErr::InvalidModel(msg) => write!(f, "invalid model: {msg}"),
            MlErr::InvalidInit(msg) => write!(f, "invalid parameter initialization: {msg}"),
            MlErr::InvalidDataset(msg) => write!(f, "invalid dataset: {msg}"),
            MlErr::Shape(e) => write!(f, "shape error: {e}"),
            MlErr::Io(e) => write!(f, "io error: {e}"),
        }
    }
}

impl Error for MlErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            MlErr::Shape(e) => Some(e),
            MlErr::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ShapeError> for MlErr {
    fn from(e: ShapeError) -> Self {
        Self::Shape(e)
    }
}

impl From<io::Error> for MlErr {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}
