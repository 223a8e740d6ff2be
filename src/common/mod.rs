use std::fmt;

/// Errors raised by the workflow steps. Every step catches them at the top and renders the message.
#[derive(Debug)]
pub(crate) enum Error {
    /// Bad file layout, or a file that yields no usable rows
    ParseError(String),
    /// A row or user input that failed validation
    ValidationError(String),
    /// Classifier training preconditions not met
    InsufficientData(String),
    /// Datastore read or write failure
    IoError(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::ParseError(s) => write!(f, "parse error: {}", s),
            Error::ValidationError(s) => write!(f, "validation error: {}", s),
            Error::InsufficientData(s) => write!(f, "insufficient data: {}", s),
            Error::IoError(s) => write!(f, "io error: {}", s),
        }
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::IoError(e.to_string())
    }
}

impl From<csv::Error> for Error {
    fn from(e: csv::Error) -> Self {
        if e.is_io_error() {
            Error::IoError(e.to_string())
        } else {
            Error::ParseError(e.to_string())
        }
    }
}

impl From<calamine::Error> for Error {
    fn from(e: calamine::Error) -> Self {
        Error::ParseError(e.to_string())
    }
}

impl From<bincode::Error> for Error {
    fn from(e: bincode::Error) -> Self {
        Error::IoError(format!("unable to encode or decode model file: {}", e))
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::IoError(format!("unable to encode or decode state file: {}", e))
    }
}

impl From<toml::de::Error> for Error {
    fn from(e: toml::de::Error) -> Self {
        Error::ParseError(format!("invalid config file: {}", e))
    }
}

/// Simplifies the return signature of fallible datastore and pipeline functions
pub(crate) type ResultError<T> = Result<T, Error>;
