//! Error handling for pdfcos

use std::io;
use thiserror::Error;

/// The main error type for COS operations
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed numeral or other textual syntax
    #[error("Format error: {0}")]
    Format(String),
    /// A parser failed to produce an indirect object
    #[error("Resolution error: {0}")]
    Resolution(String),
    /// A filter stage failed while finishing a stream
    #[error("Pipeline error: {0}")]
    Pipeline(String),
    /// An observer rejected a mutation event
    #[error("Observer error: {0}")]
    Observer(String),
    #[error("Index {index} out of bounds for length {len}")]
    Index { index: usize, len: usize },
    #[error("Unsupported: {0}")]
    Unsupported(String),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("System error: {0}")]
    System(#[from] io::Error),
}

impl Error {
    pub fn format<S: Into<String>>(msg: S) -> Self {
        Error::Format(msg.into())
    }
    pub fn resolution<S: Into<String>>(msg: S) -> Self {
        Error::Resolution(msg.into())
    }
    pub fn pipeline<S: Into<String>>(msg: S) -> Self {
        Error::Pipeline(msg.into())
    }
    pub fn observer<S: Into<String>>(msg: S) -> Self {
        Error::Observer(msg.into())
    }
    pub fn unsupported<S: Into<String>>(msg: S) -> Self {
        Error::Unsupported(msg.into())
    }
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Error::Config(msg.into())
    }
}

impl From<Error> for io::Error {
    fn from(e: Error) -> Self {
        match e {
            Error::System(inner) => inner,
            other => io::Error::other(other),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Config(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
