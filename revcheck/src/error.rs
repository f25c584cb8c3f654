//! Error types for revision checks and the Warden channel

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors produced by this crate
#[derive(Error, Debug)]
pub enum Error {
    /// The value string could not be parsed
    #[error("Invalid value string token '{token}': {reason}")]
    Parse {
        /// The offending token
        token: String,
        /// What was wrong with it
        reason: String,
    },

    /// A file taking part in the check could not be read
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        /// The file that failed
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: io::Error,
    },

    /// An index, offset or length is outside its valid range
    #[error("Out of range: {0}")]
    Range(String),

    /// Unsupported or malformed configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// A `/` operation met a zero divisor
    #[error("Division by zero at data word {word}")]
    DivisionByZero {
        /// Index of the 32-bit word being processed
        word: usize,
    },

    /// The archive name denotes a Lockdown check
    #[error("Lockdown revision check required for {0}")]
    Lockdown(String),

    /// Data handed to the checksum pass is not made of whole 32-bit words
    #[error("Data length {0} is not a multiple of 4")]
    MisalignedData(usize),
}

impl Error {
    /// Create a parse error for a value string token
    pub fn parse<T: Into<String>, R: Into<String>>(token: T, reason: R) -> Self {
        Error::Parse {
            token: token.into(),
            reason: reason.into(),
        }
    }

    /// Create an I/O error bound to a path
    pub fn io<P: Into<PathBuf>>(path: P, source: io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }

    /// Create a range error
    pub fn range<S: Into<String>>(msg: S) -> Self {
        Error::Range(msg.into())
    }

    /// Create a configuration error
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Error::Config(msg.into())
    }
}

/// Result type used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;
