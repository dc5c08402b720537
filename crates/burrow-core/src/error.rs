//! Error types for Burrow

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("key must have a non-zero bit length")]
    EmptyKey,

    #[error("key length mismatch: expected {expected} bits, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },

    #[error("invalid hash width: {requested} bits")]
    InvalidHashWidth { requested: usize },

    #[error("invalid hex string: {0}")]
    InvalidHex(String),

    #[error("invalid peer address: {0}")]
    InvalidAddress(String),

    #[error("invalid resource: {0}")]
    InvalidResource(String),

    #[error("transport error: {0}")]
    Transport(String),
}

pub type Result<T> = std::result::Result<T, Error>;
