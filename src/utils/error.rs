//! Error types for the entire library.
//!
//! We use `thiserror` for library-style errors with custom types,
//! and `anyhow` for application-level error propagation in main.rs.

use thiserror::Error;

/// Errors that can occur while isolating profile bytes from an upload
#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("Malformed content type: {0}")]
    MalformedContentType(String),

    #[error("Malformed multipart body: {0}")]
    MalformedBody(String),

    #[error("Missing form field: {0}")]
    MissingField(String),

    #[error("Malformed sample type config: {0}")]
    MalformedConfig(#[from] serde_json::Error),
}

/// Errors raised by the underlying wire-format decoders
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("gzip decompression failed: {0}")]
    Gzip(#[from] std::io::Error),

    #[error("protobuf decoding failed: {0}")]
    Protobuf(#[from] prost::DecodeError),

    #[error("invalid JFR stream: {0}")]
    Jfr(String),
}

/// Errors that abort a whole parse call
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("Cannot extract profile: {0}")]
    Extract(#[from] ExtractError),

    #[error("Empty profile")]
    EmptyInput,

    #[error("Cannot decode profile: {0}")]
    Decode(#[from] DecodeError),

    #[error("Corrupt string table reference: {what} index {index} (table size {len})")]
    CorruptReference {
        what: &'static str,
        index: i64,
        len: usize,
    },
}

/// Errors that can occur during record output
#[derive(Error, Debug)]
pub enum OutputError {
    #[error("Failed to write file: {0}")]
    WriteFailed(#[from] std::io::Error),

    #[error("Failed to serialize JSON: {0}")]
    SerializationFailed(#[from] serde_json::Error),

    #[error("Invalid output path: {0}")]
    InvalidPath(String),
}
