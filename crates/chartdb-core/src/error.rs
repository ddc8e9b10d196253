use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Unexpected end of data: wanted {wanted} bytes at position {position}, length {len}")]
    UnexpectedEof {
        position: usize,
        wanted: usize,
        len: usize,
    },

    #[error("File not ready: {0}")]
    NotReady(PathBuf),

    #[error("Invalid hash: {0:?}")]
    InvalidHash(String),

    #[error("Database version {version} is too old (minimum {minimum})")]
    VersionTooOld { version: i32, minimum: i32 },

    #[error("Database version {version} is newer than supported (maximum {maximum})")]
    VersionTooNew { version: i32, maximum: i32 },

    #[error("Stream corrupted: {0}")]
    StreamCorrupted(String),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("A load is already in progress")]
    LoadInProgress,

    #[error("Cannot modify legacy data: {0}")]
    LegacyProvenance(String),

    #[error("Collection already exists: {0}")]
    CollectionExists(String),

    #[error("Collection not found: {0}")]
    CollectionNotFound(String),

    #[error("Difficulty not found: {0}")]
    DifficultyNotFound(String),

    #[error("Config parse error: {0}")]
    ConfigParseError(#[from] toml::de::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
