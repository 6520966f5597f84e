use thiserror::Error;

/// Errors that can occur while loading events or writing outputs.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("file not found: {0} ({1})")]
    FileNotFound(String, String),

    #[error("parse error: {0}")]
    ParseError(String),

    #[error("missing column: {0}")]
    MissingColumn(String),

    #[error("invalid column type: {0}")]
    InvalidColumnType(String),

    #[error("corrupt data: {0}")]
    CorruptData(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
