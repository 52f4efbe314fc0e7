use std::path::PathBuf;

use thiserror::Error;

/// Convenient alias for fallible results returned throughout the crate.
pub type Result<T> = std::result::Result<T, ToolError>;

/// Error type covering the different failure cases that can occur when the
/// tool ingests, transforms, or emits return data.
#[derive(Debug, Error)]
pub enum ToolError {
    /// Wrapper for IO failures such as reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Raised when JSON parsing or serialization fails.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Errors bubbled up from the Excel writer implementation.
    #[error("Excel write error: {0}")]
    ExcelWrite(#[from] rust_xlsxwriter::XlsxError),

    /// Errors bubbled up from the Excel reader implementation.
    #[error("Excel read error: {0}")]
    ExcelRead(#[from] calamine::XlsxError),

    /// Raised when a sheet does not follow the expected conventions.
    #[error("invalid workbook structure: {0}")]
    InvalidWorkbook(String),

    /// Raised when an expected group or field is absent from a JSON document,
    /// or present with the wrong shape.
    #[error("schema mismatch at {path}: {reason}")]
    SchemaMismatch { path: String, reason: String },

    /// Raised when a grouping key is missing on a row being re-nested.
    #[error("sheet '{sheet}' row {row}: missing value for required column '{column}'")]
    IncompleteRow {
        sheet: String,
        row: usize,
        column: String,
    },

    /// Raised when none of the inputs contain any rows at all.
    #[error("no return data found in the provided input")]
    EmptyInput,

    /// Raised when numeric parsing fails when rebuilding typed values.
    #[error("invalid literal value '{value}' in column {column}")]
    InvalidLiteral { column: String, value: String },

    /// Raised when a summed column no longer fits a decimal.
    #[error("arithmetic overflow while summing column {0}")]
    Arithmetic(String),

    /// Raised when the taxpayer identity supplied for reconstruction is unusable.
    #[error("invalid return identity: {0}")]
    InvalidIdentity(String),

    /// Raised when the user provides a path that does not exist.
    #[error("input file not found: {0}")]
    MissingInput(PathBuf),

    /// Raised when the tracing subscriber fails to initialise.
    #[error("failed to initialise logging: {0}")]
    Logging(String),
}

impl ToolError {
    pub(crate) fn schema(path: impl Into<String>, reason: impl Into<String>) -> Self {
        ToolError::SchemaMismatch {
            path: path.into(),
            reason: reason.into(),
        }
    }
}
