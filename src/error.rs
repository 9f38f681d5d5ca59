use crate::models::{QaCounts, QaTally};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ProcessingError>;

#[derive(Error, Debug)]
pub enum ProcessingError {
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("XML parsing error: {0}")]
    Xml(#[from] roxmltree::Error),

    #[error("Invalid UTF-8 in document: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Configuration source error: {0}")]
    Settings(#[from] config::ConfigError),

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("Malformed document: {0}")]
    MalformedDocument(String),

    #[error("Missing required field '{field}' ({context})")]
    MissingRequiredField { field: String, context: String },

    #[error("Missing optional field '{field}'")]
    MissingOptionalField { field: String },

    #[error("Unexpected element '{name}' while scanning derived values: {details}")]
    UnexpectedElement { name: String, details: String },

    #[error("QA count mismatch for {station} at {date_time}: extracted {observed}, declared {expected}")]
    QaCountMismatch {
        station: String,
        date_time: String,
        observed: QaTally,
        expected: QaCounts,
    },

    #[error("Document version could not be determined")]
    MissingVersionField,

    #[error("Unknown QA category: {0}")]
    UnknownQaCategory(String),

    #[error("Invalid source URI '{uri}': {reason}")]
    InvalidSourceUri { uri: String, reason: String },

    #[error("Run finished with failures: {0}")]
    Incomplete(String),

    #[error("Async task error: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),
}

impl ProcessingError {
    pub fn missing_required(field: impl Into<String>, context: impl Into<String>) -> Self {
        Self::MissingRequiredField {
            field: field.into(),
            context: context.into(),
        }
    }
}
