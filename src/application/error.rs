use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Missing metadata label: {0}")]
    MissingMetadata(String),

    #[error("Metadata '{label}' is not an integer: {value:?}")]
    InvalidNumeric { label: String, value: String },

    #[error("Invalid amount at row {row}: {value:?}")]
    InvalidAmount { row: usize, value: String },

    #[error("Sheet not found: {0}")]
    MissingSheet(String),

    #[error("Sheet '{sheet}' has no '{column}' column")]
    MissingColumn { sheet: String, column: String },

    #[error("Sheet '{0}' has no line items")]
    EmptyLineItems(String),

    #[error("Export name is not a valid identifier: {0:?}")]
    InvalidExportName(String),

    #[error("Cannot read artifact: {0}")]
    InvalidArtifact(String),

    #[error("Source error: {0:#}")]
    Source(#[from] anyhow::Error),
}
