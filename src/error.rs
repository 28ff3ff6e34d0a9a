use thiserror::Error;

/// Errors produced by the bead pipeline.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("{file}: column '{column}' not found")]
    SchemaMismatch { file: String, column: String },

    #[error("{file}: column '{column}' row {row}: '{value}' is not numeric")]
    TypeMismatch {
        file: String,
        column: String,
        row: usize,
        value: String,
    },

    #[error("anomaly model cannot be fitted: {0}")]
    ModelFitFailure(String),

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("{file}: failed to load")]
    Load {
        file: String,
        #[source]
        source: anyhow::Error,
    },
}

impl PipelineError {
    /// The file this error refers to, when it is tied to one.
    pub fn file(&self) -> Option<&str> {
        match self {
            PipelineError::SchemaMismatch { file, .. }
            | PipelineError::TypeMismatch { file, .. }
            | PipelineError::Load { file, .. } => Some(file),
            PipelineError::ModelFitFailure(_) | PipelineError::InvalidParameter(_) => None,
        }
    }
}

/// Result type for pipeline operations.
pub type Result<T> = std::result::Result<T, PipelineError>;
