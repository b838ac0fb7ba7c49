#[derive(Debug, thiserror::Error)]
pub enum CabinetError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("{field}: {message}")]
    Validation {
        field: &'static str,
        message: String,
    },
    #[error("record not found: {0}")]
    NotFound(String),
    #[error("duplicate record id: {0}")]
    DuplicateId(String),
    #[error("a patch must not change the record id (was {0})")]
    IdChanged(String),
    #[error("cannot move record from {from} to {to}")]
    InvalidTransition { from: String, to: String },
    #[error("invalid date: {0}")]
    InvalidDate(String),
    #[error("invalid time: {0}")]
    InvalidTime(String),
    #[error("clipboard write failed: {0}")]
    Clipboard(String),
    #[error("failed to launch external handler: {0}")]
    Launch(String),
    #[error("no workflow is open")]
    WorkflowClosed,

    #[error("failed to read seed file: {0}")]
    SeedRead(std::io::Error),
    #[error("failed to parse seed YAML: {0}")]
    SeedParse(serde_yaml::Error),
    #[error("failed to serialize view: {0}")]
    Serialization(serde_json::Error),
}

impl CabinetError {
    /// Shorthand for a field-level validation failure.
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            field,
            message: message.into(),
        }
    }

    /// True for failures that leave the form open for correction.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }
}

pub type CabinetResult<T> = std::result::Result<T, CabinetError>;
