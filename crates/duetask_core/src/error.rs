use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("task text is required")]
    EmptyInput,
    #[error("task text cannot exceed {max} characters")]
    TooLong { max: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StorageError {
    #[error("failed to read '{key}': {message}")]
    ReadFailed { key: String, message: String },
    #[error("failed to write '{key}': {message}")]
    WriteFailed { key: String, message: String },
    #[error("failed to parse '{key}': {message}")]
    ParseFailed { key: String, message: String },
}

impl StorageError {
    pub fn read_failed<K: Into<String>, M: Into<String>>(key: K, message: M) -> Self {
        Self::ReadFailed {
            key: key.into(),
            message: message.into(),
        }
    }

    pub fn write_failed<K: Into<String>, M: Into<String>>(key: K, message: M) -> Self {
        Self::WriteFailed {
            key: key.into(),
            message: message.into(),
        }
    }

    pub fn parse_failed<K: Into<String>, M: Into<String>>(key: K, message: M) -> Self {
        Self::ParseFailed {
            key: key.into(),
            message: message.into(),
        }
    }

    pub fn key(&self) -> &str {
        match self {
            Self::ReadFailed { key, .. } => key,
            Self::WriteFailed { key, .. } => key,
            Self::ParseFailed { key, .. } => key,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::ReadFailed { .. } => "read_failed",
            Self::WriteFailed { .. } => "write_failed",
            Self::ParseFailed { .. } => "parse_failed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AppError {
    #[error("invalid_input - {0}")]
    InvalidInput(String),
    #[error("invalid_data - {0}")]
    InvalidData(String),
    #[error("io_error - {0}")]
    Io(String),
    #[error("validation_error - {0}")]
    Validation(#[from] ValidationError),
    #[error("not_found - task {0} not found")]
    NotFound(String),
    #[error("storage_error - {0}")]
    Storage(#[from] StorageError),
}

impl AppError {
    pub fn invalid_input<M: Into<String>>(message: M) -> Self {
        Self::InvalidInput(message.into())
    }

    pub fn invalid_data<M: Into<String>>(message: M) -> Self {
        Self::InvalidData(message.into())
    }

    pub fn io<M: Into<String>>(message: M) -> Self {
        Self::Io(message.into())
    }

    pub fn not_found<I: Into<String>>(id: I) -> Self {
        Self::NotFound(id.into())
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "invalid_input",
            Self::InvalidData(_) => "invalid_data",
            Self::Io(_) => "io_error",
            Self::Validation(_) => "validation_error",
            Self::NotFound(_) => "not_found",
            Self::Storage(_) => "storage_error",
        }
    }

    /// Errors the presentation layer swallows instead of reporting.
    pub fn is_benign(&self) -> bool {
        matches!(
            self,
            Self::NotFound(_) | Self::Validation(ValidationError::EmptyInput)
        )
    }
}
