use thiserror::Error;

#[derive(Error, Debug)]
pub enum ModelError {
    #[error("Save failed for '{model}' ({operation}): adapter reported failure")]
    SaveFailed {
        model: &'static str,
        operation: &'static str,
    },

    #[error("Ambiguous result: {0} rows matched, expected at most one")]
    AmbiguousResult(usize),

    #[error("Field '{field}' is not declared on '{model}'")]
    FieldNotDeclared { model: &'static str, field: String },

    #[error("Illegal state: {0}")]
    IllegalState(String),

    #[error("No persistence binding registered for '{0}'")]
    NotBound(&'static str),

    #[error("Persistence binding for '{0}' is already registered")]
    AlreadyBound(&'static str),

    #[error("Identifier of persisted '{0}' cannot change")]
    IdentifierImmutable(&'static str),

    /// The insert was committed by the adapter; the stored row is orphaned.
    #[error("Adapter returned no identifier for inserted '{0}'; the stored row is left behind")]
    MissingIdentifier(&'static str),

    #[error("Encoding error on field '{field}': {message}")]
    Encoding { field: String, message: String },

    #[error("Unsupported query: {0}")]
    UnsupportedQuery(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Lock error: {0}")]
    LockError(String),

    #[error("I/O error: {0}")]
    IoError(String),

    /// Failure raised by a storage adapter, passed through untouched.
    #[error(transparent)]
    Adapter(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, ModelError>;

impl ModelError {
    pub fn encoding(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Encoding {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl<T> From<std::sync::PoisonError<T>> for ModelError {
    fn from(err: std::sync::PoisonError<T>) -> Self {
        Self::LockError(err.to_string())
    }
}

impl From<std::io::Error> for ModelError {
    fn from(err: std::io::Error) -> Self {
        Self::IoError(err.to_string())
    }
}
