use thiserror::Error;

#[derive(Debug, Error)]
pub enum PerfigError {
    #[error("Array must be normalized before this operation — call .normalize() or .normalize_sync()")]
    NotNormalized,

    #[error("Cannot add entries to a normalized array")]
    NotExtensible,

    #[error("Unexpected array found in config — enable arrays via extra_config_types")]
    UnexpectedArray,

    #[error("Unexpected function found in config — enable functions via extra_config_types")]
    UnexpectedFunction,

    #[error("A config factory can only return an entry or a list, not another factory")]
    InvalidReturn,

    #[error("A config factory returned a deferred value — use .normalize() instead of .normalize_sync()")]
    AsyncNotSupported,

    #[error("Key \"{key}\": {message}")]
    Validation { key: String, message: String },

    #[error("\"files\" must be a non-empty array")]
    InvalidFiles,
}

impl PerfigError {
    /// Shorthand for a validation failure on `key`.
    pub(crate) fn validation(key: impl Into<String>, message: impl Into<String>) -> Self {
        PerfigError::Validation {
            key: key.into(),
            message: message.into(),
        }
    }
}
