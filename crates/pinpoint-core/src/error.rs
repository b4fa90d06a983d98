//! Error types and error code constants for pinpoint.
//!
//! The algorithmic cores never fail: "not found" is an absent result and a
//! malformed source yields a truncated boundary. Errors only exist at the
//! edges (configuration, directory loading, argument validation, output),
//! and all of them are funnelled into `PinpointError`.
//!
//! ## Error Code Mapping
//!
//! - `2`: Invalid arguments (bad input from caller)
//! - `3`: Resolution errors (source file or match not found)
//! - `4`: I/O errors (reading sources, writing output)
//! - `10`: Internal errors (bugs, unexpected state)

use std::fmt;
use std::io;

use thiserror::Error;

// ============================================================================
// Output Error Codes
// ============================================================================

/// Stable error codes, used as process exit codes and in JSON error responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum OutputErrorCode {
    /// Invalid arguments from caller (bad input, malformed request).
    InvalidArguments = 2,
    /// Resolution errors (file not found, nothing matched).
    ResolutionError = 3,
    /// Reading or writing failed.
    IoError = 4,
    /// Internal errors (bugs, unexpected state).
    InternalError = 10,
}

impl OutputErrorCode {
    /// Get the numeric code value.
    pub fn code(&self) -> u8 {
        *self as u8
    }
}

impl fmt::Display for OutputErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

// ============================================================================
// Unified Error Type
// ============================================================================

/// Unified error type for the fallible edges of pinpoint.
#[derive(Debug, Error)]
pub enum PinpointError {
    /// Invalid arguments from caller.
    #[error("invalid arguments: {message}")]
    InvalidArguments { message: String },

    /// A source path could not be resolved against the cache or the filesystem.
    #[error("source not found: {path}")]
    SourceNotFound { path: String },

    /// A lookup produced no result.
    #[error("no match for '{type_name}'")]
    NoMatch { type_name: String },

    /// Configuration could not be loaded or parsed.
    #[error("configuration error: {message}")]
    Config { message: String },

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Internal error (bug or unexpected state).
    #[error("internal error: {message}")]
    Internal { message: String },
}

/// Result type for pinpoint's fallible operations.
pub type PinpointResult<T> = Result<T, PinpointError>;

// ============================================================================
// Error Code Mapping
// ============================================================================

impl From<&PinpointError> for OutputErrorCode {
    fn from(err: &PinpointError) -> Self {
        match err {
            PinpointError::InvalidArguments { .. } => OutputErrorCode::InvalidArguments,
            PinpointError::Config { .. } => OutputErrorCode::InvalidArguments,
            PinpointError::SourceNotFound { .. } => OutputErrorCode::ResolutionError,
            PinpointError::NoMatch { .. } => OutputErrorCode::ResolutionError,
            PinpointError::Io(_) => OutputErrorCode::IoError,
            PinpointError::Json(_) => OutputErrorCode::InvalidArguments,
            PinpointError::Internal { .. } => OutputErrorCode::InternalError,
        }
    }
}

impl From<PinpointError> for OutputErrorCode {
    fn from(err: PinpointError) -> Self {
        OutputErrorCode::from(&err)
    }
}

// ============================================================================
// Convenience Constructors
// ============================================================================

impl PinpointError {
    /// Create an invalid arguments error.
    pub fn invalid_args(message: impl Into<String>) -> Self {
        PinpointError::InvalidArguments {
            message: message.into(),
        }
    }

    /// Create a source not found error.
    pub fn source_not_found(path: impl Into<String>) -> Self {
        PinpointError::SourceNotFound { path: path.into() }
    }

    /// Create a no-match error.
    pub fn no_match(type_name: impl Into<String>) -> Self {
        PinpointError::NoMatch {
            type_name: type_name.into(),
        }
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        PinpointError::Config {
            message: message.into(),
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        PinpointError::Internal {
            message: message.into(),
        }
    }

    /// Get the error code for this error.
    pub fn error_code(&self) -> OutputErrorCode {
        OutputErrorCode::from(self)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    mod error_code_mapping {
        use super::*;

        #[test]
        fn no_match_maps_to_resolution_error() {
            let err = PinpointError::no_match("Foo");
            assert_eq!(
                OutputErrorCode::from(&err),
                OutputErrorCode::ResolutionError
            );
            assert_eq!(err.error_code().code(), 3);
        }

        #[test]
        fn source_not_found_maps_to_resolution_error() {
            let err = PinpointError::source_not_found("lib/main.dart");
            assert_eq!(err.error_code(), OutputErrorCode::ResolutionError);
        }

        #[test]
        fn config_maps_to_invalid_arguments() {
            let err = PinpointError::config("bad tolerance");
            assert_eq!(err.error_code().code(), 2);
        }

        #[test]
        fn io_maps_to_io_error() {
            let err = PinpointError::from(io::Error::new(io::ErrorKind::NotFound, "gone"));
            assert_eq!(err.error_code().code(), 4);
        }

        #[test]
        fn internal_maps_to_internal_error() {
            let err = PinpointError::internal("unexpected state");
            assert_eq!(err.error_code().code(), 10);
        }
    }

    mod error_display {
        use super::*;

        #[test]
        fn no_match_display() {
            let err = PinpointError::no_match("Foo");
            assert_eq!(err.to_string(), "no match for 'Foo'");
        }

        #[test]
        fn invalid_arguments_display() {
            let err = PinpointError::invalid_args("missing --type");
            assert_eq!(err.to_string(), "invalid arguments: missing --type");
        }

        #[test]
        fn code_display() {
            assert_eq!(format!("{}", OutputErrorCode::ResolutionError), "3");
            assert_eq!(format!("{}", OutputErrorCode::InternalError), "10");
        }
    }
}
