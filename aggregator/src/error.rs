//! Error types for search, image fetching, archiving and session operations
//!
//! Per-term and per-image errors are recovered locally and aggregated by the
//! callers. Only [`ValidationError`] and the session-level failures surface as
//! operation-level errors.

use thiserror::Error;

/// Errors reported by an image source provider for a single page request
///
/// Provider errors are term-scoped: they truncate the pagination of the term
/// that produced them and are attached to that term's outcome as a message.
/// The variants carry owned strings so outcomes can be cloned and serialized.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProviderError {
    /// The provider answered with a non-success HTTP status
    #[error("provider returned {status}: {message}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Message from the provider's error body, or the status text
        message: String,
    },

    /// The request could not be sent or the body could not be read
    #[error("request failed: {0}")]
    Request(String),

    /// The response did not have the expected shape
    #[error("malformed response: {0}")]
    Malformed(String),

    /// The term pipeline failed in an unexpected way (e.g. a panicked task)
    #[error("unexpected failure: {0}")]
    Unexpected(String),
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ProviderError::Malformed(err.to_string())
        } else {
            ProviderError::Request(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ProviderError {
    fn from(err: serde_json::Error) -> Self {
        ProviderError::Malformed(err.to_string())
    }
}

/// Errors fetching a single image while assembling an archive
#[derive(Error, Debug)]
pub enum ImageFetchError {
    /// The image host answered with a non-success status
    #[error("image host returned status {0}")]
    Status(u16),

    /// Network-level failure
    #[error("image request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// A `data:` URL that is not valid base64 image data
    #[error("invalid data url: {0}")]
    InvalidDataUrl(String),
}

/// Errors writing the compressed archive
#[derive(Error, Debug)]
pub enum ArchiveError {
    /// The ZIP writer failed
    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// Writing entry data failed
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Pre-flight validation failures, raised before any network call
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// The term list was empty after trimming
    #[error("Please enter at least one search term.")]
    NoSearchTerms,

    /// A credential required by the configured provider is missing
    #[error("Please provide a {0}.")]
    MissingCredential(&'static str),
}

/// Operation-level failures of the search session
#[derive(Error, Debug)]
pub enum SessionError {
    /// The request failed validation; no work was performed
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// `load_more` was called before any search
    #[error("no previous search to continue - run a search first")]
    NoPreviousSearch,

    /// The term has no accumulated results in this session
    #[error("no results for search term '{0}'")]
    UnknownTerm(String),

    /// Not a single image of the term could be fetched
    #[error("could not download any of the {attempted} images for '{term}'")]
    ArchiveFailed {
        /// The term whose archive was requested
        term: String,
        /// Number of images attempted
        attempted: usize,
    },

    /// Compressing the archive failed
    #[error(transparent)]
    Archive(#[from] ArchiveError),

    /// Writing the archive to disk failed
    #[error("failed to write archive: {0}")]
    Io(#[from] std::io::Error),
}

impl SessionError {
    /// Whether the error was caused by the caller's input rather than the system
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            SessionError::Validation(_)
                | SessionError::NoPreviousSearch
                | SessionError::UnknownTerm(_)
        )
    }
}

/// Result type alias for provider page requests
pub type ProviderResult<T> = Result<T, ProviderError>;

/// Result type alias for session operations
pub type SessionResult<T> = Result<T, SessionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_messages_are_user_facing() {
        assert_eq!(
            ValidationError::NoSearchTerms.to_string(),
            "Please enter at least one search term."
        );
        assert_eq!(
            ValidationError::MissingCredential("Custom Search Engine ID").to_string(),
            "Please provide a Custom Search Engine ID."
        );
    }

    #[test]
    fn test_provider_error_carries_message() {
        let err = ProviderError::Api {
            status: 403,
            message: "API key not valid".to_string(),
        };
        assert_eq!(err.to_string(), "provider returned 403: API key not valid");
    }

    #[test]
    fn test_caller_errors() {
        assert!(SessionError::NoPreviousSearch.is_caller_error());
        assert!(SessionError::UnknownTerm("x".into()).is_caller_error());
        assert!(!SessionError::ArchiveFailed {
            term: "x".into(),
            attempted: 2
        }
        .is_caller_error());
    }
}
