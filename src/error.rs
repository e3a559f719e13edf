//! Error types for the metasearch front ends.

/// Top-level error type for the server and command-line front end.
#[derive(Debug, thiserror::Error)]
pub enum MetasearchError {
    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Preference storage error. Never fatal; logged and recovered from.
    #[error("persistence error: {0}")]
    Persistence(String),

    /// HTTP server error.
    #[error("server error: {0}")]
    Server(String),

    /// Search engine error.
    #[error(transparent)]
    Search(#[from] metasearch_core::SearchError),
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, MetasearchError>;

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

    use super::*;
    use metasearch_core::SearchError;

    #[test]
    fn search_errors_pass_through() {
        let err: MetasearchError = SearchError::UnknownProvider("gitlab".into()).into();
        assert_eq!(err.to_string(), "unknown provider: gitlab");
    }

    #[test]
    fn io_errors_convert() {
        let err: MetasearchError =
            std::io::Error::new(std::io::ErrorKind::NotFound, "missing").into();
        assert!(err.to_string().starts_with("I/O error"));
    }
}
