//! Error types for index and query operations

use tantivy::directory::error::LockError;

/// Result type for index and query operations
pub type SearchResult<T> = std::result::Result<T, SearchError>;

/// Errors that can occur while building queries or mutating an index
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    /// The index writer is held by another, uncoordinated owner
    #[error(
        "Failed to acquire an index writer. \
         Is there an active index with an exclusive writer already?"
    )]
    WriterBusy,

    /// A mutation was attempted while no writer was held
    #[error("No index writer is held by this index")]
    WriterNotAcquired,

    /// A query factory was asked to target a field outside its legal groups
    #[error("Can't search the \"{0}\" field with this query")]
    UnsupportedField(String),

    /// Range bounds have a type with no matching field group
    #[error("{0} range is not supported by range queries")]
    UnsupportedRange(String),

    /// Tokenizer configuration named an unknown kind
    #[error("Can't find \"{0}\" tokenizer")]
    UnknownTokenizer(String),

    /// Stemmer configuration named an unknown language code
    #[error("Language \"{0}\" is not supported")]
    UnsupportedLanguage(String),

    /// Schema declaration is inconsistent
    #[error("Invalid schema: {0}")]
    InvalidSchema(String),

    /// A document value can't be stored in its field
    #[error("Invalid value for field \"{field}\": expected {expected}")]
    InvalidFieldValue { field: String, expected: String },

    /// Query parameters were rejected (bad regex, bad facet path)
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Error surfaced unchanged from Tantivy
    #[error("Tantivy error: {0}")]
    Tantivy(tantivy::TantivyError),
}

impl SearchError {
    /// Whether the caller may retry once the competing writer goes away
    pub fn is_writer_busy(&self) -> bool {
        matches!(self, SearchError::WriterBusy)
    }
}

impl From<tantivy::TantivyError> for SearchError {
    fn from(err: tantivy::TantivyError) -> Self {
        match err {
            tantivy::TantivyError::LockFailure(LockError::LockBusy, _) => SearchError::WriterBusy,
            other => SearchError::Tantivy(other),
        }
    }
}

impl From<tantivy::directory::error::OpenDirectoryError> for SearchError {
    fn from(err: tantivy::directory::error::OpenDirectoryError) -> Self {
        SearchError::Tantivy(err.into())
    }
}

impl From<config::ConfigError> for SearchError {
    fn from(err: config::ConfigError) -> Self {
        SearchError::Configuration(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lock_busy_maps_to_writer_busy() {
        let err: SearchError =
            tantivy::TantivyError::LockFailure(LockError::LockBusy, Some("held".to_string()))
                .into();
        assert!(err.is_writer_busy());
    }

    #[test]
    fn test_other_engine_errors_pass_through() {
        let err: SearchError = tantivy::TantivyError::FieldNotFound("title".to_string()).into();
        match err {
            SearchError::Tantivy(tantivy::TantivyError::FieldNotFound(name)) => {
                assert_eq!(name, "title")
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_messages_carry_context() {
        assert!(SearchError::UnsupportedField("rating".to_string())
            .to_string()
            .contains("\"rating\""));
        assert!(SearchError::UnsupportedRange("text".to_string())
            .to_string()
            .starts_with("text range"));
        assert!(SearchError::UnknownTokenizer("whatever".to_string())
            .to_string()
            .contains("whatever"));
    }
}
