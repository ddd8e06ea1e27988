use thiserror::Error;

/// Errors that can occur during account repository operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RepositoryError {
    #[error("{entity_type} not found: {id}")]
    NotFound {
        entity_type: &'static str,
        id: String,
    },
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),
    #[error("Query failed: {0}")]
    QueryFailed(String),
    #[error("Invalid data: {0}")]
    InvalidData(String),
}

/// Result type for repository operations.
pub type Result<T> = std::result::Result<T, RepositoryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_display_includes_entity_and_id() {
        let error = RepositoryError::NotFound {
            entity_type: "User",
            id: "abc-123".to_string(),
        };
        assert_eq!(error.to_string(), "User not found: abc-123");
    }

    #[test]
    fn query_failed_display_includes_cause() {
        let error = RepositoryError::QueryFailed("no such table: users".to_string());
        assert_eq!(error.to_string(), "Query failed: no such table: users");
    }
}
