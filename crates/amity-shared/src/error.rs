use thiserror::Error;

/// Failure categories shared by every Amity operation.
///
/// Each variant carries a human-readable message that is surfaced to the
/// caller unchanged.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AmityError {
    /// The referenced entity is absent or not owned by the requester.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Malformed or missing required input.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// The operation would violate a state invariant.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Remote storage or persistence failure, message passed through verbatim.
    #[error("{0}")]
    Upstream(String),
}

impl AmityError {
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invalid_state(msg: impl Into<String>) -> Self {
        Self::InvalidState(msg.into())
    }

    pub fn upstream(msg: impl Into<String>) -> Self {
        Self::Upstream(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upstream_message_is_verbatim() {
        let err = AmityError::upstream("bucket unreachable");
        assert_eq!(err.to_string(), "bucket unreachable");
    }

    #[test]
    fn categories_prefix_their_message() {
        assert_eq!(
            AmityError::not_found("photo 7").to_string(),
            "Not found: photo 7"
        );
        assert_eq!(
            AmityError::invalid_state("already main").to_string(),
            "Invalid state: already main"
        );
    }
}
