use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatstoreErrorCode {
    Io,
    Encode,
    Metadata,
    TransactionInProgress,
    InvalidConfig,
}

impl ChatstoreErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            ChatstoreErrorCode::Io => "io",
            ChatstoreErrorCode::Encode => "encode",
            ChatstoreErrorCode::Metadata => "metadata",
            ChatstoreErrorCode::TransactionInProgress => "transaction_in_progress",
            ChatstoreErrorCode::InvalidConfig => "invalid_config",
        }
    }
}

/// Errors surfaced to embedders.
///
/// Decode failures on cached entities are deliberately absent: the read path
/// treats undecodable bytes as "entity absent" (logged, not raised). Pending
/// writes referencing entities missing from the cache, and short reads on a
/// durable file, are invariant violations and abort instead of returning here.
#[derive(Debug, Error)]
pub enum ChatstoreError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("encode error: {0}")]
    Encode(String),
    #[error("metadata error: {message}")]
    Metadata { message: String },
    #[error("a write transaction is already in progress")]
    TransactionInProgress,
    #[error("invalid config: {message}")]
    InvalidConfig { message: String },
}

impl ChatstoreError {
    pub fn code(&self) -> ChatstoreErrorCode {
        match self {
            ChatstoreError::Io(_) => ChatstoreErrorCode::Io,
            ChatstoreError::Encode(_) => ChatstoreErrorCode::Encode,
            ChatstoreError::Metadata { .. } => ChatstoreErrorCode::Metadata,
            ChatstoreError::TransactionInProgress => ChatstoreErrorCode::TransactionInProgress,
            ChatstoreError::InvalidConfig { .. } => ChatstoreErrorCode::InvalidConfig,
        }
    }

    pub fn code_str(&self) -> &'static str {
        self.code().as_str()
    }
}

#[cfg(test)]
mod tests {
    use super::{ChatstoreError, ChatstoreErrorCode};

    #[test]
    fn error_code_strings_are_stable() {
        assert_eq!(
            ChatstoreErrorCode::TransactionInProgress.as_str(),
            "transaction_in_progress"
        );
        assert_eq!(ChatstoreErrorCode::Metadata.as_str(), "metadata");
    }

    #[test]
    fn error_code_matches_variant_mapping() {
        let err = ChatstoreError::TransactionInProgress;
        assert_eq!(err.code(), ChatstoreErrorCode::TransactionInProgress);
        assert_eq!(err.code_str(), "transaction_in_progress");
    }
}
