use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum VfsError {
    #[error("Invalid path: {0}")]
    InvalidPath(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Already exists: {0}")]
    AlreadyExists(String),
    #[error("Path conflict: {0}")]
    PathConflict(String),
    #[error("Missing parent directory: {0}")]
    MissingParent(String),
    #[error("No match for the given text in {0}")]
    NoMatch(String),
    #[error("Text occurs {count} times in {path}; include more surrounding context to make it unique")]
    AmbiguousMatch { path: String, count: usize },
    #[error("Range out of bounds: {0}")]
    RangeOutOfBounds(String),
    #[error("Line out of bounds: {0}")]
    LineOutOfBounds(String),
    #[error("Limit exceeded: {0}")]
    LimitExceeded(String),
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),
}

impl VfsError {
    pub fn code(&self) -> &str {
        match self {
            Self::InvalidPath(_) => "VFS_INVALID_PATH",
            Self::NotFound(_) => "VFS_NOT_FOUND",
            Self::AlreadyExists(_) => "VFS_ALREADY_EXISTS",
            Self::PathConflict(_) => "VFS_PATH_CONFLICT",
            Self::MissingParent(_) => "VFS_MISSING_PARENT",
            Self::NoMatch(_) => "VFS_NO_MATCH",
            Self::AmbiguousMatch { .. } => "VFS_AMBIGUOUS_MATCH",
            Self::RangeOutOfBounds(_) => "VFS_RANGE_OUT_OF_BOUNDS",
            Self::LineOutOfBounds(_) => "VFS_LINE_OUT_OF_BOUNDS",
            Self::LimitExceeded(_) => "VFS_LIMIT_EXCEEDED",
            Self::InvalidOperation(_) => "VFS_INVALID_OPERATION",
        }
    }

    pub fn to_json_rpc_error(&self) -> serde_json::Value {
        serde_json::json!({
            "code": self.code(),
            "message": self.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ambiguous_match_message_names_count() {
        let err = VfsError::AmbiguousMatch {
            path: "/App.tsx".to_string(),
            count: 3,
        };
        assert_eq!(err.code(), "VFS_AMBIGUOUS_MATCH");
        assert!(err.to_string().contains("3 times"));
    }

    #[test]
    fn json_rpc_payload_carries_code_and_message() {
        let err = VfsError::NotFound("/x.ts".to_string());
        let payload = err.to_json_rpc_error();
        assert_eq!(payload["code"], "VFS_NOT_FOUND");
        assert_eq!(payload["message"], "Not found: /x.ts");
    }
}
