use thiserror::Error;
use uigen_preview::PreviewError;
use uigen_vfs::VfsError;

/// Errors surfaced by the session server.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Session not initialized")]
    NotInitialized,

    #[error("Invalid params: {0}")]
    InvalidParams(String),

    #[error(transparent)]
    Vfs(#[from] VfsError),

    #[error(transparent)]
    Preview(#[from] PreviewError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl EngineError {
    pub fn code(&self) -> &str {
        match self {
            Self::NotInitialized => "ENGINE_NOT_INITIALIZED",
            Self::InvalidParams(_) => "ENGINE_INVALID_PARAMS",
            Self::Vfs(e) => e.code(),
            Self::Preview(e) => e.code(),
            Self::Io(_) => "ENGINE_IO_ERROR",
            Self::Json(_) => "ENGINE_JSON_ERROR",
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
    fn wrapped_errors_keep_their_code() {
        let err: EngineError = VfsError::NotFound("/App.tsx".into()).into();
        assert_eq!(err.code(), "VFS_NOT_FOUND");
        assert_eq!(err.to_string(), "Not found: /App.tsx");

        let err: EngineError = PreviewError::UnknownResource("blob:x".into()).into();
        let data = err.to_json_rpc_error();
        assert_eq!(data["code"], "PREVIEW_UNKNOWN_RESOURCE");
    }
}
