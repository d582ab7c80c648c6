use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PreviewError {
    #[error("Unsupported file type: {0}")]
    UnsupportedFileType(String),
    #[error("No entry point found: expected /App.tsx, /App.jsx, /index.tsx, /index.jsx or a root-level component")]
    NoEntryFound,
    #[error("Parser error: {0}")]
    Parser(String),
    #[error("Unknown resource: {0}")]
    UnknownResource(String),
}

impl PreviewError {
    pub fn code(&self) -> &str {
        match self {
            Self::UnsupportedFileType(_) => "PREVIEW_UNSUPPORTED_FILE_TYPE",
            Self::NoEntryFound => "PREVIEW_NO_ENTRY_FOUND",
            Self::Parser(_) => "PREVIEW_PARSER_ERROR",
            Self::UnknownResource(_) => "PREVIEW_UNKNOWN_RESOURCE",
        }
    }

    pub fn to_json_rpc_error(&self) -> serde_json::Value {
        serde_json::json!({
            "code": self.code(),
            "message": self.to_string(),
        })
    }
}
