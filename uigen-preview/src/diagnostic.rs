use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

/// A problem found while building the preview. `line` and `column` are
/// 1-indexed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostic {
    pub file_path: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column: Option<usize>,
    pub severity: Severity,
}

impl Diagnostic {
    pub fn error(file_path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(file_path, message, Severity::Error)
    }

    pub fn warning(file_path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(file_path, message, Severity::Warning)
    }

    fn new(file_path: impl Into<String>, message: impl Into<String>, severity: Severity) -> Self {
        Self {
            file_path: file_path.into(),
            message: message.into(),
            line: None,
            column: None,
            severity,
        }
    }

    pub fn at(mut self, line: usize, column: usize) -> Self {
        self.line = Some(line);
        self.column = Some(column);
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}
