//! Uniform result envelope returned by every tool.

use serde::{Deserialize, Serialize};

use crate::error::ToolError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentItem {
    /// Always `"text"` for this server.
    #[serde(rename = "type")]
    pub kind: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolResponse {
    pub is_error: bool,
    pub content: Vec<ContentItem>,
}

impl ToolResponse {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            is_error: false,
            content: vec![ContentItem {
                kind: "text".to_string(),
                text: text.into(),
            }],
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            is_error: true,
            ..Self::text(message)
        }
    }

    /// Concatenated text of all content items.
    pub fn joined_text(&self) -> String {
        self.content
            .iter()
            .map(|item| item.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl From<Result<String, ToolError>> for ToolResponse {
    fn from(result: Result<String, ToolError>) -> Self {
        match result {
            Ok(text) => Self::text(text),
            Err(e) => Self::error(e.to_string()),
        }
    }
}
