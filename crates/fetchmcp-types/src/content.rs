//! The outbound tool-call content envelope.
//!
//! `ToolResponse` is a tagged sum type on purpose: clients distinguish on
//! the `type` field, and flattening the variants into one struct would
//! lose that distinction.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text {
        text: String,
    },
    Image {
        data: String,
        #[serde(rename = "mimeType")]
        mime_type: String,
    },
    Resource {
        resource: EmbeddedResource,
    },
    ResourceLink {
        uri: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        name: Option<String>,
        #[serde(rename = "mimeType", skip_serializing_if = "Option::is_none")]
        mime_type: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        description: Option<String>,
    },
}

impl ContentBlock {
    pub fn text(text: impl Into<String>) -> Self {
        ContentBlock::Text { text: text.into() }
    }

    pub fn resource_link(uri: impl Into<String>, mime_type: Option<String>) -> Self {
        ContentBlock::ResourceLink {
            uri: uri.into(),
            name: None,
            mime_type,
            description: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddedResource {
    pub uri: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "mimeType", skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

/// The uniform response envelope every tool handler returns.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ToolResponse {
    pub content: Vec<ContentBlock>,
    #[serde(rename = "isError", skip_serializing_if = "Option::is_none")]
    pub is_error: Option<bool>,
}

impl ToolResponse {
    pub fn ok(content: Vec<ContentBlock>) -> Self {
        Self {
            content,
            is_error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            content: vec![ContentBlock::text(message)],
            is_error: Some(true),
        }
    }

    pub fn error_with_diagnostics(message: impl Into<String>, diagnostics: &serde_json::Value) -> Self {
        Self {
            content: vec![
                ContentBlock::text(message),
                ContentBlock::text(diagnostics.to_string()),
            ],
            is_error: Some(true),
        }
    }
}
