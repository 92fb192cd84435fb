//! Request and response shapes
//!
//! The two backends answer in different shapes: the local backend returns a
//! chat-completion object, the cloud backend a nested candidates/parts
//! structure. Both are normalized into [`CompletionResult`].

use serde::{Deserialize, Serialize};
use std::fmt;

/// Which backend handles completions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RouterMode {
    Local,
    Cloud,
}

impl fmt::Display for RouterMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local => f.write_str("local"),
            Self::Cloud => f.write_str("cloud"),
        }
    }
}

/// Backend that produced a result
pub type Provider = RouterMode;

/// Chat role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One prompt message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    /// System message
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    /// User message
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    /// Assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Per-request generation options
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompletionOptions {
    /// Model override
    pub model: Option<String>,
    /// Sampling temperature
    pub temperature: Option<f32>,
    /// Completion length cap
    pub max_tokens: Option<u32>,
}

/// Token accounting
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// Normalized completion
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionResult {
    pub text: String,
    pub usage: Usage,
    pub model: String,
    pub provider: Provider,
}

/// One piece of a streamed completion
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamChunk {
    pub text: String,
    pub done: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
}

impl StreamChunk {
    /// Intermediate chunk
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            done: false,
            usage: None,
        }
    }

    /// Terminal chunk carrying totals
    #[must_use]
    pub fn done(usage: Usage) -> Self {
        Self {
            text: String::new(),
            done: true,
            usage: Some(usage),
        }
    }
}

// Local backend: chat-completion shape

/// Local chat-completion response
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalCompletion {
    #[serde(default)]
    pub model: Option<String>,
    pub choices: Vec<LocalChoice>,
    #[serde(default)]
    pub usage: Option<LocalUsage>,
}

/// One choice in a chat completion
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalChoice {
    pub message: ChatMessage,
}

/// Chat-completion usage block
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

// Cloud backend: candidates/parts shape

/// Cloud generation response
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CloudResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    #[serde(default)]
    pub usage_metadata: Option<UsageMetadata>,
}

/// One cloud candidate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    pub content: CandidateContent,
}

/// Candidate body
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateContent {
    #[serde(default)]
    pub parts: Vec<Part>,
}

/// Text fragment of a candidate
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Part {
    #[serde(default)]
    pub text: String,
}

/// Cloud usage block
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageMetadata {
    #[serde(default)]
    pub prompt_token_count: u32,
    #[serde(default)]
    pub candidates_token_count: u32,
    #[serde(default)]
    pub total_token_count: u32,
}

impl CloudResponse {
    /// Build a single-candidate response
    pub fn from_text(text: impl Into<String>, usage: UsageMetadata) -> Self {
        Self {
            candidates: vec![Candidate {
                content: CandidateContent {
                    parts: vec![Part { text: text.into() }],
                },
            }],
            usage_metadata: Some(usage),
        }
    }
}

impl CompletionResult {
    /// Normalize a local chat completion
    #[must_use]
    pub fn from_local(response: LocalCompletion, default_model: &str) -> Self {
        let text = response
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .unwrap_or_default();
        let usage = response
            .usage
            .map(|u| Usage {
                prompt_tokens: u.prompt_tokens,
                completion_tokens: u.completion_tokens,
                total_tokens: u.total_tokens,
            })
            .unwrap_or_default();
        Self {
            text,
            usage,
            model: response.model.unwrap_or_else(|| default_model.to_string()),
            provider: Provider::Local,
        }
    }

    /// Normalize a cloud response; parts of the first candidate are joined
    #[must_use]
    pub fn from_cloud(response: CloudResponse, model: &str) -> Self {
        let text = response
            .candidates
            .into_iter()
            .next()
            .map(|c| c.content.parts.into_iter().map(|p| p.text).collect::<String>())
            .unwrap_or_default();
        let usage = response
            .usage_metadata
            .map(|u| Usage {
                prompt_tokens: u.prompt_token_count,
                completion_tokens: u.candidates_token_count,
                total_tokens: u.total_token_count,
            })
            .unwrap_or_default();
        Self {
            text,
            usage,
            model: model.to_string(),
            provider: Provider::Cloud,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn cloud_shape_is_normalized() {
        let raw = r#"{
            "candidates": [{"content": {"parts": [{"text": "Hello, "}, {"text": "kiln"}]}}],
            "usageMetadata": {"promptTokenCount": 7, "candidatesTokenCount": 3, "totalTokenCount": 10}
        }"#;
        let response: CloudResponse = serde_json::from_str(raw).unwrap();
        let result = CompletionResult::from_cloud(response, "cloud-m");
        assert_eq!(
            result,
            CompletionResult {
                text: "Hello, kiln".into(),
                usage: Usage {
                    prompt_tokens: 7,
                    completion_tokens: 3,
                    total_tokens: 10
                },
                model: "cloud-m".into(),
                provider: Provider::Cloud,
            }
        );
    }

    #[test]
    fn local_shape_is_normalized() {
        let raw = r#"{
            "model": "qwen-0.5b",
            "choices": [{"message": {"role": "assistant", "content": "done"}}],
            "usage": {"prompt_tokens": 4, "completion_tokens": 1, "total_tokens": 5}
        }"#;
        let response: LocalCompletion = serde_json::from_str(raw).unwrap();
        let result = CompletionResult::from_local(response, "fallback");
        assert_eq!(result.text, "done");
        assert_eq!(result.model, "qwen-0.5b");
        assert_eq!(result.usage.total_tokens, 5);
        assert_eq!(result.provider, Provider::Local);
    }

    #[test]
    fn missing_fields_normalize_to_empty() {
        let result = CompletionResult::from_cloud(CloudResponse::default(), "m");
        assert_eq!(result.text, "");
        assert_eq!(result.usage, Usage::default());

        let result = CompletionResult::from_local(LocalCompletion::default(), "fallback");
        assert_eq!(result.model, "fallback");
    }

    #[test]
    fn usage_serializes_camel_case() {
        let json = serde_json::to_value(Usage {
            prompt_tokens: 1,
            completion_tokens: 2,
            total_tokens: 3,
        })
        .unwrap();
        assert_eq!(
            json,
            serde_json::json!({"promptTokens": 1, "completionTokens": 2, "totalTokens": 3})
        );
    }
}
