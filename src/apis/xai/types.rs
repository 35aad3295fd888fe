/// xAI Responses API request/response types
///
/// API Documentation: https://docs.x.ai/docs/api-reference#create-new-response
///
/// Search over X runs server side through the `x_search` tool; the model
/// decides the queries and the final answer arrives as an assistant message
/// in `output`.
use serde::{Deserialize, Serialize};

// ============================================================================
// REQUEST TYPES
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct XaiRequest {
    pub model: String,
    pub input: Vec<XaiMessage>,

    /// Server-side tools the model may call
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<XaiTool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_output_tokens: Option<u32>,

    /// Responses are not kept server side
    pub store: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct XaiMessage {
    /// "system", "user" or "assistant"
    pub role: String,
    pub content: String,
}

impl XaiMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct XaiTool {
    #[serde(rename = "type")]
    pub type_: String,
}

impl XaiTool {
    /// Search posts on X
    pub fn x_search() -> Self {
        Self {
            type_: "x_search".to_string(),
        }
    }
}

// ============================================================================
// RESPONSE TYPES
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct XaiResponse {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    /// Tool calls and messages, in the order the model produced them
    #[serde(default)]
    pub output: Vec<XaiOutputItem>,
    #[serde(default)]
    pub usage: Option<XaiUsage>,
}

impl XaiResponse {
    /// Text of every assistant message, joined
    pub fn output_text(&self) -> String {
        self.output
            .iter()
            .filter(|item| item.type_ == "message")
            .flat_map(|item| item.content.iter())
            .filter(|part| part.type_ == "output_text")
            .filter_map(|part| part.text.as_deref())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Number of server-side tool calls made for this answer
    pub fn tool_calls(&self) -> usize {
        self.output
            .iter()
            .filter(|item| item.type_ != "message")
            .count()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct XaiOutputItem {
    /// "message" for answers; tool calls carry their own type
    #[serde(rename = "type")]
    pub type_: String,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub content: Vec<XaiContentPart>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct XaiContentPart {
    #[serde(rename = "type")]
    pub type_: String,
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct XaiUsage {
    #[serde(default)]
    pub input_tokens: u32,
    #[serde(default)]
    pub output_tokens: u32,
    #[serde(default)]
    pub num_sources_used: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_text_skips_tool_calls() {
        let parsed: XaiResponse = serde_json::from_str(
            r#"{
                "id": "resp_1",
                "status": "completed",
                "output": [
                    {"type": "custom_tool_call", "name": "x_keyword_search", "input": "{}"},
                    {"type": "message", "role": "assistant", "content": [
                        {"type": "output_text", "text": "Username: @owner", "annotations": []},
                        {"type": "output_text", "text": "Confidence: High"}
                    ]}
                ],
                "usage": {"input_tokens": 120, "output_tokens": 9, "num_sources_used": 4}
            }"#,
        )
        .unwrap();

        assert_eq!(parsed.output_text(), "Username: @owner\nConfidence: High");
        assert_eq!(parsed.tool_calls(), 1);
        assert_eq!(parsed.usage.unwrap().num_sources_used, Some(4));
    }
}
