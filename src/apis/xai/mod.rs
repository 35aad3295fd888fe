/// xAI search oracle (raw HTTP via reqwest)
///
/// API Documentation: https://docs.x.ai/docs/api-reference
///
/// Endpoints:
/// - POST https://api.x.ai/v1/responses
///
/// Both lookup stages are single responses with the server-side `x_search`
/// tool enabled. Answers are free text and are interpreted by `lookup::parse`.
pub mod prompts;
pub mod types;

pub use self::types::{
    XaiContentPart, XaiMessage, XaiOutputItem, XaiRequest, XaiResponse, XaiTool, XaiUsage,
};

use super::client::{self, HttpClient};
use crate::config::OracleConfig;
use crate::errors::OracleError;
use crate::logger::{self, LogTag};
use crate::lookup::parse::{extract_confidence, extract_username, parse_existence};
use crate::lookup::{short, Confidence, Oracle, Ownership};
use async_trait::async_trait;
use std::time::Instant;

// ============================================================================
// API CONFIGURATION
// ============================================================================

const PROVIDER: &str = "xai";
const ENDPOINT_RESPONSES: &str = "/responses";

// ============================================================================
// CLIENT IMPLEMENTATION
// ============================================================================

pub struct XaiOracle {
    api_key: String,
    http: HttpClient,
    model: String,
    base_url: String,
}

impl XaiOracle {
    pub fn new(config: &OracleConfig) -> Result<Self, String> {
        if config.api_key.trim().is_empty() {
            return Err("xAI API key cannot be empty".to_string());
        }

        Ok(Self {
            api_key: config.api_key.trim().to_string(),
            http: HttpClient::new(config.request_timeout_secs)?,
            model: config.model.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn build_request(&self, prompt: String) -> XaiRequest {
        XaiRequest {
            model: self.model.clone(),
            input: vec![
                XaiMessage::system(prompts::SYSTEM_PROMPT),
                XaiMessage::user(prompt),
            ],
            tools: vec![XaiTool::x_search()],
            temperature: Some(0.0),
            max_output_tokens: None,
            store: false,
        }
    }

    /// Execute one response with X search and return the answer text
    async fn ask(&self, prompt: String) -> Result<String, OracleError> {
        let request = self.build_request(prompt);
        let url = format!("{}{}", self.base_url, ENDPOINT_RESPONSES);

        logger::verbose(
            LogTag::Oracle,
            &format!("[XAI] Calling responses: model={}", request.model),
        );

        let start = Instant::now();
        let response = self
            .http
            .client()
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    OracleError::Timeout {
                        provider: PROVIDER.to_string(),
                        timeout_ms: self.http.timeout().as_millis() as u64,
                    }
                } else {
                    OracleError::Network {
                        provider: PROVIDER.to_string(),
                        message: format!("Request failed: {}", e),
                    }
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            // Parse retry-after header BEFORE consuming body
            let retry_after = client::retry_after_ms(response.headers());
            let body = response.text().await.unwrap_or_default();
            return Err(OracleError::from_status(
                PROVIDER,
                status.as_u16(),
                body,
                retry_after,
            ));
        }

        let parsed = response
            .json::<XaiResponse>()
            .await
            .map_err(|e| OracleError::Parse {
                provider: PROVIDER.to_string(),
                message: format!("Failed to parse response: {}", e),
            })?;

        logger::debug(
            LogTag::Oracle,
            &format!(
                "[XAI] Response in {}ms ({} tool call(s), sources used: {})",
                start.elapsed().as_millis(),
                parsed.tool_calls(),
                parsed
                    .usage
                    .as_ref()
                    .and_then(|u| u.num_sources_used)
                    .map(|n| n.to_string())
                    .unwrap_or_else(|| "?".to_string())
            ),
        );

        answer_text(parsed)
    }
}

/// Assistant text of the response
fn answer_text(response: XaiResponse) -> Result<String, OracleError> {
    let text = response.output_text();
    let text = text.trim();
    if text.is_empty() {
        return Err(OracleError::InvalidResponse {
            provider: PROVIDER.to_string(),
            message: format!(
                "No answer in response (status: {})",
                response.status.as_deref().unwrap_or("unknown")
            ),
        });
    }
    Ok(text.to_string())
}

/// Existence answer; ambiguous answers count as "no posts"
pub fn interpret_existence(wallet: &str, answer: &str) -> bool {
    match parse_existence(answer) {
        Some(exists) => exists,
        None => {
            logger::warning(
                LogTag::Oracle,
                &format!(
                    "⚠️ Ambiguous existence answer for {}, treating as no posts: {}",
                    short(wallet),
                    answer
                ),
            );
            false
        }
    }
}

/// Ownership answer; a missing confidence label counts as Medium
pub fn interpret_ownership(wallet: &str, answer: &str) -> Ownership {
    let username = extract_username(answer);
    let confidence = extract_confidence(answer).unwrap_or(Confidence::Medium);

    if username.is_none() {
        logger::warning(
            LogTag::Oracle,
            &format!(
                "⚠️ Posts exist for {} but no username could be extracted",
                short(wallet)
            ),
        );
    }

    Ownership {
        username,
        confidence,
    }
}

#[async_trait]
impl Oracle for XaiOracle {
    fn name(&self) -> &str {
        PROVIDER
    }

    async fn post_exists(&self, wallet: &str) -> Result<bool, OracleError> {
        let answer = self.ask(prompts::existence_prompt(wallet)).await?;
        logger::debug(
            LogTag::Oracle,
            &format!("[XAI] Existence answer for {}: {}", short(wallet), answer),
        );
        Ok(interpret_existence(wallet, &answer))
    }

    async fn analyze_ownership(&self, wallet: &str) -> Result<Ownership, OracleError> {
        let answer = self.ask(prompts::ownership_prompt(wallet)).await?;
        logger::debug(
            LogTag::Oracle,
            &format!("[XAI] Ownership answer for {}: {}", short(wallet), answer),
        );
        Ok(interpret_ownership(wallet, &answer))
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> OracleConfig {
        OracleConfig {
            api_key: "test-key".to_string(),
            ..OracleConfig::default()
        }
    }

    fn response(content: Option<&str>) -> XaiResponse {
        XaiResponse {
            id: None,
            model: None,
            status: Some("completed".to_string()),
            output: content
                .map(|text| {
                    vec![XaiOutputItem {
                        type_: "message".to_string(),
                        role: Some("assistant".to_string()),
                        content: vec![XaiContentPart {
                            type_: "output_text".to_string(),
                            text: Some(text.to_string()),
                        }],
                    }]
                })
                .unwrap_or_default(),
            usage: None,
        }
    }

    #[test]
    fn test_client_creation() {
        let oracle = XaiOracle::new(&config()).unwrap();
        assert_eq!(oracle.model(), "grok-4-fast");
        assert_eq!(oracle.name(), "xai");
    }

    #[test]
    fn test_client_creation_empty_key() {
        assert!(XaiOracle::new(&OracleConfig::default()).is_err());
    }

    #[test]
    fn test_request_enables_x_search() {
        let oracle = XaiOracle::new(&config()).unwrap();
        let request = oracle.build_request(prompts::existence_prompt("0xabc"));
        let json = serde_json::to_value(&request).unwrap();

        assert_eq!(json["model"], "grok-4-fast");
        assert_eq!(json["temperature"], 0.0);
        assert_eq!(json["tools"], serde_json::json!([{"type": "x_search"}]));
        assert_eq!(json["input"][0]["role"], "system");
        assert_eq!(json["input"][1]["role"], "user");
        assert!(json["input"][1]["content"]
            .as_str()
            .unwrap()
            .contains("0xabc"));
        assert_eq!(json["store"], false);
        assert!(json.get("messages").is_none());
        assert!(json.get("search_parameters").is_none());
        assert!(json.get("max_output_tokens").is_none());
    }

    #[test]
    fn test_answer_text() {
        assert_eq!(answer_text(response(Some("  true \n"))).unwrap(), "true");

        let empty = answer_text(response(Some("   "))).unwrap_err();
        assert!(matches!(empty, OracleError::InvalidResponse { .. }));

        assert!(answer_text(response(None)).is_err());
    }

    #[test]
    fn test_interpretation_defaults() {
        assert!(interpret_existence("0xabc", "true"));
        assert!(!interpret_existence("0xabc", "I am not sure"));

        let owner = interpret_ownership("0xabc", "Username: @owner");
        assert_eq!(owner.username.as_deref(), Some("owner"));
        assert_eq!(owner.confidence, Confidence::Medium);

        let anonymous = interpret_ownership("0xabc", "Only bots posted it. Confidence: Low");
        assert_eq!(anonymous.username, None);
        assert_eq!(anonymous.confidence, Confidence::Low);
    }
}
