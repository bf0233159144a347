use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::RETRY_AFTER;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::time::{timeout, Duration};

use crate::config::models::is_usable_api_key;
use crate::config::{EngineConfig, GenerationParams};
use crate::error::UpstreamError;
use crate::logging::{preview, prompt_fingerprint};
use crate::models::base::TextGenerator;
use crate::pipelines::perf::PerfTimer;

const API_KEY_HEADER: &str = "x-goog-api-key";

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig<'a>,
}

#[derive(Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig<'a> {
    temperature: f32,
    max_output_tokens: u32,
    response_mime_type: &'a str,
}

#[derive(Deserialize, Default)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: String,
}

/// Seconds to wait from a `Retry-After` value: either delay-seconds or an
/// HTTP-date (past dates mean zero).
fn parse_retry_after(value: &str, now: DateTime<Utc>) -> Option<u64> {
    let value = value.trim();
    if let Ok(secs) = value.parse::<u64>() {
        return Some(secs);
    }
    match DateTime::parse_from_rfc2822(value) {
        Ok(at) => Some((at.with_timezone(&Utc) - now).num_seconds().max(0) as u64),
        Err(e) => {
            tracing::debug!(value = value, error = %e, "Ignoring unparseable Retry-After");
            None
        }
    }
}

/// Gemini `generateContent` client
pub struct GeminiClient {
    http: Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
    request_timeout: Duration,
}

impl GeminiClient {
    pub fn new(config: &EngineConfig) -> Result<Self, UpstreamError> {
        let request_timeout = Duration::from_secs(config.request_timeout_secs.max(1));
        let http = Client::builder()
            .timeout(request_timeout)
            .tcp_keepalive(Duration::from_secs(30))
            .build()
            .map_err(|e| UpstreamError::new(format!("Failed to create HTTP client: {}", e)))?;

        Ok(GeminiClient {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key: config
                .api_key
                .as_deref()
                .map(str::trim)
                .filter(|key| is_usable_api_key(Some(*key)))
                .map(str::to_string),
            request_timeout,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }

    async fn send(&self, api_key: &str, prompt: &str, params: &GenerationParams) -> Result<String, UpstreamError> {
        let body = GenerateContentRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![Part { text: prompt }],
            }],
            generation_config: GenerationConfig {
                temperature: params.temperature,
                max_output_tokens: params.max_output_tokens,
                response_mime_type: &params.response_mime_type,
            },
        };

        let response = self
            .http
            .post(self.endpoint())
            .header(API_KEY_HEADER, api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let retry_after = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| parse_retry_after(v, Utc::now()));
        let text = response.text().await?;

        if !status.is_success() {
            let detail = serde_json::from_str::<ErrorEnvelope>(&text)
                .map(|env| format!("{} {}", env.error.status, env.error.message).trim().to_string())
                .unwrap_or_else(|_| preview(&text, 300));
            let mut err = UpstreamError::new(format!(
                "{} {}",
                status.canonical_reason().unwrap_or("HTTP error"),
                detail
            ))
            .with_status(status.as_u16());
            if let Some(secs) = retry_after {
                err = err.with_retry_after(secs);
            }
            return Err(err);
        }

        let parsed: GenerateContentResponse = serde_json::from_str(&text).map_err(|e| {
            UpstreamError::new(format!("Unexpected response body from '{}': {}", self.model, e))
        })?;

        Ok(parsed
            .candidates
            .into_iter()
            .filter_map(|c| c.content)
            .flat_map(|c| c.parts)
            .filter_map(|p| p.text)
            .collect::<String>())
    }
}

#[async_trait]
impl TextGenerator for GeminiClient {
    fn name(&self) -> &str {
        &self.model
    }

    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    async fn generate_text(
        &self,
        prompt: &str,
        params: &GenerationParams,
    ) -> Result<String, UpstreamError> {
        let Some(api_key) = self.api_key.as_deref() else {
            return Err(UpstreamError::new("Gemini API key not configured"));
        };

        let perf = PerfTimer::new("gemini_call");
        let result = timeout(self.request_timeout, self.send(api_key, prompt, params)).await;
        let latency_ms = perf.elapsed_ms();

        match result {
            Ok(Ok(text)) => {
                tracing::info!(
                    model = %self.model,
                    prompt = %prompt_fingerprint(prompt),
                    latency_ms = latency_ms,
                    response_len = text.len(),
                    "Model call"
                );
                Ok(text)
            }
            Ok(Err(e)) => {
                tracing::warn!(
                    model = %self.model,
                    prompt = %prompt_fingerprint(prompt),
                    latency_ms = latency_ms,
                    error = %e,
                    "Model call failed"
                );
                Err(e)
            }
            Err(elapsed) => {
                tracing::error!(
                    model = %self.model,
                    duration_secs = self.request_timeout.as_secs(),
                    "Timeout exceeded"
                );
                Err(elapsed.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unconfigured_without_key() {
        let client = GeminiClient::new(&EngineConfig::default()).unwrap();
        assert!(!client.is_configured());
    }

    #[test]
    fn test_placeholder_key_is_not_configured() {
        let config = EngineConfig {
            api_key: Some(crate::config::models::PLACEHOLDER_API_KEY.to_string()),
            ..EngineConfig::default()
        };
        let client = GeminiClient::new(&config).unwrap();
        assert!(!client.is_configured());
    }

    #[test]
    fn test_endpoint() {
        let config = EngineConfig {
            base_url: "http://localhost:8080/v1beta/".to_string(),
            api_key: Some("key".to_string()),
            ..EngineConfig::default()
        };
        let client = GeminiClient::new(&config).unwrap();
        assert!(client.is_configured());
        assert_eq!(
            client.endpoint(),
            "http://localhost:8080/v1beta/models/gemini-2.0-flash-exp:generateContent"
        );
    }

    #[test]
    fn test_api_key_is_trimmed() {
        let config = EngineConfig {
            api_key: Some("  secret-key\n".to_string()),
            ..EngineConfig::default()
        };
        let client = GeminiClient::new(&config).unwrap();
        assert!(client.is_configured());
        assert_eq!(client.api_key.as_deref(), Some("secret-key"));

        let config = EngineConfig {
            api_key: Some(" \n".to_string()),
            ..EngineConfig::default()
        };
        assert!(!GeminiClient::new(&config).unwrap().is_configured());
    }

    #[test]
    fn test_retry_after_forms() {
        let now = DateTime::parse_from_rfc3339("2015-10-21T07:27:30Z")
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(parse_retry_after(" 120 ", now), Some(120));
        assert_eq!(parse_retry_after("Wed, 21 Oct 2015 07:28:00 GMT", now), Some(30));
        assert_eq!(parse_retry_after("Wed, 21 Oct 2015 07:00:00 GMT", now), Some(0));
        assert_eq!(parse_retry_after("soon", now), None);
    }

    #[test]
    fn test_request_body_shape() {
        let params = GenerationParams::schedule();
        let body = GenerateContentRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![Part { text: "hello" }],
            }],
            generation_config: GenerationConfig {
                temperature: params.temperature,
                max_output_tokens: params.max_output_tokens,
                response_mime_type: &params.response_mime_type,
            },
        };
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["contents"][0]["parts"][0]["text"], "hello");
        assert_eq!(value["generationConfig"]["maxOutputTokens"], 3000);
        assert_eq!(value["generationConfig"]["responseMimeType"], "application/json");
    }

    #[test]
    fn test_response_text_is_concatenated() {
        let parsed: GenerateContentResponse = serde_json::from_str(
            r#"{"candidates":[{"content":{"parts":[{"text":"{\"a\":"},{"text":"1}"}]}}]}"#,
        )
        .unwrap();
        let text: String = parsed
            .candidates
            .into_iter()
            .filter_map(|c| c.content)
            .flat_map(|c| c.parts)
            .filter_map(|p| p.text)
            .collect();
        assert_eq!(text, r#"{"a":1}"#);
    }
}
