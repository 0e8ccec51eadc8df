//! HTTP client for the generative-language `generateContent` endpoint.

use crate::config::ResearchConfig;
use crate::errors::Error;
use crate::research::prompt::research_prompt;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

#[derive(Debug, Serialize)]
struct GenerateContentRequest {
    contents: Vec<Content>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    text: String,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

impl GenerateContentResponse {
    /// Text of the first part of the first candidate, the way the API
    /// returns single-turn completions.
    fn into_text(self) -> Option<String> {
        self.candidates
            .into_iter()
            .next()?
            .content?
            .parts
            .into_iter()
            .next()
            .map(|part| part.text)
    }
}

/// Client for generating company research reports.
///
/// Holds a reqwest client with the configured request timeout. The API key
/// travels as a query parameter (the generative-language API's scheme), so
/// the full request URL must never be logged.
#[derive(Debug, Clone)]
pub struct GenerativeClient {
    http: reqwest::Client,
    api_base: Url,
    model: String,
    api_key: String,
}

impl GenerativeClient {
    pub fn new(config: &ResearchConfig) -> anyhow::Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .filter(|key| !key.is_empty())
            .ok_or_else(|| anyhow::anyhow!("research API key is not configured (set GOOGLE_API_KEY)"))?;

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            api_base: config.api_base.clone(),
            model: config.model.clone(),
            api_key,
        })
    }

    fn generate_url(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent?key={}",
            self.api_base.as_str().trim_end_matches('/'),
            self.model,
            self.api_key,
        )
    }

    /// Generate a research report for `company_name`.
    ///
    /// Upstream failures map to [`Error::Upstream`]: non-2xx responses carry
    /// the upstream status, while network errors, timeouts, and responses
    /// with no generated candidates carry none.
    #[tracing::instrument(skip_all, fields(model = %self.model))]
    pub async fn generate_report(&self, company_name: &str) -> Result<String, Error> {
        let payload = GenerateContentRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: research_prompt(company_name),
                }],
            }],
        };

        let response = self
            .http
            .post(self.generate_url())
            .json(&payload)
            .send()
            .await
            .map_err(|e| Error::Upstream {
                status: None,
                message: format!("generative API request failed: {e}"),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!("generative API returned {status}: {body}");
            return Err(Error::Upstream {
                status: Some(status.as_u16()),
                message: format!("generative API request failed with status {status}"),
            });
        }

        let parsed: GenerateContentResponse = response.json().await.map_err(|e| Error::Upstream {
            status: None,
            message: format!("failed to decode generative API response: {e}"),
        })?;

        parsed.into_text().ok_or_else(|| Error::Upstream {
            status: None,
            message: "generative API response contained no generated content".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> GenerativeClient {
        crate::test_utils::install_crypto_provider();
        let config = ResearchConfig {
            api_base: Url::parse(&server.uri()).unwrap(),
            model: "gemini-1.5-flash".to_string(),
            api_key: Some("test-key".to_string()),
            timeout_secs: 5,
        };
        GenerativeClient::new(&config).unwrap()
    }

    #[tokio::test]
    async fn extracts_the_first_candidate_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1beta/models/gemini-1.5-flash:generateContent"))
            .and(query_param("key", "test-key"))
            .and(body_partial_json(json!({"contents": [{"parts": [{}]}]})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "candidates": [
                    {"content": {"parts": [{"text": "Acme Corp makes everything."}], "role": "model"}}
                ]
            })))
            .mount(&server)
            .await;

        let report = client_for(&server).generate_report("Acme Corp").await.unwrap();
        assert_eq!(report, "Acme Corp makes everything.");
    }

    #[tokio::test]
    async fn non_success_status_carries_the_upstream_code() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let err = client_for(&server).generate_report("Acme Corp").await.unwrap_err();
        match err {
            Error::Upstream { status, .. } => assert_eq!(status, Some(500)),
            other => panic!("expected upstream error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn empty_candidates_are_an_upstream_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"candidates": []})))
            .mount(&server)
            .await;

        let err = client_for(&server).generate_report("Acme Corp").await.unwrap_err();
        assert!(matches!(err, Error::Upstream { status: None, .. }));
    }

    #[test]
    fn missing_api_key_is_a_construction_error() {
        let config = ResearchConfig {
            api_key: None,
            ..ResearchConfig::default()
        };
        assert!(GenerativeClient::new(&config).is_err());
    }
}
