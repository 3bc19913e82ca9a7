use anyhow::{anyhow, Result};
use reqwest::Client;
use serde::Serialize;
use serde_json::{json, Value};

use crate::config::FeedbackConfig;
use crate::models::FeedbackCreateRequest;

#[derive(Debug, Serialize)]
struct FeedbackRecord<'a> {
    #[serde(flatten)]
    feedback: &'a FeedbackCreateRequest,
    source_info: Value,
}

/// Client for the external tracing service's feedback endpoint
#[derive(Clone)]
pub struct FeedbackClient {
    client: Client,
    api_url: String,
    api_key: Option<String>,
}

impl FeedbackClient {
    pub fn new(api_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            client: Client::new(),
            api_url: api_url.into().trim_end_matches('/').to_string(),
            api_key,
        }
    }

    /// Build a client when feedback forwarding is enabled and configured
    pub fn from_config(config: &FeedbackConfig) -> Option<Self> {
        if !config.is_enabled() {
            return None;
        }
        let api_url = config.api_url.as_ref()?;
        Some(Self::new(api_url.clone(), config.api_key.clone()))
    }

    /// Submit one feedback record. Success means the service accepted the
    /// request, not that it has been recorded.
    pub async fn create_feedback(&self, feedback: &FeedbackCreateRequest) -> Result<()> {
        let record = FeedbackRecord {
            feedback,
            source_info: json!({ "from_run_server": true }),
        };

        let mut request = self
            .client
            .post(format!("{}/feedback", self.api_url))
            .json(&record);
        if let Some(key) = &self.api_key {
            request = request.header("x-api-key", key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| anyhow!("Feedback request failed: {}", e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("Feedback service error ({}): {}", status, body));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn feedback() -> FeedbackCreateRequest {
        serde_json::from_value(json!({
            "run_id": "6f9619ff-8b86-d011-b42d-00c04fc964ff",
            "key": "user_score",
            "score": 1,
            "comment": "helpful"
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn test_posts_feedback_with_key_and_source() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/feedback"))
            .and(header("x-api-key", "secret"))
            .and(body_partial_json(json!({
                "key": "user_score",
                "score": 1,
                "source_info": { "from_run_server": true }
            })))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let client = FeedbackClient::new(server.uri(), Some("secret".into()));
        client.create_feedback(&feedback()).await.unwrap();
    }

    #[tokio::test]
    async fn test_service_error_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let client = FeedbackClient::new(server.uri(), None);
        assert!(client.create_feedback(&feedback()).await.is_err());
    }

    #[test]
    fn test_disabled_config_builds_no_client() {
        assert!(FeedbackClient::from_config(&FeedbackConfig::default()).is_none());

        let config = FeedbackConfig {
            tracing_enabled: true,
            api_url: Some("http://tracing.local".into()),
            api_key: None,
        };
        assert!(FeedbackClient::from_config(&config).is_some());
    }
}
