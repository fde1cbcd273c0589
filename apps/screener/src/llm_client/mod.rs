//! Model-server client. The single point of entry for every call to the local
//! Ollama server (embeddings, entity recognition, model installation).
//!
//! No other module talks to the model server directly; backends in `scoring`
//! and `extraction` hold a clone of this client.
use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

pub mod prompts;

const DEFAULT_MAX_RETRIES: u32 = 3;
const PULL_TIMEOUT_SECS: u64 = 600;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Model '{0}' is not installed on the model server")]
    ModelMissing(String),

    #[error("Gave up after {retries} retries")]
    RetriesExhausted { retries: u32 },

    #[error("Model server returned empty content")]
    EmptyContent,
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    system: &'a str,
    prompt: &'a str,
    format: &'a str,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
}

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

#[derive(Debug, Serialize)]
struct ModelRequest<'a> {
    model: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    stream: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

/// HTTP client for an Ollama-compatible model server.
/// Wraps generate/embed with retry logic and a one-shot model install path.
#[derive(Clone)]
pub struct LlmClient {
    client: Client,
    base_url: String,
    max_retries: u32,
}

impl LlmClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, LlmError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            max_retries: DEFAULT_MAX_RETRIES,
        })
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries.max(1);
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Posts a JSON body and returns the raw successful response.
    /// Retries on 429 and 5xx with exponential backoff; 404 means the model is missing.
    async fn post_with_retry<B: Serialize>(
        &self,
        path: &str,
        model: &str,
        body: &B,
    ) -> Result<reqwest::Response, LlmError> {
        let url = format!("{}{}", self.base_url, path);
        let mut last_error: Option<LlmError> = None;

        for attempt in 0..self.max_retries {
            if attempt > 0 {
                // 500ms, 1s, 2s
                let delay = Duration::from_millis(500 * (1 << (attempt - 1)));
                warn!(
                    "Model server call to {} failed (attempt {}), retrying after {}ms",
                    path,
                    attempt,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
            }

            let response = match self.client.post(&url).json(body).send().await {
                Ok(r) => r,
                Err(e) => {
                    last_error = Some(LlmError::Http(e));
                    continue;
                }
            };

            let status = response.status();

            if status == StatusCode::NOT_FOUND {
                return Err(LlmError::ModelMissing(model.to_string()));
            }

            if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
                let body = response.text().await.unwrap_or_default();
                warn!("Model server returned {}: {}", status, body);
                last_error = Some(LlmError::Api {
                    status: status.as_u16(),
                    message: body,
                });
                continue;
            }

            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                let message = serde_json::from_str::<ErrorBody>(&body)
                    .map(|e| e.error)
                    .unwrap_or(body);
                return Err(LlmError::Api {
                    status: status.as_u16(),
                    message,
                });
            }

            return Ok(response);
        }

        Err(last_error.unwrap_or(LlmError::RetriesExhausted {
            retries: self.max_retries,
        }))
    }

    /// Runs a single non-streaming completion in JSON mode and returns the text.
    pub async fn call(&self, model: &str, prompt: &str, system: &str) -> Result<String, LlmError> {
        let request = GenerateRequest {
            model,
            system,
            prompt,
            format: "json",
            stream: false,
        };
        let response: GenerateResponse = self
            .post_with_retry("/api/generate", model, &request)
            .await?
            .json()
            .await?;

        if response.response.trim().is_empty() {
            return Err(LlmError::EmptyContent);
        }
        debug!(model, chars = response.response.len(), "Completion succeeded");
        Ok(response.response)
    }

    /// Calls the model and deserializes its text output as JSON.
    /// The prompt must instruct the model to return valid JSON.
    pub async fn call_json<T: DeserializeOwned>(
        &self,
        model: &str,
        prompt: &str,
        system: &str,
    ) -> Result<T, LlmError> {
        let text = self.call(model, prompt, system).await?;
        let text = strip_json_fences(&text);
        serde_json::from_str(text).map_err(LlmError::Parse)
    }

    /// Embeds a batch of inputs. One vector per input, in input order.
    pub async fn embed(&self, model: &str, inputs: &[String]) -> Result<Vec<Vec<f32>>, LlmError> {
        if inputs.is_empty() {
            return Ok(vec![]);
        }
        let request = EmbedRequest {
            model,
            input: inputs,
        };
        let response: EmbedResponse = self
            .post_with_retry("/api/embed", model, &request)
            .await?
            .json()
            .await?;

        if response.embeddings.len() != inputs.len() {
            return Err(LlmError::Api {
                status: 200,
                message: format!(
                    "expected {} embeddings, got {}",
                    inputs.len(),
                    response.embeddings.len()
                ),
            });
        }
        Ok(response.embeddings)
    }

    /// Checks the model is installed; if it is not, installs it once and checks again.
    pub async fn ensure_model(&self, model: &str) -> Result<(), LlmError> {
        match self.show(model).await {
            Ok(()) => return Ok(()),
            Err(LlmError::ModelMissing(_)) => {}
            Err(e) => return Err(e),
        }

        info!("Model '{model}' not installed, pulling it once");
        self.pull(model).await?;
        self.show(model).await
    }

    async fn show(&self, model: &str) -> Result<(), LlmError> {
        let request = ModelRequest {
            model,
            stream: None,
        };
        self.post_with_retry("/api/show", model, &request).await?;
        Ok(())
    }

    async fn pull(&self, model: &str) -> Result<(), LlmError> {
        let url = format!("{}/api/pull", self.base_url);
        let request = ModelRequest {
            model,
            stream: Some(false),
        };
        let response = self
            .client
            .post(&url)
            .timeout(Duration::from_secs(PULL_TIMEOUT_SECS))
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            warn!("Pulling model '{model}' failed with {status}: {message}");
            return Err(LlmError::ModelMissing(model.to_string()));
        }
        info!("Model '{model}' installed");
        Ok(())
    }
}

/// Strips ```json ... ``` or ``` ... ``` code fences from model output.
fn strip_json_fences(text: &str) -> &str {
    let text = text.trim();
    if let Some(stripped) = text.strip_prefix("```json") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else if let Some(stripped) = text.strip_prefix("```") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else {
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> LlmClient {
        LlmClient::new(server.uri(), Duration::from_secs(5))
            .unwrap()
            .with_max_retries(1)
    }

    #[test]
    fn test_strip_json_fences_with_json_tag() {
        let input = "```json\n{\"key\": \"value\"}\n```";
        assert_eq!(strip_json_fences(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn test_strip_json_fences_no_fences() {
        let input = "{\"key\": \"value\"}";
        assert_eq!(strip_json_fences(input), "{\"key\": \"value\"}");
    }

    #[tokio::test]
    async fn test_embed_returns_one_vector_per_input() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/embed"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "model": "all-minilm",
                "embeddings": [[0.1, 0.2], [0.3, 0.4]]
            })))
            .mount(&server)
            .await;

        let inputs = vec!["a".to_string(), "b".to_string()];
        let vectors = client_for(&server).embed("all-minilm", &inputs).await.unwrap();
        assert_eq!(vectors.len(), 2);
        assert_eq!(vectors[1], vec![0.3, 0.4]);
    }

    #[tokio::test]
    async fn test_embed_404_is_model_missing() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/embed"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({"error": "model not found"})))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .embed("all-minilm", &["x".to_string()])
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::ModelMissing(m) if m == "all-minilm"));
    }

    #[tokio::test]
    async fn test_call_json_parses_generate_output() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "response": "```json\n{\"locations\": [\"Berlin\"]}\n```",
                "done": true
            })))
            .mount(&server)
            .await;

        let value: serde_json::Value = client_for(&server)
            .call_json("llama3.2", "prompt", "system")
            .await
            .unwrap();
        assert_eq!(value["locations"][0], "Berlin");
    }

    #[tokio::test]
    async fn test_ensure_model_installed_skips_pull() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/show"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"details": {}})))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/pull"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        client_for(&server).ensure_model("all-minilm").await.unwrap();
    }

    #[tokio::test]
    async fn test_ensure_model_installs_missing_model_once() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/show"))
            .respond_with(ResponseTemplate::new(404))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/show"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"details": {}})))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/pull"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "success"})))
            .expect(1)
            .mount(&server)
            .await;

        client_for(&server).ensure_model("m").await.unwrap();
    }

    #[tokio::test]
    async fn test_ensure_model_pull_failure_is_model_missing() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/show"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/pull"))
            .respond_with(ResponseTemplate::new(500))
            .expect(1)
            .mount(&server)
            .await;

        let err = client_for(&server).ensure_model("ghost").await.unwrap_err();
        assert!(matches!(err, LlmError::ModelMissing(_)));
    }
}
