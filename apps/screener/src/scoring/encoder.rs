use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use async_trait::async_trait;
use tracing::debug;

use crate::errors::ExtractionError;
use crate::llm_client::LlmClient;

/// Dimension of the offline hashing encoder, matching all-MiniLM.
pub const HASHING_DIMENSION: usize = 384;

/// Sentence encoder. One vector per input, in input order.
/// Built once at startup and shared as `Arc<dyn TextEncoder>`.
#[async_trait]
pub trait TextEncoder: Send + Sync {
    async fn encode(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ExtractionError>;

    fn backend(&self) -> &'static str;
}

// ────────────────────────────────────────────────────────────────────────────
// Model-server encoder
// ────────────────────────────────────────────────────────────────────────────

pub struct OllamaEncoder {
    llm: LlmClient,
    model: String,
}

impl OllamaEncoder {
    /// Verifies the embedding model is installed (installing it once if needed).
    pub async fn load(llm: LlmClient, model: impl Into<String>) -> Result<Self, ExtractionError> {
        let model = model.into();
        llm.ensure_model(&model)
            .await
            .map_err(|e| ExtractionError::ModelUnavailable(format!("encoder model '{model}': {e}")))?;
        Ok(Self { llm, model })
    }
}

#[async_trait]
impl TextEncoder for OllamaEncoder {
    async fn encode(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ExtractionError> {
        // The server rejects empty strings; embed them as zero vectors instead.
        let non_empty: Vec<String> = texts
            .iter()
            .filter(|t| !t.trim().is_empty())
            .cloned()
            .collect();
        let mut embedded = self.llm.embed(&self.model, &non_empty).await?.into_iter();
        let dimension = embedded.as_slice().first().map(Vec::len).unwrap_or(0);

        let mut out = Vec::with_capacity(texts.len());
        for text in texts {
            if text.trim().is_empty() {
                out.push(vec![0.0; dimension]);
            } else {
                let vector = embedded.next().ok_or_else(|| {
                    ExtractionError::Encoder("embedding batch came back short".to_string())
                })?;
                out.push(vector);
            }
        }
        debug!(model = %self.model, inputs = texts.len(), dimension, "Texts encoded");
        Ok(out)
    }

    fn backend(&self) -> &'static str {
        "ollama"
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Offline encoder
// ────────────────────────────────────────────────────────────────────────────

/// Deterministic bag-of-words feature hashing. No model files, no network.
///
/// Each lowercased alphanumeric token is hashed into a signed bucket; the
/// result is normalised to unit length. Texts sharing vocabulary score high,
/// disjoint texts score near zero, and an empty text encodes to the zero
/// vector.
pub struct HashingEncoder {
    dimension: usize,
}

impl HashingEncoder {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(1),
        }
    }

    fn encode_one(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimension];

        for token in text
            .split(|c: char| !c.is_alphanumeric() && c != '+' && c != '#')
            .filter(|t| !t.is_empty())
        {
            let token = token.to_lowercase();
            let mut hasher = DefaultHasher::new();
            token.hash(&mut hasher);
            let hash = hasher.finish();

            let bucket = (hash % self.dimension as u64) as usize;
            let sign = if (hash >> 63) == 0 { 1.0 } else { -1.0 };
            vector[bucket] += sign;
        }

        let magnitude: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if magnitude > 0.0 {
            for value in &mut vector {
                *value /= magnitude;
            }
        }
        vector
    }
}

impl Default for HashingEncoder {
    fn default() -> Self {
        Self::new(HASHING_DIMENSION)
    }
}

#[async_trait]
impl TextEncoder for HashingEncoder {
    async fn encode(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ExtractionError> {
        Ok(texts.iter().map(|t| self.encode_one(t)).collect())
    }

    fn backend(&self) -> &'static str {
        "hashing"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_hashing_is_deterministic() {
        let encoder = HashingEncoder::default();
        let texts = vec!["Rust and Kubernetes".to_string(), "Rust and Kubernetes".to_string()];
        let out = encoder.encode(&texts).await.unwrap();
        assert_eq!(out[0], out[1]);
        assert_eq!(out[0].len(), HASHING_DIMENSION);
    }

    #[tokio::test]
    async fn test_hashing_empty_text_is_zero_vector() {
        let encoder = HashingEncoder::new(16);
        let out = encoder.encode(&[String::new()]).await.unwrap();
        assert!(out[0].iter().all(|v| *v == 0.0));
    }

    #[tokio::test]
    async fn test_hashing_ignores_case() {
        let encoder = HashingEncoder::default();
        let out = encoder
            .encode(&["PYTHON Docker".to_string(), "python docker".to_string()])
            .await
            .unwrap();
        assert_eq!(out[0], out[1]);
    }

    #[tokio::test]
    async fn test_ollama_encoder_fills_empty_inputs_with_zeros() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/show"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/embed"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "model": "all-minilm",
                "embeddings": [[0.6, 0.8, 0.0], [0.0, 0.0, 1.0]]
            })))
            .mount(&server)
            .await;

        let llm = LlmClient::new(server.uri(), Duration::from_secs(5)).unwrap();
        let encoder = OllamaEncoder::load(llm, "all-minilm").await.unwrap();
        let texts = vec!["job".to_string(), "".to_string(), "skills".to_string()];
        let out = encoder.encode(&texts).await.unwrap();

        assert_eq!(out.len(), 3);
        assert_eq!(out[0], vec![0.6, 0.8, 0.0]);
        assert_eq!(out[1], vec![0.0, 0.0, 0.0]);
        assert_eq!(out[2], vec![0.0, 0.0, 1.0]);
    }

    #[tokio::test]
    async fn test_ollama_encoder_missing_model_is_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/show"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/pull"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let llm = LlmClient::new(server.uri(), Duration::from_secs(5)).unwrap();
        let result = OllamaEncoder::load(llm, "all-minilm").await;
        assert!(matches!(result, Err(ExtractionError::ModelUnavailable(_))));
    }

    #[tokio::test]
    async fn test_ollama_encoder_unreachable_server_is_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/show"))
            .respond_with(ResponseTemplate::new(500).set_body_string("overloaded"))
            .expect(1)
            .mount(&server)
            .await;

        let llm = LlmClient::new(server.uri(), Duration::from_secs(5))
            .unwrap()
            .with_max_retries(1);
        let err = OllamaEncoder::load(llm, "all-minilm").await.err().unwrap();
        assert!(matches!(&err, ExtractionError::ModelUnavailable(msg) if msg.contains("all-minilm")));
        assert_eq!(err.code(), "MODEL_UNAVAILABLE");
    }
}
