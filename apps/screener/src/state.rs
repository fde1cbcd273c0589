use std::sync::Arc;

use tracing::info;

use crate::classifier::{Classifier, LinearClassifier};
use crate::config::{Config, EmbeddingBackend, EntityBackend};
use crate::errors::ExtractionError;
use crate::extraction::entities::{EntityRecognizer, HeuristicRecognizer, OllamaRecognizer};
use crate::extraction::grammar::{GrammarChecker, LanguageToolChecker};
use crate::llm_client::LlmClient;
use crate::scoring::encoder::{HashingEncoder, OllamaEncoder, TextEncoder};

/// Process-wide handles, built once by `initialize` and never mutated.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    /// Sentence encoder shared by every request.
    pub encoder: Arc<dyn TextEncoder>,
    pub recognizer: Arc<dyn EntityRecognizer>,
    /// `None` disables grammar checking (the feature is then 0).
    pub grammar: Option<Arc<dyn GrammarChecker>>,
    /// `None` means features and report only, no prediction.
    pub classifier: Option<Arc<dyn Classifier>>,
}

impl AppState {
    /// Loads every model handle up front. A model that cannot be installed
    /// or reached fails here rather than on the first request.
    pub async fn initialize(config: &Config) -> Result<Self, ExtractionError> {
        let needs_llm = config.embedding_backend == EmbeddingBackend::Ollama
            || config.entity_backend == EntityBackend::Ollama;
        let llm = if needs_llm {
            let client = LlmClient::new(config.ollama_url.clone(), config.model_timeout)
                .map_err(|e| ExtractionError::ModelUnavailable(e.to_string()))?
                .with_max_retries(config.model_retries);
            info!("Model server client initialized ({})", client.base_url());
            Some(client)
        } else {
            None
        };

        let encoder: Arc<dyn TextEncoder> = match (config.embedding_backend, &llm) {
            (EmbeddingBackend::Ollama, Some(llm)) => {
                Arc::new(OllamaEncoder::load(llm.clone(), config.embedding_model.clone()).await?)
            }
            _ => Arc::new(HashingEncoder::default()),
        };
        info!("Text encoder ready (backend: {})", encoder.backend());

        let recognizer: Arc<dyn EntityRecognizer> = match (config.entity_backend, &llm) {
            (EntityBackend::Ollama, Some(llm)) => {
                Arc::new(OllamaRecognizer::load(llm.clone(), config.ner_model.clone()).await?)
            }
            _ => Arc::new(HeuristicRecognizer),
        };
        info!("Entity recognizer ready (backend: {})", recognizer.backend());

        let grammar: Option<Arc<dyn GrammarChecker>> = match &config.languagetool_url {
            Some(url) => {
                let checker = LanguageToolChecker::new(
                    url.clone(),
                    config.grammar_language.clone(),
                    config.model_timeout,
                )?;
                info!("Grammar checker ready ({url}, {})", config.grammar_language);
                Some(Arc::new(checker))
            }
            None => {
                info!("Grammar checking disabled (LANGUAGETOOL_URL unset)");
                None
            }
        };

        let classifier: Option<Arc<dyn Classifier>> = match &config.classifier_path {
            Some(path) => Some(Arc::new(LinearClassifier::load(path)?)),
            None => None,
        };

        Ok(AppState {
            config: config.clone(),
            encoder,
            recognizer,
            grammar,
            classifier,
        })
    }

    /// Offline state for tests: hashing encoder, heuristic recognizer, no grammar service.
    #[cfg(test)]
    pub fn offline(config: Config) -> Self {
        AppState {
            config,
            encoder: Arc::new(HashingEncoder::default()),
            recognizer: Arc::new(HeuristicRecognizer),
            grammar: None,
            classifier: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_initialize_retries_then_reports_model_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/show"))
            .respond_with(ResponseTemplate::new(500))
            .expect(2)
            .mount(&server)
            .await;

        let config = Config {
            ollama_url: server.uri(),
            embedding_backend: EmbeddingBackend::Ollama,
            model_retries: 2,
            ..Config::for_tests()
        };
        let err = AppState::initialize(&config).await.err().unwrap();
        assert!(matches!(err, ExtractionError::ModelUnavailable(_)));
        assert!(!err.is_input_error());
    }

    #[tokio::test]
    async fn test_initialize_offline_backends_skip_model_server() {
        let state = AppState::initialize(&Config::for_tests()).await.unwrap();
        assert_eq!(state.encoder.backend(), "hashing");
        assert_eq!(state.recognizer.backend(), "heuristic");
        assert!(state.grammar.is_none());
        assert!(state.classifier.is_none());
    }
}
