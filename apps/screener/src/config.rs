use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{bail, Context, Result};

use crate::features::ScoreWeights;

/// Which text encoder backs the semantic scorer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbeddingBackend {
    Ollama,
    Hashing,
}

impl FromStr for EmbeddingBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ollama" => Ok(Self::Ollama),
            "hashing" => Ok(Self::Hashing),
            other => bail!("unknown EMBEDDING_BACKEND '{other}' (expected 'ollama' or 'hashing')"),
        }
    }
}

/// Which recognizer backs the entity extractor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityBackend {
    Ollama,
    Heuristic,
}

impl FromStr for EntityBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ollama" => Ok(Self::Ollama),
            "heuristic" => Ok(Self::Heuristic),
            other => bail!("unknown ENTITY_BACKEND '{other}' (expected 'ollama' or 'heuristic')"),
        }
    }
}

/// Application configuration loaded from environment variables.
/// Every variable has a default; only malformed values fail.
#[derive(Debug, Clone)]
pub struct Config {
    pub ollama_url: String,
    pub embedding_backend: EmbeddingBackend,
    pub embedding_model: String,
    pub entity_backend: EntityBackend,
    pub ner_model: String,
    /// Grammar checking is disabled when unset.
    pub languagetool_url: Option<String>,
    pub grammar_language: String,
    pub model_timeout: Duration,
    /// Attempts per model-server request, counting the first.
    pub model_retries: u32,
    pub classifier_path: Option<PathBuf>,
    pub weights: ScoreWeights,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let defaults = ScoreWeights::default();

        Ok(Config {
            ollama_url: env_or("OLLAMA_URL", "http://localhost:11434"),
            embedding_backend: env_or("EMBEDDING_BACKEND", "ollama").parse()?,
            embedding_model: env_or("EMBEDDING_MODEL", "all-minilm"),
            entity_backend: env_or("ENTITY_BACKEND", "heuristic").parse()?,
            ner_model: env_or("NER_MODEL", "llama3.2"),
            languagetool_url: optional_env("LANGUAGETOOL_URL"),
            grammar_language: env_or("GRAMMAR_LANGUAGE", "en-US"),
            model_timeout: Duration::from_secs(parse_env("MODEL_TIMEOUT_SECS", 30u64)?),
            model_retries: parse_env("MODEL_RETRIES", 3u32)?,
            classifier_path: optional_env("CLASSIFIER_PATH").map(PathBuf::from),
            weights: ScoreWeights {
                skills: parse_env("SKILLS_WEIGHT", defaults.skills)?,
                education: parse_env("EDUCATION_WEIGHT", defaults.education)?,
                experience: parse_env("EXPERIENCE_WEIGHT", defaults.experience)?,
                certifications: parse_env("CERTIFICATIONS_WEIGHT", defaults.certifications)?,
                industry: parse_env("INDUSTRY_WEIGHT", defaults.industry)?,
            },
            rust_log: env_or("RUST_LOG", "info"),
        })
    }
}

#[cfg(test)]
impl Config {
    /// Offline defaults that never touch the environment.
    pub fn for_tests() -> Self {
        Config {
            ollama_url: "http://localhost:11434".to_string(),
            embedding_backend: EmbeddingBackend::Hashing,
            embedding_model: "all-minilm".to_string(),
            entity_backend: EntityBackend::Heuristic,
            ner_model: "llama3.2".to_string(),
            languagetool_url: None,
            grammar_language: "en-US".to_string(),
            model_timeout: Duration::from_secs(5),
            model_retries: 1,
            classifier_path: None,
            weights: ScoreWeights::default(),
            rust_log: "info".to_string(),
        }
    }
}

fn env_or(key: &str, default: &str) -> String {
    optional_env(key).unwrap_or_else(|| default.to_string())
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match optional_env(key) {
        Some(raw) => raw
            .parse::<T>()
            .with_context(|| format!("Environment variable '{key}' has an invalid value '{raw}'")),
        None => Ok(default),
    }
}
