//! Grammar checking against a LanguageTool-compatible HTTP service.
//!
//! Issues whose flagged word is a recognized entity or acronym are not
//! mistakes; the remaining count is scaled down by ten for the feature vector.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, trace, warn};

use crate::errors::ExtractionError;
use crate::extraction::entities::EntitySet;

/// One flagged issue, reduced to the word it points at.
#[derive(Debug, Clone, PartialEq)]
pub struct GrammarIssue {
    pub rule_id: String,
    pub flagged: String,
}

#[async_trait]
pub trait GrammarChecker: Send + Sync {
    async fn check(&self, text: &str) -> Result<Vec<GrammarIssue>, ExtractionError>;
}

#[derive(Debug, Deserialize)]
struct CheckResponse {
    #[serde(default)]
    matches: Vec<CheckMatch>,
}

#[derive(Debug, Deserialize)]
struct CheckMatch {
    context: MatchContext,
    #[serde(default)]
    rule: Option<MatchRule>,
}

#[derive(Debug, Deserialize)]
struct MatchContext {
    text: String,
    offset: usize,
    length: usize,
}

#[derive(Debug, Deserialize)]
struct MatchRule {
    id: String,
}

impl CheckMatch {
    /// The flagged word. Offsets count characters, not bytes.
    fn flagged_word(&self) -> String {
        self.context
            .text
            .chars()
            .skip(self.context.offset)
            .take(self.context.length)
            .collect()
    }
}

/// Client for `POST /v2/check`.
pub struct LanguageToolChecker {
    client: Client,
    base_url: String,
    language: String,
}

impl LanguageToolChecker {
    pub fn new(
        base_url: impl Into<String>,
        language: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ExtractionError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ExtractionError::ModelUnavailable(format!("grammar client: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            language: language.into(),
        })
    }
}

#[async_trait]
impl GrammarChecker for LanguageToolChecker {
    async fn check(&self, text: &str) -> Result<Vec<GrammarIssue>, ExtractionError> {
        let url = format!("{}/v2/check", self.base_url);
        let response = self
            .client
            .post(&url)
            .form(&[("text", text), ("language", self.language.as_str())])
            .send()
            .await
            .map_err(|e| ExtractionError::Internal(anyhow::anyhow!("grammar check failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ExtractionError::Internal(anyhow::anyhow!(
                "grammar service returned {status}: {body}"
            )));
        }

        let parsed: CheckResponse = response.json().await.map_err(|e| {
            ExtractionError::Internal(anyhow::anyhow!("grammar response unreadable: {e}"))
        })?;

        Ok(parsed
            .matches
            .iter()
            .map(|m| GrammarIssue {
                rule_id: m.rule.as_ref().map(|r| r.id.clone()).unwrap_or_default(),
                flagged: m.flagged_word(),
            })
            .collect())
    }
}

/// Issues not explained by a special term, divided by ten and rounded to 2 dp.
///
/// No checker configured, a failed check and a timed-out check all give 0.0.
pub async fn grammatical_mistakes(
    text: &str,
    checker: Option<&dyn GrammarChecker>,
    special_terms: &EntitySet,
    timeout: Duration,
) -> f64 {
    let Some(checker) = checker else {
        return 0.0;
    };

    let issues = match tokio::time::timeout(timeout, checker.check(text)).await {
        Ok(Ok(issues)) => issues,
        Ok(Err(e)) => {
            warn!("Grammar check failed, counting zero issues: {e}");
            return 0.0;
        }
        Err(_) => {
            warn!(timeout_secs = timeout.as_secs(), "Grammar check timed out, counting zero issues");
            return 0.0;
        }
    };

    let remaining = count_unexplained(&issues, special_terms);
    debug!(total = issues.len(), remaining, "Grammar issues filtered");
    (remaining as f64 / 10.0 * 100.0).round() / 100.0
}

fn count_unexplained(issues: &[GrammarIssue], special_terms: &EntitySet) -> usize {
    issues
        .iter()
        .filter(|issue| !special_terms.contains(&issue.flagged))
        .inspect(|issue| trace!(rule = %issue.rule_id, word = %issue.flagged, "Grammar issue"))
        .count()
}
