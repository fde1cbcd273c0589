//! Entity extraction: locations plus the set of distinguishing terms
//! (acronyms, proper nouns) that the grammar checker must not flag.
//!
//! The recognizer is pluggable: `HeuristicRecognizer` (gazetteer + capitalised
//! spans, no model) or `OllamaRecognizer` (LLM prompted for JSON). The handle
//! is built once at startup and shared.

use std::collections::HashSet;
use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::errors::ExtractionError;
use crate::extraction::prompts::{NER_PROMPT_TEMPLATE, NER_SYSTEM};
use crate::llm_client::prompts::{JSON_ONLY_SYSTEM, VERBATIM_INSTRUCTION};
use crate::llm_client::LlmClient;

/// Longest text sent to the LLM recognizer in one prompt.
const MAX_PROMPT_CHARS: usize = 12_000;

static ACRONYM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b[A-Z]{2,}(?:-[A-Z]+)*\b").expect("acronym regex is valid"));

static PROPER_NOUN_SPAN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b[A-Z][a-zA-Z&.'-]+(?:[ \t]+(?:of[ \t]+)?[A-Z][a-zA-Z&.'-]+)+\b")
        .expect("proper noun regex is valid")
});

/// Geo-political names the heuristic recognizer reports as locations.
/// Multi-word names come first so they win over their single-word suffixes.
const GAZETTEER: &[&str] = &[
    "United States", "United Kingdom", "United Arab Emirates", "New Zealand", "South Africa",
    "Saudi Arabia", "South Korea", "Hong Kong", "New York", "San Francisco", "Los Angeles",
    "San Diego", "San Jose", "Las Vegas", "New Delhi", "Tel Aviv", "Abu Dhabi", "Sao Paulo",
    "Buenos Aires", "Mexico City", "Kuala Lumpur", "Cape Town", "Rio de Janeiro", "New Jersey",
    "North Carolina", "South Carolina", "Bay Area", "USA", "UK", "UAE", "India", "Pakistan",
    "Bangladesh", "Nepal", "Sri Lanka", "China", "Japan", "Singapore", "Malaysia", "Indonesia",
    "Philippines", "Vietnam", "Thailand", "Australia", "Canada", "Mexico", "Brazil", "Argentina",
    "Chile", "Colombia", "Peru", "Germany", "France", "Spain", "Portugal", "Italy", "Netherlands",
    "Belgium", "Switzerland", "Austria", "Sweden", "Norway", "Denmark", "Finland", "Ireland",
    "Poland", "Ukraine", "Romania", "Greece", "Turkey", "Israel", "Egypt", "Nigeria", "Kenya",
    "Ghana", "Qatar", "Russia", "London", "Manchester", "Edinburgh", "Dublin", "Paris", "Berlin",
    "Munich", "Hamburg", "Amsterdam", "Rotterdam", "Brussels", "Zurich", "Geneva", "Vienna",
    "Stockholm", "Oslo", "Copenhagen", "Helsinki", "Madrid", "Barcelona", "Lisbon", "Rome",
    "Milan", "Warsaw", "Prague", "Budapest", "Athens", "Istanbul", "Moscow", "Kyiv", "Dubai",
    "Riyadh", "Doha", "Cairo", "Lagos", "Nairobi", "Johannesburg", "Toronto", "Vancouver",
    "Montreal", "Ottawa", "Seattle", "Boston", "Chicago", "Austin", "Dallas", "Houston", "Denver",
    "Atlanta", "Miami", "Philadelphia", "Washington", "Portland", "Phoenix", "California", "Texas",
    "Florida", "Illinois", "Massachusetts", "Virginia", "Georgia", "Ohio", "Michigan", "Oregon",
    "Colorado", "Arizona", "Mumbai", "Delhi", "Bangalore", "Bengaluru", "Hyderabad", "Chennai",
    "Kolkata", "Pune", "Ahmedabad", "Jaipur", "Noida", "Gurgaon", "Gurugram", "Karachi", "Lahore",
    "Islamabad", "Dhaka", "Kathmandu", "Colombo", "Beijing", "Shanghai", "Shenzhen", "Tokyo",
    "Osaka", "Seoul", "Taipei", "Bangkok", "Jakarta", "Manila", "Hanoi", "Sydney", "Melbourne",
    "Brisbane", "Perth", "Auckland", "Wellington",
];

static GAZETTEER_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    let names: Vec<String> = GAZETTEER.iter().map(|n| regex::escape(n)).collect();
    Regex::new(&format!(r"\b(?:{})\b", names.join("|"))).expect("gazetteer regex is valid")
});

// ────────────────────────────────────────────────────────────────────────────
// Data types
// ────────────────────────────────────────────────────────────────────────────

/// Raw recognizer output for one document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecognizedEntities {
    #[serde(default)]
    pub locations: Vec<String>,
    #[serde(default)]
    pub entities: Vec<String>,
}

/// Unordered lookup set of terms that are not grammar mistakes.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EntitySet(HashSet<String>);

impl EntitySet {
    pub fn contains(&self, term: &str) -> bool {
        self.0.contains(term.trim())
    }

    pub fn insert(&mut self, term: &str) {
        let term = term.trim();
        if !term.is_empty() {
            self.0.insert(term.to_string());
        }
    }
}

/// Entity extractor output.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Entities {
    pub locations: Vec<String>,
    pub special_terms: EntitySet,
}

impl Entities {
    /// First recognized location, or "" when none.
    pub fn location(&self) -> &str {
        self.locations.first().map(String::as_str).unwrap_or("")
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Recognizer trait and backends
// ────────────────────────────────────────────────────────────────────────────

/// Named-entity recognizer. Implement this to swap backends without touching
/// the pipeline. Carried in `AppState` as `Arc<dyn EntityRecognizer>`.
#[async_trait]
pub trait EntityRecognizer: Send + Sync {
    async fn recognize(&self, text: &str) -> Result<RecognizedEntities, ExtractionError>;

    fn backend(&self) -> &'static str;
}

/// Gazetteer and capitalisation based recognizer. Deterministic, no model.
pub struct HeuristicRecognizer;

#[async_trait]
impl EntityRecognizer for HeuristicRecognizer {
    async fn recognize(&self, text: &str) -> Result<RecognizedEntities, ExtractionError> {
        Ok(recognize_heuristically(text))
    }

    fn backend(&self) -> &'static str {
        "heuristic"
    }
}

fn recognize_heuristically(text: &str) -> RecognizedEntities {
    let mut locations: Vec<String> = Vec::new();
    for m in GAZETTEER_PATTERN.find_iter(text) {
        let name = m.as_str().to_string();
        if !locations.contains(&name) {
            locations.push(name);
        }
    }

    let entities = PROPER_NOUN_SPAN
        .find_iter(text)
        .map(|m| m.as_str().to_string())
        .collect();

    RecognizedEntities {
        locations,
        entities,
    }
}

/// LLM-backed recognizer using the shared model-server client.
pub struct OllamaRecognizer {
    llm: LlmClient,
    model: String,
}

impl OllamaRecognizer {
    /// Verifies the model is installed (installing it once if needed).
    pub async fn load(llm: LlmClient, model: impl Into<String>) -> Result<Self, ExtractionError> {
        let model = model.into();
        llm.ensure_model(&model)
            .await
            .map_err(|e| ExtractionError::ModelUnavailable(format!("recognizer model '{model}': {e}")))?;
        Ok(Self { llm, model })
    }
}

#[async_trait]
impl EntityRecognizer for OllamaRecognizer {
    async fn recognize(&self, text: &str) -> Result<RecognizedEntities, ExtractionError> {
        let excerpt: String = text.chars().take(MAX_PROMPT_CHARS).collect();
        let prompt = NER_PROMPT_TEMPLATE
            .replace("{text}", &excerpt)
            .replace("{verbatim}", VERBATIM_INSTRUCTION.trim());

        let system = format!("{NER_SYSTEM} {JSON_ONLY_SYSTEM}");

        let recognized: RecognizedEntities = self
            .llm
            .call_json(&self.model, &prompt, &system)
            .await
            .map_err(|e| ExtractionError::Internal(anyhow::anyhow!("entity recognition failed: {e}")))?;

        // The model occasionally paraphrases; keep only spans present in the text.
        Ok(RecognizedEntities {
            locations: retain_verbatim(recognized.locations, text),
            entities: retain_verbatim(recognized.entities, text),
        })
    }

    fn backend(&self) -> &'static str {
        "ollama"
    }
}

fn retain_verbatim(spans: Vec<String>, text: &str) -> Vec<String> {
    spans
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty() && text.contains(s.as_str()))
        .collect()
}

// ────────────────────────────────────────────────────────────────────────────
// Extraction
// ────────────────────────────────────────────────────────────────────────────

/// Runs the recognizer once over the full text and builds the entity set.
///
/// A recognizer error or timeout degrades to "no recognized entities": the
/// location becomes "" and the entity set holds acronyms only.
pub async fn extract_entities(
    text: &str,
    recognizer: &dyn EntityRecognizer,
    timeout: Duration,
) -> Entities {
    let recognized = match tokio::time::timeout(timeout, recognizer.recognize(text)).await {
        Ok(Ok(recognized)) => recognized,
        Ok(Err(e)) => {
            warn!(backend = recognizer.backend(), "Entity recognition failed: {e}");
            RecognizedEntities::default()
        }
        Err(_) => {
            warn!(
                backend = recognizer.backend(),
                timeout_secs = timeout.as_secs(),
                "Entity recognition timed out"
            );
            RecognizedEntities::default()
        }
    };

    let special_terms = build_entity_set(text, &recognized);
    debug!(
        locations = recognized.locations.len(),
        special_terms = special_terms.0.len(),
        "Entities extracted"
    );

    Entities {
        locations: recognized.locations,
        special_terms,
    }
}

/// Acronyms in the text plus every recognized span and each word of it.
pub fn build_entity_set(text: &str, recognized: &RecognizedEntities) -> EntitySet {
    let mut set = EntitySet::default();

    for m in ACRONYM.find_iter(text) {
        set.insert(m.as_str());
    }
    for span in recognized.locations.iter().chain(&recognized.entities) {
        set.insert(span);
        for word in span.split_whitespace() {
            set.insert(word);
        }
    }

    set
}
