//! Regex heuristics over the full text: contact details, education level,
//! extracurricular activity.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

static EMAIL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b[\w.-]+?@\w+?\.\w+?\b").expect("email regex is valid"));

static PHONE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\+?\d{1,3}\s?)?(\d{2,4}[\s-]?){2,5}\d{2,4}").expect("phone regex is valid")
});

static EXTRACURRICULAR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)extracurricular|volunteer").expect("extracurricular regex is valid")
});

static DOCTORATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)Ph\.?D|Doctorate").expect("doctorate regex is valid"));

static MASTERS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)Master").expect("masters regex is valid"));

static BACHELORS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)B\.E\.|B\.Sc\.|Bachelor").expect("bachelors regex is valid")
});

/// First email address in the text, or "".
pub fn find_email(text: &str) -> String {
    EMAIL
        .find(text)
        .map(|m| m.as_str().trim().to_string())
        .unwrap_or_default()
}

/// First phone-number-like digit run in the text, or "".
pub fn find_phone(text: &str) -> String {
    PHONE
        .find(text)
        .map(|m| m.as_str().trim().to_string())
        .unwrap_or_default()
}

pub fn has_extracurricular(text: &str) -> bool {
    EXTRACURRICULAR.is_match(text)
}

/// Highest degree mentioned anywhere in the text.
///
/// `NotFound` is a tier of its own; it only shares the classifier ordinal
/// with `Doctorate`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EducationLevel {
    Bachelors,
    Masters,
    Doctorate,
    NotFound,
}

impl EducationLevel {
    /// Searched from highest to lowest; the first hit wins.
    pub fn detect(text: &str) -> Self {
        if DOCTORATE.is_match(text) {
            EducationLevel::Doctorate
        } else if MASTERS.is_match(text) {
            EducationLevel::Masters
        } else if BACHELORS.is_match(text) {
            EducationLevel::Bachelors
        } else {
            EducationLevel::NotFound
        }
    }

    /// Ordinal code seen by the classifier.
    pub fn ordinal(&self) -> u8 {
        match self {
            EducationLevel::Bachelors => 1,
            EducationLevel::Masters => 2,
            EducationLevel::Doctorate | EducationLevel::NotFound => 3,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            EducationLevel::Bachelors => "Bachelor's",
            EducationLevel::Masters => "Master's",
            EducationLevel::Doctorate => "PhD",
            EducationLevel::NotFound => "Not Found",
        }
    }
}
