//! Shortlisting classifier. Consumes the 14-field vector and nothing else.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::errors::ExtractionError;
use crate::features::{FeatureVector, FEATURE_COUNT};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Label {
    Shortlisted,
    Rejected,
}

impl Label {
    pub fn code(&self) -> u8 {
        match self {
            Label::Shortlisted => 1,
            Label::Rejected => 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Prediction {
    pub label: Label,
    /// Numeric label: 1 shortlisted, 0 rejected.
    pub class: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub probability: Option<f64>,
}

pub trait Classifier: Send + Sync {
    fn predict(&self, features: &FeatureVector) -> Result<Prediction, ExtractionError>;
}

/// Logistic model described in JSON:
/// `{"weights": [14 numbers], "bias": number, "threshold": number}`.
#[derive(Debug, Clone, Deserialize)]
pub struct LinearClassifier {
    weights: Vec<f64>,
    #[serde(default)]
    bias: f64,
    #[serde(default = "default_threshold")]
    threshold: f64,
}

fn default_threshold() -> f64 {
    0.5
}

impl LinearClassifier {
    #[cfg(test)]
    pub fn new(weights: [f64; FEATURE_COUNT], bias: f64, threshold: f64) -> Self {
        Self {
            weights: weights.to_vec(),
            bias,
            threshold,
        }
    }

    pub fn from_json(json: &str) -> Result<Self, ExtractionError> {
        let model: LinearClassifier = serde_json::from_str(json)
            .map_err(|e| ExtractionError::Classifier(format!("invalid model description: {e}")))?;

        if model.weights.len() != FEATURE_COUNT {
            return Err(ExtractionError::Classifier(format!(
                "model expects {} features, the feature vector has {FEATURE_COUNT}",
                model.weights.len()
            )));
        }
        if !(0.0..=1.0).contains(&model.threshold) {
            return Err(ExtractionError::Classifier(format!(
                "threshold {} is outside [0, 1]",
                model.threshold
            )));
        }
        Ok(model)
    }

    pub fn load(path: &Path) -> Result<Self, ExtractionError> {
        let json = std::fs::read_to_string(path).map_err(|e| {
            ExtractionError::Classifier(format!("cannot read '{}': {e}", path.display()))
        })?;
        let model = Self::from_json(&json)?;
        info!("Classifier loaded from {}", path.display());
        Ok(model)
    }
}

impl Classifier for LinearClassifier {
    fn predict(&self, features: &FeatureVector) -> Result<Prediction, ExtractionError> {
        let x = features.to_array();
        let z: f64 = self.weights.iter().zip(x.iter()).map(|(w, v)| w * v).sum::<f64>() + self.bias;
        let probability = 1.0 / (1.0 + (-z).exp());

        if !probability.is_finite() {
            return Err(ExtractionError::Classifier("non-finite score".to_string()));
        }

        let label = if probability >= self.threshold {
            Label::Shortlisted
        } else {
            Label::Rejected
        };
        Ok(Prediction {
            label,
            class: label.code(),
            probability: Some(probability),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extraction::contact::EducationLevel;

    fn features(skills: f64) -> FeatureVector {
        FeatureVector {
            number_of_pages: 1,
            number_of_words: 400,
            linkedin: false,
            education_level: EducationLevel::Bachelors,
            skills_score: skills,
            education_score: 0.0,
            experience_years: 0.0,
            experience_score: 0.0,
            certifications_score: 0.0,
            industry_relevance_score: 0.0,
            extracurricular: false,
            grammatical_mistakes: 0.0,
            internships: 0,
            communication: false,
        }
    }

    fn skills_only() -> LinearClassifier {
        let mut weights = [0.0; FEATURE_COUNT];
        weights[4] = 4.0;
        LinearClassifier::new(weights, -2.0, 0.5)
    }

    #[test]
    fn test_predicts_by_weighted_features() {
        let model = skills_only();
        let high = model.predict(&features(1.5)).unwrap();
        assert_eq!(high.label, Label::Shortlisted);
        assert_eq!(high.class, 1);

        let low = model.predict(&features(0.1)).unwrap();
        assert_eq!(low.label, Label::Rejected);
        assert_eq!(low.class, 0);
        assert!(low.probability.unwrap() < 0.5);

        let json = serde_json::to_string(&low).unwrap();
        assert!(json.starts_with(r#"{"label":"Rejected","class":0,"probability":"#));
    }

    #[test]
    fn test_from_json_rejects_wrong_width() {
        let err = LinearClassifier::from_json(r#"{"weights": [1.0, 2.0], "bias": 0.0}"#).unwrap_err();
        assert!(matches!(err, ExtractionError::Classifier(msg) if msg.contains("14")));
    }

    #[test]
    fn test_from_json_defaults_threshold() {
        let json = format!(r#"{{"weights": {:?}}}"#, vec![0.0; FEATURE_COUNT]);
        let model = LinearClassifier::from_json(&json).unwrap();
        let prediction = model.predict(&features(0.0)).unwrap();
        // sigmoid(0) sits exactly on the default threshold
        assert_eq!(prediction.label, Label::Shortlisted);
    }
}
