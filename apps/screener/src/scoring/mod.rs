// Semantic Scorer
// Embeds the job description together with the four resume sections and
// scores each section by cosine similarity to the job description.

pub mod encoder;

use serde::Serialize;
use tracing::debug;

use crate::errors::ExtractionError;
use crate::extraction::sections::Sections;
use encoder::TextEncoder;

/// Raw section similarities, each rounded to 3 dp and within [-1, 1].
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct SemanticScores {
    pub skills: f64,
    pub certifications: f64,
    pub experience: f64,
    pub education: f64,
}

/// Scores every section against the job description in a single encoder batch.
///
/// Empty and "Not found" sections are still encoded and always get a score.
pub async fn score_sections(
    job_description: &str,
    sections: &Sections,
    encoder: &dyn TextEncoder,
) -> Result<SemanticScores, ExtractionError> {
    let batch = vec![
        job_description.to_string(),
        sections.skills.text.clone(),
        sections.certifications.text.clone(),
        sections.experience.text.clone(),
        sections.education.text.clone(),
    ];

    let vectors = encoder.encode(&batch).await?;
    let [jd, skills, certifications, experience, education] =
        <[Vec<f32>; 5]>::try_from(vectors).map_err(|v| {
            ExtractionError::Encoder(format!("expected 5 embeddings, got {}", v.len()))
        })?;

    let scores = SemanticScores {
        skills: similarity(&skills, &jd),
        certifications: similarity(&certifications, &jd),
        experience: similarity(&experience, &jd),
        education: similarity(&education, &jd),
    };
    debug!(backend = encoder.backend(), ?scores, "Sections scored");
    Ok(scores)
}

fn similarity(a: &[f32], b: &[f32]) -> f64 {
    round3(cosine_similarity(a, b))
}

/// Cosine similarity clamped to [-1, 1]. A zero-norm or mismatched vector scores 0.0.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot: f64 = a.iter().zip(b).map(|(x, y)| f64::from(*x) * f64::from(*y)).sum();
    let norm_a: f64 = a.iter().map(|x| f64::from(*x).powi(2)).sum::<f64>().sqrt();
    let norm_b: f64 = b.iter().map(|x| f64::from(*x).powi(2)).sum::<f64>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    (dot / (norm_a * norm_b)).clamp(-1.0, 1.0)
}

pub fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}
