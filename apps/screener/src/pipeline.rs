//! End-to-end extraction: document in, feature vector and report out.
//!
//! Stages run strictly in sequence against the shared handles in `AppState`.
//! Only an unreadable document, an empty job description or a broken encoder
//! aborts the run; every other stage degrades to its documented default.

use std::io::Write;
use std::path::Path;

use chrono::NaiveDate;
use serde::Serialize;
use tracing::{debug, info};

use crate::classifier::Prediction;
use crate::document::reader::DocumentFormat;
use crate::document::{read_document, ResumeDocument};
use crate::errors::ExtractionError;
use crate::extraction::contact::{find_email, find_phone, has_extracurricular, EducationLevel};
use crate::extraction::dates::summarize_experience;
use crate::extraction::entities::extract_entities;
use crate::extraction::grammar::grammatical_mistakes;
use crate::extraction::sections::{segment, SectionKind, Sections};
use crate::features::report::{build_report, Report};
use crate::features::{assemble, BasicInfo, ExtractedParts, FeatureVector, FEATURE_COUNT};
use crate::scoring::score_sections;
use crate::state::AppState;

/// Everything produced for one resume.
#[derive(Debug, Clone, Serialize)]
pub struct ScreeningResult {
    pub basic_info: BasicInfo,
    pub features: FeatureVector,
    /// The feature vector as the classifier consumes it.
    pub classifier_input: [f64; FEATURE_COUNT],
    pub report: Report,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prediction: Option<Prediction>,
}

/// Screens a resume stored on disk.
pub async fn screen_file(
    state: &AppState,
    path: &Path,
    job_description: &str,
    today: NaiveDate,
) -> Result<ScreeningResult, ExtractionError> {
    validate_job_description(job_description)?;
    let document = read_document(path)?;
    screen_document(state, &document, job_description, today).await
}

/// Screens uploaded bytes. They are spooled to a temporary file that is
/// removed when this function returns, whatever the outcome.
pub async fn screen_upload(
    state: &AppState,
    bytes: &[u8],
    format: DocumentFormat,
    job_description: &str,
    today: NaiveDate,
) -> Result<ScreeningResult, ExtractionError> {
    validate_job_description(job_description)?;

    let mut spool = tempfile::Builder::new()
        .prefix("resume-")
        .suffix(format.suffix())
        .tempfile()?;
    spool.write_all(bytes)?;
    spool.flush()?;
    debug!(path = %spool.path().display(), bytes = bytes.len(), "Upload spooled");

    let document = read_document(spool.path())?;
    screen_document(state, &document, job_description, today).await
}

/// Runs every extractor over an already-read document.
pub async fn screen_document(
    state: &AppState,
    document: &ResumeDocument,
    job_description: &str,
    today: NaiveDate,
) -> Result<ScreeningResult, ExtractionError> {
    validate_job_description(job_description)?;
    let text = document.full_text();
    let timeout = state.config.model_timeout;

    let sections = segment(text);
    for kind in SectionKind::ALL {
        let section = sections.get(kind);
        debug!(section = kind.as_str(), found = section.found, chars = section.text.len(), "Section segmented");
    }

    let experience = summarize_experience(experience_span(text, &sections), today);
    for run in &experience.duration.runs {
        debug!(start = %run.start(), end = %run.end(), months = run.months(), "Employment run");
    }
    debug!(
        runs = experience.duration.runs.len(),
        months = experience.duration.total_months,
        internships = experience.internships,
        "Experience merged"
    );

    let entities = extract_entities(text, state.recognizer.as_ref(), timeout).await;

    let scores = score_sections(job_description, &sections, state.encoder.as_ref()).await?;

    let mistakes = grammatical_mistakes(
        text,
        state.grammar.as_deref(),
        &entities.special_terms,
        timeout,
    )
    .await;

    let parts = ExtractedParts {
        document,
        email: find_email(text),
        phone_number: find_phone(text),
        location: entities.location().to_string(),
        education_level: EducationLevel::detect(text),
        experience,
        scores,
        extracurricular: has_extracurricular(text),
        grammatical_mistakes: mistakes,
    };
    let (basic_info, features) = assemble(parts, &state.config.weights);
    let report = build_report(&basic_info, &features);

    let prediction = match &state.classifier {
        Some(classifier) => Some(classifier.predict(&features)?),
        None => None,
    };

    info!(
        pages = features.number_of_pages,
        words = features.number_of_words,
        experience_years = features.experience_years,
        label = ?prediction.as_ref().map(|p| p.label),
        "Resume screened"
    );

    Ok(ScreeningResult {
        basic_info,
        classifier_input: features.to_array(),
        features,
        report,
        prediction,
    })
}

/// Renders a result as JSON, keeping the feature vector in classifier order.
pub fn render(result: &ScreeningResult, pretty: bool) -> serde_json::Result<String> {
    if pretty {
        serde_json::to_string_pretty(result)
    } else {
        serde_json::to_string(result)
    }
}

/// Dates are read from the experience section, or from the whole text when
/// the document has no experience heading.
fn experience_span<'a>(full_text: &'a str, sections: &'a Sections) -> &'a str {
    if sections.experience.found {
        &sections.experience.text
    } else {
        full_text
    }
}

fn validate_job_description(job_description: &str) -> Result<(), ExtractionError> {
    if job_description.trim().is_empty() {
        return Err(ExtractionError::Validation(
            "job description cannot be empty".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::{Label, LinearClassifier};
    use crate::config::Config;
    use crate::features::{FeatureName, FIELD_ORDER};
    use std::sync::Arc;

    const JD: &str = "Backend engineer with Rust, PostgreSQL and Kubernetes experience";

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 15).unwrap()
    }

    fn state() -> AppState {
        AppState::offline(Config::for_tests())
    }

    fn doc(text: &str) -> ResumeDocument {
        ResumeDocument::from_pages(vec![text.to_string()], vec![])
    }

    #[tokio::test]
    async fn test_two_runs_and_no_internships() {
        let text = "Jane Doe\njane@example.com\nBerlin, Germany\n\
            EXPERIENCE\nAcme Corp Jan 2019 - Dec 2021\nGlobex Jun 2022 - Present\n\
            EDUCATION\nMaster of Science\n\
            SKILLS\nRust, PostgreSQL, Kubernetes";
        let result = screen_document(&state(), &doc(text), JD, today()).await.unwrap();

        // 35 months (Jan 2019 to Dec 2021) plus 24 months (Jun 2022 to Jun 2024)
        assert_eq!(result.features.experience_years, 4.92);
        assert_eq!(result.features.internships, 0);
        assert_eq!(result.basic_info.location, "Berlin");
        assert_eq!(result.basic_info.email, "jane@example.com");
        assert_eq!(result.features.education_level.ordinal(), 2);
        assert!(result.features.communication);
    }

    #[tokio::test]
    async fn test_overlapping_bare_years_merge() {
        let text = "EXPERIENCE\nFoo Inc 2018-2020\nBar LLC 2019-2021\nSKILLS\nGo";
        let result = screen_document(&state(), &doc(text), JD, today()).await.unwrap();
        assert_eq!(result.features.experience_years, 3.0);
    }

    #[tokio::test]
    async fn test_no_headings_still_produces_full_vector() {
        let text = "A short note without any recognizable headings or dates.";
        let result = screen_document(&state(), &doc(text), JD, today()).await.unwrap();

        let features = &result.features;
        assert_eq!(features.education_level, EducationLevel::NotFound);
        assert_eq!(features.education_level.ordinal(), 3);
        assert_eq!(features.experience_years, 0.0);
        assert_eq!(features.skills_score, 0.0);
        assert_eq!(features.certifications_score, 0.0);
        assert!((-2.0..=2.0).contains(&features.experience_score));
        assert!((-2.0..=2.0).contains(&features.education_score));
        assert_eq!(features.grammatical_mistakes, 0.0);
        assert!(!features.communication);
        assert_eq!(result.basic_info.location, "");
        assert!(result.prediction.is_none());
    }

    #[tokio::test]
    async fn test_vector_has_fourteen_fields_in_order() {
        let text = "EXPERIENCE\nIntern at Initech 2022 - 2023\nSKILLS\nRust";
        let result = screen_document(&state(), &doc(text), JD, today()).await.unwrap();

        let fields = result.features.fields();
        assert_eq!(fields.len(), FEATURE_COUNT);
        let names: Vec<FeatureName> = fields.iter().map(|(name, _)| *name).collect();
        assert_eq!(names, FIELD_ORDER.to_vec());
        assert_eq!(names[0].as_str(), "Number_of_Pages");
        assert_eq!(names[13].as_str(), "Communication");
        assert_eq!(result.features.internships, 1);
    }

    #[tokio::test]
    async fn test_rendered_output_keeps_classifier_order() {
        let text = "jane@example.com\nEXPERIENCE\nAcme 2020 - 2022\nSKILLS\nRust";
        let result = screen_document(&state(), &doc(text), JD, today()).await.unwrap();

        for pretty in [false, true] {
            let rendered = render(&result, pretty).unwrap();
            let features_at = rendered.find("\"features\"").unwrap();
            let input_at = rendered.find("\"classifier_input\"").unwrap();
            let block = &rendered[features_at..input_at];

            let positions: Vec<usize> = FIELD_ORDER
                .iter()
                .map(|name| block.find(&format!("\"{}\"", name.as_str())).unwrap())
                .collect();
            assert!(positions.windows(2).all(|w| w[0] < w[1]), "features out of order: {block}");
        }

        let parsed: serde_json::Value = serde_json::from_str(&render(&result, false).unwrap()).unwrap();
        let input: Vec<f64> = serde_json::from_value(parsed["classifier_input"].clone()).unwrap();
        assert_eq!(input, result.features.to_array().to_vec());
        assert_eq!(input[0], 1.0);
        assert_eq!(input[6], 2.0);
        assert_eq!(input[13], 1.0);
    }

    #[tokio::test]
    async fn test_empty_job_description_is_rejected() {
        let err = screen_document(&state(), &doc("EXPERIENCE"), "   ", today())
            .await
            .unwrap_err();
        assert!(matches!(err, ExtractionError::Validation(_)));
        assert!(err.is_input_error());
    }

    #[tokio::test]
    async fn test_upload_is_read_and_spool_removed() {
        let bytes = b"SKILLS\nRust PostgreSQL Kubernetes\x0cEXPERIENCE\nAcme 2020 - 2022";
        let result = screen_upload(&state(), bytes, DocumentFormat::PlainText, JD, today())
            .await
            .unwrap();
        assert_eq!(result.features.number_of_pages, 2);
        assert_eq!(result.features.experience_years, 2.0);
    }

    #[tokio::test]
    async fn test_unreadable_upload_is_document_error() {
        let err = screen_upload(&state(), b"not a pdf", DocumentFormat::Pdf, JD, today())
            .await
            .unwrap_err();
        assert!(matches!(err, ExtractionError::DocumentRead(_)));
    }

    #[tokio::test]
    async fn test_classifier_prediction_attached() {
        let mut weights = [0.0; FEATURE_COUNT];
        weights[13] = 10.0;
        let mut state = state();
        state.classifier = Some(Arc::new(LinearClassifier::new(weights, -5.0, 0.5)));

        let text = "jane@example.com\nSKILLS\nRust";
        let result = screen_document(&state, &doc(text), JD, today()).await.unwrap();
        let prediction = result.prediction.unwrap();
        assert_eq!(prediction.label, Label::Shortlisted);
        assert_eq!(prediction.class, 1);
    }
}
