// Feature Assembler
// Combines every extractor's output into the fixed, ordered 14-field vector
// the classifier was trained on.

pub mod report;

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

use crate::document::{ResumeDocument, LINK_NOT_FOUND};
use crate::extraction::contact::EducationLevel;
use crate::extraction::dates::ExperienceSummary;
use crate::scoring::{round3, SemanticScores};

/// Multipliers applied to the raw section similarities.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreWeights {
    pub skills: f64,
    pub education: f64,
    pub experience: f64,
    pub certifications: f64,
    pub industry: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            skills: 2.0,
            education: 2.0,
            experience: 2.0,
            certifications: 1.0,
            industry: 2.0,
        }
    }
}

/// Classifier input fields, in classifier order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FeatureName {
    NumberOfPages,
    NumberOfWords,
    LinkedIn,
    EducationLevel,
    SkillsScore,
    EducationScore,
    ExperienceYears,
    ExperienceScore,
    CertificationsScore,
    IndustryRelevanceScore,
    ExtracurricularActivities,
    GrammaticalMistakesCount,
    InternshipsCount,
    Communication,
}

pub const FEATURE_COUNT: usize = 14;

pub const FIELD_ORDER: [FeatureName; FEATURE_COUNT] = [
    FeatureName::NumberOfPages,
    FeatureName::NumberOfWords,
    FeatureName::LinkedIn,
    FeatureName::EducationLevel,
    FeatureName::SkillsScore,
    FeatureName::EducationScore,
    FeatureName::ExperienceYears,
    FeatureName::ExperienceScore,
    FeatureName::CertificationsScore,
    FeatureName::IndustryRelevanceScore,
    FeatureName::ExtracurricularActivities,
    FeatureName::GrammaticalMistakesCount,
    FeatureName::InternshipsCount,
    FeatureName::Communication,
];

impl FeatureName {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeatureName::NumberOfPages => "Number_of_Pages",
            FeatureName::NumberOfWords => "Number_of_Words",
            FeatureName::LinkedIn => "LinkedIn",
            FeatureName::EducationLevel => "Education_Level",
            FeatureName::SkillsScore => "Skills_Score",
            FeatureName::EducationScore => "Education_Score",
            FeatureName::ExperienceYears => "Experience_Years",
            FeatureName::ExperienceScore => "Experience_Score",
            FeatureName::CertificationsScore => "Certifications_Score",
            FeatureName::IndustryRelevanceScore => "Industry_Relevance_Score",
            FeatureName::ExtracurricularActivities => "Extracurricular_Activities",
            FeatureName::GrammaticalMistakesCount => "Grammatical_Mistakes_Count",
            FeatureName::InternshipsCount => "Internships_Count",
            FeatureName::Communication => "Communication",
        }
    }
}

/// A single field's value, tagged by kind.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FeatureValue {
    Count(u64),
    Score(f64),
    Flag(bool),
    Ordinal(u8),
}

impl FeatureValue {
    /// Numeric encoding the classifier consumes. Flags become 0/1.
    pub fn as_f64(&self) -> f64 {
        match self {
            FeatureValue::Count(n) => *n as f64,
            FeatureValue::Score(x) => *x,
            FeatureValue::Flag(b) => f64::from(u8::from(*b)),
            FeatureValue::Ordinal(o) => f64::from(*o),
        }
    }
}

impl Serialize for FeatureValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            FeatureValue::Count(n) => serializer.serialize_u64(*n),
            FeatureValue::Score(x) => serializer.serialize_f64(*x),
            FeatureValue::Flag(b) => serializer.serialize_u8(u8::from(*b)),
            FeatureValue::Ordinal(o) => serializer.serialize_u8(*o),
        }
    }
}

/// The classifier input.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector {
    pub number_of_pages: u64,
    pub number_of_words: u64,
    pub linkedin: bool,
    pub education_level: EducationLevel,
    pub skills_score: f64,
    pub education_score: f64,
    pub experience_years: f64,
    pub experience_score: f64,
    pub certifications_score: f64,
    pub industry_relevance_score: f64,
    pub extracurricular: bool,
    pub grammatical_mistakes: f64,
    pub internships: u64,
    pub communication: bool,
}

/// Serializes as a map keyed by the classifier's field names, in classifier order.
impl Serialize for FeatureVector {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(FEATURE_COUNT))?;
        for (name, value) in self.fields() {
            map.serialize_entry(name.as_str(), &value)?;
        }
        map.end()
    }
}

impl FeatureVector {
    pub fn get(&self, name: FeatureName) -> FeatureValue {
        match name {
            FeatureName::NumberOfPages => FeatureValue::Count(self.number_of_pages),
            FeatureName::NumberOfWords => FeatureValue::Count(self.number_of_words),
            FeatureName::LinkedIn => FeatureValue::Flag(self.linkedin),
            FeatureName::EducationLevel => FeatureValue::Ordinal(self.education_level.ordinal()),
            FeatureName::SkillsScore => FeatureValue::Score(self.skills_score),
            FeatureName::EducationScore => FeatureValue::Score(self.education_score),
            FeatureName::ExperienceYears => FeatureValue::Score(self.experience_years),
            FeatureName::ExperienceScore => FeatureValue::Score(self.experience_score),
            FeatureName::CertificationsScore => FeatureValue::Score(self.certifications_score),
            FeatureName::IndustryRelevanceScore => {
                FeatureValue::Score(self.industry_relevance_score)
            }
            FeatureName::ExtracurricularActivities => FeatureValue::Flag(self.extracurricular),
            FeatureName::GrammaticalMistakesCount => FeatureValue::Score(self.grammatical_mistakes),
            FeatureName::InternshipsCount => FeatureValue::Count(self.internships),
            FeatureName::Communication => FeatureValue::Flag(self.communication),
        }
    }

    /// Every field, named and tagged, in classifier order.
    pub fn fields(&self) -> [(FeatureName, FeatureValue); FEATURE_COUNT] {
        FIELD_ORDER.map(|name| (name, self.get(name)))
    }

    /// Numeric classifier input.
    pub fn to_array(&self) -> [f64; FEATURE_COUNT] {
        FIELD_ORDER.map(|name| self.get(name).as_f64())
    }
}

/// Raw attributes kept for the report alongside the feature vector.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BasicInfo {
    #[serde(rename = "Email")]
    pub email: String,
    #[serde(rename = "Phone_Number")]
    pub phone_number: String,
    #[serde(rename = "Location")]
    pub location: String,
    /// Profile URL, or "Not found".
    #[serde(rename = "LinkedIn")]
    pub linkedin: String,
    #[serde(rename = "Number_of_Pages")]
    pub number_of_pages: u64,
    #[serde(rename = "Number_of_Words")]
    pub number_of_words: u64,
}

impl BasicInfo {
    pub fn has_linkedin(&self) -> bool {
        self.linkedin != LINK_NOT_FOUND
    }
}

/// Everything the extractors produced for one resume.
pub struct ExtractedParts<'a> {
    pub document: &'a ResumeDocument,
    pub email: String,
    pub phone_number: String,
    pub location: String,
    pub education_level: EducationLevel,
    pub experience: ExperienceSummary,
    pub scores: SemanticScores,
    pub extracurricular: bool,
    pub grammatical_mistakes: f64,
}

/// Builds the raw attributes and the weighted feature vector.
pub fn assemble(parts: ExtractedParts<'_>, weights: &ScoreWeights) -> (BasicInfo, FeatureVector) {
    let scores = parts.scores;
    let industry = round3((scores.skills + scores.experience) / 2.0);

    let info = BasicInfo {
        linkedin: parts
            .document
            .linkedin_url()
            .map(str::to_string)
            .unwrap_or_else(|| LINK_NOT_FOUND.to_string()),
        number_of_pages: parts.document.page_count() as u64,
        number_of_words: parts.document.word_count() as u64,
        email: parts.email,
        phone_number: parts.phone_number,
        location: parts.location,
    };

    let features = FeatureVector {
        number_of_pages: info.number_of_pages,
        number_of_words: info.number_of_words,
        linkedin: info.has_linkedin(),
        education_level: parts.education_level,
        skills_score: weighted(scores.skills, weights.skills),
        education_score: weighted(scores.education, weights.education),
        experience_years: parts.experience.duration.years(),
        experience_score: weighted(scores.experience, weights.experience),
        certifications_score: weighted(scores.certifications, weights.certifications),
        industry_relevance_score: weighted(industry, weights.industry),
        extracurricular: parts.extracurricular,
        grammatical_mistakes: parts.grammatical_mistakes,
        internships: u64::from(parts.experience.internships),
        communication: !info.email.is_empty() || !info.phone_number.is_empty(),
    };

    (info, features)
}

fn weighted(score: f64, weight: f64) -> f64 {
    round3(score * weight)
}
