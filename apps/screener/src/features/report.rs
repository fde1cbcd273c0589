//! Human-readable report: one row per raw attribute with a display value and
//! a favorable / neutral / unfavorable tier, plus radar chart data.

use serde::Serialize;

use crate::extraction::contact::EducationLevel;
use crate::features::{BasicInfo, FeatureVector};

/// Three-way display tier for one attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Favorable,
    Neutral,
    Unfavorable,
}

/// Signed importance and expected (min, max) range per classifier field.
const IMPORTANCE: &[(&str, f64, (f64, f64))] = &[
    ("Number_of_Pages", 0.05188, (1.0, 5.0)),
    ("Number_of_Words", 0.01176, (100.0, 1500.0)),
    ("LinkedIn", 0.06124, (0.0, 1.0)),
    ("Education_Level", 0.01048, (1.0, 3.0)),
    ("Skills_Score", 0.10336, (0.0, 1.0)),
    ("Education_Score", 0.04881, (0.0, 1.0)),
    ("Experience_Years", 0.03310, (0.0, 10.0)),
    ("Experience_Score", 0.09428, (0.0, 1.0)),
    ("Certifications_Score", 0.05575, (0.0, 1.0)),
    ("Industry_Relevance_Score", 0.06007, (0.0, 1.0)),
    ("Extracurricular_Activities", 0.07473, (0.0, 1.0)),
    ("Grammatical_Mistakes_Count", -0.20627, (0.0, 5.0)),
    ("Internships_Count", 0.04534, (0.0, 5.0)),
    ("Communication", 0.14291, (0.0, 1.0)),
];

fn importance_of(key: &str) -> (f64, (f64, f64)) {
    IMPORTANCE
        .iter()
        .find(|(name, _, _)| *name == key)
        .map(|(_, importance, scale)| (*importance, *scale))
        .unwrap_or((0.0, (0.0, 1.0)))
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportRow {
    pub feature: String,
    pub value: String,
    pub tier: Tier,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Radar {
    pub labels: [&'static str; 5],
    pub data: [f64; 5],
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub features: Vec<ReportRow>,
    pub radar: Radar,
}

/// A raw attribute as it enters tiering.
enum Raw<'a> {
    Text(&'a str),
    Number(f64),
    Presence(bool),
}

pub fn build_report(info: &BasicInfo, features: &FeatureVector) -> Report {
    let years = features.experience_years;
    let linkedin = if info.has_linkedin() { info.linkedin.as_str() } else { "" };

    let attributes: Vec<(&str, Raw<'_>, String)> = vec![
        ("Email", Raw::Text(&info.email), text_display(&info.email)),
        ("Phone_Number", Raw::Text(&info.phone_number), text_display(&info.phone_number)),
        ("Location", Raw::Text(&info.location), text_display(&info.location)),
        ("LinkedIn", Raw::Text(linkedin), text_display(linkedin)),
        (
            "Number_of_Pages",
            Raw::Number(info.number_of_pages as f64),
            info.number_of_pages.to_string(),
        ),
        (
            "Number_of_Words",
            Raw::Number(info.number_of_words as f64),
            info.number_of_words.to_string(),
        ),
        (
            "Education_Level",
            Raw::Number(f64::from(features.education_level.ordinal())),
            education_display(features.education_level),
        ),
        ("Experience_Years", Raw::Number(years), format!("{years}")),
        (
            "Internships_Count",
            Raw::Number(features.internships as f64),
            features.internships.to_string(),
        ),
        score_row("Skills_Score", features.skills_score),
        score_row("Industry_Relevance_Score", features.industry_relevance_score),
        score_row("Education_Score", features.education_score),
        score_row("Certifications_Score", features.certifications_score),
        score_row("Experience_Score", features.experience_score),
        (
            "Extracurricular_Activities",
            Raw::Presence(features.extracurricular),
            yes_no(features.extracurricular),
        ),
        (
            "Grammatical_Mistakes_Count",
            Raw::Number(features.grammatical_mistakes),
            format!("{}", features.grammatical_mistakes),
        ),
        (
            "Communication",
            Raw::Number(f64::from(u8::from(features.communication))),
            yes_no(features.communication),
        ),
    ];

    let rows = attributes
        .into_iter()
        .map(|(key, raw, value)| ReportRow {
            feature: key.replace('_', " "),
            tier: tier_for(key, &raw, years),
            value,
        })
        .collect();

    Report {
        features: rows,
        radar: radar(features),
    }
}

fn score_row(key: &'static str, score: f64) -> (&'static str, Raw<'static>, String) {
    (key, Raw::Number(score), score_display(score))
}

fn tier_for(key: &str, raw: &Raw<'_>, years: f64) -> Tier {
    let value = match raw {
        Raw::Text(text) => return presence_tier(!text.is_empty()),
        Raw::Presence(present) => return presence_tier(*present),
        Raw::Number(value) => *value,
    };

    match key {
        "Education_Level" => Tier::Neutral,
        "Internships_Count" if value >= 1.0 => Tier::Favorable,
        "Number_of_Pages" => {
            if years <= 4.0 && value > 4.0 {
                Tier::Unfavorable
            } else if years >= 5.0 && value <= 3.0 {
                Tier::Favorable
            } else {
                Tier::Neutral
            }
        }
        "Number_of_Words" => {
            if years <= 4.0 && value > 1000.0 {
                Tier::Unfavorable
            } else if years >= 5.0 && (500.0..=1200.0).contains(&value) {
                Tier::Favorable
            } else {
                Tier::Neutral
            }
        }
        _ => {
            let (importance, scale) = importance_of(key);
            scaled_tier(value, importance, scale)
        }
    }
}

fn presence_tier(present: bool) -> Tier {
    if present {
        Tier::Favorable
    } else {
        Tier::Unfavorable
    }
}

/// Position within (min, max); high is good for positive importance, bad for negative.
fn scaled_tier(value: f64, importance: f64, (min, max): (f64, f64)) -> Tier {
    let norm = (value - min) / (max - min);
    let (high, low) = if importance >= 0.0 {
        (Tier::Favorable, Tier::Unfavorable)
    } else {
        (Tier::Unfavorable, Tier::Favorable)
    };

    if norm > 0.7 {
        high
    } else if norm < 0.3 {
        low
    } else {
        Tier::Neutral
    }
}

fn text_display(text: &str) -> String {
    if text.is_empty() {
        "Not Found".to_string()
    } else {
        text.to_string()
    }
}

/// Weighted scores above 1.0 read as "Excellent"; the rest as percentages.
fn score_display(score: f64) -> String {
    if score > 1.0 {
        "Excellent".to_string()
    } else if score >= 0.0 {
        format!("{:.1}%", score * 100.0)
    } else {
        format!("{score}")
    }
}

fn education_display(level: EducationLevel) -> String {
    level.label().to_string()
}

fn yes_no(flag: bool) -> String {
    let text = if flag { "Yes" } else { "No" };
    text.to_string()
}

fn radar(features: &FeatureVector) -> Radar {
    let percent = |score: f64| (score * 1000.0).round() / 10.0;
    Radar {
        labels: ["Skills", "Education", "Experience", "Certifications", "Industry Match"],
        data: [
            percent(features.skills_score),
            percent(features.education_score),
            percent(features.experience_score),
            percent(features.certifications_score),
            percent(features.industry_relevance_score),
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn features() -> FeatureVector {
        FeatureVector {
            number_of_pages: 2,
            number_of_words: 650,
            linkedin: true,
            education_level: EducationLevel::NotFound,
            skills_score: 1.2,
            education_score: 0.5,
            experience_years: 6.0,
            experience_score: 0.75,
            certifications_score: 0.1,
            industry_relevance_score: 0.975,
            extracurricular: false,
            grammatical_mistakes: 0.2,
            internships: 0,
            communication: true,
        }
    }

    fn info() -> BasicInfo {
        BasicInfo {
            email: "jane@example.com".to_string(),
            phone_number: String::new(),
            location: "Berlin".to_string(),
            linkedin: "https://linkedin.com/in/jane".to_string(),
            number_of_pages: 2,
            number_of_words: 650,
        }
    }

    fn row<'a>(report: &'a Report, feature: &str) -> &'a ReportRow {
        report
            .features
            .iter()
            .find(|r| r.feature == feature)
            .unwrap()
    }

    #[test]
    fn test_presence_fields() {
        let report = build_report(&info(), &features());
        assert_eq!(row(&report, "Email").tier, Tier::Favorable);
        assert_eq!(row(&report, "Phone Number").tier, Tier::Unfavorable);
        assert_eq!(row(&report, "Phone Number").value, "Not Found");
        assert_eq!(row(&report, "Extracurricular Activities").tier, Tier::Unfavorable);
    }

    #[test]
    fn test_education_is_neutral_and_not_found_is_distinct() {
        let report = build_report(&info(), &features());
        let education = row(&report, "Education Level");
        assert_eq!(education.tier, Tier::Neutral);
        assert_eq!(education.value, "Not Found");
    }

    #[test]
    fn test_pages_and_words_depend_on_experience() {
        let report = build_report(&info(), &features());
        assert_eq!(row(&report, "Number of Pages").tier, Tier::Favorable);
        assert_eq!(row(&report, "Number of Words").tier, Tier::Favorable);

        let mut junior = features();
        junior.experience_years = 2.0;
        let mut long_info = info();
        long_info.number_of_pages = 5;
        long_info.number_of_words = 1400;
        let report = build_report(&long_info, &junior);
        assert_eq!(row(&report, "Number of Pages").tier, Tier::Unfavorable);
        assert_eq!(row(&report, "Number of Words").tier, Tier::Unfavorable);
    }

    #[test]
    fn test_scores_display_and_tier() {
        let report = build_report(&info(), &features());
        assert_eq!(row(&report, "Skills Score").value, "Excellent");
        assert_eq!(row(&report, "Skills Score").tier, Tier::Favorable);
        assert_eq!(row(&report, "Education Score").value, "50.0%");
        assert_eq!(row(&report, "Education Score").tier, Tier::Neutral);
        assert_eq!(row(&report, "Certifications Score").tier, Tier::Unfavorable);
    }

    #[test]
    fn test_grammar_tier_is_inverted() {
        let report = build_report(&info(), &features());
        assert_eq!(row(&report, "Grammatical Mistakes Count").tier, Tier::Favorable);

        let mut sloppy = features();
        sloppy.grammatical_mistakes = 4.5;
        let report = build_report(&info(), &sloppy);
        assert_eq!(row(&report, "Grammatical Mistakes Count").tier, Tier::Unfavorable);
    }

    #[test]
    fn test_internships_zero_uses_scale() {
        let report = build_report(&info(), &features());
        assert_eq!(row(&report, "Internships Count").tier, Tier::Unfavorable);
    }

    #[test]
    fn test_radar_percentages() {
        let report = build_report(&info(), &features());
        assert_eq!(report.radar.data, [120.0, 50.0, 75.0, 10.0, 97.5]);
    }
}
