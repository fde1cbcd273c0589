//! Section segmentation: heading-anchored spans of resume text.
//!
//! Each section is described by a small rule: the heading tokens that open it
//! and the headings that close it. A rule compiles to one case-insensitive
//! pattern `HEADING \s* (.*?) (TERMINATOR | end-of-text)`. Sections are
//! independent: two rules may capture overlapping text.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Sentinel text for a section that has no heading in the document.
pub const NOT_FOUND: &str = "Not found";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionKind {
    Experience,
    Education,
    Skills,
    Certifications,
}

impl SectionKind {
    pub const ALL: [SectionKind; 4] = [
        SectionKind::Experience,
        SectionKind::Education,
        SectionKind::Skills,
        SectionKind::Certifications,
    ];

    /// Position of this kind's rule in the boundary grammar.
    fn index(&self) -> usize {
        match self {
            SectionKind::Experience => 0,
            SectionKind::Education => 1,
            SectionKind::Skills => 2,
            SectionKind::Certifications => 3,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SectionKind::Experience => "experience",
            SectionKind::Education => "education",
            SectionKind::Skills => "skills",
            SectionKind::Certifications => "certifications",
        }
    }
}

/// What a section holds when its heading never appears.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Missing {
    Sentinel,
    Empty,
}

/// One entry of the boundary grammar.
struct SectionRule {
    kind: SectionKind,
    headings: &'static [&'static str],
    terminators: &'static [&'static str],
    missing: Missing,
}

const RULES: &[SectionRule] = &[
    SectionRule {
        kind: SectionKind::Experience,
        headings: &["EXPERIENCE"],
        terminators: &[
            r"NOTABLE\s+ACHIEVEMENTS",
            "EDUCATION",
            "CERTIFICATIONS",
            "PROJECTS",
            "SKILLS",
        ],
        missing: Missing::Sentinel,
    },
    SectionRule {
        kind: SectionKind::Education,
        headings: &[r"EDUCATION(?:\s*&?\s*CERTIFICATIONS?)?"],
        terminators: &["SKILLS", "PROJECTS", "EXPERIENCE", "LANGUAGES"],
        missing: Missing::Sentinel,
    },
    SectionRule {
        kind: SectionKind::Skills,
        headings: &["SKILLS"],
        terminators: &[
            "LANGUAGES",
            "EDUCATION",
            "CERTIFICATIONS",
            "PROJECTS",
            "EXPERIENCE",
        ],
        missing: Missing::Empty,
    },
    SectionRule {
        kind: SectionKind::Certifications,
        headings: &["CERTIFICATIONS", "COURSES"],
        terminators: &["SKILLS", "LANGUAGES", "TOOLS"],
        missing: Missing::Empty,
    },
];

impl SectionRule {
    fn pattern(&self) -> String {
        format!(
            r"(?is)\b(?:{})\b\s*(.*?)(?:\b(?:{})\b|\z)",
            self.headings.join("|"),
            self.terminators.join("|")
        )
    }
}

/// Compiled rules, indexed by `SectionKind::index`.
static COMPILED: LazyLock<Vec<(SectionKind, Missing, Regex)>> = LazyLock::new(|| {
    RULES
        .iter()
        .map(|rule| {
            let regex = Regex::new(&rule.pattern()).expect("section rule compiles");
            (rule.kind, rule.missing, regex)
        })
        .collect()
});

/// A named span of resume text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    pub kind: SectionKind,
    pub text: String,
    pub found: bool,
}

/// The four sections consumed by scoring and date extraction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sections {
    pub experience: Section,
    pub education: Section,
    pub skills: Section,
    pub certifications: Section,
}

impl Sections {
    pub fn get(&self, kind: SectionKind) -> &Section {
        match kind {
            SectionKind::Experience => &self.experience,
            SectionKind::Education => &self.education,
            SectionKind::Skills => &self.skills,
            SectionKind::Certifications => &self.certifications,
        }
    }
}

/// Splits the full text into its labeled sections.
pub fn segment(full_text: &str) -> Sections {
    let section = |kind: SectionKind| {
        let (rule_kind, missing, regex) = &COMPILED[kind.index()];
        debug_assert_eq!(*rule_kind, kind);
        extract_section(full_text, *rule_kind, *missing, regex)
    };

    Sections {
        experience: section(SectionKind::Experience),
        education: section(SectionKind::Education),
        skills: section(SectionKind::Skills),
        certifications: section(SectionKind::Certifications),
    }
}

fn extract_section(text: &str, kind: SectionKind, missing: Missing, regex: &Regex) -> Section {
    let parts: Vec<String> = regex
        .captures_iter(text)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().trim().replace(['\r', '\n'], " "))
        .collect();

    if parts.is_empty() {
        debug!(section = kind.as_str(), "Section heading not found");
        let text = match missing {
            Missing::Sentinel => NOT_FOUND.to_string(),
            Missing::Empty => String::new(),
        };
        return Section {
            kind,
            text,
            found: false,
        };
    }

    Section {
        kind,
        text: parts.join(" "),
        found: true,
    }
}
