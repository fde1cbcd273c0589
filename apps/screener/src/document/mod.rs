// Document Reader
// Turns an uploaded file into an immutable ResumeDocument: per-page text,
// cleaned full text, hyperlink targets and the first professional-profile link.

pub mod links;
pub mod reader;

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

pub use reader::read_document;

/// Reported in place of a missing profile link.
pub const LINK_NOT_FOUND: &str = "Not found";

/// Bullet and list glyphs removed from the start of every line before segmentation.
static LEADING_BULLET: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^[ \t]*(?:[•●▪◦‣➢►■*]+|-[ \t])[ \t]*").expect("bullet regex is valid")
});

/// A resume read page by page. Built once per upload and never mutated.
#[derive(Debug, Clone, Serialize)]
pub struct ResumeDocument {
    pages: Vec<String>,
    full_text: String,
    links: Vec<String>,
    linkedin_url: Option<String>,
}

impl ResumeDocument {
    /// Assembles a document from page texts and the hyperlink targets found on them.
    pub fn from_pages(pages: Vec<String>, links: Vec<String>) -> Self {
        let raw = pages.join("\n");
        let full_text = strip_leading_bullets(&raw);
        let linkedin_url = links::find_profile_link(&links);

        Self {
            pages,
            full_text,
            links,
            linkedin_url,
        }
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Concatenated page text with leading bullet glyphs removed.
    pub fn full_text(&self) -> &str {
        &self.full_text
    }

    pub fn links(&self) -> &[String] {
        &self.links
    }

    /// First LinkedIn-style profile URI, lowercased. `None` means "Not found".
    pub fn linkedin_url(&self) -> Option<&str> {
        self.linkedin_url.as_deref()
    }

    pub fn word_count(&self) -> usize {
        self.full_text.split_whitespace().count()
    }
}

pub fn strip_leading_bullets(text: &str) -> String {
    LEADING_BULLET.replace_all(text, "").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_leading_bullets_only_at_line_start() {
        let text = "• Built APIs\n  * Led team\n- Shipped\nJan 2019 - Dec 2021";
        let cleaned = strip_leading_bullets(text);
        assert_eq!(cleaned, "Built APIs\nLed team\nShipped\nJan 2019 - Dec 2021");
    }

    #[test]
    fn test_word_count_uses_cleaned_text() {
        let doc = ResumeDocument::from_pages(
            vec!["• Rust engineer\n".to_string(), "- five years".to_string()],
            vec![],
        );
        assert_eq!(doc.page_count(), 2);
        assert_eq!(doc.word_count(), 4);
        assert!(doc.linkedin_url().is_none());
    }

    #[test]
    fn test_linkedin_taken_from_links() {
        let doc = ResumeDocument::from_pages(
            vec!["Jane Doe".to_string()],
            vec![
                "mailto:jane@example.com".to_string(),
                "https://www.LinkedIn.com/in/jane-doe".to_string(),
            ],
        );
        assert_eq!(doc.linkedin_url(), Some("https://www.linkedin.com/in/jane-doe"));
    }
}
