//! Date-interval extraction. Finds employment date ranges in a text span,
//! parses their endpoints and merges overlapping runs into a total duration.
//!
//! # Pipeline
//! 1. Scan with an ordered list of range patterns. A match that overlaps a
//!    span already claimed by an earlier pattern is skipped.
//! 2. Parse both endpoints with a small fuzzy parser. "Present" and friends
//!    resolve to the processing date.
//! 3. Drop candidates that fail to parse or where `start >= end`.
//! 4. Sort by start, merge left to right, sum whole months per run.

use std::ops::Range;
use std::sync::LazyLock;

use chrono::{Datelike, NaiveDate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

const MONTHS: &str = "january|february|march|april|may|june|july|august|september|october|\
    november|december|jan|feb|mar|apr|jun|jul|aug|sept|sep|oct|nov|dec";
const PRESENT: &str = r"(?:till\s+|to\s+)?(?:present|current|now|today|date)";
const SEP: &str = r"\s*(?:-|–|—|\bto\b|\buntil\b|\btill\b)\s*";

// ────────────────────────────────────────────────────────────────────────────
// Range patterns (scan order = precedence)
// ────────────────────────────────────────────────────────────────────────────

/// Every pattern captures `start` and, except for the single-ended form, `end`.
static RANGE_PATTERNS: LazyLock<Vec<(&'static str, Regex)>> = LazyLock::new(|| {
    let month_year = format!(r"(?:{MONTHS})\.?,?\s+(?:19|20)\d{{2}}");
    let numeric = r"(?:0?[1-9]|1[0-2])[/.-](?:19|20)\d{2}";
    let two_digit = format!(r"(?:\b(?:{MONTHS})\.?\s*)?['’]\d{{2}}");
    let any_date = format!(r"(?:{month_year}|{numeric}|(?:19|20)\d{{2}})");

    let patterns = [
        (
            "numeric",
            format!(r"\b(?P<start>{numeric}){SEP}(?P<end>{numeric}|{PRESENT})\b"),
        ),
        (
            "full_month",
            format!(
                r"\b(?P<start>(?:january|february|march|april|may|june|july|august|september|october|november|december),?\s+(?:19|20)\d{{2}}){SEP}(?P<end>{month_year}|(?:19|20)\d{{2}}|{PRESENT})\b"
            ),
        ),
        (
            "abbreviated_month",
            format!(
                r"\b(?P<start>{month_year}){SEP}(?P<end>{month_year}|(?:19|20)\d{{2}}|{PRESENT})\b"
            ),
        ),
        (
            "two_digit",
            format!(r"(?P<start>{two_digit}){SEP}(?P<end>{two_digit}|{PRESENT})\b"),
        ),
        (
            "year",
            format!(
                r"\b(?P<start>(?:19|20)\d{{2}}){SEP}(?P<end>(?:19|20)\d{{2}}|\d{{2}}|{PRESENT})\b"
            ),
        ),
        (
            "since",
            format!(r"\b(?:since|from)\s+(?P<start>{any_date})(?:{SEP}(?P<end>{any_date}|{PRESENT}))?\b"),
        ),
        (
            "present",
            format!(r"(?P<start>{any_date}){SEP}(?P<end>{PRESENT})\b"),
        ),
    ];

    patterns
        .into_iter()
        .map(|(name, pattern)| {
            let regex = Regex::new(&format!("(?i){pattern}")).expect("date pattern compiles");
            (name, regex)
        })
        .collect()
});

static INTERNSHIP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:intern|internship|trainee)\b").expect("internship regex is valid")
});

static PRESENT_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(&format!("(?i)^{PRESENT}$")).expect("present regex is valid"));

// Endpoint shapes understood by the fuzzy parser (input is lowercased and trimmed).
static NUMERIC_DATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{1,2})[/.-](\d{4})$").expect("valid"));
static MONTH_YEAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([a-z]+)\.?,?\s*(\d{4})$").expect("valid"));
static MONTH_SHORT_YEAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([a-z]+)\.?\s*['’](\d{2})$").expect("valid"));
static SHORT_YEAR: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^['’](\d{2})$").expect("valid"));
static YEAR: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(\d{4})$").expect("valid"));

// ────────────────────────────────────────────────────────────────────────────
// Data types
// ────────────────────────────────────────────────────────────────────────────

/// A closed calendar interval with `start < end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DateInterval {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateInterval {
    /// Returns `None` unless `start` is strictly before `end`.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Option<Self> {
        (start < end).then_some(Self { start, end })
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// Whole calendar months elapsed between start and end.
    pub fn months(&self) -> u32 {
        whole_months_between(self.start, self.end)
    }
}

/// Intervals reduced to ordered, pairwise non-overlapping runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergedDuration {
    pub runs: Vec<DateInterval>,
    pub total_months: u32,
}

impl MergedDuration {
    /// Total duration in years, rounded to two decimals. Never negative.
    pub fn years(&self) -> f64 {
        round2(self.total_months as f64 / 12.0)
    }
}

/// Everything the extractor reports for one text span.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperienceSummary {
    pub duration: MergedDuration,
    pub internships: u32,
}

// ────────────────────────────────────────────────────────────────────────────
// Public entry points
// ────────────────────────────────────────────────────────────────────────────

/// Extracts the merged experience duration and internship count from `text`.
/// `today` resolves open-ended ranges.
pub fn summarize_experience(text: &str, today: NaiveDate) -> ExperienceSummary {
    let intervals: Vec<DateInterval> = find_range_candidates(text)
        .into_iter()
        .filter_map(|(start, end)| parse_candidate(&start, &end, today))
        .collect();

    let duration = merge_intervals(intervals);
    let internships = count_internships(text);

    debug!(
        runs = duration.runs.len(),
        months = duration.total_months,
        internships,
        "Experience summarized"
    );

    ExperienceSummary {
        duration,
        internships,
    }
}

/// Sorts by start and merges any interval starting at or before the running end.
pub fn merge_intervals(mut intervals: Vec<DateInterval>) -> MergedDuration {
    intervals.sort();

    let mut runs: Vec<DateInterval> = Vec::with_capacity(intervals.len());
    for interval in intervals {
        match runs.last_mut() {
            Some(run) if interval.start <= run.end => {
                run.end = run.end.max(interval.end);
            }
            _ => runs.push(interval),
        }
    }

    let total_months = runs.iter().map(DateInterval::months).sum();
    MergedDuration { runs, total_months }
}

pub fn count_internships(text: &str) -> u32 {
    INTERNSHIP.find_iter(text).count() as u32
}

// ────────────────────────────────────────────────────────────────────────────
// Scanning
// ────────────────────────────────────────────────────────────────────────────

/// Raw `(start, end)` endpoint strings, in pattern order then text order.
fn find_range_candidates(text: &str) -> Vec<(String, String)> {
    let mut claimed: Vec<Range<usize>> = Vec::new();
    let mut candidates = Vec::new();

    for (name, regex) in RANGE_PATTERNS.iter() {
        for caps in regex.captures_iter(text) {
            let Some(whole) = caps.get(0) else { continue };
            let span = whole.range();
            if claimed.iter().any(|c| c.start < span.end && span.start < c.end) {
                continue;
            }
            let Some(start) = caps.name("start") else { continue };

            let end = match caps.name("end") {
                Some(end) => expand_short_end(start.as_str(), end.as_str()),
                // Only "since X" may omit its end; it runs until today.
                None if *name == "since" => "present".to_string(),
                None => continue,
            };

            claimed.push(span);
            candidates.push((start.as_str().to_string(), end));
        }
    }

    candidates
}

/// `2019-21` style ranges carry the start's century over to the end, rolling
/// into the next century when that would put the end first (`1998-02`).
fn expand_short_end(start: &str, end: &str) -> String {
    let start = start.trim();
    let end = end.trim();
    if end.len() != 2 || !YEAR.is_match(start) {
        return end.to_string();
    }
    let (Ok(start_year), Ok(short)) = (start.parse::<i32>(), end.parse::<i32>()) else {
        return end.to_string();
    };
    let mut year = start_year - start_year % 100 + short;
    if year < start_year {
        year += 100;
    }
    year.to_string()
}

fn parse_candidate(start: &str, end: &str, today: NaiveDate) -> Option<DateInterval> {
    let Some(start_date) = parse_fuzzy_date(start, today) else {
        debug!(start, "Dropping date range: unparsable start");
        return None;
    };
    let Some(end_date) = parse_fuzzy_date(end, today) else {
        debug!(end, "Dropping date range: unparsable end");
        return None;
    };
    let interval = DateInterval::new(start_date, end_date);
    if interval.is_none() {
        debug!(start, end, "Dropping date range: start is not before end");
    }
    interval
}

// ────────────────────────────────────────────────────────────────────────────
// Fuzzy endpoint parser
// ────────────────────────────────────────────────────────────────────────────

/// Parses one range endpoint. Month-only dates land on the 1st, bare years on Jan 1.
pub fn parse_fuzzy_date(raw: &str, today: NaiveDate) -> Option<NaiveDate> {
    let s = raw.trim().trim_end_matches([',', '.']).to_lowercase();
    let s = s.split_whitespace().collect::<Vec<_>>().join(" ");

    if PRESENT_TOKEN.is_match(&s) {
        return Some(today);
    }
    if let Some(caps) = NUMERIC_DATE.captures(&s) {
        let month: u32 = caps[1].parse().ok()?;
        let year: i32 = caps[2].parse().ok()?;
        return NaiveDate::from_ymd_opt(year, month, 1);
    }
    if let Some(caps) = MONTH_YEAR.captures(&s) {
        let month = month_number(&caps[1])?;
        let year: i32 = caps[2].parse().ok()?;
        return NaiveDate::from_ymd_opt(year, month, 1);
    }
    if let Some(caps) = MONTH_SHORT_YEAR.captures(&s) {
        let month = month_number(&caps[1])?;
        let year = expand_two_digit_year(caps[2].parse().ok()?, today);
        return NaiveDate::from_ymd_opt(year, month, 1);
    }
    if let Some(caps) = SHORT_YEAR.captures(&s) {
        let year = expand_two_digit_year(caps[1].parse().ok()?, today);
        return NaiveDate::from_ymd_opt(year, 1, 1);
    }
    if let Some(caps) = YEAR.captures(&s) {
        let year: i32 = caps[1].parse().ok()?;
        return NaiveDate::from_ymd_opt(year, 1, 1);
    }
    None
}

fn month_number(name: &str) -> Option<u32> {
    if name.len() < 3 {
        return None;
    }
    let month = match &name[..3] {
        "jan" => 1,
        "feb" => 2,
        "mar" => 3,
        "apr" => 4,
        "may" => 5,
        "jun" => 6,
        "jul" => 7,
        "aug" => 8,
        "sep" => 9,
        "oct" => 10,
        "nov" => 11,
        "dec" => 12,
        _ => return None,
    };
    Some(month)
}

/// Two-digit years up to the current one are 20xx, later ones 19xx.
fn expand_two_digit_year(yy: i32, today: NaiveDate) -> i32 {
    if yy <= today.year() % 100 {
        2000 + yy
    } else {
        1900 + yy
    }
}

fn whole_months_between(start: NaiveDate, end: NaiveDate) -> u32 {
    let mut months = (end.year() - start.year()) * 12 + end.month() as i32 - start.month() as i32;
    if end.day() < start.day() {
        months -= 1;
    }
    months.max(0) as u32
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
