//! Metadata extraction from raw feed items
//!
//! Extraction is total: a missing optional field becomes `None`. Only a
//! missing title or link stops an item from producing metadata, and that
//! is reported as an `ExtractionGap` for the caller to count and skip.

use std::fmt;
use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate, Utc};
use regex::{Captures, Regex};

use feedlink_core::{FeedItem, ItemMetadata};

use crate::normalizer::{collapse_whitespace, decode_entities, TextNormalizer};

/// Accepted author names have this many words
const AUTHOR_WORDS: std::ops::RangeInclusive<usize> = 2..=4;

/// Accepted author names have this many characters
const AUTHOR_CHARS: std::ops::RangeInclusive<usize> = 4..=30;

static CDATA: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<!\[CDATA\[(.*?)\]\]>").expect("valid regex"));

static HTML_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]*>").expect("valid regex"));

static LEADING_BY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^by\s+").expect("valid regex"));

const ISO_FORMATS: &[&str] = &["%Y-%m-%d"];
const US_FORMATS: &[&str] = &["%m/%d/%Y"];
const LONG_FORMATS: &[&str] = &["%d %B %Y", "%d %b %Y"];

/// Alternate date shapes tried when RFC 2822 and RFC 3339 both fail
static DATE_SHAPES: LazyLock<Vec<(Regex, &'static [&'static str])>> = LazyLock::new(|| {
    vec![
        (Regex::new(r"\d{4}-\d{2}-\d{2}").expect("valid regex"), ISO_FORMATS),
        (Regex::new(r"\d{1,2}/\d{1,2}/\d{4}").expect("valid regex"), US_FORMATS),
        (Regex::new(r"\d{1,2} [A-Za-z]+ \d{4}").expect("valid regex"), LONG_FORMATS),
    ]
});

/// How a byline rule turns its captures into a name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RuleKind {
    /// Capture 1 is the name
    Direct,
    /// Capture 1 holds leading words, capture 2 the last name glued to an email
    GluedEmail,
}

/// A named byline pattern
struct BylineRule {
    name: &'static str,
    pattern: Regex,
    kind: RuleKind,
}

impl BylineRule {
    fn new(name: &'static str, pattern: &str, kind: RuleKind) -> Self {
        Self {
            name,
            pattern: Regex::new(pattern).expect("valid regex"),
            kind,
        }
    }

    fn candidate(&self, caps: &Captures) -> Option<String> {
        match self.kind {
            RuleKind::Direct => caps.get(1).map(|m| m.as_str().to_string()),
            RuleKind::GluedEmail => {
                let leading = caps.get(1)?.as_str().trim();
                let last = split_glued_email(leading, caps.get(2)?.as_str())?;
                Some(format!("{leading} {last}"))
            }
        }
    }
}

/// Byline rules from most to least specific; the first valid name wins
static BYLINE_RULES: LazyLock<Vec<BylineRule>> = LazyLock::new(|| {
    vec![
        BylineRule::new(
            "capitalized_first_last",
            r"\b[Bb]y[ \t]+([A-Z][a-z]+(?:[ \t]+[A-Z]\.)?(?:[ \t]+[A-Z][A-Za-z'\-]*[a-z]){1,2})(?:[^A-Za-z0-9@]|$)",
            RuleKind::Direct,
        ),
        BylineRule::new(
            "all_caps_first_last",
            r"\b[Bb][Yy][ \t]+([A-Z][A-Z'\-]+(?:[ \t]+[A-Z][A-Z'\-]+){1,3})(?:[^A-Za-z0-9@]|$)",
            RuleKind::Direct,
        ),
        BylineRule::new(
            "name_glued_to_email",
            r"\b[Bb][Yy][ \t]+((?:[A-Za-z][A-Za-z'\-]*[ \t]+){1,3})([A-Z][A-Za-z0-9._%+\-]*)@[A-Za-z0-9\-]+\.",
            RuleKind::GluedEmail,
        ),
        BylineRule::new(
            "bounded_name_before_email_or_dash",
            r"\b[Bb][Yy][ \t]+([A-Za-z][A-Za-z.'\-]{0,29}(?:[ \t]+[A-Za-z][A-Za-z.'\-]{0,29}){1,3}?)[ \t]+(?:[A-Za-z0-9._%+\-]+@|[\x{2014}\x{2013}\-]+)",
            RuleKind::Direct,
        ),
        BylineRule::new(
            "name_after_text",
            r"\b[Bb][Yy]\b[^\n]{0,60}?([A-Z][a-z]+(?:[ \t]+[A-Z][A-Za-z'\-]*[a-z]){1,2})(?:[^A-Za-z0-9@]|$)",
            RuleKind::Direct,
        ),
    ]
});

/// Why an item produced no metadata
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionGap {
    MissingTitle,
    MissingLink,
}

impl fmt::Display for ExtractionGap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExtractionGap::MissingTitle => f.write_str("missing title"),
            ExtractionGap::MissingLink => f.write_str("missing link"),
        }
    }
}

/// Builds `ItemMetadata` from raw feed items
#[derive(Debug, Clone, Default)]
pub struct MetadataExtractor {
    normalizer: TextNormalizer,
}

impl MetadataExtractor {
    pub fn new(normalizer: TextNormalizer) -> Self {
        Self { normalizer }
    }

    pub fn normalizer(&self) -> &TextNormalizer {
        &self.normalizer
    }

    /// Extract the normalized view of one item
    pub fn extract(&self, item: &FeedItem) -> Result<ItemMetadata, ExtractionGap> {
        let title = item
            .title
            .as_deref()
            .map(extract_title)
            .filter(|t| !t.is_empty())
            .ok_or(ExtractionGap::MissingTitle)?;
        let link = item
            .link
            .as_deref()
            .map(|l| strip_cdata(l).trim().to_string())
            .filter(|l| !l.is_empty())
            .ok_or(ExtractionGap::MissingLink)?;

        let author = item.creator.as_deref().and_then(clean_creator);
        let extracted_author = if author.is_none() {
            item.body
                .as_deref()
                .or(item.description.as_deref())
                .and_then(|body| extract_byline(body).map(|(name, _)| name))
        } else {
            None
        };

        Ok(ItemMetadata {
            parsed_title: self.normalizer.parse_column_title(&title),
            title,
            link,
            author,
            extracted_author,
            pub_date: item.pub_date.as_deref().and_then(extract_date),
            description: item
                .description
                .as_deref()
                .map(|d| decode_entities(strip_cdata(d).trim()))
                .filter(|d| !d.is_empty()),
            guid: item
                .guid
                .as_deref()
                .map(|g| g.trim().to_string())
                .filter(|g| !g.is_empty()),
        })
    }
}

fn strip_cdata(text: &str) -> String {
    let mut current = text.to_string();
    // Some feeds wrap CDATA inside CDATA
    while CDATA.is_match(&current) {
        current = CDATA.replace_all(&current, "$1").into_owned();
    }
    current
}

/// Clean a raw title: CDATA unwrapped, entities decoded, markup and
/// trailing separator noise removed
pub fn extract_title(raw: &str) -> String {
    let unwrapped = strip_cdata(raw);
    let decoded = decode_entities(&HTML_TAG.replace_all(&unwrapped, " "));
    collapse_whitespace(&decoded)
        .trim_end_matches(|c: char| {
            c.is_whitespace() || matches!(c, '-' | '|' | ':' | ';' | ',' | '\u{2013}' | '\u{2014}')
        })
        .to_string()
}

fn clean_creator(raw: &str) -> Option<String> {
    let cleaned = collapse_whitespace(&decode_entities(&strip_cdata(raw)));
    let cleaned = LEADING_BY.replace(&cleaned, "").trim().to_string();
    (!cleaned.is_empty()).then_some(cleaned)
}

/// Find a byline in free text
///
/// Returns the title-cased name and the name of the rule that produced it.
pub fn extract_byline(text: &str) -> Option<(String, &'static str)> {
    let text = byline_text(text);
    for rule in BYLINE_RULES.iter() {
        for caps in rule.pattern.captures_iter(&text) {
            if let Some(name) = rule.candidate(&caps).and_then(|c| validate_author(&c)) {
                return Some((name, rule.name));
            }
        }
    }
    None
}

/// Markup becomes line breaks so a byline never runs into the next paragraph
fn byline_text(text: &str) -> String {
    let unwrapped = strip_cdata(text);
    let without_tags = HTML_TAG.replace_all(&unwrapped, "\n");
    decode_entities(&without_tags)
        .replace(['\u{00A0}', '\t'], " ")
}

/// Split the last name off a glued `LastnameEmail@` run
///
/// All-caps names split at the first lowercase letter. Mixed case splits
/// at the longest last name the email local part repeats or that is
/// followed by the first name's initial.
fn split_glued_email(leading: &str, glued: &str) -> Option<String> {
    let first = leading.split_whitespace().next()?.to_lowercase();
    let chars: Vec<(usize, char)> = glued.char_indices().collect();

    let caps_run = chars.iter().take_while(|(_, c)| c.is_ascii_uppercase()).count();
    if caps_run >= 2 && caps_run < chars.len() {
        return Some(glued[..chars[caps_run].0].to_string());
    }

    (2..chars.len()).rev().find_map(|i| {
        let split = chars[i].0;
        let last = &glued[..split];
        let local = glued[split..].to_lowercase();
        let last_lower = last.to_lowercase();
        let plausible = local.contains(&last_lower)
            || local.starts_with(&first)
            || local.starts_with(first.chars().next()?);
        (plausible && last.chars().all(|c| c.is_alphabetic() || c == '\'' || c == '-'))
            .then(|| last.to_string())
    })
}

/// Accept 2-4 words and 4-30 characters, returned in title case
fn validate_author(candidate: &str) -> Option<String> {
    let name = collapse_whitespace(candidate.trim().trim_end_matches('.'));
    let words: Vec<&str> = name.split_whitespace().collect();
    if !AUTHOR_WORDS.contains(&words.len()) || !AUTHOR_CHARS.contains(&name.chars().count()) {
        return None;
    }
    Some(words.iter().map(|w| title_case_word(w)).collect::<Vec<_>>().join(" "))
}

fn title_case_word(word: &str) -> String {
    let mut result = String::with_capacity(word.len());
    let mut capitalize = true;
    for c in word.chars() {
        if capitalize {
            result.extend(c.to_uppercase());
        } else {
            result.extend(c.to_lowercase());
        }
        capitalize = matches!(c, '-' | '\'' | '.');
    }
    result
}

/// Parse a publish date; `None` when nothing recognizable is found
pub fn extract_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(date) = DateTime::parse_from_rfc2822(raw) {
        return Some(date.with_timezone(&Utc));
    }
    if let Ok(date) = DateTime::parse_from_rfc3339(raw) {
        return Some(date.with_timezone(&Utc));
    }

    DATE_SHAPES.iter().find_map(|(shape, formats)| {
        let matched = shape.find(raw)?.as_str();
        formats
            .iter()
            .find_map(|format| NaiveDate::parse_from_str(matched, format).ok())
            .and_then(|date| date.and_hms_opt(0, 0, 0))
            .map(|naive| naive.and_utc())
    })
}
