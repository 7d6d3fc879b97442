//! Title normalization
//!
//! Turns two independently formatted titles into strings that can be
//! compared directly: entities decoded, column labels split off, local
//! spellings unified, punctuation and filler words removed.

use std::sync::LazyLock;

use regex::{Captures, Regex};

use feedlink_core::{MatchingConfig, ParsedTitle};

use crate::similarity::{detect_fragment, is_continuation};

/// Recurring columns that prefix article titles in the primary feed
pub const KNOWN_COLUMNS: &[&str] = &["Garden Plot", "Sports Shout", "Everyday Encounters"];

/// Normalized titles shorter than this are candidates for fragment detection
pub const FRAGMENT_MAX_LEN: usize = 15;

/// Longest label accepted by the generic `Label: title` form
const GENERIC_PREFIX_MAX_LEN: usize = 25;

/// The remainder after a generic label must be longer than this
const GENERIC_REMAINDER_MIN_LEN: usize = 10;

const NAMED_ENTITIES: &[(&str, &str)] = &[
    ("&amp;", "&"),
    ("&quot;", "\""),
    ("&apos;", "'"),
    ("&lt;", "<"),
    ("&gt;", ">"),
    ("&nbsp;", " "),
    ("&ndash;", "\u{2013}"),
    ("&mdash;", "\u{2014}"),
    ("&lsquo;", "\u{2018}"),
    ("&rsquo;", "\u{2019}"),
    ("&ldquo;", "\u{201C}"),
    ("&rdquo;", "\u{201D}"),
    ("&hellip;", "\u{2026}"),
];

const ARTICLES: &[&str] = &["the", "a", "an"];

const PREPOSITIONS: &[&str] = &[
    "of", "in", "on", "at", "to", "for", "with", "by", "from", "about", "into", "over", "after",
    "under", "near",
];

const BOILERPLATE_PHRASES: &[&[&str]] = &[
    &["san", "francisco"],
    &["bay", "area"],
    &["award", "winning"],
];

static DECIMAL_ENTITY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"&#(\d{1,7});").expect("valid regex"));

static HEX_ENTITY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)&#x([0-9a-f]{1,6});").expect("valid regex"));

static LEFTOVER_ENTITY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"&#?[A-Za-z0-9]{1,10};").expect("valid regex"));

static GENERIC_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)^([^:]+):\s*(.+)$").expect("valid regex"));

static TERM_NORMALIZATIONS: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    [
        (r"(?i)\btown council\b", "city council"),
        (r"\s*&\s*", " and "),
        (r"(?i)\bst\.", "street"),
        (r"(?i)\brd\.", "road"),
        (r"(?i)\bave\.", "avenue"),
        (r"(?i)\bblvd\.", "boulevard"),
        (r"(?i)\bdept\.", "department"),
    ]
    .into_iter()
    .map(|(pattern, replacement)| (Regex::new(pattern).expect("valid regex"), replacement))
    .collect()
});

/// Switches for `TextNormalizer::normalize`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NormalizeOptions {
    /// Normalize only the core title when a column label is present
    pub strip_column_names: bool,
    /// Drop prepositions and publication boilerplate
    pub remove_stop_words: bool,
}

impl NormalizeOptions {
    /// Keep the column label, used for full-title keys
    pub fn full_title() -> Self {
        Self {
            strip_column_names: false,
            remove_stop_words: true,
        }
    }
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        Self {
            strip_column_names: true,
            remove_stop_words: true,
        }
    }
}

/// Column-aware title normalizer
#[derive(Debug, Clone)]
pub struct TextNormalizer {
    /// Known columns, longest first so overlapping names prefer the longer one
    columns: Vec<String>,
    fragment_threshold: f64,
}

impl TextNormalizer {
    /// Create a normalizer with the built-in columns plus `extra_columns`
    pub fn new(extra_columns: &[String], fragment_threshold: f64) -> Self {
        let mut columns: Vec<String> = Vec::new();
        for column in KNOWN_COLUMNS
            .iter()
            .map(|c| c.to_string())
            .chain(extra_columns.iter().map(|c| c.trim().to_string()))
        {
            if !column.is_empty() && !columns.iter().any(|c| c.eq_ignore_ascii_case(&column)) {
                columns.push(column);
            }
        }
        columns.sort_by(|a, b| b.len().cmp(&a.len()));

        Self {
            columns,
            fragment_threshold,
        }
    }

    pub fn from_config(config: &MatchingConfig) -> Self {
        Self::new(&config.extra_columns, config.thresholds.fragment)
    }

    /// Produce the canonical comparison string for a title
    ///
    /// Runs the pipeline until the output stops changing, so normalizing
    /// an already normalized string returns it unchanged.
    pub fn normalize(&self, raw: &str, options: NormalizeOptions) -> String {
        // After the first pass the text is lowercase words only; later passes
        // drop words or apply a one-way term rewrite, so this settles
        let mut current = self.normalize_pass(raw, options);
        loop {
            let next = self.normalize_pass(&current, options);
            if next == current {
                return current;
            }
            current = next;
        }
    }

    fn normalize_pass(&self, raw: &str, options: NormalizeOptions) -> String {
        let decoded = decode_entities(raw);
        let source = if options.strip_column_names {
            self.parse_column_title(&decoded).core_title
        } else {
            decoded
        };

        let mut text = source;
        for (pattern, replacement) in TERM_NORMALIZATIONS.iter() {
            text = pattern.replace_all(&text, *replacement).into_owned();
        }

        let lowered = strip_punctuation(&text.to_lowercase());
        let mut tokens: Vec<&str> = lowered.split_whitespace().collect();

        if options.remove_stop_words {
            let kept = remove_stop_words(&tokens);
            if !kept.is_empty() {
                tokens = kept;
            }
        }

        while tokens.len() > 1 && ARTICLES.contains(&tokens[0]) {
            tokens.remove(0);
        }

        tokens.join(" ")
    }

    /// Split a title into its column label and core title
    pub fn parse_column_title(&self, title: &str) -> ParsedTitle {
        let full = collapse_whitespace(title);
        if full.is_empty() {
            return ParsedTitle::plain(full);
        }

        for column in &self.columns {
            let Some(head) = full.get(..column.len()) else {
                continue;
            };
            if !head.eq_ignore_ascii_case(column) {
                continue;
            }
            let rest = &full[column.len()..];
            if !rest.starts_with(|c: char| c == ':' || c.is_whitespace()) {
                continue;
            }
            let core = rest.trim_start_matches(|c: char| c == ':' || c.is_whitespace()).trim();
            if !core.is_empty() {
                return ParsedTitle {
                    column_name: Some(head.to_string()),
                    column_key: Some(column.clone()),
                    core_title: core.to_string(),
                    full_title: full.clone(),
                    is_fragment: false,
                    fragment_confidence: 1.0,
                };
            }
        }

        // Jump-page markers are continuations, never column headers
        let continuation = is_continuation(&full);

        if let Some(caps) = GENERIC_PREFIX.captures(&full) {
            let head = caps[1].trim();
            let rest = caps[2].trim();

            if !continuation && !rest.is_empty() {
                if let Some((column, confidence)) = self.best_fragment(head) {
                    return ParsedTitle {
                        column_name: Some(head.to_string()),
                        column_key: Some(column),
                        core_title: rest.to_string(),
                        full_title: full.clone(),
                        is_fragment: false,
                        fragment_confidence: confidence,
                    };
                }
            }

            if !head.is_empty()
                && head.chars().count() <= GENERIC_PREFIX_MAX_LEN
                && rest.chars().count() > GENERIC_REMAINDER_MIN_LEN
            {
                return ParsedTitle {
                    column_name: Some(head.to_string()),
                    column_key: None,
                    core_title: rest.to_string(),
                    full_title: full.clone(),
                    is_fragment: false,
                    fragment_confidence: 0.0,
                };
            }
        }

        if !continuation && canonicalize(&full).chars().count() < FRAGMENT_MAX_LEN {
            if let Some((column, confidence)) = self.best_fragment(&full) {
                return ParsedTitle {
                    column_name: Some(full.clone()),
                    column_key: Some(column),
                    core_title: full.clone(),
                    full_title: full,
                    is_fragment: true,
                    fragment_confidence: confidence,
                };
            }
        }

        ParsedTitle::plain(full)
    }

    /// Known column that `text` abbreviates, with its confidence
    pub fn best_fragment(&self, text: &str) -> Option<(String, f64)> {
        self.columns
            .iter()
            .map(|column| (column, detect_fragment(text, column)))
            .filter(|(_, confidence)| *confidence > self.fragment_threshold)
            .fold(None, |best: Option<(&String, f64)>, (column, confidence)| match best {
                Some((_, best_confidence)) if best_confidence >= confidence => best,
                _ => Some((column, confidence)),
            })
            .map(|(column, confidence)| (column.clone(), confidence))
    }
}

impl Default for TextNormalizer {
    fn default() -> Self {
        Self::new(&[], 0.7)
    }
}

/// Decode HTML entities; anything left unresolved becomes a space
pub fn decode_entities(text: &str) -> String {
    let mut current = text.to_string();
    // Two rounds cover double-encoded input such as `&amp;#8217;`
    for _ in 0..2 {
        if !current.contains('&') {
            break;
        }
        let mut next = current.clone();
        for (entity, replacement) in NAMED_ENTITIES {
            next = next.replace(entity, replacement);
        }
        next = DECIMAL_ENTITY
            .replace_all(&next, |caps: &Captures| decode_code_point(&caps[1], 10))
            .into_owned();
        next = HEX_ENTITY
            .replace_all(&next, |caps: &Captures| decode_code_point(&caps[1], 16))
            .into_owned();
        if next == current {
            break;
        }
        current = next;
    }
    LEFTOVER_ENTITY.replace_all(&current, " ").into_owned()
}

fn decode_code_point(digits: &str, radix: u32) -> String {
    u32::from_str_radix(digits, radix)
        .ok()
        .and_then(char::from_u32)
        .map(|c| if c == '\u{00A0}' { ' ' } else { c })
        .map(String::from)
        .unwrap_or_else(|| " ".to_string())
}

/// Lowercase, punctuation-free, single-spaced form with nothing removed
pub fn canonicalize(text: &str) -> String {
    collapse_whitespace(&strip_punctuation(&decode_entities(text).to_lowercase()))
}

pub(crate) fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Apostrophes vanish so contractions stay one word; other punctuation splits words
fn strip_punctuation(text: &str) -> String {
    text.chars()
        .filter(|c| !matches!(c, '\'' | '\u{2018}' | '\u{2019}'))
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect()
}

fn remove_stop_words<'a>(tokens: &[&'a str]) -> Vec<&'a str> {
    let mut kept = Vec::with_capacity(tokens.len());
    let mut i = 0;
    'outer: while i < tokens.len() {
        for phrase in BOILERPLATE_PHRASES {
            if tokens[i..].starts_with(phrase) {
                i += phrase.len();
                continue 'outer;
            }
        }
        if !PREPOSITIONS.contains(&tokens[i]) {
            kept.push(tokens[i]);
        }
        i += 1;
    }
    kept
}

#[cfg(test)]
mod tests {
    use super::*;

    fn normalize(text: &str) -> String {
        TextNormalizer::default().normalize(text, NormalizeOptions::default())
    }

    #[test]
    fn test_decode_entities() {
        assert_eq!(decode_entities("Fish &amp; Chips"), "Fish & Chips");
        assert_eq!(decode_entities("It&#8217;s"), "It\u{2019}s");
        assert_eq!(decode_entities("It&amp;#8217;s"), "It\u{2019}s");
        assert_eq!(decode_entities("&#x2014;"), "\u{2014}");
        assert_eq!(decode_entities("a&nbsp;b"), "a b");
        assert!(!decode_entities("caf&eacute; owner").contains('&'));
    }

    #[test]
    fn test_normalize_basic_pipeline() {
        assert_eq!(
            normalize("The City Council Votes on Budget!"),
            "city council votes budget"
        );
        assert_eq!(
            normalize("Town Council &amp; Mayor Clash"),
            "city council and mayor clash"
        );
        assert_eq!(normalize("Paving Oak St. Again"), "paving oak street again");
        assert_eq!(
            normalize("Award-winning bakery opens in San Francisco"),
            "bakery opens"
        );
        assert_eq!(normalize("Don\u{2019}t Panic"), "dont panic");
    }

    #[test]
    fn test_normalize_strips_known_column() {
        assert_eq!(normalize("Garden Plot: Roses in Bloom"), "roses bloom");
        assert_eq!(normalize("Sports Shout Giants Win Again"), "giants win again");

        let full = TextNormalizer::default()
            .normalize("Garden Plot: Roses in Bloom", NormalizeOptions::full_title());
        assert_eq!(full, "garden plot roses bloom");
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let samples = [
            "Garden Plot: Roses in Bloom",
            "The Garden Plot: Roses",
            "Sports Shout Sports Shout Giants",
            "Encounters, from page 3",
            "A Bay Area award-winning chef &amp; the town council",
            "  Weird   spacing \t here ",
            "The",
            "!!!",
            "Editorial: The city should fix Oak St. now",
        ];
        for sample in samples {
            let once = normalize(sample);
            assert_eq!(normalize(&once), once, "not idempotent for {sample:?}");
        }
    }

    #[test]
    fn test_repeated_column_labels_all_strip() {
        let stacked = format!("{}Roses", "Garden Plot: ".repeat(10));
        assert_eq!(normalize(&stacked), "roses");

        let mixed = format!("{}Giants Win", "Sports Shout Garden Plot: ".repeat(12));
        let once = normalize(&mixed);
        assert_eq!(once, "giants win");
        assert_eq!(normalize(&once), once);
    }

    #[test]
    fn test_keeps_lone_article_and_stop_word() {
        assert_eq!(normalize("The"), "the");
        assert_eq!(normalize("Over"), "over");
    }

    #[test]
    fn test_parse_known_column() {
        let parsed = TextNormalizer::default().parse_column_title("Garden Plot: Roses in Bloom");
        assert_eq!(parsed.column_name.as_deref(), Some("Garden Plot"));
        assert_eq!(parsed.column_key.as_deref(), Some("Garden Plot"));
        assert_eq!(parsed.core_title, "Roses in Bloom");
        assert!(parsed.full_title.starts_with("Garden Plot"));
        assert!(!parsed.is_fragment);
    }

    #[test]
    fn test_parse_fragment_label() {
        let parsed = TextNormalizer::default().parse_column_title("Encounter: A ride on the 22");
        assert_eq!(parsed.column_name.as_deref(), Some("Encounter"));
        assert_eq!(parsed.column_key.as_deref(), Some("Everyday Encounters"));
        assert_eq!(parsed.core_title, "A ride on the 22");
    }

    #[test]
    fn test_parse_bare_fragment() {
        let parsed = TextNormalizer::default().parse_column_title("Encounters");
        assert!(parsed.is_fragment);
        assert_eq!(parsed.column_key.as_deref(), Some("Everyday Encounters"));
        assert_eq!(parsed.core_title, "Encounters");
        assert!(parsed.fragment_confidence > 0.7);
    }

    #[test]
    fn test_parse_continuation_is_not_fragment() {
        let parsed = TextNormalizer::default().parse_column_title("Encounters, from page 3");
        assert!(!parsed.is_fragment);
        assert_eq!(parsed.column_key, None);
        assert_eq!(parsed.column_name, None);
        assert_eq!(parsed.core_title, "Encounters, from page 3");
    }

    #[test]
    fn test_parse_generic_prefix() {
        let normalizer = TextNormalizer::default();

        let parsed = normalizer.parse_column_title("Letters: Readers weigh in on the bond");
        assert_eq!(parsed.column_name.as_deref(), Some("Letters"));
        assert_eq!(parsed.column_key, None);
        assert_eq!(parsed.core_title, "Readers weigh in on the bond");

        // Remainder too short to be a title on its own
        let parsed = normalizer.parse_column_title("Obituary: Jo Lee");
        assert_eq!(parsed.column_name, None);
        assert_eq!(parsed.core_title, "Obituary: Jo Lee");
    }

    #[test]
    fn test_extra_columns() {
        let normalizer = TextNormalizer::new(&["Police Blotter".to_string()], 0.7);
        let parsed = normalizer.parse_column_title("Police Blotter: Bike thefts rise downtown");
        assert_eq!(parsed.column_key.as_deref(), Some("Police Blotter"));
        assert_eq!(parsed.core_title, "Bike thefts rise downtown");
    }

    #[test]
    fn test_core_title_never_empty() {
        let normalizer = TextNormalizer::default();
        for title in ["Garden Plot", "Garden Plot:", "Sports Shout", ": x"] {
            let parsed = normalizer.parse_column_title(title);
            assert!(!parsed.core_title.is_empty(), "empty core for {title:?}");
        }
    }
}
