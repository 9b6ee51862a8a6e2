use regex::Regex;
use std::sync::OnceLock;

/// A single extraction heuristic. Implementations must tolerate arbitrary
/// input and return an empty vector rather than fail.
pub trait Matcher: Send + Sync {
    fn name(&self) -> &'static str;
    fn find(&self, text: &str) -> Vec<String>;
}

fn bold_re() -> &'static Regex {
    static BOLD_RE: OnceLock<Regex> = OnceLock::new();
    BOLD_RE.get_or_init(|| Regex::new(r"\*\*([^*\n]+)\*\*").unwrap())
}

/// Trims a captured span and rejects spans with nothing name-like in them.
fn clean_capture(raw: &str) -> Option<String> {
    let s = raw.trim();
    if s.chars().any(|c| c.is_alphanumeric()) {
        Some(s.to_string())
    } else {
        None
    }
}

/// `Breakfast @ **Cafe Centrale**` → `Cafe Centrale`.
pub struct MarkerEmphasisMatcher {
    re: Option<Regex>,
}

impl MarkerEmphasisMatcher {
    pub fn new(marker: &str) -> Self {
        let pattern = format!(r"{}\s*\*\*([^*\n]+)\*\*", regex::escape(marker));
        let re = match Regex::new(&pattern) {
            Ok(re) => Some(re),
            Err(e) => {
                log::warn!("Marker pattern rejected — marker={:?} error={}", marker, e);
                None
            }
        };
        Self { re }
    }
}

impl Matcher for MarkerEmphasisMatcher {
    fn name(&self) -> &'static str {
        "marker-emphasis"
    }

    fn find(&self, text: &str) -> Vec<String> {
        let Some(re) = &self.re else {
            return Vec::new();
        };
        re.captures_iter(text)
            .filter_map(|caps| clean_capture(&caps[1]))
            .collect()
    }
}

/// Bold spans sitting inside `|`-framed table cells. Each line is split on
/// the pipes, so bold text in neighbouring cells is found independently.
pub struct TableCellEmphasisMatcher;

impl Matcher for TableCellEmphasisMatcher {
    fn name(&self) -> &'static str {
        "table-cell-emphasis"
    }

    fn find(&self, text: &str) -> Vec<String> {
        let mut found = Vec::new();
        for line in text.lines() {
            let segments: Vec<&str> = line.split('|').collect();
            // Fewer than two pipes means no framed cell on this line
            if segments.len() < 3 {
                continue;
            }
            for cell in &segments[1..segments.len() - 1] {
                found.extend(
                    bold_re()
                        .captures_iter(cell)
                        .filter_map(|caps| clean_capture(&caps[1])),
                );
            }
        }
        found
    }
}

/// Runs of two or more capitalised words: `Walt Disney World`, `Space Center`.
pub struct CapitalizedPhraseMatcher;

impl Matcher for CapitalizedPhraseMatcher {
    fn name(&self) -> &'static str {
        "capitalized-phrase"
    }

    fn find(&self, text: &str) -> Vec<String> {
        static PHRASE_RE: OnceLock<Regex> = OnceLock::new();
        let re = PHRASE_RE.get_or_init(|| Regex::new(r"[A-Z][a-z]+(?: [A-Z][a-z]+)+").unwrap());
        re.find_iter(text).map(|m| m.as_str().to_string()).collect()
    }
}

/// For every line containing one of the configured keywords, the first
/// capitalised phrase that runs through the keyword.
pub struct KeywordLineMatcher {
    patterns: Vec<(String, Regex)>,
}

impl KeywordLineMatcher {
    pub fn new(keywords: &[String]) -> Self {
        let patterns = keywords
            .iter()
            .filter(|kw| !kw.trim().is_empty())
            .filter_map(|kw| {
                let pattern = format!(
                    r"[A-Z][A-Za-z0-9'&. -]*{}[A-Za-z0-9'&. -]*",
                    regex::escape(kw)
                );
                match Regex::new(&pattern) {
                    Ok(re) => Some((kw.clone(), re)),
                    Err(e) => {
                        log::warn!("Keyword skipped — keyword={:?} error={}", kw, e);
                        None
                    }
                }
            })
            .collect();
        Self { patterns }
    }

    pub fn keyword_count(&self) -> usize {
        self.patterns.len()
    }
}

impl Matcher for KeywordLineMatcher {
    fn name(&self) -> &'static str {
        "keyword-line"
    }

    fn find(&self, text: &str) -> Vec<String> {
        let mut found = Vec::new();
        for line in text.split(['\n', '\r']) {
            for (keyword, re) in &self.patterns {
                if !line.contains(keyword.as_str()) {
                    continue;
                }
                if let Some(m) = re.find(line) {
                    let phrase = m.as_str().trim();
                    if phrase.chars().count() > 2 {
                        found.push(phrase.to_string());
                    }
                }
            }
        }
        found
    }
}
