use regex::Regex;
use std::sync::OnceLock;

/// Destination named by the itinerary's title line, e.g.
/// `# Orlando, Florida – June 3 → June 7` gives `Orlando, Florida`.
///
/// Only the first level-1 heading is considered. The destination is the text
/// before the first date separator (en dash, em dash or a spaced hyphen).
pub fn parse_heading(text: &str) -> Option<String> {
    static HEADING_RE: OnceLock<Regex> = OnceLock::new();
    let re = HEADING_RE.get_or_init(|| Regex::new(r"(?m)^[ \t]*#[ \t]+([^\r\n]+)").unwrap());

    let title = re.captures(text)?.get(1)?.as_str();
    let cut = [" - ", "–", "—", "|"]
        .iter()
        .filter_map(|sep| title.find(sep))
        .min()
        .unwrap_or(title.len());

    let destination = title[..cut].replace("**", "");
    let destination = destination.trim().trim_end_matches(':').trim();
    if destination.chars().any(|c| c.is_alphabetic()) {
        Some(destination.to_string())
    } else {
        None
    }
}
