//! `@username` mention extraction.

use once_cell::sync::Lazy;
use regex::Regex;

static MENTION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"@(\w+)").expect("mention pattern is valid"));

/// Usernames mentioned in `content`, de-duplicated in first-seen order.
pub fn extract_mentions(content: &str) -> Vec<String> {
    let mut found: Vec<String> = Vec::new();
    for cap in MENTION_RE.captures_iter(content) {
        let username = &cap[1];
        if !found.iter().any(|u| u == username) {
            found.push(username.to_string());
        }
    }
    found
}
