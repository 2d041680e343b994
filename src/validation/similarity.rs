//! Title extraction and the body similarity metric.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

static TITLE_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<title>\s*(.*?)\s*</title>").unwrap());

/// Pull the contents of the first `<title>` tag, case-insensitively.
/// Returns an empty string when the tag is absent or never closed.
pub fn extract_title(body: &str) -> String {
    TITLE_REGEX
        .captures(body)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .unwrap_or_default()
}

/// Jaccard similarity over character bigram shingles, scaled to 0..=100.
///
/// Symmetric; identical inputs score 100, shingle-disjoint inputs score 0.
/// "Clearly the same page" lands well above 50, which is what the
/// classifier's threshold is calibrated against.
pub fn similarity(a: &str, b: &str) -> f64 {
    if a == b {
        return 100.0;
    }

    let sa = shingles(a);
    let sb = shingles(b);
    if sa.is_empty() || sb.is_empty() {
        return 0.0;
    }

    let intersection = sa.intersection(&sb).count();
    let union = sa.len() + sb.len() - intersection;
    intersection as f64 * 100.0 / union as f64
}

fn shingles(text: &str) -> HashSet<(char, char)> {
    let chars: Vec<char> = text.chars().collect();
    chars.windows(2).map(|w| (w[0], w[1])).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn title_basic_and_case_insensitive() {
        assert_eq!(extract_title("<html><title>Login</title></html>"), "Login");
        assert_eq!(extract_title("<TITLE>  Admin Panel </TITLE>"), "Admin Panel");
    }

    #[test]
    fn title_spans_newlines() {
        assert_eq!(extract_title("<title>\n  two\nlines\n</title>"), "two\nlines");
    }

    #[test]
    fn title_missing_or_unclosed_is_empty() {
        assert_eq!(extract_title("<html><body>no title</body></html>"), "");
        assert_eq!(extract_title("<title>never closed"), "");
        assert_eq!(extract_title(""), "");
    }

    #[test]
    fn identical_inputs_score_100() {
        assert_eq!(similarity("", ""), 100.0);
        assert_eq!(similarity("same page", "same page"), 100.0);
    }

    #[test]
    fn disjoint_inputs_score_0() {
        assert_eq!(similarity("aaaa", "bbbb"), 0.0);
        assert_eq!(similarity("abcdef", "uvwxyz"), 0.0);
    }

    #[test]
    fn metric_is_symmetric() {
        let a = "<html><body>Welcome to the default site</body></html>";
        let b = "<html><body>Welcome to the admin panel</body></html>";
        assert_eq!(similarity(a, b), similarity(b, a));
    }

    #[test]
    fn near_identical_pages_score_high() {
        let a = "<html><body>Index of / -- generated 2024-01-01</body></html>";
        let b = "<html><body>Index of / -- generated 2024-01-02</body></html>";
        assert!(similarity(a, b) > 50.0);
    }

    #[test]
    fn unrelated_pages_score_low() {
        let a = "404 page not found";
        let b = "<html><head><title>Corporate intranet portal</title></head>\
                 <body>Quarterly reports, HR self-service, internal wiki</body></html>";
        assert!(similarity(a, b) < 50.0);
    }
}
