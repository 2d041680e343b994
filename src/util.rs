//! Small shared helpers: URL normalization, random labels, line files.

use rand::rngs::OsRng;
use rand::Rng;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use url::Url;

/// Normalize a target URL: default to https when no scheme is given and
/// strip a single trailing slash. The normalized string is the target's
/// identity for the whole scan.
pub fn normalize_url(raw: &str) -> String {
    let raw = raw.trim();
    let with_scheme = if raw.starts_with("http://") || raw.starts_with("https://") {
        raw.to_string()
    } else {
        format!("https://{}", raw)
    };

    with_scheme.trim_end_matches('/').to_string()
}

/// Extract the hostname of a target URL.
pub fn host_of(target: &str) -> Option<String> {
    let parsed = Url::parse(target).ok()?;
    parsed.host_str().map(|h| h.to_string())
}

const LABEL_CHARSET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// Random lowercase-alphanumeric label from the OS CSPRNG.
pub fn random_label(length: usize) -> String {
    let mut out = String::with_capacity(length);
    for _ in 0..length {
        let idx = OsRng.gen_range(0..LABEL_CHARSET.len());
        out.push(LABEL_CHARSET[idx] as char);
    }
    out
}

/// Read a line-oriented input file (targets or wordlist). Lines are
/// trimmed; blank lines and `#` comments are skipped.
pub fn read_lines(path: &Path) -> std::io::Result<Vec<String>> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);

    let mut lines = Vec::new();
    for line in reader.lines() {
        let line = line?;
        let trimmed = line.trim();
        if !trimmed.is_empty() && !trimmed.starts_with('#') {
            lines.push(trimmed.to_string());
        }
    }
    Ok(lines)
}

/// Parse repeated `Name: Value` header arguments into a map.
/// Malformed entries are silently dropped.
pub fn parse_header_args(raw: &[String]) -> HashMap<String, String> {
    let mut headers = HashMap::new();
    for entry in raw {
        if let Some((name, value)) = entry.split_once(':') {
            let name = name.trim();
            if !name.is_empty() {
                headers.insert(name.to_string(), value.trim().to_string());
            }
        }
    }
    headers
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_adds_https_scheme() {
        assert_eq!(normalize_url("example.com"), "https://example.com");
        assert_eq!(normalize_url("http://example.com"), "http://example.com");
    }

    #[test]
    fn normalize_strips_trailing_slash() {
        assert_eq!(normalize_url("https://example.com/"), "https://example.com");
        assert_eq!(
            normalize_url("https://example.com/app/"),
            "https://example.com/app"
        );
    }

    #[test]
    fn host_of_extracts_hostname() {
        assert_eq!(
            host_of("https://example.com:8443/path"),
            Some("example.com".to_string())
        );
        assert_eq!(host_of("http://10.0.0.1"), Some("10.0.0.1".to_string()));
        assert_eq!(host_of("not a url"), None);
    }

    #[test]
    fn random_label_charset_and_length() {
        for len in [1, 5, 10, 32] {
            let label = random_label(len);
            assert_eq!(label.len(), len);
            assert!(label.bytes().all(|b| LABEL_CHARSET.contains(&b)));
        }
    }

    #[test]
    fn parse_headers_trims_and_skips_malformed() {
        let raw = vec![
            "X-Forwarded-For: 127.0.0.1".to_string(),
            "broken".to_string(),
            " Accept : text/html ".to_string(),
        ];
        let parsed = parse_header_args(&raw);
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed["X-Forwarded-For"], "127.0.0.1");
        assert_eq!(parsed["Accept"], "text/html");
    }
}
