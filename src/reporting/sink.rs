//! Incremental result sink.
//!
//! After every new finding the full accumulated result set is re-serialized
//! and atomically swapped into place (sibling temp file + rename), so the
//! output file is valid JSON at every instant, including across a crash.

use crate::errors::UmbraError;
use crate::reporting::model::{Finding, TargetReport, VhostEntry};
use std::collections::HashSet;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tempfile::NamedTempFile;

pub struct IncrementalSink {
    path: Option<PathBuf>,
    findings: Mutex<Vec<Finding>>,
}

impl IncrementalSink {
    pub fn new(path: Option<PathBuf>) -> Self {
        Self {
            path,
            findings: Mutex::new(Vec::new()),
        }
    }

    pub fn enabled(&self) -> bool {
        self.path.is_some()
    }

    /// Write the (empty) document once so unwritable paths fail the scan
    /// before any probe is sent.
    pub fn initialize(&self) -> Result<(), UmbraError> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        write_atomic(path, &[]).map_err(|source| UmbraError::OutputInit {
            path: path.clone(),
            source,
        })
    }

    pub fn record(&self, finding: Finding) {
        self.findings.lock().unwrap().push(finding);
    }

    /// Serialize everything recorded so far, excluding targets currently
    /// marked unstable. Unstable filtering happens at write time: a target
    /// condemned after its findings were recorded disappears from the next
    /// snapshot without rewriting history.
    pub fn write_snapshot(&self, unstable: &HashSet<String>) -> Result<(), UmbraError> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        let findings = self.findings.lock().unwrap();
        let reports = render(&findings, unstable);
        write_atomic(path, &reports)?;
        Ok(())
    }

    /// The document that would be written right now.
    pub fn snapshot(&self, unstable: &HashSet<String>) -> Vec<TargetReport> {
        let findings = self.findings.lock().unwrap();
        render(&findings, unstable)
    }
}

/// Merge findings into per-target entries, de-duplicated by
/// (target, vhost), ordered by first occurrence. A pure function of the
/// accumulated findings, so repeated writes of the same set are
/// byte-identical.
fn render(findings: &[Finding], unstable: &HashSet<String>) -> Vec<TargetReport> {
    let mut reports: Vec<TargetReport> = Vec::new();
    let mut seen: HashSet<(String, String)> = HashSet::new();

    for finding in findings {
        if unstable.contains(&finding.target) {
            continue;
        }
        if !seen.insert((finding.target.clone(), finding.vhost.clone())) {
            continue;
        }

        match reports.iter_mut().find(|r| r.target == finding.target) {
            Some(report) => report.vhosts.push(VhostEntry::from(finding)),
            None => reports.push(TargetReport {
                target: finding.target.clone(),
                vhosts: vec![VhostEntry::from(finding)],
            }),
        }
    }

    reports
}

fn write_atomic(path: &Path, reports: &[TargetReport]) -> std::io::Result<()> {
    let dir = path.parent().filter(|p| !p.as_os_str().is_empty());
    let mut tmp = match dir {
        Some(dir) => NamedTempFile::new_in(dir)?,
        None => NamedTempFile::new_in(".")?,
    };

    let body = serde_json::to_vec_pretty(reports)?;
    tmp.write_all(&body)?;
    tmp.write_all(b"\n")?;
    tmp.flush()?;

    // A failed persist drops the temp file, leaving the previous document
    // untouched.
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn finding(target: &str, vhost: &str) -> Finding {
        Finding {
            target: target.to_string(),
            vhost: vhost.to_string(),
            status_code: 200,
            title: "Admin".to_string(),
            content_length: 128,
            accessible: false,
        }
    }

    fn temp_output() -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("results.json");
        (dir, path)
    }

    #[test]
    fn disabled_sink_is_a_no_op() {
        let sink = IncrementalSink::new(None);
        sink.initialize().unwrap();
        sink.record(finding("https://a", "admin.a"));
        sink.write_snapshot(&HashSet::new()).unwrap();
    }

    #[test]
    fn initialize_writes_an_empty_document() {
        let (_dir, path) = temp_output();
        let sink = IncrementalSink::new(Some(path.clone()));
        sink.initialize().unwrap();

        let parsed: Vec<TargetReport> =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert!(parsed.is_empty());
    }

    #[test]
    fn initialize_fails_on_unwritable_path() {
        let sink = IncrementalSink::new(Some(PathBuf::from(
            "/nonexistent-umbra-dir/results.json",
        )));
        assert!(matches!(
            sink.initialize(),
            Err(UmbraError::OutputInit { .. })
        ));
    }

    #[test]
    fn findings_merge_by_target_and_dedupe_by_pair() {
        let (_dir, path) = temp_output();
        let sink = IncrementalSink::new(Some(path.clone()));

        sink.record(finding("https://a", "admin.a"));
        sink.record(finding("https://b", "admin.b"));
        sink.record(finding("https://a", "mail.a"));
        sink.record(finding("https://a", "admin.a"));
        sink.write_snapshot(&HashSet::new()).unwrap();

        let parsed: Vec<TargetReport> =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0].target, "https://a");
        assert_eq!(parsed[0].vhosts.len(), 2);
        assert_eq!(parsed[1].target, "https://b");
        assert_eq!(parsed[1].vhosts.len(), 1);
    }

    #[test]
    fn unstable_targets_are_filtered_at_write_time() {
        let (_dir, path) = temp_output();
        let sink = IncrementalSink::new(Some(path.clone()));

        sink.record(finding("https://a", "admin.a"));
        sink.record(finding("https://b", "admin.b"));
        sink.write_snapshot(&HashSet::new()).unwrap();

        let mut unstable = HashSet::new();
        unstable.insert("https://a".to_string());
        sink.write_snapshot(&unstable).unwrap();

        let parsed: Vec<TargetReport> =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].target, "https://b");
    }

    #[test]
    fn repeated_writes_are_byte_identical() {
        let (_dir, path) = temp_output();
        let sink = IncrementalSink::new(Some(path.clone()));

        sink.record(finding("https://a", "admin.a"));
        sink.record(finding("https://a", "mail.a"));

        sink.write_snapshot(&HashSet::new()).unwrap();
        let first = std::fs::read(&path).unwrap();
        sink.write_snapshot(&HashSet::new()).unwrap();
        let second = std::fs::read(&path).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn serialize_roundtrip_is_a_fixed_point() {
        let reports = vec![TargetReport {
            target: "https://a".to_string(),
            vhosts: vec![VhostEntry {
                vhost: "admin.a".to_string(),
                status_code: 200,
                title: "Admin".to_string(),
                content_length: 128,
                accessible: true,
            }],
        }];

        let once = serde_json::to_string_pretty(&reports).unwrap();
        let parsed: Vec<TargetReport> = serde_json::from_str(&once).unwrap();
        let twice = serde_json::to_string_pretty(&parsed).unwrap();
        assert_eq!(once, twice);
    }
}
