//! Scan configuration for the engine.

use crate::validation::classify::DEFAULT_SIMILARITY_THRESHOLD;
use std::collections::HashMap;
use std::path::PathBuf;

pub const DEFAULT_TARGET_CONCURRENCY: usize = 3;
pub const DEFAULT_CANDIDATE_CONCURRENCY: usize = 5;
pub const DEFAULT_USER_AGENT: &str = "umbra/0.1";

#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Normalized target URLs, in input order.
    pub targets: Vec<String>,
    /// Candidate hostnames, in input order.
    pub wordlist: Vec<String>,
    /// Upper bound on simultaneously scanned targets.
    pub target_concurrency: usize,
    /// Per-target probe parallelism.
    pub candidate_concurrency: usize,
    /// Skip body similarity and cap body reads at 8 KiB.
    pub minimal: bool,
    /// Pre-filter the wordlist down to hostnames that are *not* directly
    /// accessible before scanning starts.
    pub internal: bool,
    /// Compose dotless candidates as `<candidate>.<target-host>` instead of
    /// sending them literally.
    pub append_domain: bool,
    /// Enables the incremental sink when set.
    pub output_path: Option<PathBuf>,
    pub user_agent: String,
    /// Extra headers merged into every probe; they win on conflict.
    pub custom_headers: HashMap<String, String>,
    /// Upstream HTTP proxy for all probes.
    pub proxy: Option<String>,
    pub similarity_threshold: f64,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            targets: Vec::new(),
            wordlist: Vec::new(),
            target_concurrency: DEFAULT_TARGET_CONCURRENCY,
            candidate_concurrency: DEFAULT_CANDIDATE_CONCURRENCY,
            minimal: false,
            internal: false,
            append_domain: false,
            output_path: None,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            custom_headers: HashMap::new(),
            proxy: None,
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
        }
    }
}

impl ScanConfig {
    /// Clamp the concurrency knobs to their minimum of 1.
    pub fn sanitized(mut self) -> Self {
        self.target_concurrency = self.target_concurrency.max(1);
        self.candidate_concurrency = self.candidate_concurrency.max(1);
        self
    }
}
