//! The difference classifier: is this response a real virtual host?

use crate::http::response::ProbeResponse;
use crate::validation::baseline::Baseline;
use crate::validation::similarity::similarity;

pub const DEFAULT_SIMILARITY_THRESHOLD: f64 = 50.0;

#[derive(Debug, Clone, Copy)]
pub struct ClassifyOptions {
    /// Skip the body similarity step entirely (cheaper, lower recall).
    pub minimal: bool,
    /// A candidate body must fall below this score against *every*
    /// baseline body to count as different.
    pub similarity_threshold: f64,
}

impl Default for ClassifyOptions {
    fn default() -> Self {
        Self {
            minimal: false,
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
        }
    }
}

/// Pure decision over `(baseline, response)`, evaluated top to bottom:
///
/// 1. empty baseline -> not a vhost (nothing to compare against)
/// 2. status code never seen in the baseline -> vhost
/// 3. non-empty title never seen in the baseline -> vhost
/// 4. body dissimilar to every baseline body -> vhost (skipped in minimal)
pub fn is_vhost(baseline: &Baseline, response: &ProbeResponse, opts: &ClassifyOptions) -> bool {
    if baseline.is_empty() {
        return false;
    }

    if !baseline.status_codes.contains(&response.status) {
        return true;
    }

    if !response.title.is_empty() && !baseline.titles.contains(&response.title) {
        return true;
    }

    if opts.minimal {
        return false;
    }

    baseline
        .bodies
        .iter()
        .all(|body| similarity(&response.body, body) < opts.similarity_threshold)
}
