//! Adaptive unstable-host detection.
//!
//! Some servers answer positively to any Host value; scanning them only
//! produces noise. The detector watches the stream of classified candidates
//! per target and promotes a target to "unstable" when the evidence says its
//! hits cannot be trusted. Instability is monotone: once set, it stays set,
//! and the owning session cancels its remaining work.

use crate::core::config::ScanConfig;
use crate::http::client::ProbeClient;
use crate::util::random_label;
use crate::validation::baseline::Baseline;
use crate::validation::classify::{is_vhost, ClassifyOptions};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

/// Hits in a row before the verification sweep runs.
const CONSECUTIVE_HIT_LIMIT: u32 = 3;
/// Sweep probes that must classify as hits to condemn the target.
const SWEEP_HIT_LIMIT: usize = 2;

#[derive(Default)]
pub struct InstabilityDetector {
    unstable: Mutex<HashSet<String>>,
    consecutive_hits: Mutex<HashMap<String, u32>>,
    checked_targets: Mutex<HashSet<String>>,
}

impl InstabilityDetector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_unstable(&self, target: &str) -> bool {
        self.unstable.lock().unwrap().contains(target)
    }

    pub fn mark_unstable(&self, target: &str) {
        let mut unstable = self.unstable.lock().unwrap();
        if unstable.insert(target.to_string()) {
            tracing::warn!(target = %target, "target marked unstable, aborting its scan");
        }
    }

    pub fn unstable_snapshot(&self) -> HashSet<String> {
        self.unstable.lock().unwrap().clone()
    }

    /// Feed one classified candidate into the detector. May issue extra
    /// probes (sibling check, verification sweep) and mark the target
    /// unstable as a side effect.
    pub async fn observe(
        &self,
        target: &str,
        candidate: &str,
        is_hit: bool,
        client: &ProbeClient,
        baseline: &Baseline,
        opts: &ClassifyOptions,
    ) {
        if self.is_unstable(target) {
            return;
        }

        if !is_hit {
            self.consecutive_hits
                .lock()
                .unwrap()
                .insert(target.to_string(), 0);
            return;
        }

        let first_hit = self.checked_targets.lock().unwrap().insert(target.to_string());
        if first_hit && self.sibling_also_hits(target, candidate, client, baseline, opts).await {
            self.mark_unstable(target);
            return;
        }

        let hits = {
            let mut map = self.consecutive_hits.lock().unwrap();
            let entry = map.entry(target.to_string()).or_insert(0);
            *entry += 1;
            *entry
        };

        if hits == CONSECUTIVE_HIT_LIMIT
            && self.verification_sweep(target, client, baseline, opts).await
        {
            self.mark_unstable(target);
        }
    }

    /// First-hit sanity check: perturb the candidate's leftmost label and
    /// re-probe. A server that also claims the perturbed sibling is treating
    /// the whole namespace as real.
    async fn sibling_also_hits(
        &self,
        target: &str,
        candidate: &str,
        client: &ProbeClient,
        baseline: &Baseline,
        opts: &ClassifyOptions,
    ) -> bool {
        let sibling = sibling_of(candidate);
        tracing::debug!(target = %target, candidate = %candidate, sibling = %sibling,
            "first hit, probing perturbed sibling");

        match client.request(target, &sibling).await {
            Ok(response) => is_vhost(baseline, &response, opts),
            Err(_) => false,
        }
    }

    /// Probe three fully random hostnames; two or more hits condemn the
    /// target.
    async fn verification_sweep(
        &self,
        target: &str,
        client: &ProbeClient,
        baseline: &Baseline,
        opts: &ClassifyOptions,
    ) -> bool {
        let sweep = [
            format!("{}.com", random_label(12)),
            format!("{}.{}.org", random_label(8), random_label(6)),
            format!("{}.{}.net", random_label(10), random_label(7)),
        ];

        let mut hits = 0;
        for vhost in &sweep {
            if let Ok(response) = client.request(target, vhost).await {
                if is_vhost(baseline, &response, opts) {
                    hits += 1;
                }
            }
        }

        tracing::debug!(target = %target, hits, "verification sweep finished");
        hits >= SWEEP_HIT_LIMIT
    }
}

/// Classify options for the detector's own probes, derived from the scan
/// configuration.
pub fn classify_options(config: &ScanConfig) -> ClassifyOptions {
    ClassifyOptions {
        minimal: config.minimal,
        similarity_threshold: config.similarity_threshold,
    }
}

/// Synthesize the perturbed sibling of a candidate: the leftmost label gets
/// a random suffix, or a dotless candidate gets a random label prefixed.
pub fn sibling_of(candidate: &str) -> String {
    match candidate.split_once('.') {
        Some((label, rest)) => format!("{}{}.{}", label, random_label(8), rest),
        None => format!("{}.{}", random_label(8), candidate),
    }
}
