//! Per-target baseline: what the server says to gibberish hostnames.

use crate::http::client::ProbeClient;
use crate::http::response::ProbeResponse;
use crate::util::{host_of, random_label};

/// Negative-control fingerprint for one target, built from three synthetic
/// probes. Written exactly once per target and never mutated afterwards.
#[derive(Debug, Clone, Default)]
pub struct Baseline {
    pub status_codes: Vec<u16>,
    pub titles: Vec<String>,
    pub bodies: Vec<String>,
    probes: usize,
}

impl Baseline {
    /// True when no synthetic probe got any response. An empty baseline
    /// short-circuits the classifier: nothing can be compared.
    pub fn is_empty(&self) -> bool {
        self.probes == 0
    }

    pub(crate) fn absorb(&mut self, response: ProbeResponse) {
        self.probes += 1;

        if !self.status_codes.contains(&response.status) {
            self.status_codes.push(response.status);
        }
        if !response.title.is_empty() && !self.titles.contains(&response.title) {
            self.titles.push(response.title);
        }
        self.bodies.push(response.body);
    }
}

/// Probe the target with three nonsense hostnames and collect the
/// fingerprint. Errored probes contribute nothing; the result is empty iff
/// all three failed. The session enforces the 30 s wall-clock cap.
pub async fn learn_baseline(client: &ProbeClient, target: &str) -> Baseline {
    let target_host = host_of(target).unwrap_or_default();

    let synthetic = [
        "testing.com".to_string(),
        format!("{}.{}", random_label(10), target_host),
        format!("{}.{}.com", random_label(5), random_label(5)),
    ];

    let mut baseline = Baseline::default();
    for vhost in &synthetic {
        match client.request(target, vhost).await {
            Ok(response) => baseline.absorb(response),
            Err(err) => {
                tracing::debug!(target = %target, vhost = %vhost, error = %err,
                    "baseline probe failed");
            }
        }
    }

    baseline
}
