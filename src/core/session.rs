//! Per-target scan session.
//!
//! Owns one target's lifecycle: aliveness check, baseline learning under a
//! wall-clock cap, then the bounded candidate fan-out with instability
//! watching. The baseline is built once and shared immutably with every
//! probe; classification after that point is a pure function of it.

use crate::core::config::ScanConfig;
use crate::core::events::{ScanEvent, TargetState};
use crate::core::stability::{classify_options, InstabilityDetector};
use crate::http::client::ProbeClient;
use crate::probe::accessibility::AccessibilityProbe;
use crate::reporting::model::Finding;
use crate::util::host_of;
use crate::validation::baseline::{learn_baseline, Baseline};
use crate::validation::classify::{is_vhost, ClassifyOptions};
use futures::stream::{self, StreamExt};
use hickory_resolver::TokioResolver;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};

/// Wall-clock cap on the whole baseline phase.
const BASELINE_TIMEOUT: Duration = Duration::from_secs(30);
/// Cadence of the instability watcher.
const UNSTABLE_POLL_INTERVAL: Duration = Duration::from_millis(500);

pub struct TargetSession {
    target: String,
    client: Arc<ProbeClient>,
    wordlist: Arc<Vec<String>>,
    config: Arc<ScanConfig>,
    detector: Arc<InstabilityDetector>,
    accessibility: Arc<AccessibilityProbe>,
    resolver: Arc<TokioResolver>,
}

enum ProbeOutcome {
    Hit(Finding),
    Miss,
    NoResponse,
    Cancelled,
}

impl TargetSession {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        target: String,
        client: Arc<ProbeClient>,
        wordlist: Arc<Vec<String>>,
        config: Arc<ScanConfig>,
        detector: Arc<InstabilityDetector>,
        accessibility: Arc<AccessibilityProbe>,
        resolver: Arc<TokioResolver>,
    ) -> Self {
        Self {
            target,
            client,
            wordlist,
            config,
            detector,
            accessibility,
            resolver,
        }
    }

    /// Scan the target, emitting progress and finding events. Per-session
    /// progress always sums to the wordlist length, whether the session
    /// completes, aborts or never starts.
    pub async fn run(&self, events: &mpsc::UnboundedSender<ScanEvent>) -> (Vec<Finding>, TargetState) {
        let total = self.wordlist.len() as u64;

        if !self.alive_check().await {
            tracing::info!(target = %self.target, "target is not alive, skipping");
            return self.finish(events, total, TargetState::Skipped, Vec::new());
        }

        tracing::debug!(target = %self.target, "learning baseline");
        let learned =
            tokio::time::timeout(BASELINE_TIMEOUT, learn_baseline(&self.client, &self.target))
                .await;

        let baseline = match learned {
            Ok(baseline) if !baseline.is_empty() => Arc::new(baseline),
            Ok(_) => {
                tracing::warn!(target = %self.target, "no baseline probe got a response");
                self.detector.mark_unstable(&self.target);
                return self.finish(events, total, TargetState::UnstableAborted, Vec::new());
            }
            Err(_) => {
                tracing::warn!(target = %self.target, "baseline phase timed out");
                self.detector.mark_unstable(&self.target);
                return self.finish(events, total, TargetState::UnstableAborted, Vec::new());
            }
        };

        tracing::debug!(
            target = %self.target,
            statuses = ?baseline.status_codes,
            titles = ?baseline.titles,
            "baseline installed, scanning"
        );

        let opts = classify_options(&self.config);
        let target_host = host_of(&self.target).unwrap_or_default();

        let (cancel_tx, cancel_rx) = watch::channel(false);
        let watcher = self.spawn_unstable_watcher(cancel_tx);

        let mut probes = stream::iter(self.wordlist.iter().cloned())
            .map(|word| {
                let vhost = self.compose(&word, &target_host);
                self.probe_candidate(vhost, baseline.clone(), opts, cancel_rx.clone())
            })
            .buffer_unordered(self.config.candidate_concurrency);

        let mut findings = Vec::new();
        while let Some(outcome) = probes.next().await {
            let _ = events.send(ScanEvent::Progress {
                target: self.target.clone(),
                advanced: 1,
            });

            if let ProbeOutcome::Hit(finding) = outcome {
                // Late-racing hits on a condemned target are discarded.
                if !self.detector.is_unstable(&self.target) {
                    let _ = events.send(ScanEvent::Finding(finding.clone()));
                    findings.push(finding);
                }
            }
        }
        drop(probes);
        watcher.abort();

        if self.detector.is_unstable(&self.target) {
            return self.finish(events, 0, TargetState::UnstableAborted, Vec::new());
        }

        tracing::debug!(target = %self.target, found = findings.len(), "session complete");
        self.finish(events, 0, TargetState::Completed, findings)
    }

    /// Emit any outstanding progress plus the terminal state event.
    fn finish(
        &self,
        events: &mpsc::UnboundedSender<ScanEvent>,
        remaining: u64,
        state: TargetState,
        findings: Vec<Finding>,
    ) -> (Vec<Finding>, TargetState) {
        if remaining > 0 {
            let _ = events.send(ScanEvent::Progress {
                target: self.target.clone(),
                advanced: remaining,
            });
        }
        let _ = events.send(ScanEvent::TargetFinished {
            target: self.target.clone(),
            state,
        });
        (findings, state)
    }

    /// DNS for the target host plus one GET that returns any response.
    async fn alive_check(&self) -> bool {
        let Some(host) = host_of(&self.target) else {
            return false;
        };

        if self.resolver.lookup_ip(host.as_str()).await.is_err() {
            return false;
        }

        self.client.request(&self.target, &host).await.is_ok()
    }

    fn compose(&self, word: &str, target_host: &str) -> String {
        if self.config.append_domain && !word.contains('.') && !target_host.is_empty() {
            format!("{}.{}", word, target_host)
        } else {
            word.to_string()
        }
    }

    async fn probe_candidate(
        &self,
        vhost: String,
        baseline: Arc<Baseline>,
        opts: ClassifyOptions,
        mut cancel_rx: watch::Receiver<bool>,
    ) -> ProbeOutcome {
        if *cancel_rx.borrow() || self.detector.is_unstable(&self.target) {
            return ProbeOutcome::Cancelled;
        }

        let response = tokio::select! {
            _ = cancel_rx.changed() => return ProbeOutcome::Cancelled,
            result = self.client.request(&self.target, &vhost) => match result {
                Ok(response) => response,
                Err(_) => return ProbeOutcome::NoResponse,
            },
        };

        let hit = is_vhost(&baseline, &response, &opts);
        self.detector
            .observe(&self.target, &vhost, hit, &self.client, &baseline, &opts)
            .await;

        if !hit {
            return ProbeOutcome::Miss;
        }
        if self.detector.is_unstable(&self.target) {
            return ProbeOutcome::Cancelled;
        }

        let accessible = self.accessibility.accessible(&vhost).await;

        ProbeOutcome::Hit(Finding {
            target: self.target.clone(),
            vhost,
            status_code: response.status,
            title: response.title,
            content_length: response.length,
            accessible,
        })
    }

    /// Cancellation must take effect even between candidate dispatches, so
    /// a parallel watcher polls the instability flag on a fixed cadence.
    fn spawn_unstable_watcher(&self, cancel_tx: watch::Sender<bool>) -> tokio::task::JoinHandle<()> {
        let detector = self.detector.clone();
        let target = self.target.clone();

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(UNSTABLE_POLL_INTERVAL);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                if detector.is_unstable(&target) {
                    let _ = cancel_tx.send(true);
                    return;
                }
            }
        })
    }
}
