//! Scan engine: two-level bounded scheduling over targets and candidates.
//!
//! Up to `target_concurrency` sessions run at once; each session bounds its
//! own candidate fan-out. Findings from all sessions converge on one
//! collector, which drives the incremental sink and forwards events to an
//! optional subscriber.

use crate::core::config::ScanConfig;
use crate::core::events::ScanEvent;
use crate::core::session::TargetSession;
use crate::core::stability::InstabilityDetector;
use crate::errors::UmbraError;
use crate::http::client::ProbeClient;
use crate::probe::accessibility::AccessibilityProbe;
use crate::reporting::model::Finding;
use crate::reporting::sink::IncrementalSink;
use futures::stream::{self, StreamExt};
use hickory_resolver::config::ResolverConfig;
use hickory_resolver::name_server::TokioConnectionProvider;
use hickory_resolver::TokioResolver;
use std::sync::Arc;
use tokio::sync::mpsc;

pub struct Engine {
    config: ScanConfig,
    client: Arc<ProbeClient>,
    detector: Arc<InstabilityDetector>,
    accessibility: Arc<AccessibilityProbe>,
    resolver: Arc<TokioResolver>,
    sink: Arc<IncrementalSink>,
    events: Option<mpsc::UnboundedSender<ScanEvent>>,
}

impl Engine {
    /// Build the engine. Fails fast on a bad proxy URL, an empty target
    /// list, or an unwritable output path.
    pub fn new(config: ScanConfig) -> Result<Self, UmbraError> {
        let config = config.sanitized();

        if config.targets.is_empty() {
            return Err(UmbraError::NoTargets);
        }

        let client = Arc::new(ProbeClient::new(&config)?);
        let resolver = Arc::new(build_resolver());
        let accessibility = Arc::new(AccessibilityProbe::new(&config, resolver.clone())?);

        let sink = Arc::new(IncrementalSink::new(config.output_path.clone()));
        sink.initialize()?;

        Ok(Self {
            config,
            client,
            detector: Arc::new(InstabilityDetector::new()),
            accessibility,
            resolver,
            sink,
            events: None,
        })
    }

    /// Receive every progress, finding and lifecycle event of the next
    /// `run()`. Events stop when the engine is dropped.
    pub fn subscribe(&mut self) -> mpsc::UnboundedReceiver<ScanEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.events = Some(tx);
        rx
    }

    /// Run the whole scan and return the confirmed findings, excluding any
    /// target that ended up marked unstable.
    pub async fn run(&self) -> Result<Vec<Finding>, UmbraError> {
        let wordlist = Arc::new(self.effective_wordlist().await);

        tracing::info!(
            targets = self.config.targets.len(),
            candidates = wordlist.len(),
            "starting scan"
        );

        let (tx, rx) = mpsc::unbounded_channel::<ScanEvent>();
        let collector = self.spawn_collector(rx);

        let config = Arc::new(self.config.clone());
        stream::iter(self.config.targets.clone())
            .map(|target| {
                let session = TargetSession::new(
                    target,
                    self.client.clone(),
                    wordlist.clone(),
                    config.clone(),
                    self.detector.clone(),
                    self.accessibility.clone(),
                    self.resolver.clone(),
                );
                let tx = tx.clone();
                async move { session.run(&tx).await }
            })
            .buffer_unordered(self.config.target_concurrency)
            .collect::<Vec<_>>()
            .await;
        drop(tx);

        let mut findings = collector
            .await
            .map_err(|err| UmbraError::Task(err.to_string()))?;

        // A target can be condemned after its last finding was collected;
        // drop those from both the result and the persisted document.
        findings.retain(|f| !self.detector.is_unstable(&f.target));
        if self.sink.enabled() {
            if let Err(err) = self.sink.write_snapshot(&self.detector.unstable_snapshot()) {
                tracing::warn!(error = %err, "failed to write final results");
            }
        }

        tracing::info!(findings = findings.len(), "scan complete");
        Ok(findings)
    }

    fn spawn_collector(
        &self,
        mut rx: mpsc::UnboundedReceiver<ScanEvent>,
    ) -> tokio::task::JoinHandle<Vec<Finding>> {
        let sink = self.sink.clone();
        let detector = self.detector.clone();
        let external = self.events.clone();

        tokio::spawn(async move {
            let mut confirmed = Vec::new();

            while let Some(event) = rx.recv().await {
                if let ScanEvent::Finding(finding) = &event {
                    if !detector.is_unstable(&finding.target) {
                        tracing::info!(
                            "{} - {} [{}] [{}]",
                            finding.target,
                            finding.vhost,
                            finding.status_code,
                            finding.title
                        );

                        sink.record(finding.clone());
                        if let Err(err) = sink.write_snapshot(&detector.unstable_snapshot()) {
                            tracing::warn!(error = %err, "failed to write incremental results");
                        }

                        confirmed.push(finding.clone());
                    }
                }

                if let Some(external) = &external {
                    let _ = external.send(event);
                }
            }

            confirmed
        })
    }

    /// In `internal` mode the wordlist is reduced, before any scanning
    /// request, to hostnames the accessibility probe cannot reach directly.
    async fn effective_wordlist(&self) -> Vec<String> {
        if !self.config.internal {
            return self.config.wordlist.clone();
        }

        let before = self.config.wordlist.len();
        tracing::info!("filtering wordlist down to non-accessible hostnames");

        let kept: Vec<Option<String>> = stream::iter(self.config.wordlist.clone())
            .map(|word| {
                let accessibility = self.accessibility.clone();
                async move {
                    if accessibility.accessible(&word).await {
                        None
                    } else {
                        Some(word)
                    }
                }
            })
            .buffered(self.config.candidate_concurrency)
            .collect()
            .await;

        let kept: Vec<String> = kept.into_iter().flatten().collect();
        tracing::info!(before, after = kept.len(), "wordlist filtered");
        kept
    }
}

fn build_resolver() -> TokioResolver {
    match TokioResolver::builder(TokioConnectionProvider::default()) {
        Ok(builder) => builder.build(),
        Err(err) => {
            tracing::debug!(error = %err, "system resolver config unavailable, using defaults");
            TokioResolver::builder_with_config(
                ResolverConfig::default(),
                TokioConnectionProvider::default(),
            )
            .build()
        }
    }
}
