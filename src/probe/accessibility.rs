//! Direct-accessibility probe.
//!
//! Decides whether a hostname is reachable on its own, without the
//! Host-header trick: it must resolve to a public address and answer a
//! plain GET over HTTP or HTTPS. Findings that fail this probe are shadow
//! vhosts. Results are memoized per process.

use crate::core::config::ScanConfig;
use crate::errors::UmbraError;
use hickory_resolver::TokioResolver;
use reqwest::{redirect::Policy, Client};
use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::{Arc, RwLock};
use std::time::Duration;

/// Per-attempt budget for the plain GET.
const ACCESS_TIMEOUT: Duration = Duration::from_secs(8);

pub struct AccessibilityProbe {
    resolver: Arc<TokioResolver>,
    client: Client,
    cache: RwLock<HashMap<String, bool>>,
}

impl AccessibilityProbe {
    pub fn new(config: &ScanConfig, resolver: Arc<TokioResolver>) -> Result<Self, UmbraError> {
        let mut builder = Client::builder()
            .danger_accept_invalid_certs(true)
            .redirect(Policy::none())
            .timeout(ACCESS_TIMEOUT)
            .user_agent(config.user_agent.clone());

        if let Some(ref proxy_url) = config.proxy {
            let proxy = reqwest::Proxy::all(proxy_url).map_err(|source| {
                UmbraError::InvalidProxy {
                    url: proxy_url.clone(),
                    source,
                }
            })?;
            builder = builder.proxy(proxy);
        }

        Ok(Self {
            resolver,
            client: builder.build()?,
            cache: RwLock::new(HashMap::new()),
        })
    }

    /// True when the hostname resolves to a public address and answers a
    /// plain GET. The first computed value for a hostname wins; concurrent
    /// callers observe it on every later query.
    pub async fn accessible(&self, hostname: &str) -> bool {
        if let Some(&cached) = self.cache.read().unwrap().get(hostname) {
            return cached;
        }

        let result = self.probe(hostname).await;

        let mut cache = self.cache.write().unwrap();
        *cache.entry(hostname.to_string()).or_insert(result)
    }

    async fn probe(&self, hostname: &str) -> bool {
        let lookup = match self.resolver.lookup_ip(hostname).await {
            Ok(lookup) => lookup,
            Err(err) => {
                tracing::debug!(host = %hostname, error = %err, "resolution failed");
                return false;
            }
        };

        let mut resolved_any = false;
        for ip in lookup.iter() {
            resolved_any = true;
            if is_non_public(ip) {
                tracing::debug!(host = %hostname, ip = %ip, "resolves to non-public address");
                return false;
            }
        }
        if !resolved_any {
            return false;
        }

        for scheme in ["http", "https"] {
            let url = format!("{}://{}/", scheme, hostname);
            if self.client.get(&url).send().await.is_ok() {
                tracing::debug!(host = %hostname, scheme, "directly accessible");
                return true;
            }
        }

        false
    }

    #[cfg(test)]
    pub(crate) fn seed(&self, hostname: &str, accessible: bool) {
        self.cache
            .write()
            .unwrap()
            .insert(hostname.to_string(), accessible);
    }
}

/// Loopback, RFC1918 and IPv6 ULA ranges count as "not publicly
/// accessible" for shadow classification.
fn is_non_public(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => v4.is_loopback() || v4.is_private(),
        IpAddr::V6(v6) => v6.is_loopback() || (v6.segments()[0] & 0xfe00) == 0xfc00,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hickory_resolver::name_server::TokioConnectionProvider;
    use std::net::{Ipv4Addr, Ipv6Addr};

    #[test]
    fn loopback_and_private_ranges_are_non_public() {
        assert!(is_non_public(IpAddr::V4(Ipv4Addr::LOCALHOST)));
        assert!(is_non_public(IpAddr::V4(Ipv4Addr::new(10, 1, 2, 3))));
        assert!(is_non_public(IpAddr::V4(Ipv4Addr::new(172, 16, 0, 1))));
        assert!(is_non_public(IpAddr::V4(Ipv4Addr::new(192, 168, 0, 1))));
        assert!(is_non_public(IpAddr::V6(Ipv6Addr::LOCALHOST)));
        assert!(is_non_public(IpAddr::V6("fd00::1".parse().unwrap())));
    }

    #[test]
    fn public_ranges_are_allowed() {
        assert!(!is_non_public(IpAddr::V4(Ipv4Addr::new(1, 1, 1, 1))));
        assert!(!is_non_public(IpAddr::V4(Ipv4Addr::new(93, 184, 216, 34))));
        assert!(!is_non_public(IpAddr::V6("2606:4700::1".parse().unwrap())));
    }

    #[tokio::test]
    async fn cached_verdict_is_stable_across_queries() {
        let resolver = Arc::new(
            TokioResolver::builder(TokioConnectionProvider::default())
                .expect("system resolver config")
                .build(),
        );
        let probe = AccessibilityProbe::new(&ScanConfig::default(), resolver).unwrap();

        probe.seed("cached.example", true);
        for _ in 0..3 {
            assert!(probe.accessible("cached.example").await);
        }

        probe.seed("cached.example", false);
        assert!(!probe.accessible("cached.example").await);
    }
}
