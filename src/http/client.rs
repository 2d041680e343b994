//! HTTP probe client: one GET per candidate with a spoofed Host header.

use crate::core::config::ScanConfig;
use crate::errors::UmbraError;
use crate::http::response::ProbeResponse;
use crate::validation::similarity::extract_title;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONNECTION, HOST, USER_AGENT};
use reqwest::{redirect::Policy, Client};
use std::time::Duration;

/// Whole-request deadline.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
/// Connect (TCP + TLS handshake) budget within the deadline.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(7);
/// Body cap in minimal mode; the title must live in this prefix.
const MINIMAL_BODY_CAP: usize = 8 * 1024;
/// Body cap in full mode.
const MAX_BODY_BYTES: usize = 1024 * 1024;

pub struct ProbeClient {
    client: Client,
    default_headers: HeaderMap,
    minimal: bool,
}

impl ProbeClient {
    pub fn new(config: &ScanConfig) -> Result<Self, UmbraError> {
        let mut builder = Client::builder()
            .danger_accept_invalid_certs(true)
            .redirect(Policy::none())
            .timeout(REQUEST_TIMEOUT)
            .connect_timeout(CONNECT_TIMEOUT);

        if let Some(ref proxy_url) = config.proxy {
            let proxy = reqwest::Proxy::all(proxy_url).map_err(|source| {
                UmbraError::InvalidProxy {
                    url: proxy_url.clone(),
                    source,
                }
            })?;
            builder = builder.proxy(proxy);
        }

        let mut default_headers = HeaderMap::new();
        default_headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&config.user_agent)
                .unwrap_or_else(|_| HeaderValue::from_static("umbra/0.1")),
        );
        default_headers.insert(CONNECTION, HeaderValue::from_static("close"));

        // User headers win on conflict. Host stays ours: it is the probe.
        for (name, value) in &config.custom_headers {
            if let (Ok(name), Ok(value)) = (
                HeaderName::from_bytes(name.as_bytes()),
                HeaderValue::from_str(value),
            ) {
                if name != HOST {
                    default_headers.insert(name, value);
                }
            }
        }

        Ok(Self {
            client: builder.build()?,
            default_headers,
            minimal: config.minimal,
        })
    }

    /// Issue `GET target` with `Host: host`. Redirects are not followed;
    /// the first response is returned verbatim. Transport failure, timeout
    /// and cancellation all surface as one opaque error: the caller treats
    /// an errored probe as "no response".
    pub async fn request(&self, target: &str, host: &str) -> Result<ProbeResponse, UmbraError> {
        tracing::trace!(target = %target, vhost = %host, "sending probe");

        let host_value =
            HeaderValue::from_str(host).map_err(|_| UmbraError::InvalidHost(host.to_string()))?;

        let mut response = self
            .client
            .get(target)
            .headers(self.default_headers.clone())
            .header(HOST, host_value)
            .send()
            .await?;

        let status = response.status().as_u16();
        let declared = response.content_length();

        let cap = if self.minimal {
            MINIMAL_BODY_CAP
        } else {
            MAX_BODY_BYTES
        };

        let mut body = Vec::new();
        while let Some(chunk) = response.chunk().await? {
            let remaining = cap - body.len();
            if chunk.len() >= remaining {
                body.extend_from_slice(&chunk[..remaining]);
                break;
            }
            body.extend_from_slice(&chunk);
        }

        let body = String::from_utf8_lossy(&body).into_owned();
        let title = extract_title(&body);

        let length = match declared {
            Some(n) if n > 0 => n as usize,
            _ => body.len(),
        };

        Ok(ProbeResponse {
            status,
            body,
            title,
            length,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use warp::Filter;

    fn test_config() -> ScanConfig {
        ScanConfig {
            targets: vec![],
            wordlist: vec![],
            ..ScanConfig::default()
        }
    }

    #[tokio::test]
    async fn probe_carries_host_header_and_reads_title() {
        let route = warp::any()
            .and(warp::header::<String>("host"))
            .map(|host: String| {
                warp::reply::html(format!("<html><title>hello {}</title></html>", host))
            });
        let (addr, server) = warp::serve(route).bind_ephemeral(([127, 0, 0, 1], 0));
        tokio::spawn(server);

        let client = ProbeClient::new(&test_config()).unwrap();
        let resp = client
            .request(&format!("http://{}", addr), "admin.internal")
            .await
            .unwrap();

        assert_eq!(resp.status, 200);
        assert_eq!(resp.title, "hello admin.internal");
    }

    #[tokio::test]
    async fn probe_does_not_follow_redirects() {
        let route = warp::any().map(|| {
            warp::reply::with_header(
                warp::reply::with_status("moved", warp::http::StatusCode::FOUND),
                "location",
                "https://elsewhere.invalid/",
            )
        });
        let (addr, server) = warp::serve(route).bind_ephemeral(([127, 0, 0, 1], 0));
        tokio::spawn(server);

        let client = ProbeClient::new(&test_config()).unwrap();
        let resp = client
            .request(&format!("http://{}", addr), "x")
            .await
            .unwrap();

        assert_eq!(resp.status, 302);
        assert_eq!(resp.body, "moved");
    }

    #[tokio::test]
    async fn minimal_mode_caps_body_but_keeps_declared_length() {
        let big = "A".repeat(64 * 1024);
        let route = warp::any().map(move || big.clone());
        let (addr, server) = warp::serve(route).bind_ephemeral(([127, 0, 0, 1], 0));
        tokio::spawn(server);

        let mut config = test_config();
        config.minimal = true;
        let client = ProbeClient::new(&config).unwrap();
        let resp = client
            .request(&format!("http://{}", addr), "x")
            .await
            .unwrap();

        assert!(resp.body.len() <= 8 * 1024);
        assert_eq!(resp.length, 64 * 1024);
    }

    #[tokio::test]
    async fn transport_error_is_opaque() {
        let client = ProbeClient::new(&test_config()).unwrap();
        // Port 1 is essentially never listening on loopback.
        let err = client.request("http://127.0.0.1:1", "x").await;
        assert!(err.is_err());
    }

    #[test]
    fn bad_proxy_url_is_fatal() {
        let mut config = test_config();
        config.proxy = Some("::not a proxy::".to_string());
        let err = ProbeClient::new(&config);
        assert!(matches!(err, Err(UmbraError::InvalidProxy { .. })));
    }
}
