use serde::{Deserialize, Serialize};

/// A confirmed virtual host on one target.
#[derive(Debug, Clone, PartialEq)]
pub struct Finding {
    pub target: String,
    pub vhost: String,
    pub status_code: u16,
    pub title: String,
    pub content_length: usize,
    pub accessible: bool,
}

/// One entry of the persisted document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VhostEntry {
    pub vhost: String,
    pub status_code: u16,
    pub title: String,
    pub content_length: usize,
    pub accessible: bool,
}

/// Findings for a single target, merged and de-duplicated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetReport {
    pub target: String,
    pub vhosts: Vec<VhostEntry>,
}

impl From<&Finding> for VhostEntry {
    fn from(finding: &Finding) -> Self {
        Self {
            vhost: finding.vhost.clone(),
            status_code: finding.status_code,
            title: finding.title.clone(),
            content_length: finding.content_length,
            accessible: finding.accessible,
        }
    }
}
