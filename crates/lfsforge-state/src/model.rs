use chrono::{DateTime, Utc};
use lfsforge_core::Status;
use serde::{Deserialize, Serialize};

/// Verified checksum recorded for one fetched source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceRecord {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sha256: Option<String>,
}

/// Content hash and on-disk location of a package's built artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackageArtifact {
    pub path: String,
    pub sha256: String,
}

/// Durable per-package record of phase outcomes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackageState {
    pub package: String,
    pub status: Status,
    /// Last phase attempted, e.g. `"make"`, `"install"`.
    pub phase: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sources: Vec<SourceRecord>,
    /// Short commit id recorded by a git fetch.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commit: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub package_artifact: Option<PackageArtifact>,
}

impl PackageState {
    pub fn new(package: impl Into<String>, status: Status, phase: impl Into<String>) -> Self {
        Self {
            package: package.into(),
            status,
            phase: phase.into(),
            reason: None,
            timestamp: Utc::now(),
            sources: Vec::new(),
            commit: None,
            package_artifact: None,
        }
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }
}
