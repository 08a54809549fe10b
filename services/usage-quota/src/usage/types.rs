use chrono::{DateTime, Utc};
use std::fmt;

use crate::identity::Identity;

/// Kind of resource a query asks about. New kinds are added as variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ResourceKind {
    Storage,
}

impl ResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Storage => "storage",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsageQuery {
    identity: Identity,
    kind: ResourceKind,
}

impl UsageQuery {
    pub fn new(identity: Identity, kind: ResourceKind) -> Self {
        Self { identity, kind }
    }

    pub fn storage(identity: Identity) -> Self {
        Self::new(identity, ResourceKind::Storage)
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn kind(&self) -> ResourceKind {
        self.kind
    }
}

/// Normalized answer of a backend. `bytes_used` may exceed `bytes_quota`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsageResult {
    pub bytes_used: u64,
    pub bytes_quota: u64,
    pub sampled_at: Option<DateTime<Utc>>,
    /// Username the backend attributed the series to, when it reports one.
    pub username: Option<String>,
}

impl UsageResult {
    pub fn new(bytes_used: u64, bytes_quota: u64) -> Self {
        Self {
            bytes_used,
            bytes_quota,
            sampled_at: None,
            username: None,
        }
    }

    pub fn with_sampled_at(mut self, sampled_at: DateTime<Utc>) -> Self {
        self.sampled_at = Some(sampled_at);
        self
    }

    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }
}
