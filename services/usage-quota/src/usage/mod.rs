mod adapter;
mod error;
mod mock;
mod prometheus;
mod types;

pub use adapter::UsageAdapter;
pub use error::UsageError;
pub use mock::{MockBackend, MOCK_BYTES_USED};
pub use prometheus::{PrometheusBackend, PrometheusSettings};
pub use types::{ResourceKind, UsageQuery, UsageResult};

use async_trait::async_trait;

pub const PROMETHEUS_QUERY_PATH: &str = "/api/v1/query";

/// Capability of answering a [`UsageQuery`]. Implementations hold no per-request state.
#[async_trait]
pub trait UsageBackend: Send + Sync {
    fn name(&self) -> &'static str;

    async fn answer(&self, query: &UsageQuery) -> Result<UsageResult, UsageError>;
}
