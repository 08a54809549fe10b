use std::sync::Arc;

use tracing::{info, instrument, warn};

use super::mock::MockBackend;
use super::prometheus::{PrometheusBackend, PrometheusSettings};
use super::{UsageBackend, UsageError, UsageQuery, UsageResult};
use crate::config::{BackendMode, ServiceConfig};
use crate::identity::Identity;

/// Entry point for usage lookups. Cheap to clone; the backend is shared.
#[derive(Clone)]
pub struct UsageAdapter {
    backend: Arc<dyn UsageBackend>,
}

impl UsageAdapter {
    pub fn new(backend: Arc<dyn UsageBackend>) -> Self {
        Self { backend }
    }

    /// Build the adapter with the backend selected by `BACKEND_MODE`.
    pub fn from_config(config: &ServiceConfig) -> anyhow::Result<Self> {
        let backend: Arc<dyn UsageBackend> = match config.backend_mode {
            BackendMode::Mock => Arc::new(MockBackend::new(config.default_quota_bytes)),
            BackendMode::Live => {
                Arc::new(PrometheusBackend::new(PrometheusSettings::from_config(config)?)?)
            }
        };
        Ok(Self::new(backend))
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    /// Query the storage usage of `identity`. Every call hits the backend.
    #[instrument(skip(self, identity), fields(identity = %identity, backend = self.backend.name()))]
    pub async fn fetch(&self, identity: &Identity) -> Result<UsageResult, UsageError> {
        let query = UsageQuery::storage(identity.clone());
        let start = std::time::Instant::now();

        match self.backend.answer(&query).await {
            Ok(result) => {
                info!(
                    bytes_used = result.bytes_used,
                    bytes_quota = result.bytes_quota,
                    latency_ms = start.elapsed().as_millis(),
                    "Usage query completed"
                );
                Ok(result)
            }
            Err(err) => {
                warn!(
                    error = %err,
                    latency_ms = start.elapsed().as_millis(),
                    "Usage query failed"
                );
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct FailingBackend;

    #[async_trait]
    impl UsageBackend for FailingBackend {
        fn name(&self) -> &'static str {
            "failing"
        }

        async fn answer(&self, _query: &UsageQuery) -> Result<UsageResult, UsageError> {
            Err(UsageError::BackendUnavailable("connection refused".to_string()))
        }
    }

    #[tokio::test]
    async fn mock_mode_is_selected_by_default() {
        let adapter = UsageAdapter::from_config(&ServiceConfig::default()).unwrap();
        assert_eq!(adapter.backend_name(), "mock");
    }

    #[tokio::test]
    async fn live_mode_builds_prometheus_backend() {
        let config = ServiceConfig {
            backend_mode: BackendMode::Live,
            metrics_endpoint_url: Some("http://prometheus:9090".to_string()),
            ..ServiceConfig::default()
        };
        let adapter = UsageAdapter::from_config(&config).unwrap();
        assert_eq!(adapter.backend_name(), "prometheus");
    }

    #[tokio::test]
    async fn backend_errors_are_passed_through() {
        let adapter = UsageAdapter::new(Arc::new(FailingBackend));
        let identity = Identity::new("alice").unwrap();

        let err = adapter.fetch(&identity).await.unwrap_err();
        assert!(matches!(err, UsageError::BackendUnavailable(_)));
    }
}
