use async_trait::async_trait;
use tracing::debug;

use super::{UsageBackend, UsageError, UsageQuery, UsageResult};

pub const MOCK_BYTES_USED: u64 = 5_000_000_000;

/// Fixed answer for environments without a metrics system.
pub struct MockBackend {
    bytes_quota: u64,
}

impl MockBackend {
    pub fn new(bytes_quota: u64) -> Self {
        Self { bytes_quota }
    }
}

#[async_trait]
impl UsageBackend for MockBackend {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn answer(&self, query: &UsageQuery) -> Result<UsageResult, UsageError> {
        debug!(identity = %query.identity(), kind = %query.kind(), "Answering from mock backend");
        Ok(UsageResult::new(MOCK_BYTES_USED, self.bytes_quota))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::Identity;

    #[tokio::test]
    async fn answer_does_not_depend_on_identity() {
        let backend = MockBackend::new(10_000_000_000);
        let mut answers = Vec::new();
        for name in ["alice", "bob", "user-with-dashes", "ünïcødé", "a"] {
            let query = UsageQuery::storage(Identity::new(name).unwrap());
            answers.push(backend.answer(&query).await.unwrap());
        }

        assert!(answers.iter().all(|answer| answer == &answers[0]));
        assert_eq!(answers[0], UsageResult::new(5_000_000_000, 10_000_000_000));
        assert!(answers[0].sampled_at.is_none());
    }

    #[tokio::test]
    async fn quota_comes_from_configuration() {
        let backend = MockBackend::new(2_000_000_000);
        let query = UsageQuery::storage(Identity::new("alice").unwrap());
        let result = backend.answer(&query).await.unwrap();
        assert_eq!(result.bytes_quota, 2_000_000_000);
        assert_eq!(result.bytes_used, MOCK_BYTES_USED);
    }
}
