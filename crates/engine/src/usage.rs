//! Store-backed adapter for the usage-accounting capability.

use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use steps::{UsageError, UsageRecorder};
use store::Store;

/// Appends usage records through the persistence layer.
pub struct StoreUsageRecorder {
    store: Arc<dyn Store>,
}

impl StoreUsageRecorder {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl UsageRecorder for StoreUsageRecorder {
    async fn record(
        &self,
        user_id: Uuid,
        action: &str,
        tokens: i64,
        cost: f64,
    ) -> Result<(), UsageError> {
        self.store
            .append_usage(user_id, action, tokens, cost)
            .await
            .map(|_| ())
            .map_err(|err| UsageError(err.to_string()))
    }
}
