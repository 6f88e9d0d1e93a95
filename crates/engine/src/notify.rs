//! The state-transition notification capability.
//!
//! Published on every execution status change.  Delivery is best-effort
//! and never required for correctness, so the trait is infallible and
//! implementations swallow their own transport errors.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::mpsc;
use uuid::Uuid;

use store::ExecutionStatus;

/// One state transition of one execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionEvent {
    pub execution_id: Uuid,
    pub workflow_id: Uuid,
    pub status: ExecutionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn publish(&self, event: ExecutionEvent);
}

/// The default sink: drop every event.
pub struct NoopNotifier;

#[async_trait]
impl Notifier for NoopNotifier {
    async fn publish(&self, _event: ExecutionEvent) {}
}

/// Forward events onto an in-process channel — used by tests and by any
/// future realtime layer that wants to fan events out to subscribers.
pub struct ChannelNotifier {
    tx: mpsc::UnboundedSender<ExecutionEvent>,
}

impl ChannelNotifier {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ExecutionEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

#[async_trait]
impl Notifier for ChannelNotifier {
    async fn publish(&self, event: ExecutionEvent) {
        // A closed receiver just means nobody is listening any more.
        let _ = self.tx.send(event);
    }
}
