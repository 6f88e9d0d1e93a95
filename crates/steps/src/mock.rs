//! Test doubles for the step capabilities.
//!
//! `MockHandler` stands in for any registered handler in unit and
//! integration tests; the recorders cover the usage-accounting seam.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;
use uuid::Uuid;

use crate::action::StepAction;
use crate::error::StepError;
use crate::traits::{StepContext, StepHandler};
use crate::usage::{UsageError, UsageRecorder};

/// Behaviour injected into `MockHandler` at construction time.
pub enum MockBehaviour {
    /// Return a specific JSON value.
    ReturnValue(Value),
    /// Return the (already interpolated) action the handler received,
    /// serialised — lets tests observe what the engine resolved.
    EchoAction,
    /// Fail with a config error carrying this message.
    Fail(String),
}

/// A mock handler that records every action it receives and returns a
/// programmer-specified result.
pub struct MockHandler {
    /// Label used in test assertions.
    pub name: String,
    pub behaviour: MockBehaviour,
    /// All actions seen by this handler (in call order).
    pub calls: Arc<Mutex<Vec<StepAction>>>,
}

impl MockHandler {
    fn with_behaviour(name: impl Into<String>, behaviour: MockBehaviour) -> Arc<Self> {
        Arc::new(Self {
            name: name.into(),
            behaviour,
            calls: Arc::new(Mutex::new(Vec::new())),
        })
    }

    /// A mock that always succeeds with the given value.
    pub fn returning(name: impl Into<String>, value: Value) -> Arc<Self> {
        Self::with_behaviour(name, MockBehaviour::ReturnValue(value))
    }

    /// A mock that reflects the interpolated action back as its result.
    pub fn echoing(name: impl Into<String>) -> Arc<Self> {
        Self::with_behaviour(name, MockBehaviour::EchoAction)
    }

    /// A mock that always fails.
    pub fn failing(name: impl Into<String>, message: impl Into<String>) -> Arc<Self> {
        Self::with_behaviour(name, MockBehaviour::Fail(message.into()))
    }

    /// Number of times this handler has been invoked.
    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl StepHandler for MockHandler {
    async fn process(&self, action: &StepAction, _ctx: &StepContext) -> Result<Value, StepError> {
        self.calls.lock().unwrap().push(action.clone());

        match &self.behaviour {
            MockBehaviour::ReturnValue(value) => Ok(value.clone()),
            MockBehaviour::EchoAction => serde_json::to_value(action)
                .map_err(|e| StepError::Config(format!("unserialisable action: {e}"))),
            MockBehaviour::Fail(message) => Err(StepError::Config(message.clone())),
        }
    }
}

/// In-memory usage recorder for assertions.
#[derive(Default)]
pub struct MemoryRecorder {
    pub rows: Mutex<Vec<(Uuid, String, i64, f64)>>,
}

#[async_trait]
impl UsageRecorder for MemoryRecorder {
    async fn record(
        &self,
        user_id: Uuid,
        action: &str,
        tokens: i64,
        cost: f64,
    ) -> Result<(), UsageError> {
        self.rows
            .lock()
            .unwrap()
            .push((user_id, action.to_owned(), tokens, cost));
        Ok(())
    }
}

/// A recorder whose every append fails.
pub struct RejectingRecorder;

#[async_trait]
impl UsageRecorder for RejectingRecorder {
    async fn record(&self, _: Uuid, _: &str, _: i64, _: f64) -> Result<(), UsageError> {
        Err(UsageError("append rejected".into()))
    }
}
