//! `queue` crate — the in-process job channel.
//!
//! A FIFO of messages with one producing side and any number of consuming
//! worker loops.  Delivery is at-most-once: the single receiver is guarded
//! by an async mutex, so a message handed to one consumer is never seen by
//! another.  Dropping every [`Producer`] closes the channel; consumers then
//! drain the backlog and receive `None`, which is the shutdown signal for
//! worker loops.
//!
//! Durability is layered on top by the caller: the submission path journals
//! each message as a row before sending it here, and a recovery pass can
//! re-enqueue journalled messages after a restart.

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::{mpsc, Mutex};

/// Errors surfaced by the queue.
#[derive(Debug, Error)]
pub enum QueueError {
    /// Every consumer is gone; the message was not enqueued.
    #[error("queue is closed")]
    Closed,
}

/// Create a connected producer/consumer pair.
///
/// The [`Consumer`] is cheaply cloneable; give one clone to each worker.
pub fn channel<T>() -> (Producer<T>, Consumer<T>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (
        Producer { tx },
        Consumer {
            rx: Arc::new(Mutex::new(rx)),
        },
    )
}

/// Sending half of the queue.
pub struct Producer<T> {
    tx: mpsc::UnboundedSender<T>,
}

impl<T> Clone for Producer<T> {
    fn clone(&self) -> Self {
        Self { tx: self.tx.clone() }
    }
}

impl<T> Producer<T> {
    /// Enqueue a message at the tail of the FIFO.
    pub fn send(&self, message: T) -> Result<(), QueueError> {
        self.tx.send(message).map_err(|_| QueueError::Closed)
    }
}

/// Receiving half of the queue, shared between worker loops.
pub struct Consumer<T> {
    rx: Arc<Mutex<mpsc::UnboundedReceiver<T>>>,
}

impl<T> Clone for Consumer<T> {
    fn clone(&self) -> Self {
        Self { rx: Arc::clone(&self.rx) }
    }
}

impl<T> Consumer<T> {
    /// Dequeue the next message, suspending while the queue is empty.
    ///
    /// Returns `None` once the channel is closed and fully drained.  The
    /// mutex is held across the `recv().await`, which is what guarantees a
    /// message reaches exactly one consumer.
    pub async fn recv(&self) -> Option<T> {
        let mut rx = self.rx.lock().await;
        rx.recv().await
    }
}
