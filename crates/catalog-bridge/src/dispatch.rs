//! Background delivery of webhook-triggered sends.
//!
//! Handlers only `submit`; the outcome of a task is observable through logs alone.

use tokio::sync::mpsc;
use tracing::{error, info, warn};

use crate::sender::CatalogSender;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogTask {
    pub recipient: String,
}

#[derive(Clone)]
pub struct TaskQueue {
    tx: mpsc::UnboundedSender<CatalogTask>,
}

impl TaskQueue {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<CatalogTask>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Never waits. Returns `false` when no worker is consuming the queue anymore.
    pub fn submit(&self, task: CatalogTask) -> bool {
        match self.tx.send(task) {
            Ok(()) => true,
            Err(mpsc::error::SendError(task)) => {
                warn!(recipient = %task.recipient, "dispatcher stopped; catalog task dropped");
                false
            }
        }
    }
}

/// Runs until every `TaskQueue` handle is dropped. Tasks run concurrently.
pub async fn run_worker(mut rx: mpsc::UnboundedReceiver<CatalogTask>, sender: CatalogSender) {
    while let Some(task) = rx.recv().await {
        let sender = sender.clone();
        tokio::spawn(async move {
            match sender.send(&task.recipient).await {
                Ok(receipt) => info!(
                    recipient = %task.recipient,
                    message_id = receipt.message_id.as_deref().unwrap_or("-"),
                    "catalog delivered"
                ),
                Err(err) => error!(recipient = %task.recipient, error = %err, "catalog delivery failed"),
            }
        });
    }
}
