//! Outgoing email. The transport is a black box behind [`Notifier`].

use crate::error::NotifyError;
use async_trait::async_trait;
use std::sync::Mutex;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Message {
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, message: Message) -> Result<(), NotifyError>;
}

/// Writes messages to the log instead of delivering them.
#[derive(Clone, Debug, Default)]
pub struct TracingNotifier;

#[async_trait]
impl Notifier for TracingNotifier {
    async fn send(&self, message: Message) -> Result<(), NotifyError> {
        tracing::info!(to = %message.to, subject = %message.subject, "email not delivered (log-only notifier)");
        tracing::debug!(to = %message.to, body = %message.body, "undelivered email body");
        Ok(())
    }
}

/// Keeps every message in memory.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<Message>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<Message> {
        self.sent.lock().map(|m| m.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, message: Message) -> Result<(), NotifyError> {
        self.sent
            .lock()
            .map_err(|e| NotifyError::Unavailable(e.to_string()))?
            .push(message);
        Ok(())
    }
}
