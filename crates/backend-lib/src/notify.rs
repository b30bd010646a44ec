// ============================
// inkwell-backend-lib/src/notify.rs
// ============================
//! Outbound notification contract and the emailed links it carries.
use async_trait::async_trait;
use inkwell_common::UserId;
use parking_lot::Mutex;
use thiserror::Error;

/// Delivery failure reported by a notifier
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NotifyError {
    #[error("message rejected: {0}")]
    Rejected(String),

    #[error("transport unavailable: {0}")]
    Unavailable(String),
}

/// Sends a message to a set of recipients. Only success or failure matters
/// to the caller; no retries happen on this side.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, recipients: &[String], subject: &str, body: &str) -> Result<(), NotifyError>;
}

/// A message captured by [`MemoryOutbox`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    pub recipients: Vec<String>,
    pub subject: String,
    pub body: String,
}

/// Notifier that records every message in memory
#[derive(Default)]
pub struct MemoryOutbox {
    sent: Mutex<Vec<OutboundMessage>>,
}

impl MemoryOutbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all delivered messages, oldest first
    pub fn messages(&self) -> Vec<OutboundMessage> {
        self.sent.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.sent.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl Notifier for MemoryOutbox {
    async fn send(&self, recipients: &[String], subject: &str, body: &str) -> Result<(), NotifyError> {
        self.sent.lock().push(OutboundMessage {
            recipients: recipients.to_vec(),
            subject: subject.to_string(),
            body: body.to_string(),
        });
        Ok(())
    }
}

/// Notifier that only writes a log line. Bodies carry live tokens, so only
/// their length is logged.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

#[async_trait]
impl Notifier for TracingNotifier {
    async fn send(&self, recipients: &[String], subject: &str, body: &str) -> Result<(), NotifyError> {
        if recipients.is_empty() {
            return Err(NotifyError::Rejected("no recipients".to_string()));
        }
        tracing::info!(
            recipients = %recipients.join(","),
            subject,
            body_len = body.len(),
            "notification dispatched"
        );
        Ok(())
    }
}

/// Builds the absolute links embedded in account emails
#[derive(Debug, Clone)]
pub struct LinkBuilder {
    base: String,
}

impl LinkBuilder {
    pub fn new(base_url: &str) -> Self {
        Self {
            base: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// `GET` link that activates an inactive account
    pub fn activation(&self, user_id: UserId) -> String {
        format!("{}/user/{}/activate", self.base, user_id)
    }

    /// Link that lets the holder set a new password for `user_id`
    pub fn password_update(&self, user_id: UserId, token: &str) -> String {
        format!("{}/password/{}/update?token={}", self.base, user_id, token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_links() {
        let links = LinkBuilder::new("https://blog.example.com/");
        assert_eq!(
            links.activation(UserId(3)),
            "https://blog.example.com/user/3/activate"
        );
        assert_eq!(
            links.password_update(UserId(3), "a.b.c"),
            "https://blog.example.com/password/3/update?token=a.b.c"
        );
    }

    #[tokio::test]
    async fn test_memory_outbox_records_messages() {
        let outbox = MemoryOutbox::new();
        outbox
            .send(&["alice@x.com".to_string()], "Activate Account", "link")
            .await
            .unwrap();

        let messages = outbox.messages();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].recipients, vec!["alice@x.com".to_string()]);
        assert_eq!(messages[0].subject, "Activate Account");
    }

    #[tokio::test]
    async fn test_tracing_notifier_requires_recipients() {
        let err = TracingNotifier.send(&[], "subject", "body").await.unwrap_err();
        assert!(matches!(err, NotifyError::Rejected(_)));
    }
}
