//! SMTP Transport collaborator contract.
//!
//! The core hands batches of [`DispatchEntry`] to a `Transport`
//! implementation and trusts it to call exactly one of
//! [`DispatchCallback::success`] / [`DispatchCallback::error`] per entry.
//! This crate ships one production implementation (`LettreTransport`) and,
//! under `#[cfg(test)]`, an in-memory double used in place of the
//! teacher's `wiremock` fakes (SMTP over `lettre` does not speak HTTP).

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use driftmail_common::types::Rid;
use driftmail_storage::SendingProfile;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::{debug, warn};

/// One piece of addressed, rendered mail to hand to Transport.
#[derive(Debug, Clone)]
pub struct DispatchEntry {
    pub rid: Rid,
    pub to: String,
    pub from: String,
    pub subject: String,
    pub text: Option<String>,
    pub html: Option<String>,
}

/// Per-entry outcome callback. Transport calls exactly one
/// of these per entry it was handed.
#[async_trait]
pub trait DispatchCallback: Send + Sync {
    async fn success(&self, rid: Rid);
    async fn error(&self, rid: Rid, err: String);
}

/// Transport collaborator contract.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send a batch of entries through the given sending profile,
    /// reporting each outcome via `callback`.
    async fn send_batch(
        &self,
        profile: &SendingProfile,
        entries: Vec<DispatchEntry>,
        callback: Arc<dyn DispatchCallback>,
    );
}

/// Production `Transport` backed by `lettre`'s async SMTP client.
pub struct LettreTransport;

impl LettreTransport {
    pub fn new() -> Self {
        Self
    }

    fn build_message(entry: &DispatchEntry) -> Result<Message, String> {
        let from: Mailbox = entry.from.parse().map_err(|e| format!("invalid from address: {e}"))?;
        let to: Mailbox = entry.to.parse().map_err(|e| format!("invalid to address: {e}"))?;

        let builder = Message::builder().from(from).to(to).subject(&entry.subject);

        let message = match (&entry.html, &entry.text) {
            (Some(html), Some(text)) => builder.multipart(
                lettre::message::MultiPart::alternative()
                    .singlepart(lettre::message::SinglePart::plain(text.clone()))
                    .singlepart(lettre::message::SinglePart::html(html.clone())),
            ),
            (Some(html), None) => builder.body(html.clone()),
            (None, Some(text)) => builder.body(text.clone()),
            (None, None) => builder.body(String::new()),
        };

        message.map_err(|e| format!("failed to build message: {e}"))
    }
}

impl Default for LettreTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for LettreTransport {
    async fn send_batch(
        &self,
        profile: &SendingProfile,
        entries: Vec<DispatchEntry>,
        callback: Arc<dyn DispatchCallback>,
    ) {
        let mut builder = if profile.ignore_cert_errors {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&profile.host)
        } else {
            match AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&profile.host) {
                Ok(b) => b,
                Err(e) => {
                    warn!(host = %profile.host, error = %e, "failed to build SMTP transport");
                    for entry in entries {
                        callback.error(entry.rid, e.to_string()).await;
                    }
                    return;
                }
            }
        };

        if let (Some(username), Some(password)) = (&profile.username, &profile.password) {
            builder = builder.credentials(Credentials::new(username.clone(), password.clone()));
        }

        let mailer = builder.timeout(Some(Duration::from_secs(30))).build();

        for entry in entries {
            let rid = entry.rid.clone();
            let message = match Self::build_message(&entry) {
                Ok(m) => m,
                Err(e) => {
                    callback.error(rid, e).await;
                    continue;
                }
            };

            match mailer.send(message).await {
                Ok(_) => {
                    debug!(rid = %rid, "mail sent");
                    callback.success(rid).await;
                }
                Err(e) => {
                    callback.error(rid, e.to_string()).await;
                }
            }
        }
    }
}

#[cfg(test)]
pub mod test_support {
    use super::*;
    use std::sync::Mutex;

    /// In-memory `Transport` double recording every batch handed to it
    /// and invoking the callback synchronously with a configurable
    /// outcome.
    #[derive(Default)]
    pub struct InMemoryTransport {
        pub sent: Mutex<Vec<DispatchEntry>>,
        pub fail_rids: Mutex<Vec<Rid>>,
    }

    impl InMemoryTransport {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn fail(&self, rid: Rid) {
            self.fail_rids.lock().unwrap().push(rid);
        }
    }

    #[async_trait]
    impl Transport for InMemoryTransport {
        async fn send_batch(
            &self,
            _profile: &SendingProfile,
            entries: Vec<DispatchEntry>,
            callback: Arc<dyn DispatchCallback>,
        ) {
            for entry in entries {
                let should_fail = self.fail_rids.lock().unwrap().contains(&entry.rid);
                self.sent.lock().unwrap().push(entry.clone());
                if should_fail {
                    callback.error(entry.rid, "simulated failure".to_string()).await;
                } else {
                    callback.success(entry.rid).await;
                }
            }
        }
    }
}
