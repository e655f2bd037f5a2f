//! Event Log: append-only campaign lifecycle log with best-effort
//! webhook fan-out.

use driftmail_common::types::CampaignId;
use driftmail_storage::{Event, EventRepository};
use reqwest::Client;
use tracing::warn;

/// `AddEvent` collaborator. Webhook endpoint management and signature
/// schemes are out of scope; this fans out a plain JSON POST to each
/// configured URL, fire-and-forget.
pub struct EventLog {
    repo: EventRepository,
    client: Client,
    webhook_urls: Vec<String>,
}

impl EventLog {
    pub fn new(repo: EventRepository, webhook_urls: Vec<String>) -> Self {
        Self {
            repo,
            client: Client::new(),
            webhook_urls,
        }
    }

    /// Persist an event and fan it out to every configured webhook
    /// endpoint (best-effort, failures logged, never propagated).
    pub async fn add_event(
        &self,
        campaign_id: CampaignId,
        email: Option<&str>,
        message: &str,
        details: Option<serde_json::Value>,
    ) -> Result<Event, sqlx::Error> {
        let event = self.repo.insert(campaign_id, email, message, details).await?;

        for url in &self.webhook_urls {
            let client = self.client.clone();
            let url = url.clone();
            let payload = serde_json::json!({
                "campaign_id": campaign_id,
                "message": event.message,
                "time": event.time,
                "details": event.details,
            });
            tokio::spawn(async move {
                if let Err(e) = client.post(&url).json(&payload).send().await {
                    warn!(url = %url, error = %e, "webhook delivery failed");
                }
            });
        }

        Ok(event)
    }
}
