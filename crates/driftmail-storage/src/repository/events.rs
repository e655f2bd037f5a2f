//! Event repository: append-only campaign lifecycle log

use driftmail_common::types::CampaignId;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::models::Event;

/// Event repository
#[derive(Clone)]
pub struct EventRepository {
    pool: PgPool,
}

impl EventRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Append an event row.
    pub async fn insert(
        &self,
        campaign_id: CampaignId,
        email: Option<&str>,
        message: &str,
        details: Option<serde_json::Value>,
    ) -> Result<Event, sqlx::Error> {
        sqlx::query_as::<_, Event>(
            r#"
            INSERT INTO events (id, campaign_id, email, time, message, details)
            VALUES ($1, $2, $3, now(), $4, $5)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(campaign_id)
        .bind(email)
        .bind(message)
        .bind(details)
        .fetch_one(&self.pool)
        .await
    }

    /// All events for a campaign, oldest first.
    pub async fn list_by_campaign(&self, campaign_id: CampaignId) -> Result<Vec<Event>, sqlx::Error> {
        sqlx::query_as::<_, Event>("SELECT * FROM events WHERE campaign_id = $1 ORDER BY time ASC")
            .bind(campaign_id)
            .fetch_all(&self.pool)
            .await
    }

    /// Delete every event belonging to a campaign, as part of a larger
    /// transaction.
    pub async fn delete_by_campaign_in_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        campaign_id: CampaignId,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM events WHERE campaign_id = $1")
            .bind(campaign_id)
            .execute(&mut **tx)
            .await?;
        Ok(result.rows_affected())
    }
}
