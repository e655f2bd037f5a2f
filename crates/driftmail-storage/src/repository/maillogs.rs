//! MailLog repository: the send queue

use chrono::{DateTime, Utc};
use driftmail_common::types::{CampaignId, Rid, ScenarioId, TemplateId, UserId};
use sqlx::{PgPool, Postgres, Transaction};

use crate::models::{MailLog, NewMailLog};

/// MailLog repository
#[derive(Clone)]
pub struct MailLogRepository {
    pool: PgPool,
}

impl MailLogRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a batch of MailLog rows as part of the Scheduler's single
    /// transaction.
    pub async fn insert_batch_in_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        entries: &[NewMailLog],
    ) -> Result<(), sqlx::Error> {
        for m in entries {
            sqlx::query(
                r#"
                INSERT INTO maillogs (
                    id, user_id, campaign_id, rid, send_date, processing,
                    scenario_id, template_id, campaign_context
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, NULL)
                "#,
            )
            .bind(m.id)
            .bind(m.user_id)
            .bind(m.campaign_id)
            .bind(&m.rid)
            .bind(m.send_date)
            .bind(m.processing)
            .bind(m.scenario_id)
            .bind(m.template_id)
            .execute(&mut **tx)
            .await?;
        }
        Ok(())
    }

    /// Atomically lease up to `batch_size` due, unleased MailLogs
    ///. Rows already
    /// `processing` are left untouched; no per-row locking is used.
    pub async fn lease_due(
        &self,
        now: DateTime<Utc>,
        batch_size: i64,
    ) -> Result<Vec<MailLog>, sqlx::Error> {
        sqlx::query_as::<_, MailLog>(
            r#"
            UPDATE maillogs SET processing = true
            WHERE id IN (
                SELECT id FROM maillogs
                WHERE processing = false AND send_date <= $1
                ORDER BY send_date ASC
                LIMIT $2
                FOR UPDATE SKIP LOCKED
            )
            RETURNING *
            "#,
        )
        .bind(now)
        .bind(batch_size)
        .fetch_all(&self.pool)
        .await
    }

    /// MailLogs for a given (campaign, scenario, template) triple,
    /// regardless of lease state. Used by `LaunchCampaign` to release a
    /// campaign's entries for immediate send.
    pub async fn by_campaign_scenario_template(
        &self,
        campaign_id: CampaignId,
        scenario_id: ScenarioId,
        template_id: TemplateId,
    ) -> Result<Vec<MailLog>, sqlx::Error> {
        sqlx::query_as::<_, MailLog>(
            "SELECT * FROM maillogs WHERE campaign_id = $1 AND scenario_id = $2 AND template_id = $3",
        )
        .bind(campaign_id)
        .bind(scenario_id)
        .bind(template_id)
        .fetch_all(&self.pool)
        .await
    }

    /// Release a lease without sending, used when a leased entry turns
    /// out to be future-dated.
    pub async fn release(&self, id: uuid::Uuid) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE maillogs SET processing = false WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Lease a specific entry, used by `LaunchCampaign` for due entries
    /// it picked up outside the normal tick.
    pub async fn mark_processing(&self, id: uuid::Uuid) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE maillogs SET processing = true WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Attach cached campaign/profile context to a leased entry.
    pub async fn attach_context(
        &self,
        id: uuid::Uuid,
        context: serde_json::Value,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE maillogs SET campaign_context = $2 WHERE id = $1")
            .bind(id)
            .bind(context)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Remove a MailLog once its Result has reached a terminal state.
    pub async fn delete_by_rid(&self, rid: &Rid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM maillogs WHERE rid = $1")
            .bind(rid)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete every MailLog belonging to a campaign, as part of a larger
    /// transaction.
    pub async fn delete_by_campaign_in_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        campaign_id: CampaignId,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM maillogs WHERE campaign_id = $1")
            .bind(campaign_id)
            .execute(&mut **tx)
            .await?;
        Ok(result.rows_affected())
    }

    /// Total remaining MailLogs for a campaign, across both leased and
    /// unleased rows.
    pub async fn count_by_campaign(&self, campaign_id: CampaignId) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM maillogs WHERE campaign_id = $1")
            .bind(campaign_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}
