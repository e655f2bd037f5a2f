//! Campaign repository

use chrono::Utc;
use driftmail_common::types::{CampaignId, ScenarioId, TemplateId, UserId};
use sqlx::{PgPool, Postgres, Transaction};

use crate::models::{Campaign, CampaignStats, CampaignStatus, NewCampaign};

/// Campaign repository
#[derive(Clone)]
pub struct CampaignRepository {
    pool: PgPool,
}

impl CampaignRepository {
    /// Create a new campaign repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a campaign row and its scenario junction rows as part of the
    /// Scheduler's single transaction.
    pub async fn create_in_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        campaign: &NewCampaign,
    ) -> Result<Campaign, sqlx::Error> {
        let row = sqlx::query_as::<_, Campaign>(
            r#"
            INSERT INTO campaigns (
                id, user_id, name, created_date, launch_date, send_by_date,
                completed_date, status, profile_id, start_time, end_time, location
            )
            VALUES ($1, $2, $3, $4, $5, $6, NULL, $7, $8, $9, $10, $11)
            RETURNING *
            "#,
        )
        .bind(campaign.id)
        .bind(campaign.user_id)
        .bind(&campaign.name)
        .bind(campaign.created_date)
        .bind(campaign.launch_date)
        .bind(campaign.send_by_date)
        .bind(campaign.status)
        .bind(campaign.profile_id)
        .bind(campaign.start_time)
        .bind(campaign.end_time)
        .bind(&campaign.location)
        .fetch_one(&mut **tx)
        .await?;

        for scenario_id in &campaign.scenario_ids {
            sqlx::query("INSERT INTO campaign_scenarios (campaign_id, scenario_id) VALUES ($1, $2)")
                .bind(campaign.id)
                .bind(scenario_id)
                .execute(&mut **tx)
                .await?;
        }

        Ok(row)
    }

    /// Get a campaign by ID
    pub async fn get(&self, id: CampaignId) -> Result<Option<Campaign>, sqlx::Error> {
        sqlx::query_as::<_, Campaign>("SELECT * FROM campaigns WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    /// Get a campaign by ID under the acting user's ownership.
    pub async fn get_owned(
        &self,
        id: CampaignId,
        user_id: UserId,
    ) -> Result<Option<Campaign>, sqlx::Error> {
        sqlx::query_as::<_, Campaign>("SELECT * FROM campaigns WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
    }

    /// Transition a campaign to `in-progress`. A no-op if
    /// the campaign is already `in-progress` or `complete`.
    pub async fn mark_in_progress(&self, id: CampaignId) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE campaigns SET status = $2 WHERE id = $1 AND status = $3",
        )
        .bind(id)
        .bind(CampaignStatus::InProgress)
        .bind(CampaignStatus::Queued)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Transition a campaign to the auto-detected `emails-sent` status
    /// once its MailLogs have drained on their own. A no-op unless the
    /// campaign is currently `in-progress` — `queued` means nothing was
    /// ever dispatched, and `complete` must stay `complete`.
    pub async fn mark_emails_sent(&self, id: CampaignId) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE campaigns SET status = $2 WHERE id = $1 AND status = $3")
            .bind(id)
            .bind(CampaignStatus::EmailsSent)
            .bind(CampaignStatus::InProgress)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Transition a campaign to `complete`, stamping `completed_date`
    /// exactly once. Re-completing is a no-op.
    pub async fn mark_complete(&self, id: CampaignId) -> Result<Option<Campaign>, sqlx::Error> {
        sqlx::query_as::<_, Campaign>(
            r#"
            UPDATE campaigns SET
                status = $2,
                completed_date = COALESCE(completed_date, $3)
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(CampaignStatus::Complete)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await
    }

    /// Delete a campaign and everything it owns in one transaction.
    pub async fn delete_cascade(&self, id: CampaignId) -> Result<bool, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM events WHERE campaign_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM maillogs WHERE campaign_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM results WHERE campaign_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM campaign_scenarios WHERE campaign_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        let result = sqlx::query("DELETE FROM campaigns WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(result.rows_affected() > 0)
    }

    /// Count MailLogs still pending or in-flight for a campaign, used by
    /// the Dispatcher's completion check.
    pub async fn pending_and_processing_counts(
        &self,
        id: CampaignId,
    ) -> Result<(i64, i64), sqlx::Error> {
        let row: (i64, i64) = sqlx::query_as(
            r#"
            SELECT
                COUNT(*) FILTER (WHERE processing = false) AS pending,
                COUNT(*) FILTER (WHERE processing = true) AS processing
            FROM maillogs WHERE campaign_id = $1
            "#,
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    /// Every (scenario, template) pair bound to a campaign, via the
    /// `campaign_scenarios` and `scenario_templates` junction tables.
    /// Used by `LaunchCampaign` to enumerate a campaign's
    /// MailLogs without the caller needing to know its scenario set.
    pub async fn scenario_template_pairs(
        &self,
        id: CampaignId,
    ) -> Result<Vec<(ScenarioId, TemplateId)>, sqlx::Error> {
        sqlx::query_as(
            r#"
            SELECT st.scenario_id, st.template_id
            FROM campaign_scenarios cs
            JOIN scenario_templates st ON st.scenario_id = cs.scenario_id
            WHERE cs.campaign_id = $1
            "#,
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await
    }

    /// Per-status-bucket rollup for a campaign: sent/opened/clicked/
    /// submitted/reported/error counts plus pending and processing.
    pub async fn stats(&self, id: CampaignId) -> Result<CampaignStats, sqlx::Error> {
        let row: (i64, i64, i64, i64, i64, i64, i64) = sqlx::query_as(
            r#"
            SELECT
                COUNT(*) AS total,
                COUNT(*) FILTER (WHERE status = 'sent') AS sent,
                COUNT(*) FILTER (WHERE status = 'opened') AS opened,
                COUNT(*) FILTER (WHERE status = 'clicked') AS clicked,
                COUNT(*) FILTER (WHERE status = 'submitted') AS submitted_data,
                COUNT(*) FILTER (WHERE status = 'reported') AS email_reported,
                COUNT(*) FILTER (WHERE status = 'error') AS error
            FROM results WHERE campaign_id = $1
            "#,
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await?;

        let (pending, processing) = self.pending_and_processing_counts(id).await?;

        Ok(CampaignStats {
            total: row.0,
            sent: row.1,
            opened: row.2,
            clicked: row.3,
            submitted_data: row.4,
            email_reported: row.5,
            error: row.6,
            pending,
            processing,
        })
    }
}
