//! Result repository

use driftmail_common::types::{CampaignId, Rid};
use sqlx::{PgPool, Postgres, Transaction};

use crate::models::{CampaignResult, NewResult, ResultStatus};

/// Result repository
#[derive(Clone)]
pub struct ResultRepository {
    pool: PgPool,
}

impl ResultRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a batch of Result rows as part of the Scheduler's single
    /// transaction.
    pub async fn insert_batch_in_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        results: &[NewResult],
    ) -> Result<(), sqlx::Error> {
        for r in results {
            sqlx::query(
                r#"
                INSERT INTO results (
                    id, rid, campaign_id, user_id, email, first_name, last_name,
                    position, status, reported, scenario_id, template_id, send_date,
                    modified_date
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, false, $10, $11, $12, $12)
                "#,
            )
            .bind(r.id)
            .bind(&r.rid)
            .bind(r.campaign_id)
            .bind(r.user_id)
            .bind(&r.email)
            .bind(&r.first_name)
            .bind(&r.last_name)
            .bind(&r.position)
            .bind(r.status)
            .bind(r.scenario_id)
            .bind(r.template_id)
            .bind(r.send_date)
            .execute(&mut **tx)
            .await?;
        }
        Ok(())
    }

    /// Get a result by its `rid`, used by the Dispatcher to recover
    /// recipient addressing before handing an entry to Transport.
    pub async fn get_by_rid(&self, rid: &Rid) -> Result<Option<CampaignResult>, sqlx::Error> {
        sqlx::query_as::<_, CampaignResult>("SELECT * FROM results WHERE rid = $1")
            .bind(rid)
            .fetch_optional(&self.pool)
            .await
    }

    /// All results for a campaign.
    pub async fn by_campaign(&self, campaign_id: CampaignId) -> Result<Vec<CampaignResult>, sqlx::Error> {
        sqlx::query_as::<_, CampaignResult>(
            "SELECT * FROM results WHERE campaign_id = $1 ORDER BY send_date ASC",
        )
        .bind(campaign_id)
        .fetch_all(&self.pool)
        .await
    }

    /// Delete every result belonging to a campaign, as part of a larger
    /// transaction.
    pub async fn delete_by_campaign_in_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        campaign_id: CampaignId,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM results WHERE campaign_id = $1")
            .bind(campaign_id)
            .execute(&mut **tx)
            .await?;
        Ok(result.rows_affected())
    }

    /// Move a result to `sending` when its MailLog is leased by the
    /// Dispatcher.
    pub async fn mark_sending(&self, rid: &Rid) -> Result<(), sqlx::Error> {
        self.set_status(rid, ResultStatus::Sending).await
    }

    /// Record a successful send.
    pub async fn mark_sent(&self, rid: &Rid) -> Result<(), sqlx::Error> {
        self.set_status(rid, ResultStatus::Sent).await
    }

    /// Record a failed send. The error
    /// detail itself is recorded as an Event, not on the Result row.
    pub async fn mark_error(&self, rid: &Rid) -> Result<(), sqlx::Error> {
        self.set_status(rid, ResultStatus::Error).await
    }

    async fn set_status(&self, rid: &Rid, status: ResultStatus) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE results SET status = $2, modified_date = now() WHERE rid = $1")
            .bind(rid)
            .bind(status)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
