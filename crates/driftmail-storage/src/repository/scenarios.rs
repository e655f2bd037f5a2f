//! Scenario repository

use driftmail_common::types::{ScenarioId, TemplateId, UserId};
use sqlx::PgPool;

use crate::models::Scenario;

/// Scenario repository
#[derive(Clone)]
pub struct ScenarioRepository {
    pool: PgPool,
}

impl ScenarioRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Get a scenario by ID under the acting user's ownership.
    pub async fn get_owned(
        &self,
        id: ScenarioId,
        user_id: UserId,
    ) -> Result<Option<Scenario>, sqlx::Error> {
        sqlx::query_as::<_, Scenario>("SELECT * FROM scenarios WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
    }

    /// Templates attached to a scenario, via the `scenario_templates`
    /// junction table.
    pub async fn templates_for(&self, scenario_id: ScenarioId) -> Result<Vec<TemplateId>, sqlx::Error> {
        let rows: Vec<(TemplateId,)> = sqlx::query_as(
            "SELECT template_id FROM scenario_templates WHERE scenario_id = $1 ORDER BY template_id",
        )
        .bind(scenario_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(|(id,)| id).collect())
    }
}
