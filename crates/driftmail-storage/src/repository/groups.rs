//! Group repository

use driftmail_common::types::{GroupId, UserId};
use sqlx::PgPool;

use crate::models::{Group, Target};

/// Group repository
#[derive(Clone)]
pub struct GroupRepository {
    pool: PgPool,
}

impl GroupRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Get a group by ID under the acting user's ownership.
    pub async fn get_owned(&self, id: GroupId, user_id: UserId) -> Result<Option<Group>, sqlx::Error> {
        sqlx::query_as::<_, Group>("SELECT * FROM groups WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
    }

    /// Targets belonging to a group, in insertion order.
    pub async fn targets_for(&self, group_id: GroupId) -> Result<Vec<Target>, sqlx::Error> {
        sqlx::query_as::<_, Target>(
            "SELECT * FROM targets WHERE group_id = $1 ORDER BY ordinal ASC",
        )
        .bind(group_id)
        .fetch_all(&self.pool)
        .await
    }
}
