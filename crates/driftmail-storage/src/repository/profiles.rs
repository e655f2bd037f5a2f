//! Sending profile repository

use driftmail_common::types::{ProfileId, UserId};
use sqlx::PgPool;

use crate::models::SendingProfile;

/// Sending profile repository
#[derive(Clone)]
pub struct ProfileRepository {
    pool: PgPool,
}

impl ProfileRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Get a sending profile by ID under the acting user's ownership.
    pub async fn get_owned(
        &self,
        id: ProfileId,
        user_id: UserId,
    ) -> Result<Option<SendingProfile>, sqlx::Error> {
        sqlx::query_as::<_, SendingProfile>(
            "SELECT * FROM sending_profiles WHERE id = $1 AND user_id = $2",
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
    }

    /// Get a sending profile by ID, no ownership check. Used by the
    /// Dispatcher, which already trusts the campaign's owning user.
    pub async fn get(&self, id: ProfileId) -> Result<Option<SendingProfile>, sqlx::Error> {
        sqlx::query_as::<_, SendingProfile>("SELECT * FROM sending_profiles WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }
}
