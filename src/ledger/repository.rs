use super::models::*;
use crate::error::AppResult;
use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

/// Storage for the records the reconciler owns.
///
/// Every transition method is conditional on the record still being
/// pending and returns whether this call performed the transition, so a
/// second application of the same outcome is a no-op.
#[async_trait]
pub trait RecordStore: Send + Sync {
    // ========== RELEASES ==========

    async fn insert_release(&self, release: &Release) -> AppResult<()>;

    async fn get_release(&self, release_id: Uuid) -> AppResult<Option<Release>>;

    /// All releases in the pending state, oldest first
    async fn pending_releases(&self) -> AppResult<Vec<Release>>;

    async fn count_pending_releases(&self) -> AppResult<i64>;

    /// pending -> published
    async fn publish_release(&self, release_id: Uuid, contract_address: &str) -> AppResult<bool>;

    /// pending -> error
    async fn fail_release(&self, release_id: Uuid, message: &str) -> AppResult<bool>;

    // ========== PROFILES ==========

    async fn insert_profile(&self, profile: &Profile) -> AppResult<()>;

    async fn get_profile(&self, profile_id: Uuid) -> AppResult<Option<Profile>>;

    /// All profiles with an update pending, oldest first
    async fn pending_profiles(&self) -> AppResult<Vec<Profile>>;

    async fn count_pending_profiles(&self) -> AppResult<i64>;

    /// Marks an update as submitted. Returns false if one is already pending.
    async fn begin_profile_update(&self, profile_id: Uuid, tx: &str) -> AppResult<bool>;

    /// Clears the pending flag; a new address is only stored when the
    /// profile has none yet (missing or blank).
    async fn complete_profile_update(
        &self,
        profile_id: Uuid,
        profile_address: Option<&str>,
    ) -> AppResult<bool>;

    async fn fail_profile_update(&self, profile_id: Uuid, message: &str) -> AppResult<bool>;

    // ========== FEED ==========

    async fn post_feed_message(&self, message: &FeedMessage) -> AppResult<()>;

    async fn recent_feed_messages(&self, limit: i64) -> AppResult<Vec<FeedMessage>>;
}

const RELEASE_COLUMNS: &str = r#"
    id, title, artist_address, state, tx, contract_address, error_message,
    created_at, updated_at
"#;

const PROFILE_COLUMNS: &str = r#"
    id, display_name, profile_address, update_pending, pending_tx, update_error,
    invited_by, created_at, updated_at
"#;

/// PostgreSQL-backed record store
pub struct LedgerRepository {
    pub pool: PgPool,
}

impl LedgerRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RecordStore for LedgerRepository {
    async fn insert_release(&self, release: &Release) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO releases (
                id, title, artist_address, state, tx, contract_address, error_message,
                created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(release.id)
        .bind(&release.title)
        .bind(&release.artist_address)
        .bind(release.state)
        .bind(&release.tx)
        .bind(&release.contract_address)
        .bind(&release.error_message)
        .bind(release.created_at)
        .bind(release.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get_release(&self, release_id: Uuid) -> AppResult<Option<Release>> {
        let release = sqlx::query_as::<_, Release>(&format!(
            "SELECT {} FROM releases WHERE id = $1",
            RELEASE_COLUMNS
        ))
        .bind(release_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(release)
    }

    async fn pending_releases(&self) -> AppResult<Vec<Release>> {
        let releases = sqlx::query_as::<_, Release>(&format!(
            "SELECT {} FROM releases WHERE state = 'pending' ORDER BY created_at",
            RELEASE_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(releases)
    }

    async fn count_pending_releases(&self) -> AppResult<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM releases WHERE state = 'pending'")
                .fetch_one(&self.pool)
                .await?;

        Ok(count)
    }

    async fn publish_release(&self, release_id: Uuid, contract_address: &str) -> AppResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE releases
            SET state = 'published', contract_address = $2, error_message = NULL,
                updated_at = NOW()
            WHERE id = $1 AND state = 'pending'
            "#,
        )
        .bind(release_id)
        .bind(contract_address)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn fail_release(&self, release_id: Uuid, message: &str) -> AppResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE releases
            SET state = 'error', error_message = $2, updated_at = NOW()
            WHERE id = $1 AND state = 'pending'
            "#,
        )
        .bind(release_id)
        .bind(message)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn insert_profile(&self, profile: &Profile) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO profiles (
                id, display_name, profile_address, update_pending, pending_tx, update_error,
                invited_by, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(profile.id)
        .bind(&profile.display_name)
        .bind(&profile.profile_address)
        .bind(profile.update_pending)
        .bind(&profile.pending_tx)
        .bind(&profile.update_error)
        .bind(profile.invited_by)
        .bind(profile.created_at)
        .bind(profile.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get_profile(&self, profile_id: Uuid) -> AppResult<Option<Profile>> {
        let profile = sqlx::query_as::<_, Profile>(&format!(
            "SELECT {} FROM profiles WHERE id = $1",
            PROFILE_COLUMNS
        ))
        .bind(profile_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(profile)
    }

    async fn pending_profiles(&self) -> AppResult<Vec<Profile>> {
        let profiles = sqlx::query_as::<_, Profile>(&format!(
            "SELECT {} FROM profiles WHERE update_pending ORDER BY updated_at",
            PROFILE_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(profiles)
    }

    async fn count_pending_profiles(&self) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM profiles WHERE update_pending")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    async fn begin_profile_update(&self, profile_id: Uuid, tx: &str) -> AppResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE profiles
            SET update_pending = TRUE, pending_tx = $2, update_error = NULL, updated_at = NOW()
            WHERE id = $1 AND NOT update_pending
            "#,
        )
        .bind(profile_id)
        .bind(tx)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn complete_profile_update(
        &self,
        profile_id: Uuid,
        profile_address: Option<&str>,
    ) -> AppResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE profiles
            SET update_pending = FALSE, pending_tx = NULL, update_error = NULL,
                profile_address = CASE
                    WHEN BTRIM(COALESCE(profile_address, '')) = '' THEN $2
                    ELSE profile_address
                END,
                updated_at = NOW()
            WHERE id = $1 AND update_pending
            "#,
        )
        .bind(profile_id)
        .bind(profile_address)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn fail_profile_update(&self, profile_id: Uuid, message: &str) -> AppResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE profiles
            SET update_pending = FALSE, pending_tx = NULL, update_error = $2, updated_at = NOW()
            WHERE id = $1 AND update_pending
            "#,
        )
        .bind(profile_id)
        .bind(message)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn post_feed_message(&self, message: &FeedMessage) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO feed_messages (id, sender_address, release_id, message, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(message.id)
        .bind(&message.sender_address)
        .bind(message.release_id)
        .bind(&message.message)
        .bind(message.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn recent_feed_messages(&self, limit: i64) -> AppResult<Vec<FeedMessage>> {
        let messages = sqlx::query_as::<_, FeedMessage>(
            r#"
            SELECT id, sender_address, release_id, message, created_at
            FROM feed_messages
            ORDER BY created_at DESC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(messages)
    }
}
