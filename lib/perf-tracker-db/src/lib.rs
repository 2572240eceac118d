use async_trait::async_trait;
use sqlx::migrate::Migrator;
use sqlx::sqlite::SqliteQueryResult;
use sqlx::{Pool, Sqlite};

// Re-export so that clients can avoid having sqlx as a dependency
pub use sqlx::sqlite::SqlitePoolOptions;

pub mod cache;
pub mod error;
pub mod model;

use error::Error;
use model::{UserPerformance, UserPerformanceRow};

static MIGRATOR: Migrator = sqlx::migrate!();

/// Durable tier for [`UserPerformance`] snapshots, keyed by `(puuid, region)`.
#[async_trait]
pub trait PerformanceStore: Send + Sync {
    async fn get_user_performance(
        &self,
        puuid: &str,
        region: &str,
    ) -> Result<Option<UserPerformance>, Error>;

    /// Insert or replace the snapshot for its `(puuid, region)`. Last write wins.
    async fn upsert_user_performance(&self, data: &UserPerformance) -> Result<(), Error>;

    /// The `limit` most used item IDs across every stored match, most used
    /// first. Empty item slots are not counted.
    async fn popular_item_ids(&self, limit: u32) -> Result<Vec<i32>, Error>;
}

/// Wrapper around common database operations. By using this wrapper, clients
/// of [`DbHandler`] can remain database agnostic.
#[derive(Debug)]
pub struct DbHandler {
    pool: Pool<Sqlite>,
}

impl DbHandler {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    /// Apply pending schema migrations.
    pub async fn migrate(&self) -> Result<(), Error> {
        MIGRATOR.run(&self.pool).await?;
        Ok(())
    }

    /// Get the stored performance snapshot of a PUUID in a region.
    pub async fn get_user_performance(
        &self,
        puuid: &str,
        region: &str,
    ) -> Result<Option<UserPerformance>, Error> {
        let row = sqlx::query_as::<_, UserPerformanceRow>(
            "SELECT * FROM user_performance WHERE puuid = ? AND region = ?",
        )
        .bind(puuid)
        .bind(region)
        .fetch_optional(&self.pool)
        .await?;

        row.map(UserPerformance::try_from).transpose()
    }

    /// Insert performance data, replacing whatever was stored for the same
    /// PUUID and region.
    pub async fn upsert_user_performance(
        &self,
        data: &UserPerformance,
    ) -> Result<SqliteQueryResult, Error> {
        let matches = serde_json::to_string(&data.matches)?;

        let result = sqlx::query(
            "INSERT INTO user_performance (puuid, region, riot_id, queue_id, matches, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT (puuid, region) DO UPDATE SET
                riot_id = excluded.riot_id,
                queue_id = excluded.queue_id,
                matches = excluded.matches,
                updated_at = excluded.updated_at",
        )
        .bind(&data.puuid)
        .bind(&data.region)
        .bind(&data.riot_id)
        .bind(i64::from(data.queue_id))
        .bind(matches)
        .bind(data.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(result)
    }

    /// Count item usage across the match arrays of every stored snapshot.
    /// Ties are broken by the lower item ID.
    pub async fn popular_item_ids(&self, limit: u32) -> Result<Vec<i32>, Error> {
        let item_ids = sqlx::query_scalar::<_, i64>(
            "SELECT CAST(item.value AS INTEGER) AS item_id
            FROM user_performance,
                json_each(user_performance.matches) AS game,
                json_each(game.value, '$.items') AS item
            WHERE CAST(item.value AS INTEGER) != 0
            GROUP BY item_id
            ORDER BY COUNT(*) DESC, item_id ASC
            LIMIT ?",
        )
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        item_ids
            .into_iter()
            .map(|item_id| {
                i32::try_from(item_id)
                    .map_err(|_| Error::InvalidRow(format!("item ID {item_id} is out of range")))
            })
            .collect()
    }
}

#[async_trait]
impl PerformanceStore for DbHandler {
    async fn get_user_performance(
        &self,
        puuid: &str,
        region: &str,
    ) -> Result<Option<UserPerformance>, Error> {
        DbHandler::get_user_performance(self, puuid, region).await
    }

    async fn upsert_user_performance(&self, data: &UserPerformance) -> Result<(), Error> {
        DbHandler::upsert_user_performance(self, data).await?;
        Ok(())
    }

    async fn popular_item_ids(&self, limit: u32) -> Result<Vec<i32>, Error> {
        DbHandler::popular_item_ids(self, limit).await
    }
}
