use chrono::{DateTime, NaiveDateTime, Utc};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous},
    Pool, Sqlite,
};
use std::str::FromStr;
use tokio::time::Duration;
use tracing::{info, instrument};

use crate::TARGET_DB;

/// Fixed-width UTC timestamps, so that string comparison in SQL orders them.
pub(crate) const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub(crate) fn to_db_time(time: &DateTime<Utc>) -> String {
    time.format(TIMESTAMP_FORMAT).to_string()
}

pub(crate) fn from_db_time(value: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(value, TIMESTAMP_FORMAT)
        .ok()
        .map(|naive| naive.and_utc())
}

#[derive(Clone)]
pub struct Database {
    pool: Pool<Sqlite>,
}

impl Database {
    /// Get access to the database pool
    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    /// Opens (creating if needed) the SQLite file at `database_path` and
    /// ensures the schema exists.
    #[instrument(target = "db", level = "info")]
    pub async fn new(database_path: &str) -> Result<Self, sqlx::Error> {
        info!(target: TARGET_DB, "Creating database pool for: {}", database_path);

        let connect_options =
            SqliteConnectOptions::from_str(&format!("sqlite://{}", database_path))?
                .create_if_missing(true)
                .foreign_keys(true)
                .journal_mode(SqliteJournalMode::Wal)
                .busy_timeout(Duration::from_secs(5))
                .synchronous(SqliteSynchronous::Normal);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(connect_options)
            .await?;

        info!(target: TARGET_DB, "Database pool created");

        let db = Database { pool };
        db.initialize_schema().await?;
        Ok(db)
    }

    /// A private in-memory database. A single connection is kept open for
    /// the pool's lifetime, since every new in-memory connection would start
    /// empty.
    pub async fn connect_in_memory() -> Result<Self, sqlx::Error> {
        let connect_options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(connect_options)
            .await?;

        let db = Database { pool };
        db.initialize_schema().await?;
        Ok(db)
    }

    /// Row counts used by the `stats` command: (articles, active articles, stopwords).
    pub async fn collect_stats(&self, now: DateTime<Utc>) -> Result<(i64, i64, i64), sqlx::Error> {
        let articles: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM articles")
            .fetch_one(self.pool())
            .await?;
        let active: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM articles WHERE expires_at > ?1")
            .bind(to_db_time(&now))
            .fetch_one(self.pool())
            .await?;
        let stopwords: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM stopwords")
            .fetch_one(self.pool())
            .await?;
        Ok((articles, active, stopwords))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    #[test]
    fn test_timestamps_round_trip_and_sort() {
        let early = Utc.with_ymd_and_hms(2024, 3, 9, 8, 5, 0).unwrap();
        let late = Utc.with_ymd_and_hms(2024, 11, 20, 17, 45, 30).unwrap();

        assert_eq!(to_db_time(&early), "2024-03-09 08:05:00");
        assert_eq!(from_db_time(&to_db_time(&late)), Some(late));
        assert!(to_db_time(&early) < to_db_time(&late));
        assert_eq!(from_db_time("yesterday"), None);
    }

    #[tokio::test]
    async fn test_new_creates_database_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("newsfeed.db");

        let db = Database::new(path.to_str().unwrap()).await.unwrap();

        assert!(path.exists());
        assert_eq!(db.collect_stats(Utc::now()).await.unwrap(), (0, 0, 0));
    }
}
