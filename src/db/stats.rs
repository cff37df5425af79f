use anyhow::Result;
use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use sqlx::{query, query_as, sqlite::SqlitePool, SqliteConnection};

use crate::domain::Verdict;

const SCANNED: &str = "scanned";
const BLOCKED: &str = "blocked";

/// Counter sink for terminal verdicts. Errors never reach the worker loop.
pub trait StatsRecorder: Send + Sync {
    fn record<'a>(&'a self, verdict: Verdict) -> BoxFuture<'a, Result<()>>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsCounts {
    pub scanned: i64,
    pub blocked: i64,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Clone)]
pub struct StatsRepository {
    pool: SqlitePool,
}

impl StatsRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    async fn increment(conn: &mut SqliteConnection, name: &str) -> Result<()> {
        query(
            r#"INSERT INTO stats (name, count, updated_at) VALUES (?1, 1, ?2)
                ON CONFLICT(name) DO UPDATE SET count = count + 1, updated_at = excluded.updated_at"#,
        )
        .bind(name)
        .bind(Utc::now())
        .execute(conn)
        .await?;
        Ok(())
    }

    /// Both counters move together or not at all.
    pub async fn record_verdict(&self, verdict: Verdict) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        Self::increment(&mut tx, SCANNED).await?;
        if verdict == Verdict::Unsafe {
            Self::increment(&mut tx, BLOCKED).await?;
        }
        tx.commit().await?;
        tracing::trace!(target: "db", ?verdict, "counters bumped");
        Ok(())
    }

    pub async fn counts(&self) -> Result<StatsCounts> {
        let rows: Vec<(String, i64, DateTime<Utc>)> =
            query_as(r#"SELECT name, count, updated_at FROM stats"#)
                .fetch_all(&self.pool)
                .await?;

        let mut counts = StatsCounts::default();
        for (name, count, updated_at) in rows {
            match name.as_str() {
                SCANNED => counts.scanned = count,
                BLOCKED => counts.blocked = count,
                _ => continue,
            }
            counts.updated_at = counts.updated_at.max(Some(updated_at));
        }
        Ok(counts)
    }
}

impl StatsRecorder for StatsRepository {
    fn record<'a>(&'a self, verdict: Verdict) -> BoxFuture<'a, Result<()>> {
        Box::pin(self.record_verdict(verdict))
    }
}
