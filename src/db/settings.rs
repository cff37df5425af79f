use anyhow::Result;
use sqlx::{query, query_as, sqlite::SqlitePool};

const PROTECTION_ENABLED: &str = "protection_enabled";

#[derive(Clone)]
pub struct SettingsRepository {
    pool: SqlitePool,
}

impl SettingsRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Protection is on unless it was explicitly switched off.
    pub async fn protection_enabled(&self) -> Result<bool> {
        let row: Option<(String,)> = query_as(r#"SELECT value FROM settings WHERE key = ?1"#)
            .bind(PROTECTION_ENABLED)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map_or(true, |(value,)| value != "false"))
    }

    pub async fn set_protection_enabled(&self, enabled: bool) -> Result<()> {
        query(
            r#"INSERT INTO settings (key, value) VALUES (?1, ?2)
                ON CONFLICT(key) DO UPDATE SET value = excluded.value"#,
        )
        .bind(PROTECTION_ENABLED)
        .bind(if enabled { "true" } else { "false" })
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
