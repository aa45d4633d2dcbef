use std::str::FromStr;

use chrono::{NaiveDate, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};
use tracing::info;

use common::{Error, OutcomeCounts, Result};

/// Records which trading dates already had a run, so a restarted scheduler
/// does not run twice on the same day.
#[derive(Clone)]
pub struct RunLedger {
    db: SqlitePool,
}

/// Stored state of one trading date.
#[derive(Debug, Clone, PartialEq)]
pub struct RunRecord {
    pub started_at: String,
    pub completed_at: Option<String>,
    pub counts: Option<OutcomeCounts>,
}

impl RunLedger {
    /// Open (creating if needed) the sqlite database at `url`.
    pub async fn connect(url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
        let db = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;
        let ledger = Self::from_pool(db).await?;
        info!(url = %url, "Run ledger ready");
        Ok(ledger)
    }

    pub async fn from_pool(db: SqlitePool) -> Result<Self> {
        sqlx::migrate!("./migrations")
            .run(&db)
            .await
            .map_err(|e| Error::Config(format!("run ledger migration failed: {e}")))?;
        Ok(Self { db })
    }

    /// Mark `date` as started. Returns false if a run for that date was
    /// already claimed.
    pub async fn claim(&self, date: NaiveDate) -> Result<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO runs (trading_date, started_at)
            VALUES (?1, ?2)
            ON CONFLICT(trading_date) DO NOTHING
            "#,
        )
        .bind(date.to_string())
        .bind(Utc::now().to_rfc3339())
        .execute(&self.db)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    /// Store the outcome counts of the run for `date`.
    pub async fn complete(&self, date: NaiveDate, counts: OutcomeCounts) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE runs
            SET completed_at = ?1, buy = ?2, sell = ?3, hold = ?4, failed = ?5
            WHERE trading_date = ?6
            "#,
        )
        .bind(Utc::now().to_rfc3339())
        .bind(counts.buy as i64)
        .bind(counts.sell as i64)
        .bind(counts.hold as i64)
        .bind(counts.failed as i64)
        .bind(date.to_string())
        .execute(&self.db)
        .await?;
        Ok(())
    }

    pub async fn record(&self, date: NaiveDate) -> Result<Option<RunRecord>> {
        let row = sqlx::query(
            "SELECT started_at, completed_at, buy, sell, hold, failed FROM runs WHERE trading_date = ?1",
        )
        .bind(date.to_string())
        .fetch_optional(&self.db)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let count = |column: &str| -> Result<Option<usize>> {
            let value: Option<i64> = row.try_get(column)?;
            Ok(value.map(|v| v.max(0) as usize))
        };
        let counts = match (count("buy")?, count("sell")?, count("hold")?, count("failed")?) {
            (Some(buy), Some(sell), Some(hold), Some(failed)) => {
                Some(OutcomeCounts { buy, sell, hold, failed })
            }
            _ => None,
        };
        Ok(Some(RunRecord {
            started_at: row.try_get("started_at")?,
            completed_at: row.try_get("completed_at")?,
            counts,
        }))
    }
}
