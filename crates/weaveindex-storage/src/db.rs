//! The storage handle: pool construction and the small height/reset
//! operations the sync orchestrator drives directly.

use std::path::Path;
use std::time::Duration;

use sqlx::sqlite::{
    SqliteArguments, SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions,
    SqliteSynchronous,
};
use sqlx::query::Query;
use sqlx::Sqlite;
use tracing::{debug, warn};

use weaveindex_core::encoding::b64url_encode;
use weaveindex_core::types::Amount;
use weaveindex_core::{IndexConfig, IndexError};

use crate::schema::{CREATE_INDEXES, CREATE_TABLES};

/// The two-tier chain index over a single SQLite database.
///
/// One handle serves the whole lifecycle: `open → serve → close` (drop).
/// Mutations run inside engine-level transactions; reads run pool-side
/// against the last committed state.
pub struct IndexDb {
    pub(crate) pool: SqlitePool,
    pub(crate) config: IndexConfig,
}

impl IndexDb {
    /// Open (or create) the index database at `path`.
    pub async fn open(path: impl AsRef<Path>, config: IndexConfig) -> Result<Self, IndexError> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(Duration::from_secs(5))
            .pragma("page_size", config.page_size.to_string());

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await
            .map_err(db_err)?;

        let db = Self { pool, config };
        db.init_schema().await?;
        Ok(db)
    }

    /// Open an in-memory index. All data is lost on drop; for tests and
    /// ephemeral tooling.
    pub async fn in_memory(config: IndexConfig) -> Result<Self, IndexError> {
        let options = SqliteConnectOptions::new()
            .filename(":memory:")
            .journal_mode(SqliteJournalMode::Memory);

        // A second connection would see a different empty database.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .map_err(db_err)?;

        let db = Self { pool, config };
        db.init_schema().await?;
        Ok(db)
    }

    async fn init_schema(&self) -> Result<(), IndexError> {
        for statement in CREATE_TABLES.iter().chain(CREATE_INDEXES) {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(db_err)?;
        }
        debug!("schema ready");
        Ok(())
    }

    /// The tunables this index was opened with.
    pub fn config(&self) -> &IndexConfig {
        &self.config
    }

    /// Greatest height across both tiers, `-1` when the index is empty.
    pub async fn get_max_height(&self) -> Result<i64, IndexError> {
        let row: (Option<i64>,) = sqlx::query_as(
            "SELECT MAX(height) FROM (
                SELECT MAX(height) AS height FROM new_block_heights
                UNION ALL
                SELECT MAX(height) AS height FROM stable_blocks
            )",
        )
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(row.0.unwrap_or(-1))
    }

    /// The pending block hash at `height`, if one is mapped there.
    pub async fn get_new_block_hash_by_height(
        &self,
        height: i64,
    ) -> Result<Option<String>, IndexError> {
        if height < 0 {
            return Err(IndexError::InvalidArgument(format!(
                "height must be non-negative, got {height}"
            )));
        }
        let row: Option<(Vec<u8>,)> = sqlx::query_as(
            "SELECT block_indep_hash FROM new_block_heights WHERE height = ? LIMIT 1",
        )
        .bind(height)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(row.map(|(hash,)| b64url_encode(&hash)))
    }

    /// Drop every pending height mapping above `height`.
    ///
    /// Pending blocks, associations, transactions, and tags that lose their
    /// mapping become unreachable from queries and are swept by the next
    /// stabilization pass. This is how the orchestrator reacts to an
    /// upstream reorganization.
    pub async fn reset_to_height(&self, height: u64) -> Result<(), IndexError> {
        let result = sqlx::query("DELETE FROM new_block_heights WHERE height > ?")
            .bind(height as i64)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        if result.rows_affected() > 0 {
            warn!(
                height,
                unmapped = result.rows_affected(),
                "fork reset dropped pending height mappings"
            );
        }
        Ok(())
    }
}

/// Storage-engine errors cross the crate boundary stringly-typed so the core
/// crate stays driver-free.
pub(crate) fn db_err(e: sqlx::Error) -> IndexError {
    IndexError::Storage(e.to_string())
}

/// A positional bind value for runtime-assembled SQL.
#[derive(Debug, Clone)]
pub(crate) enum SqlArg {
    Int(i64),
    Text(String),
    Blob(Vec<u8>),
    Null,
}

impl From<&Amount> for SqlArg {
    fn from(amount: &Amount) -> Self {
        match amount.as_i64() {
            Some(v) => SqlArg::Int(v),
            None => SqlArg::Text(amount.0.clone()),
        }
    }
}

impl From<Option<&Amount>> for SqlArg {
    fn from(amount: Option<&Amount>) -> Self {
        amount.map(SqlArg::from).unwrap_or(SqlArg::Null)
    }
}

/// Attach `args` to `query` in order.
pub(crate) fn bind_args<'q>(
    mut query: Query<'q, Sqlite, SqliteArguments<'q>>,
    args: &[SqlArg],
) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    for arg in args {
        query = match arg {
            SqlArg::Int(v) => query.bind(*v),
            SqlArg::Text(v) => query.bind(v.clone()),
            SqlArg::Blob(v) => query.bind(v.clone()),
            SqlArg::Null => query.bind(None::<i64>),
        };
    }
    query
}
