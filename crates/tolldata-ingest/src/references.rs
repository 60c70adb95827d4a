//! Reference URL source
//!
//! The snapshot pipeline records a `reference` column with each toll-rate
//! row; the fetch sweep starts from the distinct set of those values. The
//! set is read once at sweep start and never mutated.

use crate::db::DbResult;
use sqlx::PgPool;
use tracing::debug;
use url::Url;

/// Table the provenance column is read from.
pub const DEFAULT_REFERENCE_TABLE: &str = "toll_facilities";

/// Loads candidate URLs from the backing store.
pub struct ReferenceSource {
    pool: PgPool,
    table: String,
}

impl ReferenceSource {
    pub fn new(pool: PgPool) -> Self {
        Self::with_table(pool, DEFAULT_REFERENCE_TABLE)
    }

    pub fn with_table(pool: PgPool, table: impl Into<String>) -> Self {
        Self {
            pool,
            table: table.into(),
        }
    }

    /// Distinct reference values, filtered down to well-formed absolute URLs.
    pub async fn load(&self) -> DbResult<Vec<String>> {
        let sql = format!(
            "SELECT DISTINCT reference FROM {} WHERE reference IS NOT NULL",
            self.table
        );

        let raw: Vec<String> = sqlx::query_scalar(&sql).fetch_all(&self.pool).await?;
        let total = raw.len();
        let urls = filter_absolute_urls(raw);

        debug!(
            table = %self.table,
            total,
            well_formed = urls.len(),
            "loaded reference urls"
        );

        Ok(urls)
    }
}

/// Keep only values that parse as absolute URLs with a scheme and a host.
pub fn filter_absolute_urls(raw: Vec<String>) -> Vec<String> {
    raw.into_iter().filter(|v| is_absolute_url(v)).collect()
}

fn is_absolute_url(value: &str) -> bool {
    Url::parse(value).map(|u| u.has_host()).unwrap_or(false)
}
