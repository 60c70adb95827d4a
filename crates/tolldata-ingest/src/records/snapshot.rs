//! Versioned snapshot commit
//!
//! Every ingestion run lands in its own `toll_facilities_<id>` table and
//! appends one row to the `toll_facility_history` ledger. Prior snapshots
//! are never touched, so the store retains the full history of runs.
//!
//! Snapshot identifiers come from a Postgres sequence rather than the
//! commit wall-clock: ids stay unique under rapid successive runs, while
//! the ledger still records when each snapshot was taken.

use super::model::TollRateRecord;
use crate::db::DbResult;
use chrono::Utc;
use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::{debug, info};

/// Ledger of committed snapshots, one row per ingestion run.
const LEDGER_DDL: &str = "\
CREATE TABLE IF NOT EXISTS toll_facility_history (
    snapshot_id BIGINT PRIMARY KEY,
    event_time BIGINT NOT NULL
)";

const SEQUENCE_DDL: &str = "CREATE SEQUENCE IF NOT EXISTS toll_snapshot_id_seq";

/// Advisory lock key serializing snapshot commits; held for the length of
/// the commit transaction.
const COMMIT_LOCK_KEY: i64 = 0x746f_6c6c;

const INSERT_COLUMNS: &str = "state_or_province, facility_label, toll_operator, \
facility_type, road_type, interstate, facility_open_date, revenue_lane_miles, \
revenue, length_miles, lane, source_type, reference, year";

/// Identifier of one committed snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SnapshotId(pub i64);

impl SnapshotId {
    pub fn table_name(&self) -> String {
        format!("toll_facilities_{}", self.0)
    }
}

impl std::fmt::Display for SnapshotId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Commits batches of validated records as immutable snapshot tables.
pub struct SnapshotWriter {
    pool: PgPool,
    insert_batch_size: usize,
}

impl SnapshotWriter {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            insert_batch_size: 1000,
        }
    }

    /// Rows bound per INSERT statement. Kept well under the Postgres
    /// bind-parameter limit (14 parameters per row).
    pub fn with_insert_batch_size(mut self, size: usize) -> Self {
        self.insert_batch_size = size.max(1);
        self
    }

    /// Commit a batch: new snapshot table, one ledger row, all records
    /// bulk-inserted. Runs in a single transaction, so a failed commit
    /// leaves neither a table nor a ledger entry behind.
    pub async fn commit(&self, records: &[TollRateRecord]) -> DbResult<SnapshotId> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(COMMIT_LOCK_KEY)
            .execute(&mut *tx)
            .await?;

        sqlx::query(LEDGER_DDL).execute(&mut *tx).await?;
        sqlx::query(SEQUENCE_DDL).execute(&mut *tx).await?;

        let id: i64 = sqlx::query_scalar("SELECT nextval('toll_snapshot_id_seq')")
            .fetch_one(&mut *tx)
            .await?;
        let snapshot = SnapshotId(id);

        sqlx::query(&snapshot_table_ddl(&snapshot))
            .execute(&mut *tx)
            .await?;

        let event_time = Utc::now().timestamp();
        sqlx::query("INSERT INTO toll_facility_history (snapshot_id, event_time) VALUES ($1, $2)")
            .bind(id)
            .bind(event_time)
            .execute(&mut *tx)
            .await?;

        for chunk in records.chunks(self.insert_batch_size) {
            let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(format!(
                "INSERT INTO {} ({}) ",
                snapshot.table_name(),
                INSERT_COLUMNS
            ));

            builder.push_values(chunk, |mut bind, record| {
                bind.push_bind(&record.state_or_province)
                    .push_bind(&record.facility_label)
                    .push_bind(&record.toll_operator)
                    .push_bind(record.facility_type.as_str())
                    .push_bind(&record.road_type)
                    .push_bind(record.interstate)
                    .push_bind(&record.facility_open_date)
                    .push_bind(record.revenue_lane_miles)
                    .push_bind(record.revenue)
                    .push_bind(record.length_miles)
                    .push_bind(record.lane)
                    .push_bind(&record.source_type)
                    .push_bind(&record.reference)
                    .push_bind(record.year);
            });

            builder.build().execute(&mut *tx).await?;
            debug!(snapshot_id = id, rows = chunk.len(), "inserted batch");
        }

        tx.commit().await?;

        info!(
            snapshot_id = id,
            rows = records.len(),
            event_time,
            "committed snapshot"
        );

        Ok(snapshot)
    }
}

fn snapshot_table_ddl(snapshot: &SnapshotId) -> String {
    format!(
        "CREATE TABLE {} (
    id SERIAL PRIMARY KEY,
    state_or_province VARCHAR(255) NOT NULL,
    facility_label VARCHAR(255) NOT NULL,
    toll_operator VARCHAR(255) NOT NULL,
    facility_type VARCHAR(255) NOT NULL,
    road_type VARCHAR(255) NOT NULL,
    interstate BOOLEAN NOT NULL,
    facility_open_date VARCHAR(255) NOT NULL,
    revenue_lane_miles FLOAT NOT NULL,
    revenue FLOAT NOT NULL,
    length_miles FLOAT NOT NULL,
    lane FLOAT NOT NULL,
    source_type VARCHAR(255) NOT NULL,
    reference VARCHAR(255) NOT NULL,
    year INTEGER NOT NULL
)",
        snapshot.table_name()
    )
}
