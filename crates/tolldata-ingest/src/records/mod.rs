//! Toll-rate record validation and snapshot commit
//!
//! [`model`] defines the validated record and its per-field coercions,
//! [`parser`] turns a pipe-delimited export into a lazy sequence of
//! records, and [`snapshot`] commits a batch as a fresh versioned table
//! plus a history ledger row.

pub mod model;
pub mod parser;
pub mod snapshot;

pub use model::{FacilityType, TollRateRecord};
pub use parser::{read_file, RecordError, RecordReader};
pub use snapshot::{SnapshotId, SnapshotWriter};
