//! Tolldata ingestion pipeline
//!
//! Two independent pipelines sharing one Postgres store:
//!
//! - **Reference sweep**: load the distinct reference URLs already recorded
//!   in the store, fetch each PDF with bounded concurrency and retry/backoff,
//!   and persist the bodies under content-addressed keys
//!   ([`references`] -> [`fetch`]).
//! - **Snapshot ingestion**: validate a pipe-delimited toll-rate export
//!   field by field and commit it as a fresh versioned table plus a history
//!   ledger row ([`records`]).
//!
//! The AI structured-extraction service is an external collaborator; only
//! its schema boundary lives here ([`extract`]).

pub mod config;
pub mod db;
pub mod extract;
pub mod fetch;
pub mod records;
pub mod references;
