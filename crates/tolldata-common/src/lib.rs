//! Shared plumbing for the tolldata workspace.
//!
//! Home of the pieces every component needs: the error taxonomy, logging
//! initialization, and the content-address function that names fetched
//! artifacts.

pub mod content_address;
pub mod error;
pub mod logging;

pub use error::{Result, TollDataError};
