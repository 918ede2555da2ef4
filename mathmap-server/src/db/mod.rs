//! Database access layer for mathmap-server
//!
//! One module per resource. Functions take the pool (or a transaction where
//! several rows change together) and return `mathmap_common::Result`.

use mathmap_common::{Error, Result};
use uuid::Uuid;

pub mod links;
pub mod nodes;
pub mod practice;
pub mod progress;
pub mod questions;
pub mod users;

/// Parse a `guid` column value
pub(crate) fn parse_guid(value: &str) -> Result<Uuid> {
    Uuid::parse_str(value).map_err(|e| Error::Internal(format!("Corrupt guid '{}': {}", value, e)))
}
