//! # mathmap Common Library
//!
//! Shared code for the mathmap services including:
//! - Database schema, initialization and entity models
//! - Configuration resolution
//! - Password and bearer-token primitives
//! - Practice progress calculations

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod progress;

pub use error::{Error, Result};
pub use progress::calculate_mastery_level;
