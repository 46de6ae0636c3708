//! # IntegrityOS Common Library
//!
//! Shared code for the IntegrityOS client crates including:
//! - Domain models (inspection objects, diagnostics, work permits, analytics)
//! - The filter value object shared by both client stores
//! - Event types (IntegrityEvent enum) and the EventBus
//! - Configuration loading
//! - Date helpers

pub mod config;
pub mod error;
pub mod events;
pub mod models;
pub mod time;

pub use error::{Error, Result};
pub use models::filter::Filter;
