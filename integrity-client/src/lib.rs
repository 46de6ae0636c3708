//! IntegrityOS client library
//!
//! Async client for the IntegrityOS pipeline-inspection backend plus the
//! dashboard logic built on top of it:
//! - `api`: REST client and the traits the rest of the crate is written against
//! - `store`: map and data stores kept in sync through the event bus
//! - `map`: marker registry, popups and the camera fly-to channel
//! - `report`: report composition and HTML / PDF / XLSX export
//! - `import`, `permits`, `chat`: the remaining backend workflows

pub mod api;
pub mod batch;
pub mod chat;
pub mod fallback;
pub mod import;
pub mod map;
pub mod permits;
pub mod report;
pub mod store;

pub use integrity_common::{Error, Filter, Result};

/// Version string with build identification
pub fn build_info() -> String {
    format!(
        "{} ({} {}, built {})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_PROFILE"),
        env!("BUILD_TIMESTAMP")
    )
}
