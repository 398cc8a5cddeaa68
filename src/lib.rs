//! Pezzottify Analytics Library
//!
//! Listening analytics computed from play-event tables, joined with song
//! metadata from a catalog.

pub mod catalog;
pub mod config;
pub mod engine;
pub mod query;
pub mod records;
pub mod resolver;
pub mod server;

// Re-export commonly used types for convenience
pub use catalog::{Catalog, SongMetadata};
pub use query::{AnalyticsService, QueryError, QuerySettings};
pub use records::{open_source, PlayEvent, RecordSource};
pub use resolver::{HttpSongResolver, SongResolver};
pub use server::{run_server, RequestsLoggingLevel};
