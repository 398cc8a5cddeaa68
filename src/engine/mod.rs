//! Streaming aggregation primitives.
//!
//! Queries fold events into song-keyed tables while scanning, then project
//! those tables onto titles or artists once metadata for the distinct songs
//! is known.

mod frequency;
pub mod months;
mod payout;
mod scan;
mod window;

pub use frequency::{FrequencyTable, KeyProjection, MetadataLookup};
pub use months::{MonthlyBucket, MonthlyBuckets};
pub use payout::{
    DurationTally, ListeningTime, PayoutAmount, PayoutPolicy, DEFAULT_MIN_PLAY_MS,
    DEFAULT_RATE_PER_MINUTE,
};
pub use scan::{scan_events, InlineMetadata, ScanError, ScanStats};
pub use window::TimeWindow;
