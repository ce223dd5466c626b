//! Cleaning Layer
//!
//! Turns noisy OCR readings of device displays into one trustworthy value per
//! field and frame:
//! - [`sanitize`]: per-reading character cleanup driven by the field registry
//! - [`resolver`]: candidate disambiguation within a frame
//! - [`cache`]: last known good values per monitor and field
//! - [`frame`]: the per-frame orchestration in [`Cleaner`]

pub mod cache;
pub mod candidates;
pub mod diagnostics;
pub mod frame;
pub mod resolver;
pub mod sanitize;

pub use cache::{CachePolicy, MonitorCache, MonitorState, SensorState, DEFAULT_WINDOW};
pub use candidates::CandidateSet;
pub use diagnostics::{CleanDiagnostics, Overlap, OverlapCounter, OverlapObserver};
pub use frame::{CleanOutput, Cleaner, CleanerConfig, UNKNOWN_MONITOR};
pub use resolver::{resolve_candidates, Rejection, Resolution};
pub use sanitize::sanitize;
