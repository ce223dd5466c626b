//! vitalread - OCR value cleaning for medical device displays
//!
//! Takes the raw OCR readings extracted from photographs of vital-sign
//! monitors, ventilators and infusion pumps, and emits one trustworthy value
//! (or `null`) per field and frame. Pixels, files and network I/O stay with
//! the caller.

pub mod cleaning;
pub mod config;
pub mod error;
pub mod fields;
pub mod segment;
pub mod storage;

pub use cleaning::{CleanOutput, Cleaner, CleanerConfig};
pub use error::{CleanError, Result};
pub use fields::{DeviceType, FieldRegistry, FieldSpec};
pub use segment::{BoundingBox, CleanedSegment, OcrRequest, Segment};
