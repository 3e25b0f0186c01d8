//! Record construction and output writers.
//!
//! This module handles:
//! - Log records (ordered key/value pairs with a timestamp)
//! - Expanding aggregated rows into records
//! - Writing records to JSON files

pub mod emitter;
pub mod json;
pub mod record;

// Re-export main types and functions
pub use emitter::RecordEmitter;
pub use json::{read_records, records_to_string, write_records};
pub use record::{LogContent, LogRecord};
