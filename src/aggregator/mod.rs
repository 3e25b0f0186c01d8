//! Aggregation of decoded samples into per-stack rows.
//!
//! This module transforms decoded profiles into:
//! - Call trees grouped by sample type and label set
//! - Canonical label sets (static tags plus resolved labels)
//! - Aggregated rows keyed by StackID

pub mod cache;
pub mod labels;
pub mod stack_builder;
pub mod tree;

// Re-export main types and functions
pub use cache::LabelsCache;
pub use labels::{build_label_set, Label, StringResolver};
pub use stack_builder::{stack_id, AggregatedRow, SampleEntry, StackAggregator};
pub use tree::{Tree, WalkedStack};
