//! Shared profile model: metadata, stacks, units and profile kinds.
//!
//! This module defines the types both decoders produce and the emitter
//! consumes. Nothing here keeps state between parse calls.

pub mod frame;
pub mod sample_type;

use crate::utils::config::{PROFILE_ID_LABEL, SAMPLE_RATE_TAG};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

pub use frame::{format_position_and_name, format_position_and_names};
pub use sample_type::{default_sample_type_mapping, SampleTypeConfig, SampleTypeMapping};

/// Resolved key/value labels, sorted by key
pub type LabelSet = BTreeMap<String, String>;

// Units as reported to the sink
pub const SAMPLES_UNITS: &str = "samples";
pub const NANOSECONDS_UNITS: &str = "nanoseconds";
pub const OBJECTS_UNITS: &str = "objects";
pub const BYTES_UNITS: &str = "bytes";
pub const GOROUTINES_UNITS: &str = "goroutines";
pub const LOCK_NANOSECONDS_UNITS: &str = "lock_nanoseconds";
pub const LOCK_SAMPLES_UNITS: &str = "local_samples";

/// How repeated samples of one type are combined downstream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AggType {
    Avg,
    #[default]
    Sum,
}

impl AggType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AggType::Avg => "avg",
            AggType::Sum => "sum",
        }
    }
}

impl fmt::Display for AggType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Caller-owned metadata describing one upload
///
/// **Public** - passed mutably into every parse call
#[derive(Debug, Clone, Default)]
pub struct Meta {
    /// Start of the profiling window
    pub start_time: DateTime<Utc>,

    /// End of the profiling window
    pub end_time: DateTime<Utc>,

    /// Static tags merged into every label set
    pub tags: LabelSet,

    /// Source language / agent name ("go", "java", "py", ...)
    pub spy_name: String,

    /// Sampling rate in Hz, 0 when unknown
    pub sample_rate: u32,

    /// Default units (overwritten by the pprof decoder)
    pub units: String,

    /// Default aggregation for sample types without their own
    pub aggregation_type: AggType,
}

impl Meta {
    /// Add the synthetic sample rate tag when a rate is known
    pub(crate) fn apply_sample_rate_tag(&mut self) {
        if self.sample_rate > 0 {
            self.tags
                .insert(SAMPLE_RATE_TAG.to_string(), self.sample_rate.to_string());
        }
    }

    /// The metadata window in nanoseconds since the epoch
    pub fn window(&self) -> ProfileWindow {
        ProfileWindow {
            start_nanos: self.start_time.timestamp_nanos_opt().unwrap_or_default(),
            end_nanos: self.end_time.timestamp_nanos_opt().unwrap_or_default(),
        }
    }
}

/// Time window a set of rows covers, in nanoseconds since the epoch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProfileWindow {
    pub start_nanos: i64,
    pub end_nanos: i64,
}

impl ProfileWindow {
    pub fn duration_nanos(&self) -> i64 {
        self.end_nanos.saturating_sub(self.start_nanos)
    }

    /// Second-resolution timestamp shared by all records of the window
    pub fn start_seconds(&self) -> u32 {
        (self.start_nanos / 1_000_000_000) as u32
    }
}

/// A call stack ready for display
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stack {
    /// Leaf frame
    pub name: String,

    /// Callers of the leaf, nearest first
    pub frames: Vec<String>,
}

/// Coarse profile classification written into each record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Cpu,
    Mem,
    Goroutines,
    Exception,
    Unknown,
}

impl Kind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Kind::Cpu => "profile_cpu",
            Kind::Mem => "profile_mem",
            Kind::Goroutines => "profile_goroutines",
            Kind::Exception => "profile_exception",
            Kind::Unknown => "profile_unknown",
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classify a sample type name
///
/// **Public** - used by the emitter on the first sample type of a row
pub fn detect_profile_type(value_type: &str) -> Kind {
    match value_type {
        "inuse_space"
        | "inuse_objects"
        | "alloc_space"
        | "alloc_objects"
        | "alloc-size"
        | "alloc-samples"
        | "alloc_in_new_tlab_objects"
        | "alloc_in_new_tlab_bytes"
        | "alloc_outside_tlab_objects"
        | "alloc_outside_tlab_bytes" => Kind::Mem,
        "samples" | "cpu" | "itimer" | "lock_count" | "lock_duration" | "wall" => Kind::Cpu,
        "mutex_count" | "mutex_duration" | "block_duration" | "block_count" | "contentions"
        | "delay" | "lock-time" | "lock-count" => Kind::Mem,
        "goroutines" | "goroutine" => Kind::Goroutines,
        "exception" => Kind::Exception,
        _ => Kind::Unknown,
    }
}

/// Correlation id for one parse call: the reserved tag if present, otherwise a fresh UUID
pub fn profile_id(meta: &Meta) -> String {
    match meta.tags.get(PROFILE_ID_LABEL) {
        Some(id) => id.clone(),
        None => uuid::Uuid::new_v4().to_string(),
    }
}
