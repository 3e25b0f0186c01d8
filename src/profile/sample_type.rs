//! Sample type configuration.
//!
//! A sample type is retained only when its raw name has an entry here; the
//! entry supplies the display name, units and aggregation written out.

use super::{AggType, BYTES_UNITS, GOROUTINES_UNITS, OBJECTS_UNITS, SAMPLES_UNITS};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Per-type display configuration, as sent by agents in `sample_type_config`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SampleTypeConfig {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub units: String,

    #[serde(default, rename = "display-name", skip_serializing_if = "String::is_empty")]
    pub display_name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aggregation: Option<AggType>,

    #[serde(default)]
    pub cumulative: bool,

    #[serde(default)]
    pub sampled: bool,
}

/// Raw sample type name to its configuration
pub type SampleTypeMapping = HashMap<String, SampleTypeConfig>;

/// The built-in table used when an upload carries no configuration
pub fn default_sample_type_mapping() -> SampleTypeMapping {
    let entry = |units: &str, display_name: &str, aggregation, cumulative, sampled| {
        SampleTypeConfig {
            units: units.to_string(),
            display_name: display_name.to_string(),
            aggregation,
            cumulative,
            sampled,
        }
    };

    HashMap::from([
        (
            "samples".to_string(),
            entry(SAMPLES_UNITS, "cpu", None, false, true),
        ),
        (
            "inuse_objects".to_string(),
            entry(OBJECTS_UNITS, "", Some(AggType::Avg), false, false),
        ),
        (
            "alloc_objects".to_string(),
            entry(OBJECTS_UNITS, "", None, true, false),
        ),
        (
            "inuse_space".to_string(),
            entry(BYTES_UNITS, "", Some(AggType::Avg), false, false),
        ),
        (
            "alloc_space".to_string(),
            entry(BYTES_UNITS, "", None, true, false),
        ),
        (
            "goroutine".to_string(),
            entry(GOROUTINES_UNITS, "goroutines", Some(AggType::Avg), false, false),
        ),
        (
            "contentions".to_string(),
            entry("lock_samples", "mutex_count", None, true, false),
        ),
        (
            "delay".to_string(),
            entry("lock_nanoseconds", "mutex_duration", None, true, false),
        ),
    ])
}

/// Display name for a raw sample type, falling back to the raw name
pub(crate) fn display_name<'a>(mapping: &'a SampleTypeMapping, sample_type: &'a str) -> &'a str {
    match mapping.get(sample_type) {
        Some(c) if !c.display_name.is_empty() => &c.display_name,
        _ => sample_type,
    }
}

/// Aggregation for a raw sample type, falling back to the metadata default
pub(crate) fn aggregation_type(
    mapping: &SampleTypeMapping,
    sample_type: &str,
    default: AggType,
) -> AggType {
    mapping
        .get(sample_type)
        .and_then(|c| c.aggregation)
        .unwrap_or(default)
}
