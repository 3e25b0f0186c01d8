//! Fold pprof samples into per-type trees and build rows.

use super::proto::{Function, Location, Profile, Sample};
use crate::aggregator::labels::{cut_label, profile_id_label_index};
use crate::aggregator::{build_label_set, AggregatedRow, Label, LabelsCache, SampleEntry, StackAggregator};
use crate::profile::sample_type::{aggregation_type, display_name};
use crate::profile::{Meta, ProfileWindow, SampleTypeMapping};
use crate::utils::config::GZIP_MAGIC;
use crate::utils::error::{DecodeError, ParseError};
use flate2::write::GzDecoder;
use log::debug;
use prost::Message;
use std::collections::HashMap;
use std::io::Write;

/// Decode a profile, gunzipping it first when it carries the gzip magic
///
/// # Errors
/// * `DecodeError::Gzip` - corrupt gzip stream
/// * `DecodeError::Protobuf` - bytes are not a `Profile` message
pub fn decode_profile(bytes: &[u8]) -> Result<Profile, DecodeError> {
    if bytes.starts_with(&GZIP_MAGIC) {
        let mut gz = GzDecoder::new(Vec::new());
        gz.write_all(bytes)?;
        let raw = gz.finish()?;
        debug!("Gunzipped profile: {} -> {} bytes", bytes.len(), raw.len());
        return Ok(Profile::decode(raw.as_slice())?);
    }
    Ok(Profile::decode(bytes)?)
}

/// A sample type with its strings resolved
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSampleType {
    /// Position in each sample's value list
    pub index: usize,
    pub name: String,
    pub unit: String,
}

fn string_at<'a>(table: &'a [String], index: i64, what: &'static str) -> Result<&'a str, ParseError> {
    usize::try_from(index)
        .ok()
        .and_then(|i| table.get(i))
        .map(String::as_str)
        .ok_or(ParseError::CorruptReference {
            what,
            index,
            len: table.len(),
        })
}

/// Resolve the name and unit of every declared sample type
///
/// # Errors
/// * `ParseError::CorruptReference` - a name or unit index is out of range
pub fn resolve_sample_types(profile: &Profile) -> Result<Vec<ResolvedSampleType>, ParseError> {
    profile
        .sample_type
        .iter()
        .enumerate()
        .map(|(index, vt)| {
            Ok(ResolvedSampleType {
                index,
                name: string_at(&profile.string_table, vt.r#type, "sample type")?.to_string(),
                unit: string_at(&profile.string_table, vt.unit, "sample unit")?.to_string(),
            })
        })
        .collect()
}

/// Lookup tables from ids to locations and functions
struct Finder<'a> {
    locations: HashMap<u64, &'a Location>,
    functions: HashMap<u64, &'a Function>,
}

impl<'a> Finder<'a> {
    fn new(profile: &'a Profile) -> Self {
        Self {
            locations: profile.location.iter().map(|l| (l.id, l)).collect(),
            functions: profile.function.iter().map(|f| (f.id, f)).collect(),
        }
    }
}

/// Root-first function names of a sample; unknown ids are skipped
fn sample_stack(
    profile: &Profile,
    finder: &Finder<'_>,
    sample: &Sample,
) -> Result<Vec<String>, ParseError> {
    let mut stack = Vec::new();
    for location_id in sample.location_id.iter().rev() {
        let Some(location) = finder.locations.get(location_id) else {
            continue;
        };
        for line in location.line.iter().rev() {
            let Some(function) = finder.functions.get(&line.function_id) else {
                continue;
            };
            stack.push(string_at(&profile.string_table, function.name, "function name")?.to_string());
        }
    }
    Ok(stack)
}

/// String labels of a sample; numeric labels carry no value id
fn sample_labels(sample: &Sample) -> Vec<Label> {
    sample
        .label
        .iter()
        .filter(|l| l.str != 0)
        .map(|l| Label::new(l.key, l.str))
        .collect()
}

/// Fold every retained sample type into trees keyed by (type index, labels)
///
/// Only sample types present in `mapping` are kept. Values that are zero
/// or negative are skipped. Samples tagged with the correlation label are
/// folded into the label set without it.
///
/// # Errors
/// * `ParseError::CorruptReference` - a function name index is out of range
pub fn build_trees(
    profile: &Profile,
    sample_types: &[ResolvedSampleType],
    mapping: &SampleTypeMapping,
) -> Result<LabelsCache<usize>, ParseError> {
    let finder = Finder::new(profile);
    let mut cache = LabelsCache::new();

    let retained: Vec<&ResolvedSampleType> = sample_types
        .iter()
        .filter(|st| mapping.contains_key(&st.name))
        .collect();
    debug!(
        "Retained {} of {} sample types",
        retained.len(),
        sample_types.len()
    );
    if retained.is_empty() {
        return Ok(cache);
    }

    for sample in &profile.sample {
        let stack = sample_stack(profile, &finder, sample)?;
        let mut labels = sample_labels(sample);
        if let Some(index) = profile_id_label_index(&labels, &profile.string_table) {
            labels = cut_label(&labels, index);
        }

        for sample_type in &retained {
            let value = sample.value.get(sample_type.index).copied().unwrap_or(0);
            if value <= 0 {
                continue;
            }
            cache
                .get_or_create(sample_type.index, &labels)
                .insert_stack(&stack, value as u64);
        }
    }

    Ok(cache)
}

/// The profile's own window when it records a start time
pub fn profile_window(profile: &Profile, meta: &Meta) -> ProfileWindow {
    if profile.time_nanos != 0 {
        return ProfileWindow {
            start_nanos: profile.time_nanos,
            end_nanos: profile.time_nanos.saturating_add(profile.duration_nanos),
        };
    }
    meta.window()
}

/// Walk every tree into rows
///
/// **Public** - the whole pprof pipeline after extraction
///
/// Records the first declared sample type's name in `meta.units`.
///
/// # Errors
/// * `ParseError::CorruptReference` - string table indices out of range
pub fn profile_rows(
    profile: &Profile,
    mapping: &SampleTypeMapping,
    meta: &mut Meta,
) -> Result<Vec<AggregatedRow>, ParseError> {
    let sample_types = resolve_sample_types(profile)?;
    if let Some(first) = sample_types.first() {
        meta.units = first.name.clone();
    }

    let cache = build_trees(profile, &sample_types, mapping)?;

    let mut aggregator = StackAggregator::new(&meta.spy_name);
    for (index, labels, tree) in cache.iter() {
        let sample_type = &sample_types[index];
        let entry_name = display_name(mapping, &sample_type.name).to_string();
        let aggregation = aggregation_type(mapping, &sample_type.name, meta.aggregation_type);
        let label_set = build_label_set(&meta.tags, labels, &profile.string_table);

        for walked in tree.stacks() {
            let entry = SampleEntry {
                value: walked.self_value,
                sample_type: entry_name.clone(),
                unit: sample_type.unit.clone(),
                aggregation: aggregation.to_string(),
            };
            aggregator.add(&walked, entry, label_set.clone());
        }
    }

    Ok(aggregator.into_rows())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pprof::proto::{Label as ProtoLabel, Line, ValueType};
    use crate::profile::default_sample_type_mapping;

    fn profile() -> Profile {
        let strings = ["", "samples", "count", "main", "work", "profile_id", "abc", "cpu"];
        Profile {
            sample_type: vec![ValueType { r#type: 1, unit: 2 }],
            location: vec![
                Location {
                    id: 1,
                    line: vec![Line { function_id: 2, line: 0 }, Line { function_id: 1, line: 0 }],
                    ..Default::default()
                },
            ],
            function: vec![
                Function { id: 1, name: 3, ..Default::default() },
                Function { id: 2, name: 4, ..Default::default() },
            ],
            sample: vec![
                Sample {
                    location_id: vec![1],
                    value: vec![5],
                    label: vec![],
                },
                Sample {
                    location_id: vec![1, 99],
                    value: vec![2],
                    label: vec![ProtoLabel { key: 5, str: 6, ..Default::default() }],
                },
                Sample {
                    location_id: vec![1],
                    value: vec![0],
                    label: vec![],
                },
            ],
            string_table: strings.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        }
    }

    #[test]
    fn test_inlined_lines_are_root_first() {
        let profile = profile();
        let finder = Finder::new(&profile);
        let stack = sample_stack(&profile, &finder, &profile.sample[0]).unwrap();
        assert_eq!(stack, vec!["main", "work"]);
    }

    #[test]
    fn test_profile_id_samples_join_baseline() {
        let profile = profile();
        let sample_types = resolve_sample_types(&profile).unwrap();
        let cache = build_trees(&profile, &sample_types, &default_sample_type_mapping()).unwrap();

        assert_eq!(cache.len(), 1);
        let (_, labels, tree) = cache.iter().next().unwrap();
        assert!(labels.is_empty());
        assert_eq!(tree.total(), 7);
    }

    #[test]
    fn test_unconfigured_types_dropped() {
        let profile = profile();
        let sample_types = resolve_sample_types(&profile).unwrap();
        let mapping = SampleTypeMapping::new();
        assert!(build_trees(&profile, &sample_types, &mapping).unwrap().is_empty());
    }

    #[test]
    fn test_corrupt_sample_type_reference() {
        let mut profile = profile();
        profile.sample_type[0].unit = 42;
        let err = resolve_sample_types(&profile).unwrap_err();
        assert!(matches!(
            err,
            ParseError::CorruptReference { what: "sample unit", index: 42, .. }
        ));
    }

    #[test]
    fn test_rows_use_display_name_and_profile_window() {
        let mut profile = profile();
        profile.time_nanos = 2_000_000_000;
        profile.duration_nanos = 1_000_000_000;

        let mut meta = Meta::default();
        meta.spy_name = "go".to_string();
        let rows = profile_rows(&profile, &default_sample_type_mapping(), &mut meta).unwrap();

        assert_eq!(meta.units, "samples");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].types, vec!["cpu"]);
        assert_eq!(rows[0].units, vec!["count"]);
        assert_eq!(rows[0].values, vec![7]);

        let window = profile_window(&profile, &meta);
        assert_eq!(window.start_nanos, 2_000_000_000);
        assert_eq!(window.duration_nanos(), 1_000_000_000);
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(decode_profile(&[0xff, 0xff, 0xff]).is_err());
        assert!(decode_profile(&[0x1f, 0x8b, 0x00]).is_err());
    }
}
