//! Fold JFR events into per-context trees and build rows.
//!
//! Each chunk is processed on its own: the active profiling event is read
//! from its settings, events are grouped by execution context and folded
//! into eight accumulators, correlation-tagged trees are merged back, and
//! every remaining tree is walked into rows.

use super::chunk::Chunk;
use super::event::{JfrEvent, StackTrace};
use super::labels::LabelsSnapshot;
use crate::aggregator::{
    build_label_set, AggregatedRow, Label, LabelsCache, SampleEntry, StackAggregator,
};
use crate::profile::{
    Meta, BYTES_UNITS, LOCK_NANOSECONDS_UNITS, LOCK_SAMPLES_UNITS, OBJECTS_UNITS, SAMPLES_UNITS,
};
use crate::utils::config::{JFR_ACTIVE_EVENT_SETTING, JFR_RUNNABLE_STATE, JFR_WALL_EVENT};
use log::debug;
use std::collections::BTreeMap;

/// The eight accumulators events are folded into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum JfrSampleType {
    Cpu,
    Wall,
    InTlabObjects,
    InTlabBytes,
    OutTlabObjects,
    OutTlabBytes,
    LockSamples,
    LockDuration,
}

impl JfrSampleType {
    /// Sample type name given the chunk's active event
    pub fn name<'a>(&self, active_event: &'a str) -> &'a str {
        match self {
            JfrSampleType::Cpu => match active_event {
                "cpu" | "itimer" => active_event,
                "wall" => "cpu",
                _ => "unknown",
            },
            JfrSampleType::Wall => "wall",
            JfrSampleType::InTlabObjects => "alloc_in_new_tlab_objects",
            JfrSampleType::InTlabBytes => "alloc_in_new_tlab_bytes",
            JfrSampleType::OutTlabObjects => "alloc_outside_tlab_objects",
            JfrSampleType::OutTlabBytes => "alloc_outside_tlab_bytes",
            JfrSampleType::LockSamples => "lock_count",
            JfrSampleType::LockDuration => "lock_duration",
        }
    }

    pub fn units(&self) -> &'static str {
        match self {
            JfrSampleType::Cpu | JfrSampleType::Wall => SAMPLES_UNITS,
            JfrSampleType::InTlabObjects | JfrSampleType::OutTlabObjects => OBJECTS_UNITS,
            JfrSampleType::InTlabBytes | JfrSampleType::OutTlabBytes => BYTES_UNITS,
            JfrSampleType::LockSamples => LOCK_SAMPLES_UNITS,
            JfrSampleType::LockDuration => LOCK_NANOSECONDS_UNITS,
        }
    }
}

/// Value of the last `event` setting, empty when none was recorded
pub fn active_event(events: &[JfrEvent]) -> &str {
    events
        .iter()
        .filter_map(|event| match event {
            JfrEvent::ActiveSetting { name, value } if name == JFR_ACTIVE_EVENT_SETTING => {
                Some(value.as_str())
            }
            _ => None,
        })
        .last()
        .unwrap_or_default()
}

/// Build the rows of one chunk
///
/// **Public** - called once per chunk by [`super::JfrProfile`]
pub fn chunk_rows(chunk: &Chunk, snapshot: &LabelsSnapshot, meta: &Meta) -> Vec<AggregatedRow> {
    let events = chunk.events();
    let active = active_event(&events);
    debug!("Chunk has {} events, active event '{}'", events.len(), active);

    let mut cache = fold_events(&events, snapshot);
    cache.merge_profile_id_labels(snapshot);

    let aggregation = meta.aggregation_type.to_string();
    let mut aggregator = StackAggregator::new(&meta.spy_name);
    for (sample_type, labels, tree) in cache.iter() {
        if sample_type == JfrSampleType::Wall && active != JFR_WALL_EVENT {
            continue;
        }

        let name = sample_type.name(active);
        let label_set = build_label_set(&meta.tags, labels, snapshot);
        for walked in tree.stacks() {
            let entry = SampleEntry {
                value: walked.self_value,
                sample_type: name.to_string(),
                unit: sample_type.units().to_string(),
                aggregation: aggregation.clone(),
            };
            aggregator.add(&walked, entry, label_set.clone());
        }
    }

    aggregator.into_rows()
}

/// Group sampling events by context and fold them into trees
pub fn fold_events(
    events: &[JfrEvent],
    snapshot: &LabelsSnapshot,
) -> LabelsCache<JfrSampleType> {
    let mut by_context: BTreeMap<i64, Vec<&JfrEvent>> = BTreeMap::new();
    for event in events {
        if let Some(context_id) = event.context_id() {
            by_context.entry(context_id).or_default().push(event);
        }
    }

    let mut cache = LabelsCache::new();
    for (context_id, group) in by_context {
        let labels = snapshot.context_labels(context_id);
        for event in group {
            fold_event(&mut cache, &labels, event);
        }
    }
    cache
}

fn fold_event(cache: &mut LabelsCache<JfrSampleType>, labels: &[Label], event: &JfrEvent) {
    let mut insert = |sample_type, frames: &[String], value: i64| {
        let value = u64::try_from(value).unwrap_or(0);
        cache
            .get_or_create(sample_type, labels)
            .insert_stack(frames, value);
    };

    match event {
        JfrEvent::ExecutionSample {
            stack_trace, state, ..
        } => {
            let Some(frames) = folded_frames(stack_trace) else {
                return;
            };
            if state.as_deref() == Some(JFR_RUNNABLE_STATE) {
                insert(JfrSampleType::Cpu, &frames, 1);
            }
            insert(JfrSampleType::Wall, &frames, 1);
        }
        JfrEvent::ObjectAllocationInNewTlab {
            stack_trace,
            tlab_size,
            ..
        } => {
            let Some(frames) = folded_frames(stack_trace) else {
                return;
            };
            insert(JfrSampleType::InTlabObjects, &frames, 1);
            insert(JfrSampleType::InTlabBytes, &frames, *tlab_size);
        }
        JfrEvent::ObjectAllocationOutsideTlab {
            stack_trace,
            allocation_size,
            ..
        } => {
            let Some(frames) = folded_frames(stack_trace) else {
                return;
            };
            insert(JfrSampleType::OutTlabObjects, &frames, 1);
            insert(JfrSampleType::OutTlabBytes, &frames, *allocation_size);
        }
        JfrEvent::JavaMonitorEnter {
            stack_trace,
            duration,
            ..
        }
        | JfrEvent::ThreadPark {
            stack_trace,
            duration,
            ..
        } => {
            let Some(frames) = folded_frames(stack_trace) else {
                return;
            };
            insert(JfrSampleType::LockSamples, &frames, 1);
            insert(JfrSampleType::LockDuration, &frames, *duration);
        }
        JfrEvent::ActiveSetting { .. } => {}
    }
}

/// Root-first frame names; `None` when nothing is left to fold
fn folded_frames(stack_trace: &Option<StackTrace>) -> Option<Vec<String>> {
    let frames = stack_trace.as_ref()?.root_first();
    if frames.is_empty() {
        return None;
    }
    Some(frames)
}
