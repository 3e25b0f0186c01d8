//! Build aggregated rows from walked stacks.
//!
//! Every stack discovered by a tree walk is keyed by its StackID, a hash of
//! the full frame sequence. Rows collect one entry per sample type the stack
//! was seen with, so a stack seen as both `alloc_space` and `inuse_space`
//! ends up as a single row with two entries.

use super::tree::WalkedStack;
use crate::profile::{format_position_and_name, format_position_and_names, LabelSet, Stack};
use highway::{HighwayHash, HighwayHasher, Key};
use log::{debug, warn};
use std::collections::HashMap;

/// Fixed key so that StackIDs are stable across processes
const STACK_ID_KEY: Key = Key([
    0x7072_6f66_696c_6531,
    0x7374_6163_6b5f_6964,
    0x6361_6c6c_7374_6b31,
    0x6e6f_726d_616c_697a,
]);

/// Hash of an ordered frame sequence
///
/// **Public** - the grouping key of every row
///
/// Frames are hashed as their plain concatenation; distinct sequences that
/// concatenate to the same text share an ID, an accepted precision loss.
pub fn stack_id<S: AsRef<str>>(frames: &[S]) -> u64 {
    let mut hasher = HighwayHasher::new(STACK_ID_KEY);
    for frame in frames {
        hasher.append(frame.as_ref().as_bytes());
    }
    hasher.finalize64()
}

/// One sample type's contribution to a stack
#[derive(Debug, Clone, PartialEq)]
pub struct SampleEntry {
    pub value: u64,
    pub sample_type: String,
    pub unit: String,
    pub aggregation: String,
}

/// All values recorded for one StackID
///
/// **Public** - handed to the record emitter
#[derive(Debug, Clone, Default)]
pub struct AggregatedRow {
    pub id: u64,
    pub stack: Option<Stack>,
    pub values: Vec<u64>,
    pub types: Vec<String>,
    pub units: Vec<String>,
    pub aggregations: Vec<String>,
    pub labels: LabelSet,
}

impl AggregatedRow {
    /// Whether every parallel sequence is non-empty and equally long
    pub fn is_complete(&self) -> bool {
        let n = self.values.len();
        self.stack.is_some()
            && n > 0
            && self.types.len() == n
            && self.units.len() == n
            && self.aggregations.len() == n
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Accumulates rows for one parse call
#[derive(Debug, Default)]
pub struct StackAggregator {
    spy_name: String,
    rows: HashMap<u64, AggregatedRow>,
}

impl StackAggregator {
    pub fn new(spy_name: &str) -> Self {
        Self {
            spy_name: spy_name.to_string(),
            rows: HashMap::new(),
        }
    }

    /// Record one walked stack
    ///
    /// Stacks with an empty leaf name are ignored. The row's labels are
    /// replaced by `labels`, so the last occurrence wins.
    pub fn add(&mut self, walked: &WalkedStack, entry: SampleEntry, labels: LabelSet) {
        if walked.name.is_empty() {
            return;
        }

        let id = stack_id(&walked.frames);
        let spy_name = &self.spy_name;
        let row = self.rows.entry(id).or_insert_with(|| AggregatedRow {
            id,
            ..Default::default()
        });

        row.stack = Some(Stack {
            name: format_position_and_name(&walked.name, spy_name),
            frames: format_position_and_names(walked.frames.get(1..).unwrap_or_default(), spy_name),
        });
        row.values.push(entry.value);
        row.types.push(entry.sample_type);
        row.units.push(entry.unit);
        row.aggregations.push(entry.aggregation);
        row.labels = labels;
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Finish aggregation, dropping rows that lack values or metadata
    pub fn into_rows(self) -> Vec<AggregatedRow> {
        let total = self.rows.len();
        let rows: Vec<AggregatedRow> = self
            .rows
            .into_values()
            .filter(|row| {
                if row.is_complete() {
                    return true;
                }
                warn!(
                    "stack {:016x} doesn't have enough meta or values, skipping: {:?}",
                    row.id, row.stack
                );
                false
            })
            .collect();

        debug!("Built {} rows from {} unique stacks", rows.len(), total);
        rows
    }
}
