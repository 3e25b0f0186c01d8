//! Expand aggregated rows into log records.
//!
//! A row with N sample-type entries becomes N records sharing the stack,
//! labels and profile fields, each carrying its own units, type,
//! aggregation and value.

use super::record::LogRecord;
use crate::aggregator::AggregatedRow;
use crate::profile::{detect_profile_type, profile_id, LabelSet, Meta, ProfileWindow};
use crate::utils::config::DATA_TYPE_CALL_STACK;
use log::{debug, warn};

/// Accumulates records for one parse call
///
/// **Public** - shared by both decoders
pub struct RecordEmitter<'a> {
    spy_name: &'a str,
    tags: &'a LabelSet,
    profile_id: String,
    records: Vec<LogRecord>,
}

impl<'a> RecordEmitter<'a> {
    /// The profile id is fixed here, once per parse call
    pub fn new(meta: &'a Meta, tags: &'a LabelSet) -> Self {
        Self {
            spy_name: &meta.spy_name,
            tags,
            profile_id: profile_id(meta),
            records: Vec::new(),
        }
    }

    pub fn profile_id(&self) -> &str {
        &self.profile_id
    }

    /// Emit one record per entry of `row`
    ///
    /// Rows whose parallel sequences are empty or of unequal length are
    /// skipped whole.
    pub fn emit(&mut self, row: AggregatedRow, window: ProfileWindow) {
        if !row.is_complete() {
            warn!(
                "stack {:016x} doesn't have enough meta or values, skipping: {:?}",
                row.id, row.stack
            );
            return;
        }
        let Some(stack) = row.stack else {
            return;
        };
        let Some(first_type) = row.types.first() else {
            return;
        };

        let mut labels = row.labels;
        labels.extend(self.tags.iter().map(|(k, v)| (k.clone(), v.clone())));
        let labels = serde_json::to_string(&labels).unwrap_or_else(|_| "{}".to_string());

        let mut base = LogRecord::new(window.start_seconds());
        base.push("name", stack.name);
        base.push("stack", stack.frames.join("\n"));
        base.push("stackID", format!("{:016x}", row.id));
        base.push("language", self.spy_name);
        base.push("type", detect_profile_type(first_type).as_str());
        base.push("dataType", DATA_TYPE_CALL_STACK);
        base.push("durationNs", window.duration_nanos().to_string());
        base.push("profileID", self.profile_id.as_str());
        base.push("labels", labels);

        let entries = row
            .values
            .iter()
            .zip(&row.units)
            .zip(&row.types)
            .zip(&row.aggregations);
        for (((value, unit), value_type), aggregation) in entries {
            let mut record = base.clone();
            record.push("units", unit.as_str());
            record.push("valueTypes", value_type.as_str());
            record.push("aggTypes", aggregation.as_str());
            record.push("val", format!("{:.2}", *value as f64));
            self.records.push(record);
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn into_records(self) -> Vec<LogRecord> {
        debug!("Emitted {} records", self.records.len());
        self.records
    }
}
