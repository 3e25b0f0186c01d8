//! Label snapshot shipped alongside JFR recordings.
//!
//! The agent interns label keys and values into `strings` and associates
//! each execution context id with a set of (key id, value id) pairs.

use crate::aggregator::labels::{Label, StringResolver};
use std::collections::HashMap;

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Context {
    #[prost(map = "int64, int64", tag = "1")]
    pub labels: HashMap<i64, i64>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct LabelsSnapshot {
    #[prost(map = "int64, message", tag = "1")]
    pub contexts: HashMap<i64, Context>,
    #[prost(map = "int64, string", tag = "2")]
    pub strings: HashMap<i64, String>,
}

impl StringResolver for LabelsSnapshot {
    fn resolve(&self, index: i64) -> Option<&str> {
        self.strings.get(&index).map(String::as_str)
    }
}

impl LabelsSnapshot {
    /// Labels of an execution context; context 0 and unknown ids have none
    pub fn context_labels(&self, context_id: i64) -> Vec<Label> {
        if context_id == 0 {
            return Vec::new();
        }
        match self.contexts.get(&context_id) {
            Some(ctx) => ctx
                .labels
                .iter()
                .map(|(&key, &value)| Label::new(key, value))
                .collect(),
            None => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_labels() {
        let mut snapshot = LabelsSnapshot::default();
        snapshot.contexts.insert(
            7,
            Context {
                labels: HashMap::from([(1, 2)]),
            },
        );

        assert_eq!(snapshot.context_labels(7), vec![Label::new(1, 2)]);
        assert!(snapshot.context_labels(0).is_empty());
        assert!(snapshot.context_labels(8).is_empty());
    }
}
