//! Label resolution: interned label references to one canonical label set.

use crate::profile::LabelSet;
use crate::utils::config::PROFILE_ID_LABEL;

/// A label as carried by the wire formats: interned key and value ids
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Label {
    pub key: i64,
    pub value: i64,
}

impl Label {
    pub fn new(key: i64, value: i64) -> Self {
        Self { key, value }
    }
}

/// Sort labels so that equal sets compare and hash equally
pub fn normalize_labels(mut labels: Vec<Label>) -> Vec<Label> {
    labels.sort_unstable();
    labels
}

/// Anything that maps interned ids back to strings
pub trait StringResolver {
    fn resolve(&self, index: i64) -> Option<&str>;
}

impl StringResolver for [String] {
    fn resolve(&self, index: i64) -> Option<&str> {
        usize::try_from(index)
            .ok()
            .and_then(|i| self.get(i))
            .map(String::as_str)
    }
}

impl StringResolver for Vec<String> {
    fn resolve(&self, index: i64) -> Option<&str> {
        self.as_slice().resolve(index)
    }
}

/// Merge static tags with per-sample labels
///
/// **Public** - used by both decoders while folding rows
///
/// Static tags seed the result and labels overlay them. A label whose key
/// or value is missing or empty is treated as corrupt interning and skipped.
pub fn build_label_set<R: StringResolver + ?Sized>(
    static_tags: &LabelSet,
    labels: &[Label],
    resolver: &R,
) -> LabelSet {
    let mut result = static_tags.clone();

    for label in labels {
        let Some(key) = resolver.resolve(label.key).filter(|k| !k.is_empty()) else {
            continue;
        };
        let Some(value) = resolver.resolve(label.value).filter(|v| !v.is_empty()) else {
            continue;
        };
        result.insert(key.to_string(), value.to_string());
    }

    result
}

/// Position of the correlation label, if the set carries one
pub fn profile_id_label_index<R: StringResolver + ?Sized>(
    labels: &[Label],
    resolver: &R,
) -> Option<usize> {
    labels
        .iter()
        .position(|l| resolver.resolve(l.key) == Some(PROFILE_ID_LABEL))
}

/// Copy of `labels` without the label at `index`
pub fn cut_label(labels: &[Label], index: usize) -> Vec<Label> {
    labels
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != index)
        .map(|(_, l)| *l)
        .collect()
}
