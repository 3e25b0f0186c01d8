//! Trees grouped by sample type and label set.

use super::labels::{cut_label, normalize_labels, profile_id_label_index, Label, StringResolver};
use super::tree::Tree;
use std::collections::BTreeMap;

/// One tree per (sample type, label set), iterated in key order
#[derive(Debug, Clone)]
pub struct LabelsCache<K> {
    trees: BTreeMap<(K, Vec<Label>), Tree>,
}

impl<K> Default for LabelsCache<K> {
    fn default() -> Self {
        Self {
            trees: BTreeMap::new(),
        }
    }
}

impl<K: Copy + Ord> LabelsCache<K> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tree for the given key, created empty on first use
    pub fn get_or_create(&mut self, sample_type: K, labels: &[Label]) -> &mut Tree {
        let labels = normalize_labels(labels.to_vec());
        self.trees.entry((sample_type, labels)).or_default()
    }

    /// Re-key every tree whose labels carry the correlation label onto the
    /// same label set without it, merging where that set already exists
    pub fn merge_profile_id_labels<R: StringResolver + ?Sized>(&mut self, resolver: &R) {
        let tagged: Vec<(K, Vec<Label>)> = self
            .trees
            .keys()
            .filter(|(_, labels)| profile_id_label_index(labels, resolver).is_some())
            .cloned()
            .collect();

        for key in tagged {
            let Some(tree) = self.trees.remove(&key) else {
                continue;
            };
            let (sample_type, labels) = key;
            if let Some(index) = profile_id_label_index(&labels, resolver) {
                let cut = cut_label(&labels, index);
                self.get_or_create(sample_type, &cut).merge(&tree);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.trees.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trees.is_empty()
    }

    /// All entries as (sample type, labels, tree), sorted by sample type
    /// and then by normalized labels
    pub fn iter(&self) -> impl Iterator<Item = (K, &[Label], &Tree)> {
        self.trees
            .iter()
            .map(|((sample_type, labels), tree)| (*sample_type, labels.as_slice(), tree))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_order_does_not_split_trees() {
        let mut cache = LabelsCache::new();
        cache
            .get_or_create(1u8, &[Label::new(1, 2), Label::new(3, 4)])
            .insert_stack(&["a"], 1);
        cache
            .get_or_create(1u8, &[Label::new(3, 4), Label::new(1, 2)])
            .insert_stack(&["a"], 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_merge_profile_id_labels() {
        let table: Vec<String> = ["", "profile_id", "abc", "region", "eu"]
            .iter()
            .map(|s| s.to_string())
            .collect();

        let mut cache = LabelsCache::new();
        cache
            .get_or_create(0u8, &[Label::new(3, 4)])
            .insert_stack(&["main"], 1);
        cache
            .get_or_create(0u8, &[Label::new(3, 4), Label::new(1, 2)])
            .insert_stack(&["main"], 2);

        cache.merge_profile_id_labels(&table);

        assert_eq!(cache.len(), 1);
        let (_, labels, tree) = cache.iter().next().unwrap();
        assert_eq!(labels, &[Label::new(3, 4)]);
        assert_eq!(tree.total(), 3);
    }

    #[test]
    fn test_iteration_follows_key_order() {
        let mut cache = LabelsCache::new();
        for labels in [[Label::new(5, 6)], [Label::new(1, 2)], [Label::new(3, 4)]] {
            cache.get_or_create(1u8, &labels).insert_stack(&["a"], 1);
        }
        cache.get_or_create(0u8, &[Label::new(9, 9)]).insert_stack(&["a"], 1);

        let keys: Vec<(u8, Vec<Label>)> = cache
            .iter()
            .map(|(k, labels, _)| (k, labels.to_vec()))
            .collect();
        assert_eq!(
            keys,
            vec![
                (0, vec![Label::new(9, 9)]),
                (1, vec![Label::new(1, 2)]),
                (1, vec![Label::new(3, 4)]),
                (1, vec![Label::new(5, 6)]),
            ]
        );
    }
}
