//! Call trees: stacks folded by shared prefix, walked back out per leaf.
//!
//! Stacks are inserted root first. Walking yields one [`WalkedStack`] per
//! node carrying a positive self value; its frame sequence runs from that
//! node up to (but excluding) the root, so the head repeats the node name.

use std::collections::BTreeMap;

const ROOT: usize = 0;

#[derive(Debug, Clone, Default)]
struct Node {
    name: String,
    self_value: u64,
    parent: usize,
    children: BTreeMap<String, usize>,
}

/// Arena-backed call tree
#[derive(Debug, Clone)]
pub struct Tree {
    nodes: Vec<Node>,
}

impl Default for Tree {
    fn default() -> Self {
        Self::new()
    }
}

impl Tree {
    pub fn new() -> Self {
        Self {
            nodes: vec![Node::default()],
        }
    }

    /// Add `value` to the node reached by following `stack` from the root
    pub fn insert_stack<S: AsRef<str>>(&mut self, stack: &[S], value: u64) {
        let mut current = ROOT;
        for frame in stack {
            current = self.child(current, frame.as_ref());
        }
        let node = &mut self.nodes[current];
        node.self_value = node.self_value.saturating_add(value);
    }

    /// Fold every stack of `other` into this tree
    pub fn merge(&mut self, other: &Tree) {
        let mut pending = vec![(ROOT, ROOT)];
        while let Some((theirs, ours)) = pending.pop() {
            let node = &other.nodes[theirs];
            let target = &mut self.nodes[ours];
            target.self_value = target.self_value.saturating_add(node.self_value);
            for (name, &child) in &node.children {
                let target = self.child(ours, name);
                pending.push((child, target));
            }
        }
    }

    /// Sum of all self values
    pub fn total(&self) -> u64 {
        self.nodes
            .iter()
            .fold(0u64, |acc, n| acc.saturating_add(n.self_value))
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    /// Single-pass walk over every node with a self value
    pub fn stacks(&self) -> Stacks<'_> {
        Stacks {
            tree: self,
            pending: vec![ROOT],
        }
    }

    fn child(&mut self, parent: usize, name: &str) -> usize {
        if let Some(&index) = self.nodes[parent].children.get(name) {
            return index;
        }
        let index = self.nodes.len();
        self.nodes.push(Node {
            name: name.to_string(),
            self_value: 0,
            parent,
            children: BTreeMap::new(),
        });
        self.nodes[parent].children.insert(name.to_string(), index);
        index
    }

    fn path(&self, mut index: usize) -> Vec<String> {
        let mut frames = Vec::new();
        while index != ROOT {
            let node = &self.nodes[index];
            frames.push(node.name.clone());
            index = node.parent;
        }
        frames
    }
}

/// One stack discovered by a tree walk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalkedStack {
    /// Leaf frame name
    pub name: String,

    /// Value attributed to the leaf itself
    pub self_value: u64,

    /// Frames from the leaf up to the outermost caller, leaf included
    pub frames: Vec<String>,
}

/// Iterator returned by [`Tree::stacks`]
pub struct Stacks<'a> {
    tree: &'a Tree,
    pending: Vec<usize>,
}

impl Iterator for Stacks<'_> {
    type Item = WalkedStack;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(index) = self.pending.pop() {
            let node = &self.tree.nodes[index];
            self.pending.extend(node.children.values().rev());

            if index != ROOT && node.self_value > 0 {
                return Some(WalkedStack {
                    name: node.name.clone(),
                    self_value: node.self_value,
                    frames: self.tree.path(index),
                });
            }
        }
        None
    }
}
