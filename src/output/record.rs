//! Structured log records handed to the caller's sink.

use serde::{Deserialize, Serialize};

/// One key/value pair of a record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogContent {
    pub key: String,
    pub value: String,
}

/// A timestamped, ordered list of key/value pairs
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LogRecord {
    /// Seconds since the epoch
    pub time: u32,
    pub contents: Vec<LogContent>,
}

impl LogRecord {
    pub fn new(time: u32) -> Self {
        Self {
            time,
            contents: Vec::new(),
        }
    }

    pub fn push(&mut self, key: &str, value: impl Into<String>) {
        self.contents.push(LogContent {
            key: key.to_string(),
            value: value.into(),
        });
    }

    /// First value stored under `key`
    pub fn get(&self, key: &str) -> Option<&str> {
        self.contents
            .iter()
            .find(|c| c.key == key)
            .map(|c| c.value.as_str())
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.contents.iter().map(|c| c.key.as_str())
    }
}
