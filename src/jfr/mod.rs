//! JFR (Java Flight Recorder) decoding.
//!
//! This module handles:
//! - The chunked binary format (header, metadata, constant pools, events)
//! - Symbol normalization for JVM-generated names
//! - Folding execution, allocation and lock events into rows
//! - Resolving execution contexts through an agent-supplied label snapshot

pub mod chunk;
pub mod decoder;
pub mod event;
pub mod labels;
pub mod metadata;
mod reader;
pub mod symbols;
pub mod value;

pub use chunk::{parse_chunks, Chunk, ChunkHeader};
pub use decoder::JfrSampleType;
pub use event::{Frame, JfrEvent, StackTrace};
pub use labels::{Context, LabelsSnapshot};
pub use symbols::merge_jvm_generated_classes;

use crate::extract::extract_jfr;
use crate::output::{LogRecord, RecordEmitter};
use crate::profile::{LabelSet, Meta};
use crate::utils::error::ParseError;
use crate::RawProfile;
use log::{debug, info};

#[derive(Debug)]
enum Source {
    Upload {
        data: Vec<u8>,
        content_type: Option<String>,
    },
    Extracted {
        jfr: Vec<u8>,
        labels: LabelsSnapshot,
    },
}

/// A JFR upload waiting to be parsed
///
/// **Public** - consumed by [`RawProfile::parse`]
#[derive(Debug)]
pub struct JfrProfile {
    source: Source,
}

impl JfrProfile {
    /// Raw recording bytes or a multipart form with `jfr` and `labels` fields
    pub fn new(data: Vec<u8>, content_type: Option<&str>) -> Self {
        Self {
            source: Source::Upload {
                data,
                content_type: content_type.map(str::to_string),
            },
        }
    }

    /// A bare recording with an already decoded label snapshot
    pub fn with_labels(jfr: Vec<u8>, labels: LabelsSnapshot) -> Self {
        Self {
            source: Source::Extracted { jfr, labels },
        }
    }
}

impl RawProfile for JfrProfile {
    fn parse(self, meta: &mut Meta, tags: &LabelSet) -> Result<Vec<LogRecord>, ParseError> {
        let (jfr, labels) = match self.source {
            Source::Upload { data, content_type } => {
                let payload = extract_jfr(data, content_type.as_deref())?;
                (payload.jfr, payload.labels.unwrap_or_default())
            }
            Source::Extracted { jfr, labels } => (jfr, labels),
        };
        if jfr.is_empty() {
            return Err(ParseError::EmptyInput);
        }

        meta.apply_sample_rate_tag();

        let chunks = parse_chunks(&jfr, merge_jvm_generated_classes)?;
        debug!(
            "Decoded {} JFR chunks, {} label contexts",
            chunks.len(),
            labels.contexts.len()
        );

        let meta = &*meta;
        let window = meta.window();
        let mut emitter = RecordEmitter::new(meta, tags);
        for chunk in &chunks {
            for row in decoder::chunk_rows(chunk, &labels, meta) {
                emitter.emit(row, window);
            }
        }

        info!("Converted JFR recording into {} records", emitter.len());
        Ok(emitter.into_records())
    }
}
