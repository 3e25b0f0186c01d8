//! pprof decoding.
//!
//! This module handles:
//! - Protobuf messages of the pprof format
//! - Gzip detection and decoding
//! - Folding samples into per-type trees and walking them into rows

pub mod decoder;
pub mod proto;

pub use decoder::{decode_profile, profile_rows, profile_window, ResolvedSampleType};
pub use proto::Profile;

use crate::extract::extract_pprof;
use crate::output::{LogRecord, RecordEmitter};
use crate::profile::{default_sample_type_mapping, LabelSet, Meta};
use crate::utils::error::ParseError;
use crate::RawProfile;
use log::{debug, info};

/// A pprof upload waiting to be parsed
///
/// **Public** - consumed by [`RawProfile::parse`]
#[derive(Debug)]
pub struct PprofProfile {
    data: Vec<u8>,
    content_type: Option<String>,
}

impl PprofProfile {
    /// Raw profile bytes or a multipart form with `profile` and optional
    /// `sample_type_config` fields
    pub fn new(data: Vec<u8>, content_type: Option<&str>) -> Self {
        Self {
            data,
            content_type: content_type.map(str::to_string),
        }
    }
}

impl RawProfile for PprofProfile {
    fn parse(self, meta: &mut Meta, tags: &LabelSet) -> Result<Vec<LogRecord>, ParseError> {
        let payload = extract_pprof(self.data, self.content_type.as_deref())?;
        if payload.profile.is_empty() {
            return Err(ParseError::EmptyInput);
        }

        meta.apply_sample_rate_tag();

        let profile = decode_profile(&payload.profile)?;
        let mapping = match payload.sample_type_config {
            Some(config) => config,
            None => {
                debug!("No sample type config in upload, using defaults");
                default_sample_type_mapping()
            }
        };

        let rows = profile_rows(&profile, &mapping, meta)?;
        let window = profile_window(&profile, meta);

        let mut emitter = RecordEmitter::new(meta, tags);
        for row in rows {
            emitter.emit(row, window);
        }

        info!(
            "Converted pprof profile ({} samples) into {} records",
            profile.sample.len(),
            emitter.len()
        );
        Ok(emitter.into_records())
    }
}
