//! Profile Convert
//!
//! Converts raw profiler uploads into per-stack sample records.
//!
//! Two wire formats are supported:
//! - pprof (protobuf call-tree profiles, optionally gzipped)
//! - JFR (Java Flight Recorder chunked event streams)
//!
//! Both are extracted from raw bytes or a multipart upload, folded into
//! call trees per sample type and label set, deduplicated by StackID and
//! expanded into one [`LogRecord`] per (stack, sample type).
//!
//! ## Getting Started
//!
//! ```ignore
//! use profile_convert::{parse_profile, Format, Meta, LabelSet};
//!
//! let mut meta = Meta { spy_name: "go".into(), ..Default::default() };
//! let records = parse_profile(Format::Pprof, bytes, None, &mut meta, &LabelSet::new())?;
//! ```

pub mod aggregator;
pub mod extract;
pub mod jfr;
pub mod output;
pub mod pprof;
pub mod profile;
pub mod utils;

pub use jfr::JfrProfile;
pub use output::{LogContent, LogRecord};
pub use pprof::PprofProfile;
pub use profile::{AggType, LabelSet, Meta};
pub use utils::error::ParseError;

use clap::ValueEnum;
use std::fmt;

/// A raw upload that can be converted into records once
///
/// **Public** - implemented by every supported format
pub trait RawProfile {
    /// Convert the upload, consuming it
    ///
    /// `meta` is updated in place (sample rate tag, pprof units); `tags`
    /// override row labels in every record.
    ///
    /// # Errors
    /// Any extraction, decoding or reference error aborts the whole call.
    fn parse(self, meta: &mut Meta, tags: &LabelSet) -> Result<Vec<LogRecord>, ParseError>;
}

/// Supported upload formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Format {
    Pprof,
    Jfr,
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Format::Pprof => f.write_str("pprof"),
            Format::Jfr => f.write_str("jfr"),
        }
    }
}

/// Convert an upload of the given format
///
/// **Public** - main entry point of the library
///
/// # Arguments
/// * `format` - Wire format of `data`
/// * `data` - Raw profile bytes or a multipart body
/// * `content_type` - Multipart content type, `None` for raw bytes
/// * `meta` - Upload metadata, updated in place
/// * `tags` - Labels that override per-row labels
///
/// # Errors
/// * `ParseError` - see [`RawProfile::parse`]
pub fn parse_profile(
    format: Format,
    data: Vec<u8>,
    content_type: Option<&str>,
    meta: &mut Meta,
    tags: &LabelSet,
) -> Result<Vec<LogRecord>, ParseError> {
    match format {
        Format::Pprof => PprofProfile::new(data, content_type).parse(meta, tags),
        Format::Jfr => JfrProfile::new(data, content_type).parse(meta, tags),
    }
}
