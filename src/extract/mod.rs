//! Payload extraction from raw or multipart uploads.
//!
//! Agents either post the profile bytes directly or wrap them in a
//! `multipart/form-data` body next to auxiliary fields (sample type
//! configuration for pprof, a label snapshot for JFR).

use crate::jfr::LabelsSnapshot;
use crate::profile::SampleTypeMapping;
use crate::utils::config::{
    FORM_FIELD_JFR, FORM_FIELD_LABELS, FORM_FIELD_PROFILE, FORM_FIELD_SAMPLE_TYPE_CONFIG,
    MAX_FORM_MEMORY,
};
use crate::utils::error::ExtractError;
use log::debug;
use multipart::server::Multipart;
use prost::Message;
use std::collections::HashMap;
use std::io::{Cursor, Read};

/// Fields of a decoded multipart form, first value per name
#[derive(Debug, Default)]
pub struct Form {
    fields: HashMap<String, Vec<u8>>,
}

impl Form {
    /// Remove and return a field's bytes
    pub fn take(&mut self, name: &str) -> Option<Vec<u8>> {
        self.fields.remove(name)
    }

    /// Remove a field that must be present
    pub fn take_required(&mut self, name: &str) -> Result<Vec<u8>, ExtractError> {
        self.take(name)
            .ok_or_else(|| ExtractError::MissingField(name.to_string()))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Read a multipart body, buffering at most [`MAX_FORM_MEMORY`] bytes
///
/// **Public** - shared by both profile formats
///
/// # Errors
/// * `ExtractError::MalformedContentType` - unparseable type or no boundary
/// * `ExtractError::MalformedBody` - invalid multipart syntax or too large
pub fn read_form(data: &[u8], content_type: &str) -> Result<Form, ExtractError> {
    let boundary = parse_boundary(content_type)?;

    let mut multipart = Multipart::with_body(Cursor::new(data), boundary);
    let mut form = Form::default();
    let mut buffered: u64 = 0;

    loop {
        let entry = multipart
            .read_entry()
            .map_err(|e| ExtractError::MalformedBody(e.to_string()))?;
        let Some(mut field) = entry else {
            break;
        };

        let name = field.headers.name.to_string();
        let remaining = MAX_FORM_MEMORY - buffered;
        let mut content = Vec::new();
        (&mut field.data)
            .take(remaining + 1)
            .read_to_end(&mut content)
            .map_err(|e| ExtractError::MalformedBody(e.to_string()))?;

        buffered += content.len() as u64;
        if buffered > MAX_FORM_MEMORY {
            return Err(ExtractError::MalformedBody(format!(
                "form exceeds {} bytes",
                MAX_FORM_MEMORY
            )));
        }

        debug!("Read form field '{}' ({} bytes)", name, content.len());
        form.fields.entry(name).or_insert(content);
    }

    Ok(form)
}

fn parse_boundary(content_type: &str) -> Result<String, ExtractError> {
    let mime: mime::Mime = content_type
        .parse()
        .map_err(|e| ExtractError::MalformedContentType(format!("{}: {}", content_type, e)))?;

    mime.get_param(mime::BOUNDARY)
        .map(|b| b.as_str().to_string())
        .ok_or_else(|| {
            ExtractError::MalformedContentType(format!("no boundary in '{}'", content_type))
        })
}

/// Profile bytes and optional configuration of a pprof upload
#[derive(Debug, Default)]
pub struct PprofPayload {
    pub profile: Vec<u8>,
    pub sample_type_config: Option<SampleTypeMapping>,
}

/// Isolate a pprof profile from an upload
///
/// **Public** - first step of the pprof decoder
///
/// # Errors
/// * `ExtractError::MissingField` - no `profile` field in the form
/// * `ExtractError::MalformedConfig` - `sample_type_config` is not valid JSON
pub fn extract_pprof(data: Vec<u8>, content_type: Option<&str>) -> Result<PprofPayload, ExtractError> {
    let Some(content_type) = content_type.filter(|c| !c.is_empty()) else {
        return Ok(PprofPayload {
            profile: data,
            sample_type_config: None,
        });
    };

    let mut form = read_form(&data, content_type)?;
    let profile = form.take_required(FORM_FIELD_PROFILE)?;
    let sample_type_config = match form.take(FORM_FIELD_SAMPLE_TYPE_CONFIG) {
        Some(raw) => Some(serde_json::from_slice::<SampleTypeMapping>(&raw)?),
        None => None,
    };

    Ok(PprofPayload {
        profile,
        sample_type_config,
    })
}

/// Recording bytes and optional label snapshot of a JFR upload
#[derive(Debug, Default)]
pub struct JfrPayload {
    pub jfr: Vec<u8>,
    pub labels: Option<LabelsSnapshot>,
}

/// Isolate a JFR recording from an upload
///
/// **Public** - first step of the JFR decoder
///
/// # Errors
/// * `ExtractError::MissingField` - no `jfr` field in the form
/// * `ExtractError::MalformedBody` - `labels` is not a valid snapshot
pub fn extract_jfr(data: Vec<u8>, content_type: Option<&str>) -> Result<JfrPayload, ExtractError> {
    let Some(content_type) = content_type.filter(|c| !c.is_empty()) else {
        return Ok(JfrPayload {
            jfr: data,
            labels: None,
        });
    };

    let mut form = read_form(&data, content_type)?;
    let jfr = form.take_required(FORM_FIELD_JFR)?;
    let labels = match form.take(FORM_FIELD_LABELS) {
        Some(raw) => Some(LabelsSnapshot::decode(raw.as_slice()).map_err(|e| {
            ExtractError::MalformedBody(format!("invalid {} field: {}", FORM_FIELD_LABELS, e))
        })?),
        None => None,
    };

    Ok(JfrPayload { jfr, labels })
}
