//! Record loader for portal exports
//!
//! An export is either a bare JSON array of file records or a portal query
//! result exposing the array at `data.getStudy.files`. Each file record has a
//! `description` field that is itself a JSON document, so decoding happens in
//! two steps: the outer file record, then the embedded description.

use crate::error::{ReportError, Result};
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::path::Path;

/// Nested location of the file list inside a portal export
const EXPORT_PATH: [&str; 3] = ["data", "getStudy", "files"];

/// Length of the device-id prefix naming the device type
pub const DEVICE_TYPE_LEN: usize = 3;

/// What to do with a record whose description cannot be decoded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecordPolicy {
    /// Log a warning and leave the record out
    #[default]
    Skip,
    /// Fail the whole load
    Strict,
}

/// A file record as it appears in the export
#[derive(Debug, Clone, Deserialize)]
pub struct FileRecord {
    pub description: String,
    #[serde(rename = "uploadedBy")]
    pub uploaded_by: String,
}

/// The JSON document embedded in a file record's `description`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Description {
    pub participant_id: String,
    pub device_id: String,
    #[serde(deserialize_with = "epoch_ms")]
    pub start_date: i64,
    #[serde(deserialize_with = "epoch_ms")]
    pub end_date: i64,
}

/// Epoch milliseconds appear both as JSON numbers and as numeric strings
fn epoch_ms<'de, D>(deserializer: D) -> std::result::Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum EpochMs {
        Int(i64),
        Text(String),
    }

    match EpochMs::deserialize(deserializer)? {
        EpochMs::Int(ms) => Ok(ms),
        EpochMs::Text(s) => s
            .trim()
            .parse()
            .map_err(|_| serde::de::Error::custom(format!("'{}' is not epoch milliseconds", s))),
    }
}

/// One uploaded recording: who uploaded which device's data for whom, and when
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub participant_id: String,
    pub device_id: String,
    pub start_ms: i64,
    pub end_ms: i64,
    pub uploaded_by: String,
}

impl Record {
    /// Study site: the first character of the participant id
    pub fn site(&self) -> Option<char> {
        self.participant_id.chars().next()
    }

    /// Device type: the first three characters of the device id
    pub fn device_type(&self) -> &str {
        match self.device_id.char_indices().nth(DEVICE_TYPE_LEN) {
            Some((idx, _)) => &self.device_id[..idx],
            None => &self.device_id,
        }
    }

    /// Build a record from a decoded description
    ///
    /// The recording window is kept as given; only the view report reads it
    /// and it rejects unusable windows itself.
    fn from_description(desc: Description, uploaded_by: String) -> std::result::Result<Self, String> {
        if desc.participant_id.is_empty() {
            return Err("participantId is empty".to_string());
        }
        Ok(Self {
            participant_id: desc.participant_id,
            device_id: desc.device_id,
            start_ms: desc.start_date,
            end_ms: desc.end_date,
            uploaded_by,
        })
    }
}

/// Records decoded from an export, plus how many were left out
#[derive(Debug, Clone, Default)]
pub struct LoadedRecords {
    pub records: Vec<Record>,
    pub skipped: usize,
}

/// Read and decode the export at `path`
pub fn load_records(path: &Path, policy: RecordPolicy) -> Result<LoadedRecords> {
    let content =
        std::fs::read_to_string(path).map_err(|e| ReportError::input_parse(path, e))?;
    let loaded = parse_records(&content, path, policy)?;
    tracing::info!(
        path = %path.display(),
        records = loaded.records.len(),
        skipped = loaded.skipped,
        "loaded records"
    );
    Ok(loaded)
}

/// Decode export text; `path` is only used in error messages
pub fn parse_records(content: &str, path: &Path, policy: RecordPolicy) -> Result<LoadedRecords> {
    let document: Value =
        serde_json::from_str(content).map_err(|e| ReportError::input_parse(path, e))?;
    let files = locate_files(document).ok_or_else(|| {
        ReportError::input_parse(
            path,
            "expected a top-level array or an object with data.getStudy.files",
        )
    })?;

    let mut loaded = LoadedRecords::default();
    for (index, item) in files.into_iter().enumerate() {
        let file: FileRecord = serde_json::from_value(item)
            .map_err(|e| ReportError::input_parse(path, format!("file record #{}: {}", index, e)))?;

        match decode_description(&file.description)
            .and_then(|desc| Record::from_description(desc, file.uploaded_by))
        {
            Ok(record) => loaded.records.push(record),
            Err(reason) => match policy {
                RecordPolicy::Strict => return Err(ReportError::Description { index, reason }),
                RecordPolicy::Skip => {
                    tracing::warn!(index, %reason, "skipping record with malformed description");
                    loaded.skipped += 1;
                }
            },
        }
    }

    Ok(loaded)
}

fn decode_description(raw: &str) -> std::result::Result<Description, String> {
    serde_json::from_str(raw).map_err(|e| e.to_string())
}

fn locate_files(document: Value) -> Option<Vec<Value>> {
    let mut node = document;
    if !node.is_array() {
        for key in EXPORT_PATH {
            node = match node {
                Value::Object(mut map) => map.remove(key)?,
                _ => return None,
            };
        }
    }
    match node {
        Value::Array(items) => Some(items),
        _ => None,
    }
}
