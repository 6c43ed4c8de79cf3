//! Storage-change notifications.
//!
//! Only the fields the pipeline uses are modelled: a record's bucket name
//! and object key. Anything else in the notification is ignored, and so are
//! records that are never read: [`TriggerEvent::from_notification`] checks
//! the first record only, [`TriggerEvent::all_from_notification`] checks
//! them all.

use crate::error::Diagram2TfError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// One uploaded diagram to process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerEvent {
    pub source_bucket: String,
    pub object_key: String,
}

impl TriggerEvent {
    pub fn new(source_bucket: impl Into<String>, object_key: impl Into<String>) -> Self {
        Self {
            source_bucket: source_bucket.into(),
            object_key: object_key.into(),
        }
    }

    /// The first record of a notification. Later records are not parsed.
    pub fn from_notification(value: &serde_json::Value) -> Result<Self, Diagram2TfError> {
        let records = records_of(value)?;
        parse_record(0, &records[0])
    }

    /// Every record of a notification, in order. Never empty on success.
    pub fn all_from_notification(value: &serde_json::Value) -> Result<Vec<Self>, Diagram2TfError> {
        records_of(value)?
            .iter()
            .enumerate()
            .map(|(i, r)| parse_record(i, r))
            .collect()
    }
}

/// The raw, non-empty `Records` array.
fn records_of(value: &serde_json::Value) -> Result<Vec<serde_json::Value>, Diagram2TfError> {
    let notification: Notification = serde_json::from_value(value.clone())
        .map_err(|e| Diagram2TfError::InvalidEvent(e.to_string()))?;
    if notification.records.is_empty() {
        return Err(Diagram2TfError::InvalidEvent("notification has no records".into()));
    }
    Ok(notification.records)
}

fn parse_record(index: usize, raw: &serde_json::Value) -> Result<TriggerEvent, Diagram2TfError> {
    let record = Record::deserialize(raw)
        .map_err(|e| Diagram2TfError::InvalidEvent(format!("record {index}: {e}")))?;
    if record.s3.bucket.name.is_empty() || record.s3.object.key.is_empty() {
        return Err(Diagram2TfError::InvalidEvent(format!(
            "record {index} has an empty bucket name or object key"
        )));
    }
    Ok(TriggerEvent::new(record.s3.bucket.name, record.s3.object.key))
}

/// Read a notification document from disk.
pub async fn read_notification(path: &Path) -> Result<serde_json::Value, Diagram2TfError> {
    let text = tokio::fs::read_to_string(path).await.map_err(|e| {
        Diagram2TfError::InvalidEvent(format!("cannot read {}: {}", path.display(), e))
    })?;
    serde_json::from_str(&text)
        .map_err(|e| Diagram2TfError::InvalidEvent(format!("{}: {}", path.display(), e)))
}

#[derive(Deserialize)]
struct Notification {
    #[serde(rename = "Records")]
    records: Vec<serde_json::Value>,
}

#[derive(Deserialize)]
struct Record {
    s3: S3Entity,
}

#[derive(Deserialize)]
struct S3Entity {
    bucket: BucketEntity,
    object: ObjectEntity,
}

#[derive(Deserialize)]
struct BucketEntity {
    name: String,
}

#[derive(Deserialize)]
struct ObjectEntity {
    key: String,
}
