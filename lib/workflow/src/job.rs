//! Job instance model and hash encoding.
//!
//! A job instance lives in the store as a flat string hash (`job:{id}:data`).
//! Timestamps are RFC 3339, payloads are JSON-encoded objects, and an unset
//! timestamp is stored as the empty string so field layout stays stable.

use chrono::{DateTime, SecondsFormat, Utc};
use fairway_core::{JobId, RunId};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;

/// Lifecycle status of a job instance.
///
/// `Queued` is reserved for future priority bookkeeping; execution flows move
/// straight from `Pending` to `Running`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    /// Created, awaiting admission.
    Pending,
    /// Reserved; not emitted by execution flows.
    Queued,
    /// A worker is executing the handler.
    Running,
    /// Handler returned (terminal).
    Success,
    /// Handler raised or the template was unknown (terminal).
    Failed,
}

impl JobStatus {
    /// Returns the wire form of the status.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Queued => "QUEUED",
            Self::Running => "RUNNING",
            Self::Success => "SUCCESS",
            Self::Failed => "FAILED",
        }
    }

    /// Parses the wire form back into a status.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "PENDING" => Some(Self::Pending),
            "QUEUED" => Some(Self::Queued),
            "RUNNING" => Some(Self::Running),
            "SUCCESS" => Some(Self::Success),
            "FAILED" => Some(Self::Failed),
            _ => None,
        }
    }

    /// Returns true once the job can no longer transition.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Success | Self::Failed)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Inputs for creating a job instance.
#[derive(Debug, Clone)]
pub struct NewJob {
    /// Owning user.
    pub user_id: String,
    /// Workflow the spec came from.
    pub workflow_id: String,
    /// Run this instance belongs to.
    pub run_id: RunId,
    /// Branch the spec came from.
    pub branch_id: String,
    /// Template to execute.
    pub template_id: String,
    /// Input payload, merged and hydrated by the execution manager.
    pub input_payload: Map<String, Value>,
}

/// A concrete, executable job record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobInstance {
    pub job_id: JobId,
    pub workflow_id: String,
    pub run_id: RunId,
    pub branch_id: String,
    pub template_id: String,
    pub user_id: String,
    pub status: JobStatus,
    pub created_at: Option<DateTime<Utc>>,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub input_payload: Map<String, Value>,
    pub output_payload: Map<String, Value>,
    pub progress: u8,
    pub progress_message: String,
    pub stage: String,
    pub eta_seconds: Option<i64>,
}

impl JobInstance {
    /// Decodes an instance from its store hash.
    ///
    /// Returns None for an empty hash or one whose identifying fields are
    /// missing or unparseable. Payload and timestamp fields decode
    /// defensively: garbage reads as empty.
    #[must_use]
    pub fn from_fields(fields: &HashMap<String, String>) -> Option<Self> {
        let job_id: JobId = fields.get("job_id")?.parse().ok()?;
        let run_id: RunId = fields.get("run_id")?.parse().ok()?;
        let status = JobStatus::parse(fields.get("status")?)?;

        let text = |field: &str| fields.get(field).cloned().unwrap_or_default();

        Some(Self {
            job_id,
            workflow_id: text("workflow_id"),
            run_id,
            branch_id: text("branch_id"),
            template_id: text("template_id"),
            user_id: text("user_id"),
            status,
            created_at: parse_timestamp(fields.get("created_at")),
            scheduled_at: parse_timestamp(fields.get("scheduled_at")),
            started_at: parse_timestamp(fields.get("started_at")),
            finished_at: parse_timestamp(fields.get("finished_at")),
            input_payload: decode_payload(fields.get("input_payload").map_or("", String::as_str)),
            output_payload: decode_payload(
                fields.get("output_payload").map_or("", String::as_str),
            ),
            progress: fields
                .get("progress")
                .and_then(|p| p.parse().ok())
                .unwrap_or(0),
            progress_message: text("progress_message"),
            stage: text("stage"),
            eta_seconds: fields.get("eta_seconds").and_then(|e| e.parse().ok()),
        })
    }
}

/// Formats a timestamp the way the job hash stores it.
#[must_use]
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(raw: Option<&String>) -> Option<DateTime<Utc>> {
    let raw = raw?;
    if raw.is_empty() {
        return None;
    }
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|ts| ts.with_timezone(&Utc))
}

/// Encodes a payload object for storage.
#[must_use]
pub fn encode_payload(payload: &Map<String, Value>) -> String {
    serde_json::to_string(payload).unwrap_or_else(|_| String::from("{}"))
}

/// Decodes a stored payload defensively.
///
/// Older writers sometimes serialized an already-serialized payload, leaving
/// a JSON string whose content is the real object; that shape decodes twice.
/// Anything unparseable reads as an empty map.
#[must_use]
pub fn decode_payload(raw: &str) -> Map<String, Value> {
    if raw.is_empty() {
        return Map::new();
    }
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => map,
        Ok(Value::String(inner)) => match serde_json::from_str::<Value>(&inner) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        },
        _ => Map::new(),
    }
}
