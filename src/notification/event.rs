//! Execution event normalization
//!
//! The scheduler hands over a loosely-shaped JSON record whose fields depend on
//! the trigger. Everything that may be absent or mistyped is resolved here, once,
//! into a strongly-typed `ExecutionEvent`. Rendering never looks at raw JSON.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::{NotifyError, Result};

/// Normalized execution event
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExecutionEvent {
    /// Execution identifier
    pub id: Option<String>,
    /// Execution status (not guaranteed to agree with the trigger)
    pub status: Option<Status>,
    /// Link to the execution detail view
    pub href: String,
    /// Who started the execution
    pub user: Option<String>,
    /// Who aborted the execution
    pub aborted_by: Option<String>,
    pub date_started: Option<EventTime>,
    pub date_ended: Option<EventTime>,
    pub job: JobInfo,
    pub context: ExecutionContext,
    pub node_status: Option<NodeStatus>,
    /// Comma-joined failed node names
    pub failed_nodes: Option<String>,
    /// Comma-joined succeeded node names
    pub succeeded_nodes: Option<String>,
}

/// Job the execution belongs to
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobInfo {
    pub name: String,
    pub group: Option<String>,
    pub project: Option<String>,
    pub description: Option<String>,
}

/// Execution context: user-supplied options and the names of secure ones
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ExecutionContext {
    /// Option name -> rendered value, sorted by name
    pub options: BTreeMap<String, String>,
    /// Secure option name -> value carried by the secure option record, if any
    pub secure_options: BTreeMap<String, Option<String>>,
}

impl ExecutionContext {
    /// Whether an option must be redacted
    pub fn is_secure(&self, key: &str) -> bool {
        self.secure_options.contains_key(key)
    }

    /// Options safe to display
    pub fn visible_options(&self) -> impl Iterator<Item = (&String, &String)> {
        self.options.iter().filter(|(k, _)| !self.is_secure(k))
    }

    /// Every non-empty value associated with a secure option name
    pub fn secret_values(&self) -> Vec<&str> {
        let mut values: Vec<&str> = Vec::new();
        for (key, own) in &self.secure_options {
            if let Some(v) = self.options.get(key) {
                values.push(v.as_str());
            }
            if let Some(v) = own {
                values.push(v.as_str());
            }
        }
        values.retain(|v| !v.is_empty());
        values.sort_unstable();
        values.dedup();
        values
    }
}

/// Node result counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct NodeStatus {
    pub failed: u64,
    pub succeeded: u64,
    pub total: u64,
}

/// Execution status
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Running,
    Failed,
    Aborted,
    Succeeded,
    Other(String),
}

impl Status {
    /// Parse a status (case-insensitive)
    pub fn parse(raw: &str) -> Self {
        match raw.to_lowercase().as_str() {
            "running" => Status::Running,
            "failed" => Status::Failed,
            "aborted" => Status::Aborted,
            "succeeded" => Status::Succeeded,
            _ => Status::Other(raw.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Status::Running => "running",
            Status::Failed => "failed",
            Status::Aborted => "aborted",
            Status::Succeeded => "succeeded",
            Status::Other(s) => s,
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Event timestamp. Unparseable text is kept verbatim rather than dropped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum EventTime {
    At(DateTime<Utc>),
    Text(String),
}

impl EventTime {
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) => {
                let s = s.trim();
                if s.is_empty() {
                    return None;
                }
                match DateTime::parse_from_rfc3339(s) {
                    Ok(dt) => Some(EventTime::At(dt.with_timezone(&Utc))),
                    Err(_) => Some(EventTime::Text(s.to_string())),
                }
            }
            // epoch milliseconds
            Value::Number(n) => n
                .as_i64()
                .and_then(DateTime::<Utc>::from_timestamp_millis)
                .map(EventTime::At),
            _ => None,
        }
    }
}

impl fmt::Display for EventTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventTime::At(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%S UTC")),
            EventTime::Text(s) => f.write_str(s),
        }
    }
}

impl ExecutionEvent {
    /// Extract a typed event from the raw execution record.
    ///
    /// Fails only when `job.name` or `href` is missing or not a string.
    pub fn from_value(raw: &Value) -> Result<Self> {
        let job_record = raw.get("job").and_then(Value::as_object);

        let name = job_record
            .and_then(|j| j.get("name"))
            .and_then(Value::as_str)
            .ok_or(NotifyError::MissingRequiredField("job.name"))?
            .to_string();

        let href = raw
            .get("href")
            .and_then(Value::as_str)
            .filter(|s| !s.trim().is_empty())
            .ok_or(NotifyError::MissingRequiredField("href"))?
            .to_string();

        let job = JobInfo {
            name,
            group: job_record.and_then(|j| text(j, "group")),
            project: job_record.and_then(|j| text(j, "project")),
            description: job_record.and_then(|j| text(j, "description")),
        };

        let record = raw.as_object();
        let field = |key: &str| record.and_then(|r| r.get(key));
        let either = |a: &str, b: &str| field(a).or_else(|| field(b));

        let event = Self {
            id: field("id").and_then(scalar_text),
            status: field("status").and_then(Value::as_str).map(Status::parse),
            href,
            user: record.and_then(|r| text(r, "user")),
            aborted_by: record.and_then(|r| text(r, "abortedBy").or_else(|| text(r, "abortedby"))),
            date_started: field("dateStarted").and_then(EventTime::from_value),
            date_ended: field("dateEnded").and_then(EventTime::from_value),
            job,
            context: field("context").map(parse_context).unwrap_or_default(),
            node_status: either("nodeStatus", "nodestatus").and_then(parse_node_status),
            failed_nodes: record.and_then(|r| text(r, "failedNodeListString")),
            succeeded_nodes: record.and_then(|r| text(r, "succeededNodeListString")),
        };

        debug!(
            job = %event.job.name,
            id = ?event.id,
            options = event.context.options.len(),
            secure_options = event.context.secure_options.len(),
            "Normalized execution event"
        );

        Ok(event)
    }
}

/// Convenience wrapper around [`ExecutionEvent::from_value`]
pub fn normalize(raw: &Value) -> Result<ExecutionEvent> {
    ExecutionEvent::from_value(raw)
}

/// Non-blank string field
fn text(record: &Map<String, Value>, key: &str) -> Option<String> {
    record
        .get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
        .map(|s| s.to_string())
}

/// Strings and numbers as text; anything else is absent
fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn parse_context(value: &Value) -> ExecutionContext {
    let options = value
        .get("option")
        .and_then(Value::as_object)
        .map(|map| {
            map.iter()
                .map(|(k, v)| {
                    let rendered = match v {
                        Value::String(s) => s.clone(),
                        Value::Null => String::new(),
                        other => other.to_string(),
                    };
                    (k.clone(), rendered)
                })
                .collect()
        })
        .unwrap_or_default();

    let secure_options = match value.get("secureOption") {
        Some(Value::Object(map)) => map
            .iter()
            .map(|(k, v)| (k.clone(), v.as_str().map(|s| s.to_string())))
            .collect(),
        Some(Value::Array(names)) => names
            .iter()
            .filter_map(Value::as_str)
            .map(|k| (k.to_string(), None))
            .collect(),
        _ => BTreeMap::new(),
    };

    ExecutionContext {
        options,
        secure_options,
    }
}

fn parse_node_status(value: &Value) -> Option<NodeStatus> {
    let record = value.as_object()?;
    let count = |key: &str| -> u64 {
        match record.get(key) {
            Some(Value::Number(n)) => n.as_u64().unwrap_or(0),
            Some(Value::String(s)) => s.trim().parse().unwrap_or(0),
            _ => 0,
        }
    };

    Some(NodeStatus {
        failed: count("failed"),
        succeeded: count("succeeded"),
        total: count("total"),
    })
}
