//! Message formatting - turn an execution event into a push title and body
//!
//! Rendering is total: once an event has been normalized, every optional field
//! has an "absent" rendering (the line is omitted), so nothing here can fail.
//!
//! Body sections, in order, one per line:
//! 1. `Job [<TRIGGER>] #<id> <status>`
//! 2. `started by <user>`
//! 3. `aborted by <user>` (aborted executions only)
//! 4. `at <timestamp>`
//! 5. `Description: ...`
//! 6. `Breadcrumb: project > group > name`
//! 7. `User Options` followed by `- key: value` lines, secure options removed
//! 8. `Nodes status [ failed=.. succeeded=.. total=.. ]`
//! 9. `Nodes failed: ...`
//! 10. `Nodes succeeded: ...`

use serde::Serialize;
use tracing::debug;

use super::event::{ExecutionEvent, Status};
use super::priority::{get_priority, Priority};

/// Fixed message text
pub mod msg {
    pub const STARTED_BY: &str = "started by";
    pub const ABORTED_BY: &str = "aborted by";
    pub const AT: &str = "at";
    pub const DESCRIPTION: &str = "Description:";
    pub const BREADCRUMB: &str = "Breadcrumb:";
    pub const BREADCRUMB_SEP: &str = " > ";
    pub const USER_OPTIONS: &str = "User Options";
    pub const NODES_STATUS: &str = "Nodes status";
    pub const NODES_FAILED: &str = "Nodes failed:";
    pub const NODES_SUCCEEDED: &str = "Nodes succeeded:";
    pub const TRIGGERED_BY: &str = "triggered by:";

    /// Replacement for secure option values
    pub const REDACTED: &str = "*****";
}

/// trigger -> title suffix. Anything not listed gets the `triggered by:` title.
const TITLE_TABLE: &[(&str, &str)] = &[
    ("start", "has started."),
    ("success", "has finished successfully!"),
    ("failure", "has failed!"),
    ("retryablefailure", "has failed, but will retry."),
    ("onavgduration", "exceeded avg duration"),
];

/// Triggers fired while the execution is still in progress
const IN_PROGRESS_TRIGGERS: &[&str] = &["start", "running"];

/// Rendered push message
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderedMessage {
    pub title: String,
    pub body: String,
    pub priority: Priority,
}

/// Message formatter
pub struct MessageFormatter {
    /// Text substituted for secure option values
    mask: String,
}

impl MessageFormatter {
    pub fn new() -> Self {
        Self {
            mask: msg::REDACTED.to_string(),
        }
    }

    /// Set the redaction mask
    pub fn with_mask(mut self, mask: impl Into<String>) -> Self {
        self.mask = mask.into();
        self
    }

    /// Render title, body and priority for one event
    pub fn render(&self, trigger: Option<&str>, event: &ExecutionEvent) -> RenderedMessage {
        let rendered = RenderedMessage {
            title: Self::format_title(trigger, &event.job.name),
            body: self.format_body(trigger, event),
            priority: get_priority(trigger),
        };

        debug!(
            job = %event.job.name,
            priority = %rendered.priority,
            body_lines = rendered.body.lines().count(),
            "Rendered notification"
        );

        rendered
    }

    /// Title from the trigger table, falling back to the raw trigger value
    pub fn format_title(trigger: Option<&str>, job: &str) -> String {
        let trigger = trigger.unwrap_or("");
        match TITLE_TABLE.iter().find(|(t, _)| *t == trigger) {
            Some((_, suffix)) => format!("Job '{}' {}", job, suffix),
            None => format!("Job '{}' {} {}", job, msg::TRIGGERED_BY, trigger),
        }
    }

    /// Compose the multi-section body
    pub fn format_body(&self, trigger: Option<&str>, event: &ExecutionEvent) -> String {
        let trigger = trigger.unwrap_or("");
        let mut lines: Vec<String> = Vec::new();

        lines.push(Self::format_header(trigger, event));

        if let Some(user) = &event.user {
            lines.push(format!("{} {}", msg::STARTED_BY, user));
        }

        if event.status == Some(Status::Aborted) {
            if let Some(aborted_by) = &event.aborted_by {
                lines.push(format!("{} {}", msg::ABORTED_BY, aborted_by));
            }
        }

        let date = if Self::is_in_progress(trigger) {
            event.date_started.as_ref()
        } else {
            event.date_ended.as_ref()
        };
        if let Some(date) = date {
            lines.push(format!("{} {}", msg::AT, date));
        }

        if let Some(description) = &event.job.description {
            lines.push(format!("{} {}", msg::DESCRIPTION, description));
        }

        lines.push(Self::format_breadcrumb(event));

        let options: Vec<String> = event
            .context
            .visible_options()
            .map(|(k, v)| format!("- {}: {}", k, v))
            .collect();
        if !options.is_empty() {
            lines.push(msg::USER_OPTIONS.to_string());
            lines.extend(options);
        }

        if let Some(nodes) = &event.node_status {
            lines.push(format!(
                "{} [ failed={} succeeded={} total={} ]",
                msg::NODES_STATUS,
                nodes.failed,
                nodes.succeeded,
                nodes.total
            ));
        }

        if let Some(failed) = &event.failed_nodes {
            lines.push(format!("{} {}", msg::NODES_FAILED, failed));
        }

        if let Some(succeeded) = &event.succeeded_nodes {
            lines.push(format!("{} {}", msg::NODES_SUCCEEDED, succeeded));
        }

        self.redact(lines.join("\n"), &event.context.secret_values())
    }

    fn format_header(trigger: &str, event: &ExecutionEvent) -> String {
        let mut header = format!("Job [{}]", trigger.to_uppercase());
        if let Some(id) = &event.id {
            header.push_str(&format!(" #{}", id));
        }
        if let Some(status) = &event.status {
            header.push_str(&format!(" {}", status));
        }
        header
    }

    /// Project is always present (possibly empty); group and name only when set
    fn format_breadcrumb(event: &ExecutionEvent) -> String {
        let mut crumb = format!(
            "{} {}",
            msg::BREADCRUMB,
            event.job.project.as_deref().unwrap_or("")
        );
        if let Some(group) = &event.job.group {
            crumb.push_str(msg::BREADCRUMB_SEP);
            crumb.push_str(group);
        }
        if !event.job.name.trim().is_empty() {
            crumb.push_str(msg::BREADCRUMB_SEP);
            crumb.push_str(&event.job.name);
        }
        crumb
    }

    fn is_in_progress(trigger: &str) -> bool {
        IN_PROGRESS_TRIGGERS.contains(&trigger)
    }

    /// Mask secure values anywhere in the body.
    ///
    /// Every occurrence is located in the unmasked body and overlapping or
    /// adjacent matches are masked once as a single span. Lines that still
    /// contain a secret afterwards (the mask itself spells one) are dropped.
    fn redact(&self, body: String, secrets: &[&str]) -> String {
        let secrets: Vec<&str> = secrets.iter().copied().filter(|s| !s.is_empty()).collect();
        if secrets.is_empty() {
            return body;
        }

        let spans = secret_spans(&body, &secrets);
        let mut masked = String::with_capacity(body.len());
        let mut pos = 0;
        for (start, end) in spans {
            masked.push_str(&body[pos..start]);
            masked.push_str(&self.mask);
            pos = end;
        }
        masked.push_str(&body[pos..]);

        drop_leaking_lines(masked, &secrets)
    }
}

/// Byte ranges of all secret occurrences, sorted and merged
fn secret_spans(body: &str, secrets: &[&str]) -> Vec<(usize, usize)> {
    let mut ranges: Vec<(usize, usize)> = Vec::new();
    for (start, _) in body.char_indices() {
        let rest = &body[start..];
        for secret in secrets {
            if rest.starts_with(secret) {
                ranges.push((start, start + secret.len()));
            }
        }
    }
    ranges.sort_unstable();

    let mut merged: Vec<(usize, usize)> = Vec::with_capacity(ranges.len());
    for (start, end) in ranges {
        match merged.last_mut() {
            Some(last) if start <= last.1 => last.1 = last.1.max(end),
            _ => merged.push((start, end)),
        }
    }
    merged
}

/// Remove lines until no secret occurs anywhere in the body
fn drop_leaking_lines(mut body: String, secrets: &[&str]) -> String {
    loop {
        let leak = secrets
            .iter()
            .find_map(|s| body.find(s).map(|start| (start, start + s.len())));
        let (start, end) = match leak {
            Some(span) => span,
            None => return body,
        };

        // a line owns its trailing newline, so every offset maps to some line
        let remaining = {
            let mut kept: Vec<&str> = Vec::new();
            let mut offset = 0;
            for line in body.split('\n') {
                let line_end = offset + line.len();
                if offset >= end || line_end < start {
                    kept.push(line);
                }
                offset = line_end + 1;
            }
            kept.join("\n")
        };
        body = remaining;
    }
}

impl Default for MessageFormatter {
    fn default() -> Self {
        Self::new()
    }
}

/// Render with the default formatter
pub fn render(trigger: Option<&str>, event: &ExecutionEvent) -> RenderedMessage {
    MessageFormatter::new().render(trigger, event)
}
