// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Parsing tool output: `devcontainer up` results, agent logs and `ps` listings.

use chrono::DateTime;
use jitr_adapters::CommandOutput;
use jitr_core::NamedContainerEntry;
use serde_json::Value;

/// Lines the agent prints once it has registered and picked up work.
pub const ATTACH_MARKERS: &[&str] = &["Listening for Jobs", "Running job:", "completed with result"];

/// What a finished agent run amounts to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum AgentOutcome {
    Completed,
    Failed(String),
}

pub(crate) fn classify_agent(output: &CommandOutput) -> AgentOutcome {
    if !output.success() {
        let detail = output.failure_detail();
        return AgentOutcome::Failed(if detail.is_empty() {
            format!("agent exited with code {}", output.exit_code)
        } else {
            format!("agent exited with code {}: {}", output.exit_code, detail)
        });
    }
    let combined = output.combined();
    if combined.trim().is_empty() {
        return AgentOutcome::Failed("agent produced no output".to_string());
    }
    if ATTACH_MARKERS.iter().any(|marker| combined.contains(marker)) {
        AgentOutcome::Completed
    } else {
        AgentOutcome::Failed("agent exited but never attached to a job".to_string())
    }
}

/// Result object printed by `devcontainer up`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct UpResult {
    pub container_id: Option<String>,
    /// `message` of an `"outcome": "error"` result.
    pub error: Option<String>,
    /// Whether any result object was printed at all.
    pub reported: bool,
}

impl UpResult {
    pub fn into_container_id(self) -> Result<String, String> {
        if let Some(message) = self.error {
            return Err(format!("devcontainer up failed: {}", message));
        }
        if !self.reported {
            return Err("devcontainer up printed no result".to_string());
        }
        self.container_id.ok_or_else(|| "devcontainer up did not report a container id".to_string())
    }
}

/// Parse `devcontainer up` stdout.
///
/// The CLI logs freely and prints its JSON result last, so the last line
/// that parses as a JSON object wins.
pub(crate) fn parse_up_output(stdout: &str) -> UpResult {
    let result = stdout
        .lines()
        .rev()
        .map(str::trim)
        .filter(|line| line.starts_with('{'))
        .find_map(|line| serde_json::from_str::<Value>(line).ok().filter(Value::is_object));
    let Some(result) = result else {
        return UpResult::default();
    };
    let error = (result.get("outcome").and_then(Value::as_str) == Some("error")).then(|| {
        result.get("message").and_then(Value::as_str).unwrap_or("unknown error").to_string()
    });
    let container_id = result
        .get("containerId")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string);
    UpResult { container_id, error, reported: true }
}

/// One line of the named-container listing. `None` for malformed or unnamed rows.
pub(crate) fn parse_listing_line(line: &str, now_ms: u64) -> Option<NamedContainerEntry> {
    let mut fields = line.split('\t').map(str::trim);
    let id = fields.next().filter(|f| !f.is_empty())?;
    let name = fields.next().filter(|f| !f.is_empty())?;
    let owner = fields.next().unwrap_or_default();
    let repository = fields.next().unwrap_or_default();
    let created_at_ms = fields.next().and_then(parse_created_at).unwrap_or(now_ms);
    let mut entry = NamedContainerEntry::new(name, id, owner, repository, created_at_ms);
    entry.last_used_at_ms = now_ms;
    Some(entry)
}

/// Engine timestamps look like `2026-01-02 03:04:05 +0000 UTC`.
fn parse_created_at(raw: &str) -> Option<u64> {
    let mut parts = raw.split_whitespace();
    let stamp = format!("{} {} {}", parts.next()?, parts.next()?, parts.next()?);
    let parsed = DateTime::parse_from_str(&stamp, "%Y-%m-%d %H:%M:%S %z").ok()?;
    u64::try_from(parsed.timestamp_millis()).ok()
}

#[cfg(test)]
#[path = "outcome_tests.rs"]
mod tests;
