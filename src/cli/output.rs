//! Output formatting for CLI commands

use crate::htpasswd::StateResult;

/// Format a state result as JSON or a short summary based on --json flag
pub fn format_state(result: &StateResult, json: bool) -> String {
    if json {
        return serde_json::to_string_pretty(result).unwrap_or_else(|_| "{}".to_string());
    }

    let status = match result.result {
        Some(true) => "ok",
        Some(false) => "failed",
        None => "pending",
    };
    let mut out = format!("{} [{}]: {}", result.name, status, result.comment);
    if !result.changes.is_empty() {
        let changed: Vec<&str> = result.changes.keys().map(String::as_str).collect();
        out.push_str(&format!("\n  changes: {}", changed.join(", ")));
    }
    out
}
