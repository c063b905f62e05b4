//! File and command permission table for tools that gate access by pattern.
//!
//! The table starts from a fixed deny list, adds the project's ignore patterns
//! as read denials, and then layers any `permission` blocks embedded in rule
//! bodies on top, entry by entry.

use anyhow::{Context, Result};
use regex::Regex;
use serde_json::{Map, Value, json};
use std::collections::BTreeMap;
use std::sync::LazyLock;

/// Category (`read`, `write`, `run`) to pattern to action (`allow`, `ask`, `deny`).
pub type PermissionTable = BTreeMap<String, BTreeMap<String, String>>;

pub const CATEGORIES: &[&str] = &["read", "write", "run"];

/// Patterns denied for reading and writing unless a rule says otherwise.
pub const DEFAULT_DENY_PATTERNS: &[&str] = &[
    ".env",
    ".env.*",
    "**/*.pem",
    "**/*.key",
    "**/.ssh/**",
    "**/.aws/**",
    "**/.gnupg/**",
    "**/credentials*",
];

pub const DENY: &str = "deny";

static JSON_FENCE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?ms)^```(?:json|jsonc)?[ \t]*\r?\n(.*?)^```").unwrap());

pub fn default_table() -> PermissionTable {
    let mut table = PermissionTable::new();
    for category in ["read", "write"] {
        let entries = table.entry(category.to_string()).or_default();
        for pattern in DEFAULT_DENY_PATTERNS {
            entries.insert(pattern.to_string(), DENY.to_string());
        }
    }
    table.entry("run".to_string()).or_default();
    table
}

/// Overlay `overlay` onto `base` one pattern at a time.
pub fn merge_into(base: &mut PermissionTable, overlay: PermissionTable) {
    for (category, entries) in overlay {
        base.entry(category).or_default().extend(entries);
    }
}

fn table_from_value(value: &Value) -> Option<PermissionTable> {
    let permission = value.get("permission")?.as_object()?;
    let mut table = PermissionTable::new();
    for (category, entries) in permission {
        let target = table.entry(category.clone()).or_default();
        match entries {
            Value::String(action) => {
                target.insert("*".to_string(), action.clone());
            }
            Value::Object(patterns) => {
                for (pattern, action) in patterns {
                    if let Some(action) = action.as_str() {
                        target.insert(pattern.clone(), action.to_string());
                    }
                }
            }
            _ => {}
        }
    }
    Some(table)
}

/// Permission blocks found in fenced JSON code blocks of a markdown body.
///
/// Blocks that are not JSON or have no `permission` object are skipped.
pub fn extract_blocks(body: &str) -> Vec<PermissionTable> {
    JSON_FENCE_RE
        .captures_iter(body)
        .filter_map(|caps| serde_json::from_str::<Value>(&caps[1]).ok())
        .filter_map(|value| table_from_value(&value))
        .collect()
}

/// Build the effective table for one tool.
pub fn build_table<'a>(
    ignore_patterns: &[String],
    rule_bodies: impl IntoIterator<Item = &'a str>,
) -> PermissionTable {
    let mut table = default_table();

    let read = table.entry("read".to_string()).or_default();
    for pattern in ignore_patterns {
        read.insert(pattern.clone(), DENY.to_string());
    }

    for body in rule_bodies {
        for block in extract_blocks(body) {
            merge_into(&mut table, block);
        }
    }
    table
}

fn table_to_json(table: &PermissionTable) -> Value {
    let mut obj = Map::new();
    for (category, entries) in table {
        let mut patterns = Map::new();
        for (pattern, action) in entries {
            patterns.insert(pattern.clone(), json!(action));
        }
        obj.insert(category.clone(), Value::Object(patterns));
    }
    Value::Object(obj)
}

/// Write the table into `opencode.json`'s `permission` key, keeping every
/// other setting in the file.
pub fn apply_to_opencode(existing: Option<&str>, table: &PermissionTable) -> Result<String> {
    let mut doc: Value = match existing {
        Some(content) if !content.trim().is_empty() => serde_json::from_str(content)
            .context("Failed to parse existing OpenCode config as JSON")?,
        _ => json!({}),
    };

    if !doc.is_object() {
        doc = json!({});
    }
    if let Some(obj) = doc.as_object_mut() {
        obj.insert("permission".to_string(), table_to_json(table));
    }

    let mut out = serde_json::to_string_pretty(&doc).context("Failed to serialize OpenCode config")?;
    out.push('\n');
    Ok(out)
}

/// Patterns an `opencode.json` denies for reading, excluding the defaults.
pub fn read_denied_from_opencode(content: &str) -> Result<Vec<String>> {
    let doc: Value =
        serde_json::from_str(content).context("Failed to parse OpenCode config as JSON")?;
    let Some(table) = table_from_value(&doc) else {
        return Ok(Vec::new());
    };

    Ok(table
        .get("read")
        .map(|entries| {
            entries
                .iter()
                .filter(|(pattern, action)| {
                    action.as_str() == DENY && !DEFAULT_DENY_PATTERNS.contains(&pattern.as_str())
                })
                .map(|(pattern, _)| pattern.clone())
                .collect()
        })
        .unwrap_or_default())
}
