//! Ignore adapters: `.rulesyncignore` patterns to each tool's ignore mechanism.
//!
//! Most tools read a gitignore-style line file. Claude Code and OpenCode keep
//! access rules inside a shared JSON settings file instead, so their output is
//! merged into whatever the file already holds.

use anyhow::{Context, Result};
use serde_json::{Value, json};
use std::path::Path;

use super::split_path;
use crate::fs;
use crate::mcp::permissions;
use crate::model::{ArtifactKind, Document, FileFormat, IgnoreDocument, IgnoreFrontmatter, ToolDocument};
use crate::source::IGNORE_FILE;
use crate::targets::ToolTarget;

pub const CLAUDE_SETTINGS: &str = ".claude/settings.json";
pub const OPENCODE_CONFIG: &str = "opencode.json";

const LINE_FILE_HEADER: &str = "# Generated by rulesync from .rulesyncignore";

/// Where a tool reads ignore patterns from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreOutput {
    /// One pattern per line.
    LineFile(&'static str),
    /// `Read(<pattern>)` entries in `permissions.deny`.
    ClaudeSettings,
    /// The `permission` table of `opencode.json`.
    OpenCodePermissions,
}

impl IgnoreOutput {
    pub fn path(&self) -> &'static str {
        match self {
            IgnoreOutput::LineFile(path) => path,
            IgnoreOutput::ClaudeSettings => CLAUDE_SETTINGS,
            IgnoreOutput::OpenCodePermissions => OPENCODE_CONFIG,
        }
    }

    /// Whether the file is shared with other settings and must be merged.
    pub fn is_shared(&self) -> bool {
        !matches!(self, IgnoreOutput::LineFile(_))
    }
}

pub fn ignore_output(tool: ToolTarget) -> Option<IgnoreOutput> {
    let output = match tool {
        ToolTarget::Cursor => IgnoreOutput::LineFile(".cursorignore"),
        ToolTarget::Cline => IgnoreOutput::LineFile(".clineignore"),
        ToolTarget::GeminiCli => IgnoreOutput::LineFile(".geminiignore"),
        ToolTarget::QwenCode => IgnoreOutput::LineFile(".qwenignore"),
        ToolTarget::Roo => IgnoreOutput::LineFile(".rooignore"),
        ToolTarget::Windsurf => IgnoreOutput::LineFile(".codeiumignore"),
        ToolTarget::Junie | ToolTarget::Kiro => IgnoreOutput::LineFile(".aiignore"),
        ToolTarget::AugmentCode | ToolTarget::AugmentCodeLegacy => {
            IgnoreOutput::LineFile(".augmentignore")
        }
        ToolTarget::AmazonQCli => IgnoreOutput::LineFile(".amazonqignore"),
        ToolTarget::ClaudeCode => IgnoreOutput::ClaudeSettings,
        ToolTarget::OpenCode => IgnoreOutput::OpenCodePermissions,
        ToolTarget::AgentsMd | ToolTarget::CodexCli | ToolTarget::Copilot => return None,
    };
    Some(output)
}

pub fn render_line_file(patterns: &[String]) -> String {
    let mut out = String::from(LINE_FILE_HEADER);
    out.push('\n');
    for pattern in patterns {
        out.push_str(pattern);
        out.push('\n');
    }
    out
}

fn claude_read_entry(pattern: &str) -> String {
    format!("Read({})", pattern)
}

fn parse_json_object(existing: Option<&str>, path: &str) -> Result<Value> {
    let doc = match existing {
        Some(content) if !content.trim().is_empty() => serde_json::from_str(content)
            .with_context(|| format!("Failed to parse existing {} as JSON", path))?,
        _ => json!({}),
    };
    Ok(if doc.is_object() { doc } else { json!({}) })
}

/// Replace the `Read(...)` denials in Claude settings with `patterns`.
///
/// Every other key, and every non-`Read` deny entry, is kept.
pub fn merge_claude_settings(existing: Option<&str>, patterns: &[String]) -> Result<String> {
    let mut doc = parse_json_object(existing, CLAUDE_SETTINGS)?;

    if let Some(obj) = doc.as_object_mut() {
        let permissions = obj
            .entry("permissions")
            .or_insert_with(|| json!({}));
        if !permissions.is_object() {
            *permissions = json!({});
        }
        if let Some(permissions) = permissions.as_object_mut() {
            let mut deny: Vec<Value> = permissions
                .get("deny")
                .and_then(Value::as_array)
                .map(|entries| {
                    entries
                        .iter()
                        .filter(|v| !v.as_str().is_some_and(|s| s.starts_with("Read(")))
                        .cloned()
                        .collect()
                })
                .unwrap_or_default();
            deny.extend(patterns.iter().map(|p| json!(claude_read_entry(p))));
            permissions.insert("deny".to_string(), Value::Array(deny));
        }
    }

    let mut out = serde_json::to_string_pretty(&doc).context("Failed to serialize Claude settings")?;
    out.push('\n');
    Ok(out)
}

/// Render `tool`'s ignore output. `existing` is the current content of the
/// output file, used by the shared settings files.
///
/// Without a `.rulesyncignore` only OpenCode produces output: its permission
/// table still carries the default denials and any rule permission blocks.
pub fn generate(
    tool: ToolTarget,
    ignore: Option<&IgnoreDocument>,
    rule_bodies: &[&str],
    existing: Option<&str>,
) -> Result<Option<ToolDocument>> {
    let Some(output) = ignore_output(tool) else {
        return Ok(None);
    };
    if ignore.is_none() && output != IgnoreOutput::OpenCodePermissions {
        return Ok(None);
    }
    let patterns = ignore.map(IgnoreDocument::patterns).unwrap_or_default();

    let content = match output {
        IgnoreOutput::LineFile(_) => render_line_file(&patterns),
        IgnoreOutput::ClaudeSettings => merge_claude_settings(existing, &patterns)?,
        IgnoreOutput::OpenCodePermissions => {
            let table = permissions::build_table(&patterns, rule_bodies.iter().copied());
            permissions::apply_to_opencode(existing, &table)?
        }
    };

    let (dir, file) = split_path(output.path());
    let mut doc = ToolDocument::new(tool, ArtifactKind::Ignore, dir, file);
    doc.description = ignore.map(|i| i.description().to_string()).unwrap_or_default();
    doc.format = FileFormat::Raw;
    doc.body = content;
    Ok(Some(doc))
}

fn line_patterns(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .map(str::to_string)
        .collect()
}

fn claude_patterns(content: &str) -> Result<Vec<String>> {
    let doc: Value = serde_json::from_str(content)
        .with_context(|| format!("Failed to parse {} as JSON", CLAUDE_SETTINGS))?;
    Ok(doc
        .pointer("/permissions/deny")
        .and_then(Value::as_array)
        .map(|entries| {
            entries
                .iter()
                .filter_map(Value::as_str)
                .filter_map(|s| s.strip_prefix("Read(")?.strip_suffix(')'))
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default())
}

/// Ignore patterns `tool` currently declares below `base_dir`, or `None` when
/// its ignore file does not exist.
pub fn read_native(tool: ToolTarget, base_dir: &Path) -> Result<Option<Vec<String>>> {
    let Some(output) = ignore_output(tool) else {
        return Ok(None);
    };
    let Some(content) = fs::read_text_if_exists(&base_dir.join(output.path()))? else {
        return Ok(None);
    };

    let patterns = match output {
        IgnoreOutput::LineFile(_) => line_patterns(&content),
        IgnoreOutput::ClaudeSettings => claude_patterns(&content)?,
        IgnoreOutput::OpenCodePermissions => permissions::read_denied_from_opencode(&content)?,
    };
    Ok(Some(patterns))
}

/// Build a canonical ignore document from imported patterns.
pub fn to_canonical(patterns: &[String]) -> IgnoreDocument {
    Document::new(IgnoreFrontmatter::default(), patterns.join("\n"), "", IGNORE_FILE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn ignore(patterns: &[&str]) -> IgnoreDocument {
        to_canonical(&patterns.iter().map(|p| p.to_string()).collect::<Vec<_>>())
    }

    #[test]
    fn test_line_file_outputs() {
        let doc = generate(ToolTarget::Cursor, Some(&ignore(&["dist/", "*.log"])), &[], None)
            .unwrap()
            .unwrap();
        assert_eq!(doc.relative_path(), PathBuf::from(".cursorignore"));
        assert_eq!(doc.render().unwrap(), format!("{}\ndist/\n*.log\n", LINE_FILE_HEADER));

        assert_eq!(ignore_output(ToolTarget::Windsurf).unwrap().path(), ".codeiumignore");
        assert_eq!(ignore_output(ToolTarget::Kiro).unwrap().path(), ".aiignore");
        assert!(ignore_output(ToolTarget::Copilot).is_none());
    }

    #[test]
    fn test_claude_settings_merge_keeps_other_entries() {
        let existing = r#"{
            "model": "sonnet",
            "permissions": {"allow": ["Bash(ls)"], "deny": ["Read(old/)", "Bash(rm)"]}
        }"#;
        let out = merge_claude_settings(Some(existing), &["secret/".to_string()]).unwrap();
        let parsed: Value = serde_json::from_str(&out).unwrap();

        assert_eq!(parsed["model"], "sonnet");
        assert_eq!(parsed["permissions"]["allow"][0], "Bash(ls)");
        assert_eq!(
            parsed["permissions"]["deny"],
            json!(["Bash(rm)", "Read(secret/)"])
        );
    }

    #[test]
    fn test_claude_settings_created_from_scratch() {
        let out = merge_claude_settings(None, &["dist/".to_string()]).unwrap();
        assert_eq!(claude_patterns(&out).unwrap(), vec!["dist/"]);
    }

    #[test]
    fn test_opencode_permissions_include_rule_blocks() {
        let rule = "```json\n{\"permission\": {\"run\": {\"git push\": \"ask\"}}}\n```";
        let doc = generate(ToolTarget::OpenCode, Some(&ignore(&["build/"])), &[rule], Some("{\"theme\": \"x\"}"))
            .unwrap()
            .unwrap();
        let parsed: Value = serde_json::from_str(&doc.body).unwrap();
        assert_eq!(parsed["theme"], "x");
        assert_eq!(parsed["permission"]["read"]["build/"], "deny");
        assert_eq!(parsed["permission"]["run"]["git push"], "ask");
    }

    #[test]
    fn test_opencode_permissions_without_ignore_file() {
        let rule = "```json\n{\"permission\": {\"run\": {\"rm -rf\": \"deny\"}}}\n```";
        let doc = generate(ToolTarget::OpenCode, None, &[rule], None).unwrap().unwrap();
        let parsed: Value = serde_json::from_str(&doc.body).unwrap();
        assert_eq!(parsed["permission"]["run"]["rm -rf"], "deny");
        assert_eq!(parsed["permission"]["read"][permissions::DEFAULT_DENY_PATTERNS[0]], "deny");

        assert!(generate(ToolTarget::Cursor, None, &[rule], None).unwrap().is_none());
        assert!(generate(ToolTarget::ClaudeCode, None, &[rule], None).unwrap().is_none());
    }

    #[test]
    fn test_read_native_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let source = ignore(&["dist/", "*.log"]);

        for tool in [ToolTarget::Roo, ToolTarget::ClaudeCode, ToolTarget::OpenCode] {
            let doc = generate(tool, Some(&source), &[], None).unwrap().unwrap();
            fs::write_text(&doc.file_path(temp_dir.path()), &doc.body).unwrap();
            let mut patterns = read_native(tool, temp_dir.path()).unwrap().unwrap();
            patterns.sort();
            assert_eq!(patterns, vec!["*.log", "dist/"], "{}", tool);
        }
    }

    #[test]
    fn test_read_native_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        assert!(read_native(ToolTarget::Cursor, temp_dir.path()).unwrap().is_none());
    }
}
