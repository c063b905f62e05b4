//! Tool identifiers, feature names and artifact target declarations.
//!
//! This module centralizes alias handling so frontmatter parsing, CLI flags,
//! config files and gitignore pattern generation stay consistent.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use crate::error::SyncError;

/// Token that stands for "every tool" / "every feature".
pub const WILDCARD: &str = "*";

// =============================================================================
// Tool identifiers
// =============================================================================

/// Every AI coding tool rulesync can generate for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ToolTarget {
    AgentsMd,
    AmazonQCli,
    AugmentCode,
    AugmentCodeLegacy,
    ClaudeCode,
    Cline,
    CodexCli,
    Copilot,
    Cursor,
    GeminiCli,
    Junie,
    Kiro,
    OpenCode,
    QwenCode,
    Roo,
    Windsurf,
}

impl ToolTarget {
    /// Get all supported tools
    pub fn all() -> &'static [ToolTarget] {
        &[
            ToolTarget::AgentsMd,
            ToolTarget::AmazonQCli,
            ToolTarget::AugmentCode,
            ToolTarget::AugmentCodeLegacy,
            ToolTarget::ClaudeCode,
            ToolTarget::Cline,
            ToolTarget::CodexCli,
            ToolTarget::Copilot,
            ToolTarget::Cursor,
            ToolTarget::GeminiCli,
            ToolTarget::Junie,
            ToolTarget::Kiro,
            ToolTarget::OpenCode,
            ToolTarget::QwenCode,
            ToolTarget::Roo,
            ToolTarget::Windsurf,
        ]
    }

    /// Tools a wildcard expands to when the project config does not say otherwise.
    pub fn builtin_defaults() -> Vec<ToolTarget> {
        Self::all()
            .iter()
            .copied()
            .filter(|t| *t != ToolTarget::AugmentCodeLegacy)
            .collect()
    }

    /// Get the tool identifier string (used in frontmatter and config)
    pub fn id(&self) -> &'static str {
        match self {
            ToolTarget::AgentsMd => "agentsmd",
            ToolTarget::AmazonQCli => "amazonqcli",
            ToolTarget::AugmentCode => "augmentcode",
            ToolTarget::AugmentCodeLegacy => "augmentcode-legacy",
            ToolTarget::ClaudeCode => "claudecode",
            ToolTarget::Cline => "cline",
            ToolTarget::CodexCli => "codexcli",
            ToolTarget::Copilot => "copilot",
            ToolTarget::Cursor => "cursor",
            ToolTarget::GeminiCli => "geminicli",
            ToolTarget::Junie => "junie",
            ToolTarget::Kiro => "kiro",
            ToolTarget::OpenCode => "opencode",
            ToolTarget::QwenCode => "qwencode",
            ToolTarget::Roo => "roo",
            ToolTarget::Windsurf => "windsurf",
        }
    }

    /// Get human-readable name
    pub fn name(&self) -> &'static str {
        match self {
            ToolTarget::AgentsMd => "AGENTS.md",
            ToolTarget::AmazonQCli => "Amazon Q Developer CLI",
            ToolTarget::AugmentCode => "Augment Code",
            ToolTarget::AugmentCodeLegacy => "Augment Code (legacy guidelines)",
            ToolTarget::ClaudeCode => "Claude Code",
            ToolTarget::Cline => "Cline",
            ToolTarget::CodexCli => "OpenAI Codex CLI",
            ToolTarget::Copilot => "GitHub Copilot",
            ToolTarget::Cursor => "Cursor",
            ToolTarget::GeminiCli => "Gemini CLI",
            ToolTarget::Junie => "JetBrains Junie",
            ToolTarget::Kiro => "Kiro",
            ToolTarget::OpenCode => "OpenCode",
            ToolTarget::QwenCode => "Qwen Code",
            ToolTarget::Roo => "Roo Code",
            ToolTarget::Windsurf => "Windsurf",
        }
    }

    /// Parse a tool from its id or a known alias (case-insensitive)
    pub fn from_id(id: &str) -> Option<ToolTarget> {
        let id = id.trim();
        let canonical = canonical_tool_id(id)?;
        Self::all().iter().copied().find(|t| t.id() == canonical)
    }
}

impl fmt::Display for ToolTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl Serialize for ToolTarget {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.id())
    }
}

impl FromStr for ToolTarget {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ToolTarget::from_id(s).ok_or_else(|| SyncError::UnknownTarget(s.to_string()))
    }
}

/// Normalize a user-provided tool identifier to its canonical id.
pub fn canonical_tool_id(id: &str) -> Option<&'static str> {
    let lower = id.to_ascii_lowercase();
    let canonical = match lower.as_str() {
        "agentsmd" | "agents-md" | "agents.md" => "agentsmd",
        "amazonqcli" | "amazonq" | "amazon-q" | "amazonq-cli" => "amazonqcli",
        "augmentcode" | "augment" | "augment-code" => "augmentcode",
        "augmentcode-legacy" | "augment-legacy" => "augmentcode-legacy",
        "claudecode" | "claude" | "claude-code" | "claude_code" => "claudecode",
        "cline" => "cline",
        "codexcli" | "codex" | "codex-cli" | "codex_cli" => "codexcli",
        "copilot" | "github-copilot" | "github_copilot" => "copilot",
        "cursor" => "cursor",
        "geminicli" | "gemini" | "gemini-cli" | "gemini_cli" => "geminicli",
        "junie" => "junie",
        "kiro" => "kiro",
        "opencode" | "open-code" | "open_code" => "opencode",
        "qwencode" | "qwen" | "qwen-code" | "qwen_code" => "qwencode",
        "roo" | "roocode" | "roo-code" => "roo",
        "windsurf" | "codeium" => "windsurf",
        _ => return None,
    };
    Some(canonical)
}

/// Parse a list of tool names, expanding the wildcard to `defaults`.
pub fn parse_tool_list<S: AsRef<str>>(
    names: &[S],
    defaults: &[ToolTarget],
) -> Result<Vec<ToolTarget>, SyncError> {
    if names.iter().any(|n| n.as_ref().trim() == WILDCARD) {
        let mut all = defaults.to_vec();
        all.sort();
        all.dedup();
        return Ok(all);
    }

    let mut tools = names
        .iter()
        .map(|n| n.as_ref().parse::<ToolTarget>())
        .collect::<Result<Vec<_>, _>>()?;
    tools.sort();
    tools.dedup();
    Ok(tools)
}

// =============================================================================
// Features
// =============================================================================

/// A kind of output that can be generated or imported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Feature {
    Rules,
    Commands,
    Mcp,
    Ignore,
    Subagents,
}

impl Feature {
    pub fn all() -> &'static [Feature] {
        &[
            Feature::Rules,
            Feature::Commands,
            Feature::Mcp,
            Feature::Ignore,
            Feature::Subagents,
        ]
    }

    pub fn id(&self) -> &'static str {
        match self {
            Feature::Rules => "rules",
            Feature::Commands => "commands",
            Feature::Mcp => "mcp",
            Feature::Ignore => "ignore",
            Feature::Subagents => "subagents",
        }
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl Serialize for Feature {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.id())
    }
}

impl FromStr for Feature {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Feature::all()
            .iter()
            .copied()
            .find(|f| f.id().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| SyncError::UnknownFeature(s.to_string()))
    }
}

/// Parse requested features. The wildcard expands to all five; anything
/// unrecognised is an error, never silently dropped.
pub fn parse_feature_list<S: AsRef<str>>(names: &[S]) -> Result<Vec<Feature>, SyncError> {
    let mut features = Vec::new();
    let mut wildcard = false;
    for name in names {
        if name.as_ref().trim() == WILDCARD {
            wildcard = true;
        } else {
            features.push(name.as_ref().parse::<Feature>()?);
        }
    }

    if wildcard {
        return Ok(Feature::all().to_vec());
    }

    features.sort();
    features.dedup();
    Ok(features)
}

// =============================================================================
// Target declarations
// =============================================================================

/// The `targets` field of an artifact: every tool, or an explicit set.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "RawTargets", into = "Vec<String>")]
pub enum TargetSpec {
    #[default]
    Wildcard,
    Tools(BTreeSet<ToolTarget>),
}

impl TargetSpec {
    pub fn only(tool: ToolTarget) -> Self {
        TargetSpec::Tools(BTreeSet::from([tool]))
    }

    pub fn is_wildcard(&self) -> bool {
        matches!(self, TargetSpec::Wildcard)
    }

    /// Whether this declaration names `tool` (wildcard names every tool).
    pub fn contains(&self, tool: ToolTarget) -> bool {
        match self {
            TargetSpec::Wildcard => true,
            TargetSpec::Tools(tools) => tools.contains(&tool),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawTargets {
    One(String),
    Many(Vec<String>),
}

impl TryFrom<RawTargets> for TargetSpec {
    type Error = SyncError;

    fn try_from(raw: RawTargets) -> Result<Self, Self::Error> {
        let names = match raw {
            RawTargets::One(name) => vec![name],
            RawTargets::Many(names) => names,
        };

        if names.iter().any(|n| n.trim() == WILDCARD) {
            return Ok(TargetSpec::Wildcard);
        }

        let tools = names
            .iter()
            .map(|n| n.parse::<ToolTarget>())
            .collect::<Result<BTreeSet<_>, _>>()?;
        Ok(TargetSpec::Tools(tools))
    }
}

impl From<TargetSpec> for Vec<String> {
    fn from(spec: TargetSpec) -> Self {
        match spec {
            TargetSpec::Wildcard => vec![WILDCARD.to_string()],
            TargetSpec::Tools(tools) => tools.iter().map(|t| t.id().to_string()).collect(),
        }
    }
}
