//! MCP (Model Context Protocol) server configuration.
//!
//! The canonical server list lives in `.rulesync/.mcp.json`. This module
//! loads and validates it, decides which servers apply to which tool, and
//! writes each tool's config file through its [`McpFormatter`].

pub mod formatters;
pub mod permissions;
pub mod redact;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::SyncError;
use crate::fs;
use crate::resolver;
use crate::source::MCP_FILE;
use crate::targets::{TargetSpec, ToolTarget};

pub use formatters::{McpFormatter, formatter_for};

// =============================================================================
// Canonical server model
// =============================================================================

/// One canonical MCP server declaration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct McpServer {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_url: Option<String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub env: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "is_false")]
    pub disabled: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network_timeout: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trust: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transport: Option<String>,

    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub server_type: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub always_allow: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub targets: Option<TargetSpec>,
}

fn is_false(value: &bool) -> bool {
    !*value
}

/// How a client talks to a server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    Stdio,
    Sse,
    Http,
}

const KNOWN_TRANSPORTS: &[&str] = &["stdio", "sse", "http", "streamable-http"];

impl McpServer {
    pub fn stdio(command: impl Into<String>, args: &[&str]) -> Self {
        Self {
            command: Some(command.into()),
            args: args.iter().map(|a| a.to_string()).collect(),
            ..Default::default()
        }
    }

    pub fn remote(url: impl Into<String>, transport: Transport) -> Self {
        let mut server = Self {
            url: Some(url.into()),
            ..Default::default()
        };
        if transport == Transport::Http {
            server.server_type = Some("http".to_string());
        }
        server
    }

    fn transport_tag(&self) -> Option<&str> {
        self.server_type.as_deref().or(self.transport.as_deref())
    }

    pub fn transport(&self) -> Transport {
        if self.command.is_some() {
            return Transport::Stdio;
        }
        match self.transport_tag() {
            Some("http") | Some("streamable-http") => Transport::Http,
            Some("sse") => Transport::Sse,
            _ if self.http_url.is_some() && self.url.is_none() => Transport::Http,
            _ => Transport::Sse,
        }
    }

    /// Endpoint of a remote server.
    pub fn endpoint(&self) -> Option<&str> {
        match self.transport() {
            Transport::Stdio => None,
            Transport::Http => self.http_url.as_deref().or(self.url.as_deref()),
            Transport::Sse => self.url.as_deref().or(self.http_url.as_deref()),
        }
    }

    pub fn validate(&self, name: &str) -> Result<(), SyncError> {
        let invalid = |message: &str| SyncError::InvalidMcpServer {
            name: name.to_string(),
            message: message.to_string(),
        };

        let has_url = self.url.is_some() || self.http_url.is_some();
        match (&self.command, has_url) {
            (None, false) => return Err(invalid("needs either `command` or `url`/`httpUrl`")),
            (Some(_), true) => return Err(invalid("cannot set both `command` and a URL")),
            (Some(command), false) if command.trim().is_empty() => {
                return Err(invalid("`command` must not be empty"));
            }
            _ => {}
        }

        if let Some(tag) = self.transport_tag()
            && !KNOWN_TRANSPORTS.contains(&tag)
        {
            return Err(invalid(&format!("unknown transport `{}`", tag)));
        }
        Ok(())
    }

    /// Whether this server should appear in `tool`'s config. `disabled` is
    /// carried into the output, not used for selection.
    pub fn applies_to(&self, tool: ToolTarget) -> bool {
        resolver::targets_include(self.targets.as_ref(), tool)
    }
}

// =============================================================================
// Canonical config file
// =============================================================================

/// The contents of `.rulesync/.mcp.json`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct McpConfig {
    pub servers: BTreeMap<String, McpServer>,
}

/// Move a legacy top-level `servers` object to `mcpServers`.
pub fn normalize_legacy(doc: &mut Value) {
    if let Some(obj) = doc.as_object_mut()
        && !obj.contains_key("mcpServers")
        && let Some(servers) = obj.remove("servers")
    {
        obj.insert("mcpServers".to_string(), servers);
    }
}

impl McpConfig {
    pub fn path(project_root: &Path) -> PathBuf {
        project_root.join(MCP_FILE)
    }

    /// Load the canonical config; a missing file is an empty config.
    pub fn load_canonical(project_root: &Path) -> Result<Self> {
        let path = Self::path(project_root);
        match fs::read_text_if_exists(&path)? {
            Some(content) => Ok(Self::parse(Path::new(MCP_FILE), &content)?),
            None => Ok(Self::default()),
        }
    }

    pub fn parse(path: &Path, content: &str) -> Result<Self, SyncError> {
        let invalid = |message: String| SyncError::InvalidMcpConfig {
            path: path.to_path_buf(),
            message,
        };

        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        let mut doc: Value = serde_json::from_str(content).map_err(|e| invalid(e.to_string()))?;
        if !doc.is_object() {
            return Err(invalid("expected a JSON object".to_string()));
        }
        normalize_legacy(&mut doc);

        let servers: BTreeMap<String, McpServer> = match doc.get("mcpServers") {
            None | Some(Value::Null) => BTreeMap::new(),
            Some(value) => {
                serde_json::from_value(value.clone()).map_err(|e| invalid(e.to_string()))?
            }
        };

        for (name, server) in &servers {
            server.validate(name)?;
        }
        Ok(Self { servers })
    }

    pub fn to_json_string(&self) -> Result<String> {
        let doc = json!({ "mcpServers": self.servers });
        let mut out =
            serde_json::to_string_pretty(&doc).context("Failed to serialize MCP config")?;
        out.push('\n');
        Ok(out)
    }

    pub fn write_canonical(&self, project_root: &Path) -> Result<PathBuf> {
        let path = Self::path(project_root);
        fs::write_text(&path, &self.to_json_string()?)?;
        Ok(path)
    }

    /// Servers that apply to `tool`, by name.
    pub fn servers_for(&self, tool: ToolTarget) -> BTreeMap<String, &McpServer> {
        self.servers
            .iter()
            .filter(|(_, server)| server.applies_to(tool))
            .map(|(name, server)| (name.clone(), server))
            .collect()
    }

    /// Add `imported` servers, replacing same-named ones.
    pub fn merge_from(&mut self, imported: BTreeMap<String, McpServer>) {
        self.servers.extend(imported);
    }
}

// =============================================================================
// Per-tool output
// =============================================================================

/// How existing tool config files are treated on generation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum McpMergeStrategy {
    /// Replace the server list; unrelated settings in shared files survive.
    #[default]
    Overwrite,
    /// Keep servers already in the file; canonical servers win on name clashes.
    Merge,
}

/// Project-relative MCP config path of `tool`, if it supports MCP.
pub fn config_path(tool: ToolTarget) -> Option<&'static str> {
    let path = match tool {
        ToolTarget::ClaudeCode => ".mcp.json",
        ToolTarget::Cursor => ".cursor/mcp.json",
        ToolTarget::Cline => ".cline/mcp.json",
        ToolTarget::Roo => ".roo/mcp.json",
        ToolTarget::Junie => ".junie/mcp/mcp.json",
        ToolTarget::Kiro => ".kiro/settings/mcp.json",
        ToolTarget::AmazonQCli => ".amazonq/mcp.json",
        ToolTarget::Copilot => ".vscode/mcp.json",
        ToolTarget::GeminiCli => ".gemini/settings.json",
        ToolTarget::QwenCode => ".qwen/settings.json",
        ToolTarget::OpenCode => "opencode.json",
        ToolTarget::CodexCli => ".codex/config.toml",
        ToolTarget::AgentsMd | ToolTarget::AugmentCode | ToolTarget::AugmentCodeLegacy => {
            return None;
        }
        ToolTarget::Windsurf => return None,
    };
    Some(path)
}

/// Render `tool`'s MCP config given the file's current content.
///
/// Returns `Ok(None)` when the tool has no MCP support or no servers apply and
/// there is no existing file to update.
pub fn render_for_tool(
    config: &McpConfig,
    tool: ToolTarget,
    existing: Option<&str>,
    strategy: McpMergeStrategy,
) -> Result<Option<String>> {
    let Some(formatter) = formatter_for(tool) else {
        return Ok(None);
    };
    let servers = config.servers_for(tool);

    if servers.is_empty() && existing.is_none() {
        return Ok(None);
    }

    let content = match (existing, strategy) {
        (Some(existing), McpMergeStrategy::Merge) if !existing.trim().is_empty() => {
            formatter.merge(existing, &servers)?
        }
        (Some(existing), McpMergeStrategy::Overwrite)
            if formatter.preserve_on_overwrite() && !existing.trim().is_empty() =>
        {
            formatter.replace_servers(existing, &servers)?
        }
        _ => formatter.format_to_string(&servers)?,
    };
    Ok(Some(content))
}

/// Read `tool`'s MCP config back into canonical servers.
pub fn import_from_tool(tool: ToolTarget, base_dir: &Path) -> Result<BTreeMap<String, McpServer>> {
    let (Some(formatter), Some(path)) = (formatter_for(tool), config_path(tool)) else {
        return Ok(BTreeMap::new());
    };
    let Some(content) = fs::read_text_if_exists(&base_dir.join(path))? else {
        return Ok(BTreeMap::new());
    };

    let mut servers = BTreeMap::new();
    for (name, value) in formatter.parse_existing(&content)? {
        let mut server = formatter
            .to_canonical(&value)
            .with_context(|| format!("{}: server `{}`", path, name))?;
        server.targets = Some(TargetSpec::only(tool));
        server.validate(&name)?;
        servers.insert(name, server);
    }
    Ok(servers)
}

/// Build a JSON object from key/value pairs in deterministic lexicographic key order.
pub(crate) fn sorted_json_map_from_pairs<I>(pairs: I) -> Map<String, Value>
where
    I: IntoIterator<Item = (String, Value)>,
{
    let sorted: BTreeMap<String, Value> = pairs.into_iter().collect();
    sorted.into_iter().collect()
}
