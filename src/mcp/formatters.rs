//! Per-tool MCP config formats.
//!
//! Every tool stores the same server list under a different key, with slightly
//! different field names. A formatter renders canonical servers into that shape,
//! merges them into an existing file, and reads the file back for import.

use anyhow::{Context, Result, bail};
use serde_json::{Map, Value, json};
use std::collections::BTreeMap;
use toml::{Table as TomlTable, Value as TomlValue};

use super::redact;
use super::{McpServer, Transport, sorted_json_map_from_pairs};
use crate::targets::ToolTarget;

/// Servers selected for one tool, by name.
pub type ServerRefs<'a> = BTreeMap<String, &'a McpServer>;

const OPENCODE_SCHEMA: &str = "https://opencode.ai/config.json";

// =============================================================================
// MCP Formatter Trait
// =============================================================================

pub trait McpFormatter: Send + Sync {
    /// Logical JSON shape of a fresh config file holding `servers`.
    fn format(&self, servers: &ServerRefs) -> Value;

    /// File content of a fresh config. Pretty JSON by default.
    fn format_to_string(&self, servers: &ServerRefs) -> Result<String> {
        to_pretty_json(&self.format(servers))
    }

    /// Native server entries of an existing file, by name.
    fn parse_existing(&self, content: &str) -> Result<BTreeMap<String, Value>>;

    /// Add `servers` to the existing file; same-named entries are replaced and
    /// every other entry is kept.
    fn merge(&self, existing_content: &str, servers: &ServerRefs) -> Result<String>;

    /// Replace the file's server list with `servers`, keeping unrelated settings.
    fn replace_servers(&self, existing_content: &str, servers: &ServerRefs) -> Result<String>;

    /// Whether the file holds settings besides MCP servers that overwrite must keep.
    fn preserve_on_overwrite(&self) -> bool {
        false
    }

    /// Convert one native server entry back into a canonical server.
    fn to_canonical(&self, value: &Value) -> Result<McpServer>;
}

/// The formatter for `tool`, or `None` when it has no MCP support.
pub fn formatter_for(tool: ToolTarget) -> Option<Box<dyn McpFormatter>> {
    let formatter: Box<dyn McpFormatter> = match tool {
        ToolTarget::ClaudeCode => Box::new(JsonFormatter::standard("http")),
        ToolTarget::Cline | ToolTarget::Roo => Box::new(JsonFormatter::standard("streamable-http")),
        ToolTarget::Cursor | ToolTarget::Junie | ToolTarget::Kiro | ToolTarget::AmazonQCli => {
            Box::new(JsonFormatter::standard("http"))
        }
        ToolTarget::GeminiCli | ToolTarget::QwenCode => Box::new(JsonFormatter {
            key: "mcpServers",
            shape: JsonShape::Gemini,
            preserve_other_keys: true,
        }),
        ToolTarget::Copilot => Box::new(JsonFormatter {
            key: "servers",
            shape: JsonShape::Copilot,
            preserve_other_keys: false,
        }),
        ToolTarget::OpenCode => Box::new(JsonFormatter {
            key: "mcp",
            shape: JsonShape::OpenCode,
            preserve_other_keys: true,
        }),
        ToolTarget::CodexCli => Box::new(CodexFormatter),
        ToolTarget::AgentsMd
        | ToolTarget::AugmentCode
        | ToolTarget::AugmentCodeLegacy
        | ToolTarget::Windsurf => return None,
    };
    Some(formatter)
}

// =============================================================================
// Helpers
// =============================================================================

fn to_pretty_json(value: &Value) -> Result<String> {
    let mut out = serde_json::to_string_pretty(value).context("Failed to serialize MCP config")?;
    out.push('\n');
    Ok(out)
}

fn string_map_to_json(values: &BTreeMap<String, String>) -> Value {
    Value::Object(sorted_json_map_from_pairs(
        values
            .iter()
            .map(|(k, v)| (k.clone(), Value::String(v.clone()))),
    ))
}

fn json_to_string_map(value: Option<&Value>) -> BTreeMap<String, String> {
    value
        .and_then(Value::as_object)
        .map(|obj| {
            obj.iter()
                .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
                .collect()
        })
        .unwrap_or_default()
}

fn json_to_string_list(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

fn json_str(value: &Value, key: &str) -> Option<String> {
    value.get(key).and_then(Value::as_str).map(str::to_string)
}

fn remote_tag(server: &McpServer, http_tag: &'static str) -> &'static str {
    match server.transport() {
        Transport::Http => http_tag,
        _ => "sse",
    }
}

// =============================================================================
// JSON formatters
// =============================================================================

/// Field naming used inside each server entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsonShape {
    /// `command`/`args`/`env` or `url`/`headers` with a `type` tag for remote servers.
    Standard { http_tag: &'static str },
    /// `url` for SSE, `httpUrl` for streamable HTTP, plus `trust`.
    Gemini,
    /// Typed entries with secret values moved to prompted `inputs`.
    Copilot,
    /// `type: local|remote`, command as an array, `environment`.
    OpenCode,
}

/// A JSON config file keeping servers under `key`.
#[derive(Debug, Clone, Copy)]
pub struct JsonFormatter {
    pub key: &'static str,
    pub shape: JsonShape,
    pub preserve_other_keys: bool,
}

impl JsonFormatter {
    pub const fn standard(http_tag: &'static str) -> Self {
        Self {
            key: "mcpServers",
            shape: JsonShape::Standard { http_tag },
            preserve_other_keys: false,
        }
    }

    /// Render one server, along with any editor inputs it needs.
    fn render_server(&self, name: &str, server: &McpServer) -> (Value, Vec<Value>) {
        match self.shape {
            JsonShape::Standard { http_tag } => (server_to_json(server, http_tag), Vec::new()),
            JsonShape::Gemini => (server_to_gemini_json(server), Vec::new()),
            JsonShape::OpenCode => (server_to_opencode_json(server), Vec::new()),
            JsonShape::Copilot => server_to_copilot_json(name, server),
        }
    }

    fn render_servers(&self, servers: &ServerRefs) -> (Map<String, Value>, Vec<Value>) {
        let mut inputs = Vec::new();
        let entries = sorted_json_map_from_pairs(servers.iter().map(|(name, server)| {
            let (value, needed) = self.render_server(name, server);
            redact::merge_inputs(&mut inputs, needed);
            (name.clone(), value)
        }));
        (entries, inputs)
    }

    fn parse_document(&self, content: &str) -> Result<Value> {
        if content.trim().is_empty() {
            return Ok(json!({}));
        }
        let doc: Value = serde_json::from_str(content)
            .with_context(|| format!("Failed to parse existing `{}` config as JSON", self.key))?;
        Ok(if doc.is_object() { doc } else { json!({}) })
    }

    /// Write `servers` into `existing_content`, optionally keeping its current entries.
    fn update(&self, existing_content: &str, servers: &ServerRefs, keep_entries: bool) -> Result<String> {
        let mut doc = self.parse_document(existing_content)?;
        let mut entries = if keep_entries {
            self.parse_existing(existing_content)?
        } else {
            BTreeMap::new()
        };

        let (rendered, new_inputs) = self.render_servers(servers);
        entries.extend(rendered);

        if let Some(obj) = doc.as_object_mut() {
            obj.insert(
                self.key.to_string(),
                Value::Object(sorted_json_map_from_pairs(entries)),
            );

            if !new_inputs.is_empty() {
                let mut inputs = obj
                    .get("inputs")
                    .and_then(Value::as_array)
                    .cloned()
                    .unwrap_or_default();
                redact::merge_inputs(&mut inputs, new_inputs);
                obj.insert("inputs".to_string(), Value::Array(inputs));
            }

            if self.shape == JsonShape::OpenCode && !obj.contains_key("$schema") {
                obj.insert("$schema".to_string(), json!(OPENCODE_SCHEMA));
            }
        }

        to_pretty_json(&doc)
    }
}

impl McpFormatter for JsonFormatter {
    fn format(&self, servers: &ServerRefs) -> Value {
        let (entries, inputs) = self.render_servers(servers);
        let mut doc = Map::new();
        if self.shape == JsonShape::OpenCode {
            doc.insert("$schema".to_string(), json!(OPENCODE_SCHEMA));
        }
        if !inputs.is_empty() {
            doc.insert("inputs".to_string(), Value::Array(inputs));
        }
        doc.insert(self.key.to_string(), Value::Object(entries));
        Value::Object(doc)
    }

    fn parse_existing(&self, content: &str) -> Result<BTreeMap<String, Value>> {
        let mut doc = self.parse_document(content)?;
        if self.key == "mcpServers" {
            super::normalize_legacy(&mut doc);
        }
        Ok(doc
            .get(self.key)
            .and_then(Value::as_object)
            .map(|obj| obj.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
            .unwrap_or_default())
    }

    fn merge(&self, existing_content: &str, servers: &ServerRefs) -> Result<String> {
        self.update(existing_content, servers, true)
    }

    fn replace_servers(&self, existing_content: &str, servers: &ServerRefs) -> Result<String> {
        self.update(existing_content, servers, false)
    }

    fn preserve_on_overwrite(&self) -> bool {
        self.preserve_other_keys
    }

    fn to_canonical(&self, value: &Value) -> Result<McpServer> {
        if !value.is_object() {
            bail!("server entry is not a JSON object");
        }
        let server = match self.shape {
            JsonShape::OpenCode => server_from_opencode_json(value),
            _ => server_from_json(value),
        };
        Ok(server)
    }
}

/// Standard server entry.
fn server_to_json(server: &McpServer, http_tag: &'static str) -> Value {
    let mut obj = Map::new();

    if let Some(ref cmd) = server.command {
        obj.insert("command".to_string(), json!(cmd));
    }
    if !server.args.is_empty() {
        obj.insert("args".to_string(), json!(server.args));
    }
    if !server.env.is_empty() {
        obj.insert("env".to_string(), string_map_to_json(&server.env));
    }
    if let Some(url) = server.endpoint() {
        obj.insert("url".to_string(), json!(url));
        obj.insert("type".to_string(), json!(remote_tag(server, http_tag)));
    }
    if !server.headers.is_empty() {
        obj.insert("headers".to_string(), string_map_to_json(&server.headers));
    }
    if let Some(timeout) = server.timeout {
        obj.insert("timeout".to_string(), json!(timeout));
    }
    if !server.always_allow.is_empty() {
        obj.insert("alwaysAllow".to_string(), json!(server.always_allow));
    }
    if !server.tools.is_empty() {
        obj.insert("tools".to_string(), json!(server.tools));
    }
    if server.disabled {
        obj.insert("disabled".to_string(), json!(true));
    }

    Value::Object(obj)
}

fn server_to_gemini_json(server: &McpServer) -> Value {
    let mut obj = Map::new();

    if let Some(ref cmd) = server.command {
        obj.insert("command".to_string(), json!(cmd));
    }
    if !server.args.is_empty() {
        obj.insert("args".to_string(), json!(server.args));
    }
    if !server.env.is_empty() {
        obj.insert("env".to_string(), string_map_to_json(&server.env));
    }
    if let Some(endpoint) = server.endpoint() {
        let key = match server.transport() {
            Transport::Http => "httpUrl",
            _ => "url",
        };
        obj.insert(key.to_string(), json!(endpoint));
    }
    if !server.headers.is_empty() {
        obj.insert("headers".to_string(), string_map_to_json(&server.headers));
    }
    if let Some(timeout) = server.timeout {
        obj.insert("timeout".to_string(), json!(timeout));
    }
    // Gemini requires trust for non-interactive tool execution.
    obj.insert("trust".to_string(), json!(server.trust.unwrap_or(true)));
    if server.disabled {
        obj.insert("disabled".to_string(), json!(true));
    }

    Value::Object(obj)
}

fn server_to_copilot_json(name: &str, server: &McpServer) -> (Value, Vec<Value>) {
    let mut obj = Map::new();
    let mut inputs = Vec::new();

    let tag = match server.transport() {
        Transport::Stdio => "stdio",
        Transport::Sse => "sse",
        Transport::Http => "http",
    };
    obj.insert("type".to_string(), json!(tag));

    if let Some(ref cmd) = server.command {
        obj.insert("command".to_string(), json!(cmd));
    }
    if !server.args.is_empty() {
        obj.insert("args".to_string(), json!(server.args));
    }
    if !server.env.is_empty() {
        let (env, needed) = redact::redact_values(name, &server.env);
        obj.insert("env".to_string(), string_map_to_json(&env));
        redact::merge_inputs(&mut inputs, needed);
    }
    if let Some(url) = server.endpoint() {
        obj.insert("url".to_string(), json!(url));
    }
    if !server.headers.is_empty() {
        let (headers, needed) = redact::redact_values(name, &server.headers);
        obj.insert("headers".to_string(), string_map_to_json(&headers));
        redact::merge_inputs(&mut inputs, needed);
    }

    (Value::Object(obj), inputs)
}

/// Convert a server to OpenCode's entry shape.
fn server_to_opencode_json(server: &McpServer) -> Value {
    let mut obj = Map::new();

    if let Some(url) = server.endpoint() {
        obj.insert("type".to_string(), json!("remote"));
        obj.insert("url".to_string(), json!(url));
        if !server.headers.is_empty() {
            obj.insert("headers".to_string(), string_map_to_json(&server.headers));
        }
    } else {
        obj.insert("type".to_string(), json!("local"));

        let mut command_parts = Vec::new();
        if let Some(ref cmd) = server.command {
            command_parts.push(cmd.clone());
        }
        command_parts.extend(server.args.clone());
        obj.insert("command".to_string(), json!(command_parts));

        if !server.env.is_empty() {
            obj.insert("environment".to_string(), string_map_to_json(&server.env));
        }
    }

    obj.insert("enabled".to_string(), json!(!server.disabled));

    Value::Object(obj)
}

/// Read any `mcpServers`-style entry; unknown fields are ignored.
fn server_from_json(value: &Value) -> McpServer {
    let url = json_str(value, "url");
    let http_url = json_str(value, "httpUrl");
    let server_type = json_str(value, "type")
        .or_else(|| json_str(value, "transport"))
        .filter(|tag| tag != "stdio");

    McpServer {
        command: json_str(value, "command"),
        args: json_to_string_list(value.get("args")),
        url,
        http_url,
        env: json_to_string_map(value.get("env")),
        headers: json_to_string_map(value.get("headers")),
        disabled: value.get("disabled").and_then(Value::as_bool).unwrap_or(false),
        timeout: value.get("timeout").and_then(Value::as_u64),
        network_timeout: value.get("networkTimeout").and_then(Value::as_u64),
        trust: value.get("trust").and_then(Value::as_bool),
        server_type,
        always_allow: json_to_string_list(value.get("alwaysAllow")),
        tools: json_to_string_list(value.get("tools")),
        ..Default::default()
    }
}

fn server_from_opencode_json(value: &Value) -> McpServer {
    let disabled = value
        .get("enabled")
        .and_then(Value::as_bool)
        .map(|enabled| !enabled)
        .unwrap_or(false);

    if json_str(value, "type").as_deref() == Some("remote") {
        return McpServer {
            url: json_str(value, "url"),
            headers: json_to_string_map(value.get("headers")),
            disabled,
            ..Default::default()
        };
    }

    let mut parts = json_to_string_list(value.get("command")).into_iter();
    McpServer {
        command: parts.next(),
        args: parts.collect(),
        env: json_to_string_map(value.get("environment")),
        disabled,
        ..Default::default()
    }
}

// =============================================================================
// Codex CLI Formatter
// =============================================================================

/// Formatter for `.codex/config.toml`: `[mcp_servers.<name>]` tables.
#[derive(Debug)]
pub struct CodexFormatter;

impl CodexFormatter {
    fn existing_servers(doc: &TomlTable) -> TomlTable {
        doc.get("mcp_servers")
            .and_then(|v| v.as_table())
            .cloned()
            .unwrap_or_default()
    }

    fn write(mut doc: TomlTable, servers: TomlTable) -> Result<String> {
        doc.insert("mcp_servers".to_string(), TomlValue::Table(servers));
        toml::to_string_pretty(&doc).context("Failed to serialize Codex config")
    }
}

impl McpFormatter for CodexFormatter {
    /// Logical shape only; the file itself is TOML, see `format_to_string`.
    fn format(&self, servers: &ServerRefs) -> Value {
        let entries = sorted_json_map_from_pairs(
            servers
                .iter()
                .map(|(name, server)| (name.clone(), server_to_json(server, "http"))),
        );
        json!({ "mcp_servers": entries })
    }

    fn format_to_string(&self, servers: &ServerRefs) -> Result<String> {
        let table = servers
            .iter()
            .map(|(name, server)| (name.clone(), server_to_codex_toml(server)))
            .collect();
        Self::write(TomlTable::new(), table)
    }

    fn parse_existing(&self, content: &str) -> Result<BTreeMap<String, Value>> {
        let doc = parse_codex_doc(content)?;
        Ok(Self::existing_servers(&doc)
            .iter()
            .map(|(k, v)| (k.clone(), toml_to_json_value(v)))
            .collect())
    }

    fn merge(&self, existing_content: &str, servers: &ServerRefs) -> Result<String> {
        let doc = parse_codex_doc(existing_content)?;
        let mut table = Self::existing_servers(&doc);
        for (name, server) in servers {
            table.insert(name.clone(), server_to_codex_toml(server));
        }
        Self::write(doc, table)
    }

    fn replace_servers(&self, existing_content: &str, servers: &ServerRefs) -> Result<String> {
        let doc = parse_codex_doc(existing_content)?;
        let table = servers
            .iter()
            .map(|(name, server)| (name.clone(), server_to_codex_toml(server)))
            .collect();
        Self::write(doc, table)
    }

    fn preserve_on_overwrite(&self) -> bool {
        true
    }

    fn to_canonical(&self, value: &Value) -> Result<McpServer> {
        if !value.is_object() {
            bail!("server entry is not a TOML table");
        }
        let mut server = server_from_json(value);
        if server.headers.is_empty() {
            server.headers = json_to_string_map(value.get("http_headers"));
        }
        Ok(server)
    }
}

/// Parse Codex CLI config TOML into a document table.
fn parse_codex_doc(content: &str) -> Result<TomlTable> {
    if content.trim().is_empty() {
        return Ok(TomlTable::new());
    }
    toml::from_str(content).context("Failed to parse existing Codex config as TOML")
}

/// Convert TOML value recursively to JSON value for unified parsing APIs.
fn toml_to_json_value(value: &TomlValue) -> Value {
    match value {
        TomlValue::String(s) => Value::String(s.clone()),
        TomlValue::Integer(i) => json!(*i),
        TomlValue::Float(f) => json!(*f),
        TomlValue::Boolean(b) => json!(*b),
        TomlValue::Datetime(d) => Value::String(d.to_string()),
        TomlValue::Array(arr) => Value::Array(arr.iter().map(toml_to_json_value).collect()),
        TomlValue::Table(table) => Value::Object(
            table
                .iter()
                .map(|(k, v)| (k.clone(), toml_to_json_value(v)))
                .collect(),
        ),
    }
}

fn string_map_to_toml(values: &BTreeMap<String, String>) -> TomlValue {
    TomlValue::Table(
        values
            .iter()
            .map(|(k, v)| (k.clone(), TomlValue::String(v.clone())))
            .collect(),
    )
}

/// Convert a server into a Codex CLI TOML server table.
fn server_to_codex_toml(server: &McpServer) -> TomlValue {
    let mut table = TomlTable::new();

    if let Some(ref cmd) = server.command {
        table.insert("command".to_string(), TomlValue::String(cmd.clone()));
    }
    if !server.args.is_empty() {
        table.insert(
            "args".to_string(),
            TomlValue::Array(server.args.iter().cloned().map(TomlValue::String).collect()),
        );
    }
    if !server.env.is_empty() {
        table.insert("env".to_string(), string_map_to_toml(&server.env));
    }
    if let Some(url) = server.endpoint() {
        table.insert("url".to_string(), TomlValue::String(url.to_string()));
    }
    if !server.headers.is_empty() {
        // Codex calls static headers `http_headers`.
        table.insert("http_headers".to_string(), string_map_to_toml(&server.headers));
    }

    TomlValue::Table(table)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn refs(servers: &BTreeMap<String, McpServer>) -> ServerRefs<'_> {
        servers.iter().map(|(k, v)| (k.clone(), v)).collect()
    }

    fn stdio_servers() -> BTreeMap<String, McpServer> {
        let mut fs = McpServer::stdio("npx", &["-y", "@modelcontextprotocol/server-filesystem"]);
        fs.env.insert("ROOT".to_string(), ".".to_string());
        BTreeMap::from([("filesystem".to_string(), fs)])
    }

    fn remote_servers() -> BTreeMap<String, McpServer> {
        let mut api = McpServer::remote("https://api.example.com/mcp", Transport::Http);
        api.headers
            .insert("Authorization".to_string(), "Bearer MY_SECRET".to_string());
        BTreeMap::from([
            ("api".to_string(), api),
            (
                "events".to_string(),
                McpServer::remote("https://events.example.com/sse", Transport::Sse),
            ),
        ])
    }

    fn formatter(tool: ToolTarget) -> Box<dyn McpFormatter> {
        formatter_for(tool).unwrap()
    }

    // ==========================================================================
    // FORMATTER TESTS - Standard
    // ==========================================================================

    #[test]
    fn test_standard_formatter_basic() {
        let servers = stdio_servers();
        let value = formatter(ToolTarget::ClaudeCode).format(&refs(&servers));
        let fs = &value["mcpServers"]["filesystem"];
        assert_eq!(fs["command"], "npx");
        assert_eq!(fs["args"][0], "-y");
        assert_eq!(fs["env"]["ROOT"], ".");
        assert!(fs.get("type").is_none());
    }

    #[test]
    fn test_standard_formatter_remote_tags() {
        let servers = remote_servers();
        let claude = formatter(ToolTarget::ClaudeCode).format(&refs(&servers));
        assert_eq!(claude["mcpServers"]["api"]["type"], "http");
        assert_eq!(claude["mcpServers"]["events"]["type"], "sse");

        let cline = formatter(ToolTarget::Cline).format(&refs(&servers));
        assert_eq!(cline["mcpServers"]["api"]["type"], "streamable-http");
    }

    #[test]
    fn test_standard_formatter_orders_servers_deterministically() {
        let mut servers = stdio_servers();
        servers.insert("alpha".to_string(), McpServer::stdio("a", &[]));
        let out = formatter(ToolTarget::Cursor)
            .format_to_string(&refs(&servers))
            .unwrap();
        assert!(out.find("\"alpha\"").unwrap() < out.find("\"filesystem\"").unwrap());
        assert!(out.ends_with('\n'));
    }

    #[test]
    fn test_standard_formatter_merge_override() {
        let servers = stdio_servers();
        let existing = r#"{"mcpServers": {"filesystem": {"command": "old"}, "other": {"command": "x"}}}"#;
        let merged = formatter(ToolTarget::ClaudeCode)
            .merge(existing, &refs(&servers))
            .unwrap();
        let parsed: Value = serde_json::from_str(&merged).unwrap();
        assert_eq!(parsed["mcpServers"]["filesystem"]["command"], "npx");
        assert_eq!(parsed["mcpServers"]["other"]["command"], "x");
    }

    // ==========================================================================
    // FORMATTER TESTS - Gemini CLI
    // ==========================================================================

    #[test]
    fn test_gemini_formatter_adds_trust_and_http_url() {
        let servers = remote_servers();
        let value = formatter(ToolTarget::GeminiCli).format(&refs(&servers));
        assert_eq!(value["mcpServers"]["api"]["httpUrl"], "https://api.example.com/mcp");
        assert_eq!(value["mcpServers"]["events"]["url"], "https://events.example.com/sse");
        assert_eq!(value["mcpServers"]["api"]["trust"], true);
    }

    #[test]
    fn test_gemini_formatter_preserves_other_settings() {
        let servers = stdio_servers();
        let existing = r#"{"theme": "dark", "mcpServers": {"stale": {"command": "x"}}}"#;
        let f = formatter(ToolTarget::GeminiCli);
        assert!(f.preserve_on_overwrite());

        let replaced = f.replace_servers(existing, &refs(&servers)).unwrap();
        let parsed: Value = serde_json::from_str(&replaced).unwrap();
        assert_eq!(parsed["theme"], "dark");
        assert!(parsed["mcpServers"].get("stale").is_none());
        assert!(parsed["mcpServers"].get("filesystem").is_some());
    }

    // ==========================================================================
    // FORMATTER TESTS - Copilot
    // ==========================================================================

    #[test]
    fn test_copilot_formatter_redacts_secrets() {
        let servers = remote_servers();
        let value = formatter(ToolTarget::Copilot).format(&refs(&servers));
        assert_eq!(value["servers"]["api"]["type"], "http");
        assert_eq!(
            value["servers"]["api"]["headers"]["Authorization"],
            "${input:Authorization}"
        );
        assert_eq!(value["inputs"][0]["id"], "Authorization");
        assert_eq!(value["inputs"][0]["password"], true);
        assert!(value.get("mcpServers").is_none());
    }

    #[test]
    fn test_copilot_stdio_type() {
        let servers = stdio_servers();
        let value = formatter(ToolTarget::Copilot).format(&refs(&servers));
        assert_eq!(value["servers"]["filesystem"]["type"], "stdio");
        assert!(value.get("inputs").is_none());
    }

    // ==========================================================================
    // FORMATTER TESTS - OpenCode
    // ==========================================================================

    #[test]
    fn test_opencode_formatter_basic() {
        let servers = stdio_servers();
        let value = formatter(ToolTarget::OpenCode).format(&refs(&servers));
        assert_eq!(value["$schema"], OPENCODE_SCHEMA);
        let fs = &value["mcp"]["filesystem"];
        assert_eq!(fs["type"], "local");
        assert_eq!(fs["command"][0], "npx");
        assert_eq!(fs["command"][2], "@modelcontextprotocol/server-filesystem");
        assert_eq!(fs["environment"]["ROOT"], ".");
        assert_eq!(fs["enabled"], true);
    }

    #[test]
    fn test_opencode_formatter_keeps_permissions() {
        let servers = stdio_servers();
        let existing = r#"{"permission": {"read": {".env": "deny"}}}"#;
        let out = formatter(ToolTarget::OpenCode)
            .replace_servers(existing, &refs(&servers))
            .unwrap();
        let parsed: Value = serde_json::from_str(&out).unwrap();
        assert_eq!(parsed["permission"]["read"][".env"], "deny");
        assert_eq!(parsed["$schema"], OPENCODE_SCHEMA);
    }

    #[test]
    fn test_opencode_to_canonical() {
        let f = formatter(ToolTarget::OpenCode);
        let local = f
            .to_canonical(&json!({"type": "local", "command": ["npx", "-y", "srv"], "enabled": false}))
            .unwrap();
        assert_eq!(local.command.as_deref(), Some("npx"));
        assert_eq!(local.args, vec!["-y", "srv"]);
        assert!(local.disabled);

        let remote = f
            .to_canonical(&json!({"type": "remote", "url": "https://x"}))
            .unwrap();
        assert_eq!(remote.endpoint(), Some("https://x"));
    }

    // ==========================================================================
    // FORMATTER TESTS - Codex CLI
    // ==========================================================================

    #[test]
    fn test_codex_formatter_format_to_string() {
        let servers = stdio_servers();
        let out = formatter(ToolTarget::CodexCli)
            .format_to_string(&refs(&servers))
            .unwrap();
        assert!(out.contains("[mcp_servers.filesystem]"));
        assert!(out.contains("command = \"npx\""));
    }

    #[test]
    fn test_codex_formatter_uses_http_headers() {
        let servers = remote_servers();
        let out = formatter(ToolTarget::CodexCli)
            .format_to_string(&refs(&servers))
            .unwrap();
        assert!(out.contains("http_headers"));
        assert!(!out.contains("type ="));
    }

    #[test]
    fn test_codex_formatter_merge_preserves_other_settings() {
        let servers = stdio_servers();
        let existing = "model = \"o3\"\n\n[mcp_servers.legacy]\ncommand = \"legacy\"\n";
        let f = formatter(ToolTarget::CodexCli);

        let merged = f.merge(existing, &refs(&servers)).unwrap();
        assert!(merged.contains("model = \"o3\""));
        assert!(merged.contains("[mcp_servers.legacy]"));
        assert!(merged.contains("[mcp_servers.filesystem]"));

        let replaced = f.replace_servers(existing, &refs(&servers)).unwrap();
        assert!(replaced.contains("model = \"o3\""));
        assert!(!replaced.contains("legacy"));
    }

    #[test]
    fn test_codex_parse_and_import() {
        let f = formatter(ToolTarget::CodexCli);
        let existing = f
            .parse_existing("[mcp_servers.api]\nurl = \"https://x\"\n\n[mcp_servers.api.http_headers]\nX-Key = \"k\"\n")
            .unwrap();
        let api = f.to_canonical(&existing["api"]).unwrap();
        assert_eq!(api.endpoint(), Some("https://x"));
        assert_eq!(api.headers["X-Key"], "k");
    }

    #[test]
    fn test_no_formatter_for_tools_without_mcp() {
        assert!(formatter_for(ToolTarget::Windsurf).is_none());
        assert!(formatter_for(ToolTarget::AgentsMd).is_none());
    }
}
