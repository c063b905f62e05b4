//! Loading and writing the canonical `.rulesync/**` source tree.

use anyhow::{Context, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::{SyncError, ValidationErrors};
use crate::frontmatter;
use crate::fs;
use crate::mcp::McpConfig;
use crate::model::{
    self, ArtifactKind, CommandDocument, Document, IgnoreDocument, IgnoreFrontmatter,
    RuleDocument, SubagentDocument,
};

pub const RULESYNC_DIR: &str = ".rulesync";
pub const RULES_DIR: &str = ".rulesync/rules";
pub const COMMANDS_DIR: &str = ".rulesync/commands";
pub const SUBAGENTS_DIR: &str = ".rulesync/subagents";
pub const MCP_FILE: &str = ".rulesync/.mcp.json";
pub const IGNORE_FILE: &str = ".rulesyncignore";

/// Every canonical artifact of one project, validated.
#[derive(Debug, Clone, Default)]
pub struct SourceSet {
    pub rules: Vec<RuleDocument>,
    pub commands: Vec<CommandDocument>,
    pub subagents: Vec<SubagentDocument>,
    pub ignore: Option<IgnoreDocument>,
    pub mcp: McpConfig,
}

impl SourceSet {
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
            && self.commands.is_empty()
            && self.subagents.is_empty()
            && self.ignore.is_none()
            && self.mcp.servers.is_empty()
    }
}

/// Load and validate every canonical source below `project_root`.
///
/// Each file is validated independently; when any fail, the returned error is a
/// [`ValidationErrors`] listing all of them. I/O failures abort immediately.
pub fn load_sources(project_root: &Path) -> Result<SourceSet> {
    let mut errors = Vec::new();

    let rules: Vec<RuleDocument> = load_documents(project_root, RULES_DIR, &mut errors)?;
    let commands: Vec<CommandDocument> = load_documents(project_root, COMMANDS_DIR, &mut errors)?;
    let subagents: Vec<SubagentDocument> =
        load_documents(project_root, SUBAGENTS_DIR, &mut errors)?;

    if let Err(e) = model::validate_single_root(&rules) {
        errors.push(e);
    }
    for result in [
        model::validate_unique_paths(ArtifactKind::Rule, &rules),
        model::validate_unique_paths(ArtifactKind::Command, &commands),
        model::validate_unique_paths(ArtifactKind::Subagent, &subagents),
    ] {
        if let Err(e) = result {
            errors.push(e);
        }
    }

    let ignore = match load_ignore(project_root) {
        Ok(doc) => doc,
        Err(e) => match e.downcast::<SyncError>() {
            Ok(sync) => {
                errors.push(sync);
                None
            }
            Err(other) => return Err(other),
        },
    };

    let mcp = match McpConfig::load_canonical(project_root) {
        Ok(config) => config,
        Err(e) => match e.downcast::<SyncError>() {
            Ok(sync) => {
                errors.push(sync);
                McpConfig::default()
            }
            Err(other) => return Err(other),
        },
    };

    if !errors.is_empty() {
        return Err(ValidationErrors(errors).into());
    }

    tracing::debug!(
        rules = rules.len(),
        commands = commands.len(),
        subagents = subagents.len(),
        mcp_servers = mcp.servers.len(),
        "Loaded rulesync sources"
    );

    Ok(SourceSet {
        rules,
        commands,
        subagents,
        ignore,
        mcp,
    })
}

/// Canonical rules that parse cleanly. Malformed files are skipped here and
/// reported by [`load_sources`].
pub fn load_rules(project_root: &Path) -> Result<Vec<RuleDocument>> {
    let mut errors = Vec::new();
    load_documents(project_root, RULES_DIR, &mut errors)
}

fn load_documents<F: DeserializeOwned>(
    project_root: &Path,
    dir: &str,
    errors: &mut Vec<SyncError>,
) -> Result<Vec<Document<F>>> {
    let mut docs = Vec::new();
    for relative in fs::list_files(&project_root.join(dir), Some(".md"))? {
        let display = Path::new(dir).join(&relative);
        let content = fs::read_text(&project_root.join(&display))?;
        match frontmatter::parse::<F>(&display, &content) {
            Ok((fm, body)) => docs.push(Document::new(fm, body, dir, relative)),
            Err(e) => errors.push(e),
        }
    }
    Ok(docs)
}

/// Parse `<dir>/.rulesyncignore` if present.
pub fn load_ignore(dir: &Path) -> Result<Option<IgnoreDocument>> {
    let display = PathBuf::from(IGNORE_FILE);
    let Some(content) = fs::read_text_if_exists(&dir.join(IGNORE_FILE))? else {
        return Ok(None);
    };
    let (fm, body) = frontmatter::parse_optional::<IgnoreFrontmatter>(&display, &content)?;
    Ok(Some(Document::new(fm, body, "", IGNORE_FILE)))
}

/// Write one canonical document below `project_root`, returning its path.
pub fn write_document<F: Serialize>(project_root: &Path, doc: &Document<F>) -> Result<PathBuf> {
    let path = doc.path(project_root);
    let content = doc
        .to_file_content()
        .with_context(|| format!("Failed to serialize {}", path.display()))?;
    fs::write_text(&path, &content)?;
    Ok(path)
}

/// Write `.rulesyncignore`. Documents without metadata are written as a plain
/// pattern list.
pub fn write_ignore(project_root: &Path, doc: &IgnoreDocument) -> Result<PathBuf> {
    if doc.frontmatter == IgnoreFrontmatter::default() {
        let path = project_root.join(IGNORE_FILE);
        let mut content = doc.patterns().join("\n");
        content.push('\n');
        fs::write_text(&path, &content)?;
        Ok(path)
    } else {
        write_document(project_root, doc)
    }
}

// =============================================================================
// Ignore pattern cache
// =============================================================================

/// Request-scoped memo of `.rulesyncignore` documents, keyed by directory.
///
/// Created per generate/import run and passed down; nothing is cached across
/// runs.
#[derive(Debug, Default)]
pub struct IgnoreCache {
    entries: HashMap<PathBuf, Option<IgnoreDocument>>,
}

impl IgnoreCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the cache with an already-loaded document.
    pub fn insert(&mut self, dir: &Path, doc: Option<IgnoreDocument>) {
        self.entries.insert(dir.to_path_buf(), doc);
    }

    pub fn get(&mut self, dir: &Path) -> Result<Option<&IgnoreDocument>> {
        if !self.entries.contains_key(dir) {
            let loaded = load_ignore(dir)?;
            self.entries.insert(dir.to_path_buf(), loaded);
        }
        Ok(self.entries.get(dir).and_then(|doc| doc.as_ref()))
    }

    /// Ignore document for `base_dir`, falling back to the project root's.
    pub fn resolve(&mut self, base_dir: &Path, project_root: &Path) -> Result<Option<IgnoreDocument>> {
        if let Some(doc) = self.get(base_dir)? {
            return Ok(Some(doc.clone()));
        }
        Ok(self.get(project_root)?.cloned())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
