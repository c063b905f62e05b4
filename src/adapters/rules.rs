//! Rule adapters: canonical rules to and from each tool's instruction files.

use anyhow::Result;
use regex::Regex;
use serde_yaml::{Mapping, Value as YamlValue};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use super::{AdapterSpec, Layout, Naming, canonical_from_native, detail_path, split_path};
use crate::error::SyncError;
use crate::frontmatter;
use crate::fs;
use crate::model::{self, ArtifactKind, Document, RuleDocument, RuleFrontmatter, ToolDocument};
use crate::source::RULES_DIR;
use crate::targets::{TargetSpec, ToolTarget};

/// Heading that introduces the satellite list in a primary rule file.
pub const REFERENCE_HEADING: &str = "Please also reference the following documents as needed:";

/// Canonical file name given to an imported root rule.
pub const ROOT_RULE_FILE: &str = "overview.md";

pub const DEFAULT_ROOT_DESCRIPTION: &str = "Project overview and general development guidelines";

static REFERENCE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"^@(?P<path>\S+)\s+description:\s*(?P<desc>"(?:[^"\\]|\\.)*")\s+globs:\s*(?P<globs>"(?:[^"\\]|\\.)*")\s*$"#,
    )
    .unwrap()
});

/// Frontmatter dialect of a tool's rule files.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleDialect {
    /// No frontmatter at all.
    Plain,
    /// `description`, `globs`, `alwaysApply`.
    Cursor,
    /// `description`, `applyTo`.
    Copilot,
    /// `trigger`, `description`, `globs`.
    Windsurf,
    /// `type`, `description`.
    Augment,
    /// `inclusion`, `fileMatchPattern`.
    Kiro,
}

pub type RuleAdapter = AdapterSpec<RuleDialect>;

const fn memory_style(tool: ToolTarget, root: &'static str, detail_dir: &'static str) -> RuleAdapter {
    AdapterSpec {
        tool,
        layout: Layout::Split {
            root,
            detail_dir,
            ext: ".md",
            naming: Naming::Hierarchical,
            references: true,
        },
        dialect: RuleDialect::Plain,
        simulated: false,
        legacy_file: None,
    }
}

const fn directory(
    tool: ToolTarget,
    dir: &'static str,
    ext: &'static str,
    naming: Naming,
    dialect: RuleDialect,
    legacy_file: Option<&'static str>,
) -> RuleAdapter {
    AdapterSpec {
        tool,
        layout: Layout::Directory { dir, ext, naming },
        dialect,
        simulated: false,
        legacy_file,
    }
}

/// The rule adapter table entry for `tool`. Every tool supports rules.
pub fn rule_adapter(tool: ToolTarget) -> RuleAdapter {
    use ToolTarget::*;

    match tool {
        AgentsMd => memory_style(tool, "AGENTS.md", ".agents/memories"),
        AmazonQCli => directory(
            tool,
            ".amazonq/rules",
            ".md",
            Naming::Hierarchical,
            RuleDialect::Plain,
            None,
        ),
        AugmentCode => directory(
            tool,
            ".augment/rules",
            ".md",
            Naming::Flat,
            RuleDialect::Augment,
            None,
        ),
        AugmentCodeLegacy => AdapterSpec {
            tool,
            layout: Layout::SingleFile {
                path: ".augment-guidelines",
            },
            dialect: RuleDialect::Plain,
            simulated: false,
            legacy_file: None,
        },
        ClaudeCode => memory_style(tool, "CLAUDE.md", ".claude/memories"),
        Cline => directory(
            tool,
            ".clinerules",
            ".md",
            Naming::Flat,
            RuleDialect::Plain,
            Some(".clinerules"),
        ),
        CodexCli => memory_style(tool, "AGENTS.md", ".codex/memories"),
        Copilot => AdapterSpec {
            tool,
            layout: Layout::Split {
                root: ".github/copilot-instructions.md",
                detail_dir: ".github/instructions",
                ext: ".instructions.md",
                naming: Naming::Flat,
                references: false,
            },
            dialect: RuleDialect::Copilot,
            simulated: false,
            legacy_file: None,
        },
        Cursor => directory(
            tool,
            ".cursor/rules",
            ".mdc",
            Naming::Flat,
            RuleDialect::Cursor,
            Some(".cursorrules"),
        ),
        GeminiCli => memory_style(tool, "GEMINI.md", ".gemini/memories"),
        Junie => memory_style(tool, ".junie/guidelines.md", ".junie/memories"),
        Kiro => directory(tool, ".kiro/steering", ".md", Naming::Hierarchical, RuleDialect::Kiro, None),
        OpenCode => memory_style(tool, "AGENTS.md", ".opencode/memories"),
        QwenCode => memory_style(tool, "QWEN.md", ".qwen/memories"),
        Roo => directory(
            tool,
            ".roo/rules",
            ".md",
            Naming::Hierarchical,
            RuleDialect::Plain,
            None,
        ),
        Windsurf => directory(
            tool,
            ".windsurf/rules",
            ".md",
            Naming::Flat,
            RuleDialect::Windsurf,
            Some(".windsurfrules"),
        ),
    }
}

// =============================================================================
// Dialects
// =============================================================================

fn is_catch_all(globs: &[String]) -> bool {
    matches!(globs, [g] if g == "**" || g == "**/*")
}

fn insert(mapping: &mut Mapping, key: &str, value: impl Into<YamlValue>) {
    mapping.insert(YamlValue::from(key), value.into());
}

/// Cursor rule type: `always`, `specificFiles`, `intelligently` or `manual`.
fn cursor_rule_type(fm: &RuleFrontmatter) -> &'static str {
    match fm.cursor_rule_type.as_deref() {
        Some("always") => return "always",
        Some("manual") => return "manual",
        Some("specificFiles") => return "specificFiles",
        Some("intelligently") => return "intelligently",
        _ => {}
    }
    if fm.root || is_catch_all(&fm.globs) {
        "always"
    } else if !fm.globs.is_empty() {
        "specificFiles"
    } else if !fm.description.is_empty() {
        "intelligently"
    } else {
        "manual"
    }
}

/// Windsurf trigger: `always_on`, `glob`, `model_decision` or `manual`.
fn windsurf_trigger(fm: &RuleFrontmatter) -> &'static str {
    match fm.windsurf_activation_mode.as_deref() {
        Some("always") => return "always_on",
        Some("manual") => return "manual",
        Some("model-decision") => return "model_decision",
        Some("glob") => return "glob",
        _ => {}
    }
    if fm.root || is_catch_all(&fm.globs) {
        "always_on"
    } else if !fm.globs.is_empty() {
        "glob"
    } else if !fm.description.is_empty() {
        "model_decision"
    } else {
        "manual"
    }
}

fn windsurf_activation_mode(trigger: &str) -> Option<&'static str> {
    match trigger {
        "always_on" => Some("always"),
        "manual" => Some("manual"),
        "model_decision" => Some("model-decision"),
        "glob" => Some("glob"),
        _ => None,
    }
}

fn dialect_frontmatter(dialect: RuleDialect, fm: &RuleFrontmatter) -> Mapping {
    let mut mapping = Mapping::new();
    let globs = fm.globs.join(",");

    match dialect {
        RuleDialect::Plain => {}
        RuleDialect::Cursor => {
            let rule_type = cursor_rule_type(fm);
            let description = if rule_type == "manual" { "" } else { fm.description.as_str() };
            let globs = if rule_type == "specificFiles" { globs } else { String::new() };
            insert(&mut mapping, "description", description);
            insert(&mut mapping, "globs", globs);
            insert(&mut mapping, "alwaysApply", rule_type == "always");
        }
        RuleDialect::Copilot => {
            insert(&mut mapping, "description", fm.description.as_str());
            let apply_to = if fm.globs.is_empty() { "**".to_string() } else { globs };
            insert(&mut mapping, "applyTo", apply_to);
        }
        RuleDialect::Windsurf => {
            let trigger = windsurf_trigger(fm);
            insert(&mut mapping, "trigger", trigger);
            if !fm.description.is_empty() {
                insert(&mut mapping, "description", fm.description.as_str());
            }
            if trigger == "glob" {
                insert(&mut mapping, "globs", globs);
            }
        }
        RuleDialect::Augment => {
            let rule_type = if fm.root || is_catch_all(&fm.globs) {
                "always"
            } else if !fm.description.is_empty() {
                "auto"
            } else {
                "manual"
            };
            insert(&mut mapping, "type", rule_type);
            if !fm.description.is_empty() {
                insert(&mut mapping, "description", fm.description.as_str());
            }
        }
        RuleDialect::Kiro => {
            if fm.root || fm.globs.is_empty() || is_catch_all(&fm.globs) {
                insert(&mut mapping, "inclusion", "always");
            } else {
                insert(&mut mapping, "inclusion", "fileMatch");
                insert(&mut mapping, "fileMatchPattern", globs);
            }
        }
    }

    mapping
}

/// Description and globs a native frontmatter block declares in `dialect`.
fn read_dialect(dialect: RuleDialect, mapping: &Mapping) -> (String, Vec<String>) {
    let description = frontmatter::get_str(mapping, "description")
        .unwrap_or_default()
        .to_string();

    match dialect {
        RuleDialect::Plain | RuleDialect::Augment => (description, Vec::new()),
        RuleDialect::Cursor | RuleDialect::Windsurf => {
            (description, frontmatter::get_str_list(mapping, "globs"))
        }
        RuleDialect::Copilot => {
            let globs = frontmatter::get_str_list(mapping, "applyTo");
            let globs = if globs == ["**"] { Vec::new() } else { globs };
            (description, globs)
        }
        RuleDialect::Kiro => {
            let globs = if frontmatter::get_str(mapping, "inclusion") == Some("fileMatch") {
                frontmatter::get_str_list(mapping, "fileMatchPattern")
            } else {
                Vec::new()
            };
            (description, globs)
        }
    }
}

// =============================================================================
// Canonical -> tool
// =============================================================================

fn routes_to_legacy_file(spec: &RuleAdapter, fm: &RuleFrontmatter) -> Option<&'static str> {
    if spec.dialect == RuleDialect::Windsurf
        && fm.windsurf_output_format.as_deref() == Some("single-file")
    {
        spec.legacy_file
    } else {
        None
    }
}

/// Convert one canonical rule into the tool's document. Pure.
pub fn from_canonical(spec: &RuleAdapter, rule: &RuleDocument) -> ToolDocument {
    let fm = &rule.frontmatter;
    let root = fm.root;

    let (dir, file, plain) = if let Some(legacy) = routes_to_legacy_file(spec, fm) {
        let (dir, file) = split_path(legacy);
        (dir, file, true)
    } else {
        match spec.layout {
            Layout::Split {
                root: root_path,
                detail_dir,
                ext,
                naming,
                ..
            } => {
                if root {
                    let (dir, file) = split_path(root_path);
                    (dir, file, true)
                } else {
                    (
                        PathBuf::from(detail_dir),
                        detail_path(&rule.relative_file_path, naming, ext),
                        false,
                    )
                }
            }
            Layout::Directory { dir, ext, naming } => (
                PathBuf::from(dir),
                detail_path(&rule.relative_file_path, naming, ext),
                false,
            ),
            Layout::SingleFile { path } => {
                let (dir, file) = split_path(path);
                (dir, file, true)
            }
        }
    };

    let mut doc = ToolDocument::new(spec.tool, ArtifactKind::Rule, dir, file);
    doc.root = root;
    doc.description = fm.description.clone();
    doc.globs = fm.globs.clone();
    doc.body = rule.body.clone();
    if !plain {
        doc.frontmatter = dialect_frontmatter(spec.dialect, fm);
        // Directory layouts have no primary file listing each rule's description.
        if matches!(spec.layout, Layout::Directory { .. })
            && !fm.description.is_empty()
            && !doc.frontmatter.contains_key("description")
        {
            insert(&mut doc.frontmatter, "description", fm.description.as_str());
        }
    }
    doc
}

/// Documents that land on the same path are concatenated in order.
fn merge_shared_paths(docs: Vec<ToolDocument>) -> Vec<ToolDocument> {
    let mut merged: Vec<ToolDocument> = Vec::new();
    for doc in docs {
        let path = doc.relative_path();
        if let Some(existing) = merged.iter_mut().find(|d| d.relative_path() == path) {
            if !doc.body.is_empty() {
                if !existing.body.is_empty() {
                    existing.body.push_str("\n\n");
                }
                existing.body.push_str(&doc.body);
            }
            existing.root |= doc.root;
        } else {
            merged.push(doc);
        }
    }
    merged
}

/// One reference line for a satellite document.
pub fn format_reference(doc: &ToolDocument) -> String {
    let quote = |s: &str| serde_json::to_string(s).unwrap_or_else(|_| format!("\"{}\"", s));
    format!(
        "@{} description: {} globs: {}",
        doc.reference_path(),
        quote(&doc.description),
        quote(&doc.globs.join(","))
    )
}

fn reference_block(satellites: &[&ToolDocument]) -> String {
    let lines: Vec<String> = satellites.iter().map(|d| format_reference(d)).collect();
    format!("{}\n\n{}", REFERENCE_HEADING, lines.join("\n"))
}

/// Produce every output document for `rules` (already selected for this tool).
pub fn generate(spec: &RuleAdapter, rules: &[&RuleDocument]) -> Vec<ToolDocument> {
    let (root, details) = model::partition_root(rules);
    let docs: Vec<ToolDocument> = root
        .into_iter()
        .chain(details)
        .map(|rule| from_canonical(spec, rule))
        .collect();
    let mut docs = merge_shared_paths(docs);

    if let Layout::Split {
        root: root_path,
        references: true,
        ..
    } = spec.layout
    {
        let block = {
            let satellites: Vec<&ToolDocument> = docs.iter().filter(|d| !d.root).collect();
            if satellites.is_empty() {
                None
            } else {
                Some(reference_block(&satellites))
            }
        };

        if let Some(block) = block {
            let (dir, file) = split_path(root_path);
            let index = match docs.iter().position(|d| d.root) {
                Some(index) => index,
                None => {
                    let mut primary = ToolDocument::new(spec.tool, ArtifactKind::Rule, dir, file);
                    primary.root = true;
                    docs.insert(0, primary);
                    0
                }
            };
            let primary = &mut docs[index];
            primary.body = if primary.body.is_empty() {
                block
            } else {
                format!("{}\n\n{}", primary.body, block)
            };
        }
    }

    docs
}

// =============================================================================
// Tool -> canonical
// =============================================================================

/// Convert a tool document back into a canonical rule.
///
/// Always fails for simulated adapters.
pub fn to_canonical(spec: &RuleAdapter, doc: &ToolDocument) -> Result<RuleDocument, SyncError> {
    if spec.simulated {
        return Err(SyncError::SimulatedAdapter {
            tool: spec.tool,
            kind: ArtifactKind::Rule,
        });
    }

    let mut fm = RuleFrontmatter::new(doc.description.clone());
    fm.root = doc.root;
    fm.targets = TargetSpec::only(spec.tool);
    fm.globs = doc.globs.clone();

    match spec.dialect {
        RuleDialect::Cursor if !doc.root => {
            if frontmatter::get_bool(&doc.frontmatter, "alwaysApply") == Some(true) {
                fm.cursor_rule_type = Some("always".to_string());
            }
        }
        RuleDialect::Windsurf => {
            fm.windsurf_activation_mode = frontmatter::get_str(&doc.frontmatter, "trigger")
                .and_then(windsurf_activation_mode)
                .map(str::to_string);
        }
        _ => {}
    }

    let file = if doc.root {
        PathBuf::from(ROOT_RULE_FILE)
    } else {
        canonical_from_native(&doc.relative_file_path, spec.layout.extension().unwrap_or(".md"))
    };

    Ok(Document::new(fm, &doc.body, RULES_DIR, file))
}

/// Split a primary file body into its own text and its reference list.
pub fn parse_references(body: &str) -> (String, Vec<Reference>) {
    let Some(start) = body.find(REFERENCE_HEADING) else {
        return (body.trim().to_string(), Vec::new());
    };

    let own = body[..start].trim().to_string();
    let references = body[start + REFERENCE_HEADING.len()..]
        .lines()
        .filter_map(|line| {
            let caps = REFERENCE_RE.captures(line.trim())?;
            let description: String = serde_json::from_str(&caps["desc"]).ok()?;
            let globs: String = serde_json::from_str(&caps["globs"]).ok()?;
            Some(Reference {
                path: caps["path"].to_string(),
                description,
                globs: globs
                    .split(',')
                    .map(|g| g.trim().to_string())
                    .filter(|g| !g.is_empty())
                    .collect(),
            })
        })
        .collect();

    (own, references)
}

/// One satellite listed in a primary rule file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    pub path: String,
    pub description: String,
    pub globs: Vec<String>,
}

/// Parse one native rule file.
///
/// `dir` and `file` are relative to `base_dir`; for primary files the
/// reference list is stripped from the body.
pub fn from_native_file(
    spec: &RuleAdapter,
    base_dir: &Path,
    dir: &Path,
    file: &Path,
    root: bool,
) -> Result<ToolDocument> {
    let relative = dir.join(file);
    let content = fs::read_text(&base_dir.join(&relative))?;
    let (mapping, body) = frontmatter::parse_mapping(&relative, &content)?;

    let mut doc = ToolDocument::new(spec.tool, ArtifactKind::Rule, dir, file);
    doc.root = root;
    let (description, globs) = read_dialect(spec.dialect, &mapping);
    doc.description = description;
    doc.globs = globs;
    doc.frontmatter = mapping;
    doc.body = if root { parse_references(&body).0 } else { body };
    Ok(doc)
}

/// Native rule documents found for one tool, plus per-file failures.
#[derive(Debug, Default)]
pub struct NativeScan {
    pub docs: Vec<ToolDocument>,
    pub errors: Vec<anyhow::Error>,
}

impl NativeScan {
    fn push(&mut self, result: Result<ToolDocument>) {
        match result {
            Ok(doc) => self.docs.push(doc),
            Err(e) => self.errors.push(e),
        }
    }
}

fn list_layout_files(base_dir: &Path, dir: &str, ext: &str, naming: Naming) -> Result<Vec<PathBuf>> {
    let files = fs::list_files(&base_dir.join(dir), Some(ext))?;
    Ok(match naming {
        Naming::Hierarchical => files,
        Naming::Flat => files
            .into_iter()
            .filter(|f| f.components().count() == 1)
            .collect(),
    })
}

/// Locate and parse every native rule file of one tool.
///
/// A missing anchor (primary file, rules directory or single file) fails the
/// whole tool; a malformed file is recorded and skipped.
pub fn scan_native(spec: &RuleAdapter, base_dir: &Path) -> Result<NativeScan> {
    let mut scan = NativeScan::default();
    let missing = |path: &str| SyncError::MissingAnchor {
        tool: spec.tool,
        path: PathBuf::from(path),
    };

    match spec.layout {
        Layout::Split {
            root,
            detail_dir,
            ext,
            naming,
            references,
        } => {
            let has_root = base_dir.join(root).is_file();
            let details = list_layout_files(base_dir, detail_dir, ext, naming)?;
            if !has_root && (references || details.is_empty()) {
                return Err(missing(root).into());
            }

            let mut refs = Vec::new();
            if has_root {
                let (dir, file) = split_path(root);
                let result = from_native_file(spec, base_dir, &dir, &file, true);
                if let Ok(content) = fs::read_text(&base_dir.join(root)) {
                    let body = frontmatter::split(&content).map(|(_, b)| b).unwrap_or(&content);
                    refs = parse_references(body).1;
                }
                scan.push(result);
            }

            for file in details {
                scan.push(from_native_file(spec, base_dir, Path::new(detail_dir), &file, false));
            }

            for doc in scan.docs.iter_mut().filter(|d| !d.root) {
                let path = doc.reference_path();
                if let Some(reference) = refs.iter().find(|r| r.path == path) {
                    if doc.description.is_empty() {
                        doc.description = reference.description.clone();
                    }
                    if doc.globs.is_empty() {
                        doc.globs = reference.globs.clone();
                    }
                }
            }
        }
        Layout::Directory { dir, ext, naming } => {
            let has_dir = base_dir.join(dir).is_dir();
            let legacy = spec.legacy_file.filter(|l| base_dir.join(l).is_file());
            if !has_dir && legacy.is_none() {
                return Err(missing(dir).into());
            }

            if let Some(legacy) = legacy {
                let (legacy_dir, legacy_file) = split_path(legacy);
                scan.push(from_native_file(spec, base_dir, &legacy_dir, &legacy_file, true));
            }
            for file in list_layout_files(base_dir, dir, ext, naming)? {
                scan.push(from_native_file(spec, base_dir, Path::new(dir), &file, false));
            }
        }
        Layout::SingleFile { path } => {
            if !base_dir.join(path).is_file() {
                return Err(missing(path).into());
            }
            let (dir, file) = split_path(path);
            scan.push(from_native_file(spec, base_dir, &dir, &file, true));
        }
    }

    for doc in &mut scan.docs {
        if doc.description.is_empty() {
            doc.description = default_description(doc);
        }
    }

    Ok(scan)
}

fn default_description(doc: &ToolDocument) -> String {
    if doc.root {
        return DEFAULT_ROOT_DESCRIPTION.to_string();
    }
    let name = doc
        .relative_file_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    name.split('.').next().unwrap_or_default().replace(['-', '_'], " ")
}
