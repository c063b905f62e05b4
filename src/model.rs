//! Canonical documents and the tool-side documents derived from them.

use serde::{Deserialize, Serialize};
use serde_yaml::Mapping;
use std::fmt;
use std::path::{Component, Path, PathBuf};

use crate::error::SyncError;
use crate::frontmatter;
use crate::targets::{Feature, TargetSpec, ToolTarget};

// =============================================================================
// Artifact kinds
// =============================================================================

/// The kinds of canonical artifact rulesync manages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ArtifactKind {
    Rule,
    Command,
    Subagent,
    Ignore,
    Mcp,
}

impl ArtifactKind {
    pub fn id(&self) -> &'static str {
        match self {
            ArtifactKind::Rule => "rule",
            ArtifactKind::Command => "command",
            ArtifactKind::Subagent => "subagent",
            ArtifactKind::Ignore => "ignore",
            ArtifactKind::Mcp => "mcp",
        }
    }

    pub fn feature(&self) -> Feature {
        match self {
            ArtifactKind::Rule => Feature::Rules,
            ArtifactKind::Command => Feature::Commands,
            ArtifactKind::Subagent => Feature::Subagents,
            ArtifactKind::Ignore => Feature::Ignore,
            ArtifactKind::Mcp => Feature::Mcp,
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

// =============================================================================
// Canonical frontmatter
// =============================================================================

/// Frontmatter of `.rulesync/rules/*.md`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleFrontmatter {
    #[serde(default)]
    pub root: bool,

    #[serde(default)]
    pub targets: TargetSpec,

    pub description: String,

    #[serde(default)]
    pub globs: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,

    /// Cursor rule type hint: `always`, `manual`, `specificFiles`, `intelligently`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cursor_rule_type: Option<String>,

    /// Windsurf trigger hint: `always`, `manual`, `model-decision`, `glob`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub windsurf_activation_mode: Option<String>,

    /// Windsurf output hint: `single-file` or `directory`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub windsurf_output_format: Option<String>,
}

impl RuleFrontmatter {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            root: false,
            targets: TargetSpec::Wildcard,
            description: description.into(),
            globs: Vec::new(),
            tags: None,
            cursor_rule_type: None,
            windsurf_activation_mode: None,
            windsurf_output_format: None,
        }
    }
}

/// Frontmatter of `.rulesync/commands/*.md`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandFrontmatter {
    #[serde(default)]
    pub targets: TargetSpec,

    pub description: String,
}

/// Claude Code specific subagent options.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClaudecodeSubagentOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

/// Frontmatter of `.rulesync/subagents/*.md`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubagentFrontmatter {
    #[serde(default)]
    pub targets: TargetSpec,

    pub name: String,

    pub description: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub claudecode: Option<ClaudecodeSubagentOptions>,
}

/// Frontmatter of `.rulesyncignore` (optional; a plain pattern list is valid).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IgnoreFrontmatter {
    #[serde(default)]
    pub targets: TargetSpec,

    #[serde(default)]
    pub description: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patterns: Option<Vec<String>>,
}

/// Fields every canonical frontmatter exposes to the resolver.
pub trait Targeted {
    fn targets(&self) -> &TargetSpec;
    fn description(&self) -> &str;
}

impl Targeted for RuleFrontmatter {
    fn targets(&self) -> &TargetSpec {
        &self.targets
    }
    fn description(&self) -> &str {
        &self.description
    }
}

impl Targeted for CommandFrontmatter {
    fn targets(&self) -> &TargetSpec {
        &self.targets
    }
    fn description(&self) -> &str {
        &self.description
    }
}

impl Targeted for SubagentFrontmatter {
    fn targets(&self) -> &TargetSpec {
        &self.targets
    }
    fn description(&self) -> &str {
        &self.description
    }
}

impl Targeted for IgnoreFrontmatter {
    fn targets(&self) -> &TargetSpec {
        &self.targets
    }
    fn description(&self) -> &str {
        &self.description
    }
}

// =============================================================================
// Canonical documents
// =============================================================================

/// One parsed canonical source file. Never mutated after parsing.
#[derive(Debug, Clone, PartialEq)]
pub struct Document<F> {
    pub frontmatter: F,
    /// Trimmed markdown body.
    pub body: String,
    /// Directory relative to the project root, e.g. `.rulesync/rules`.
    pub relative_dir_path: PathBuf,
    /// Path inside `relative_dir_path`, e.g. `git/commit.md`.
    pub relative_file_path: PathBuf,
}

pub type RuleDocument = Document<RuleFrontmatter>;
pub type CommandDocument = Document<CommandFrontmatter>;
pub type SubagentDocument = Document<SubagentFrontmatter>;
pub type IgnoreDocument = Document<IgnoreFrontmatter>;

impl<F> Document<F> {
    pub fn new(
        frontmatter: F,
        body: impl AsRef<str>,
        relative_dir_path: impl Into<PathBuf>,
        relative_file_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            frontmatter,
            body: body.as_ref().trim().to_string(),
            relative_dir_path: relative_dir_path.into(),
            relative_file_path: relative_file_path.into(),
        }
    }

    /// Path relative to the project root.
    pub fn relative_path(&self) -> PathBuf {
        self.relative_dir_path.join(&self.relative_file_path)
    }

    /// Absolute (or base-relative) path of the source file.
    pub fn path(&self, base_dir: &Path) -> PathBuf {
        base_dir.join(self.relative_path())
    }

    /// File name without directories, used by filename conventions.
    pub fn file_name(&self) -> String {
        self.relative_file_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

impl<F: Serialize> Document<F> {
    /// Serialize back to `---` frontmatter plus body.
    pub fn to_file_content(&self) -> anyhow::Result<String> {
        frontmatter::serialize(&self.frontmatter, &self.body)
    }
}

impl<F: Targeted> Document<F> {
    pub fn targets(&self) -> &TargetSpec {
        self.frontmatter.targets()
    }

    pub fn description(&self) -> &str {
        self.frontmatter.description()
    }
}

impl IgnoreDocument {
    /// Effective patterns: explicit `patterns` first, then body lines.
    pub fn patterns(&self) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        let explicit = self.frontmatter.patterns.iter().flatten().cloned();
        let lines = self
            .body
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty() && !l.starts_with('#'))
            .map(str::to_string);

        for pattern in explicit.chain(lines) {
            if !out.contains(&pattern) {
                out.push(pattern);
            }
        }
        out
    }
}

/// Fail when more than one rule claims `root: true`, naming every offender.
pub fn validate_single_root(rules: &[RuleDocument]) -> Result<(), SyncError> {
    let roots: Vec<PathBuf> = rules
        .iter()
        .filter(|r| r.frontmatter.root)
        .map(|r| r.relative_path())
        .collect();

    if roots.len() > 1 {
        return Err(SyncError::DuplicateRoot(roots));
    }
    Ok(())
}

/// Fail when two documents of one kind share a source path.
pub fn validate_unique_paths<F>(kind: ArtifactKind, docs: &[Document<F>]) -> Result<(), SyncError> {
    let mut seen = std::collections::HashSet::new();
    for doc in docs {
        let path = doc.relative_path();
        if !seen.insert(path.clone()) {
            return Err(SyncError::DuplicatePath { kind, path });
        }
    }
    Ok(())
}

/// Split rules into the root rule (if any) and the detail rules, keeping order.
pub fn partition_root<'a>(
    rules: &[&'a RuleDocument],
) -> (Option<&'a RuleDocument>, Vec<&'a RuleDocument>) {
    let mut root = None;
    let mut details = Vec::new();
    for rule in rules {
        if rule.frontmatter.root && root.is_none() {
            root = Some(*rule);
        } else {
            details.push(*rule);
        }
    }
    (root, details)
}

// =============================================================================
// Tool documents
// =============================================================================

/// How a tool document is rendered to disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    /// Markdown with optional `---` frontmatter (omitted when empty).
    Markdown,
    /// TOML command file with `description` and `prompt` keys.
    Toml,
    /// `body` is already the complete file content.
    Raw,
}

/// A document in one tool's native shape, derived from canonical sources or
/// parsed from disk.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolDocument {
    pub tool: ToolTarget,
    pub kind: ArtifactKind,
    /// Directory relative to the base dir, e.g. `.cursor/rules`.
    pub relative_dir_path: PathBuf,
    /// Path inside `relative_dir_path`.
    pub relative_file_path: PathBuf,
    /// Whether this is the tool's primary (root) document.
    pub root: bool,
    /// Canonical description; kept even when the native format has no slot for it.
    pub description: String,
    pub globs: Vec<String>,
    /// Subagent display name, when the kind carries one.
    pub name: Option<String>,
    /// Frontmatter in the tool's dialect, rendered as-is.
    pub frontmatter: Mapping,
    pub body: String,
    pub format: FileFormat,
}

#[derive(Serialize, Deserialize)]
struct TomlCommandFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    prompt: String,
}

impl ToolDocument {
    pub fn new(
        tool: ToolTarget,
        kind: ArtifactKind,
        relative_dir_path: impl Into<PathBuf>,
        relative_file_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            tool,
            kind,
            relative_dir_path: relative_dir_path.into(),
            relative_file_path: relative_file_path.into(),
            root: false,
            description: String::new(),
            globs: Vec::new(),
            name: None,
            frontmatter: Mapping::new(),
            body: String::new(),
            format: FileFormat::Markdown,
        }
    }

    /// Path relative to the base dir.
    pub fn relative_path(&self) -> PathBuf {
        self.relative_dir_path.join(&self.relative_file_path)
    }

    /// `join(baseDir, relativeDirPath, relativeFilePath)`.
    pub fn file_path(&self, base_dir: &Path) -> PathBuf {
        base_dir.join(self.relative_path())
    }

    /// Forward-slash form of the base-relative path, used in references.
    pub fn reference_path(&self) -> String {
        self.relative_path()
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join("/")
    }

    /// Render the complete file content.
    pub fn render(&self) -> anyhow::Result<String> {
        match self.format {
            FileFormat::Markdown => frontmatter::render(&self.frontmatter, &self.body),
            FileFormat::Raw => Ok(self.body.clone()),
            FileFormat::Toml => {
                let file = TomlCommandFile {
                    description: frontmatter::get_str(&self.frontmatter, "description")
                        .map(str::to_string),
                    prompt: self.body.clone(),
                };
                Ok(toml::to_string(&file)?)
            }
        }
    }

    /// Parse a TOML command file into `(description, prompt)`.
    pub fn parse_toml_command(path: &Path, content: &str) -> Result<(Option<String>, String), SyncError> {
        let file: TomlCommandFile =
            toml::from_str(content).map_err(|e| SyncError::InvalidFrontmatter {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;
        Ok((file.description, file.prompt.trim().to_string()))
    }

    /// Structural checks shared by every adapter.
    pub fn validate(&self) -> Result<(), SyncError> {
        let path = self.relative_path();
        let escapes = path
            .components()
            .any(|c| matches!(c, Component::ParentDir | Component::RootDir | Component::Prefix(_)));
        if escapes || self.relative_file_path.as_os_str().is_empty() {
            return Err(SyncError::InvalidFrontmatter {
                path,
                message: "output path must be a relative path inside the base directory"
                    .to_string(),
            });
        }
        if self.format == FileFormat::Toml && self.body.trim().is_empty() {
            return Err(SyncError::InvalidFrontmatter {
                path,
                message: "`prompt` must not be empty".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(path: &str, root: bool) -> RuleDocument {
        let mut fm = RuleFrontmatter::new("desc");
        fm.root = root;
        Document::new(fm, "body", ".rulesync/rules", path)
    }

    #[test]
    fn test_single_root_accepts_one() {
        let rules = vec![rule("a.md", true), rule("b.md", false)];
        assert!(validate_single_root(&rules).is_ok());
    }

    #[test]
    fn test_second_root_names_both_files() {
        let rules = vec![rule("a.md", true), rule("b.md", true)];
        let err = validate_single_root(&rules).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("a.md"));
        assert!(message.contains("b.md"));
    }

    #[test]
    fn test_unique_paths() {
        let rules = vec![rule("a.md", false), rule("a.md", false)];
        assert!(matches!(
            validate_unique_paths(ArtifactKind::Rule, &rules),
            Err(SyncError::DuplicatePath { .. })
        ));
    }

    #[test]
    fn test_partition_root_keeps_detail_order() {
        let rules = [rule("b.md", false), rule("a.md", true), rule("c.md", false)];
        let refs: Vec<&RuleDocument> = rules.iter().collect();
        let (root, details) = partition_root(&refs);
        assert_eq!(root.unwrap().relative_file_path, PathBuf::from("a.md"));
        assert_eq!(details.len(), 2);
        assert_eq!(details[0].relative_file_path, PathBuf::from("b.md"));
    }

    #[test]
    fn test_document_body_is_trimmed() {
        let doc = Document::new(RuleFrontmatter::new("d"), "\n\n Use TS \n", "x", "y.md");
        assert_eq!(doc.body, "Use TS");
    }

    #[test]
    fn test_document_round_trip_through_file_content() {
        let mut fm = RuleFrontmatter::new("Naming");
        fm.globs = vec!["**/*.ts".to_string()];
        fm.tags = Some(vec!["style".to_string()]);
        let doc = Document::new(fm.clone(), "Use camelCase", ".rulesync/rules", "naming.md");

        let content = doc.to_file_content().unwrap();
        let (parsed, body): (RuleFrontmatter, String) =
            frontmatter::parse(Path::new("naming.md"), &content).unwrap();
        assert_eq!(parsed, fm);
        assert_eq!(body, "Use camelCase");
    }

    #[test]
    fn test_ignore_patterns_merge_and_dedupe() {
        let fm = IgnoreFrontmatter {
            patterns: Some(vec!["*.log".to_string()]),
            ..Default::default()
        };
        let doc = Document::new(fm, "# comment\n*.log\n\n.env\n", "", ".rulesyncignore");
        assert_eq!(doc.patterns(), vec!["*.log", ".env"]);
    }

    #[test]
    fn test_tool_document_file_path() {
        let doc = ToolDocument::new(
            ToolTarget::Cursor,
            ArtifactKind::Rule,
            ".cursor/rules",
            "naming.mdc",
        );
        assert_eq!(
            doc.file_path(Path::new("/repo")),
            PathBuf::from("/repo/.cursor/rules/naming.mdc")
        );
        assert_eq!(doc.reference_path(), ".cursor/rules/naming.mdc");
    }

    #[test]
    fn test_tool_document_validate_rejects_escape() {
        let doc = ToolDocument::new(ToolTarget::Cursor, ArtifactKind::Rule, "..", "x.md");
        assert!(doc.validate().is_err());
    }

    #[test]
    fn test_toml_render_and_parse() {
        let mut doc = ToolDocument::new(
            ToolTarget::GeminiCli,
            ArtifactKind::Command,
            ".gemini/commands",
            "review.toml",
        );
        doc.format = FileFormat::Toml;
        doc.frontmatter
            .insert("description".into(), "Review code".into());
        doc.body = "Review {{args}}".to_string();

        let rendered = doc.render().unwrap();
        let (description, prompt) =
            ToolDocument::parse_toml_command(Path::new("review.toml"), &rendered).unwrap();
        assert_eq!(description.as_deref(), Some("Review code"));
        assert_eq!(prompt, "Review {{args}}");
    }
}
