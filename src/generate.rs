//! Canonical sources to tool files.
//!
//! Generation happens in two steps. [`Generator::plan`] renders every output
//! in memory (base dirs, then tools, then features, all in sorted order), and
//! [`Generator::run`] optionally deletes stale outputs and then writes the plan
//! sequentially. `status` reuses the plan without writing.

use anyhow::{Context, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::adapters::{commands, ignore, rules, subagents};
use crate::config::ResolvedOptions;
use crate::fs;
use crate::mcp;
use crate::model::{ArtifactKind, IgnoreDocument, ToolDocument};
use crate::resolver;
use crate::source::{IgnoreCache, SourceSet};
use crate::targets::{Feature, ToolTarget};

/// One file the generator intends to write.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedFile {
    /// Absolute path.
    pub path: PathBuf,
    pub base_dir: PathBuf,
    pub tool: ToolTarget,
    pub kind: ArtifactKind,
    pub content: String,
}

/// Every rendered output of one run, in write order.
#[derive(Debug, Default)]
pub struct Plan {
    pub files: Vec<PlannedFile>,
    index: HashMap<PathBuf, usize>,
    /// Tools that produced nothing, per base dir.
    pub skipped: Vec<(PathBuf, ToolTarget)>,
    /// Failures while rendering, already logged.
    pub errors: Vec<anyhow::Error>,
}

impl Plan {
    /// Current planned content of `path`, if something was rendered for it.
    pub fn content(&self, path: &Path) -> Option<&str> {
        self.index
            .get(path)
            .map(|&i| self.files[i].content.as_str())
    }

    /// Add a file; a later file for the same path replaces the earlier one.
    fn add(&mut self, file: PlannedFile) {
        if let Some(&i) = self.index.get(&file.path) {
            let previous = &self.files[i];
            if previous.tool != file.tool {
                tracing::debug!(
                    path = %file.path.display(),
                    previous = %previous.tool,
                    tool = %file.tool,
                    "shared output path, later tool wins"
                );
            }
            self.files[i] = file;
        } else {
            self.index.insert(file.path.clone(), self.files.len());
            self.files.push(file);
        }
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// Result of a generation run
#[derive(Debug, Default)]
pub struct GenerateResult {
    pub written: usize,
    pub unchanged: usize,
    pub skipped: usize,
    pub deleted: usize,
    pub errors: usize,
}

impl GenerateResult {
    pub fn is_success(&self) -> bool {
        self.errors == 0
    }
}

pub struct Generator<'a> {
    options: &'a ResolvedOptions,
    sources: &'a SourceSet,
}

impl<'a> Generator<'a> {
    pub fn new(options: &'a ResolvedOptions, sources: &'a SourceSet) -> Self {
        Self { options, sources }
    }

    /// Render every output in memory.
    pub fn plan(&self) -> Result<Plan> {
        let mut plan = Plan::default();
        let mut ignore_cache = IgnoreCache::new();
        ignore_cache.insert(&self.options.project_root, self.sources.ignore.clone());

        for base_dir in &self.options.base_dirs {
            let ignore_doc = ignore_cache.resolve(base_dir, &self.options.project_root)?;

            for &tool in &self.options.targets {
                let mut produced = 0usize;

                for &feature in &self.options.features {
                    match self.render(&plan, base_dir, tool, feature, ignore_doc.as_ref()) {
                        Ok(docs) => {
                            for doc in docs {
                                match planned_file(base_dir, doc) {
                                    Ok(file) => {
                                        produced += 1;
                                        plan.add(file);
                                    }
                                    Err(e) => {
                                        tracing::error!(tool = %tool, feature = %feature, error = %e, "failed to render output");
                                        plan.errors.push(e);
                                    }
                                }
                            }
                        }
                        Err(e) => {
                            tracing::error!(tool = %tool, feature = %feature, error = %e, "failed to generate");
                            plan.errors.push(e);
                        }
                    }
                }

                if produced == 0 {
                    tracing::warn!(tool = %tool, base_dir = %base_dir.display(), "no artifacts to generate for tool");
                    plan.skipped.push((base_dir.clone(), tool));
                }
            }
        }

        tracing::debug!(files = plan.len(), cached_ignore_dirs = ignore_cache.len(), "generation planned");
        Ok(plan)
    }

    fn existing_content(plan: &Plan, path: &Path) -> Result<Option<String>> {
        match plan.content(path) {
            Some(content) => Ok(Some(content.to_string())),
            None => fs::read_text_if_exists(path),
        }
    }

    /// Tool documents for one (tool, feature) pair.
    fn render(
        &self,
        plan: &Plan,
        base_dir: &Path,
        tool: ToolTarget,
        feature: Feature,
        ignore_doc: Option<&IgnoreDocument>,
    ) -> Result<Vec<ToolDocument>> {
        let requested = &self.options.targets;

        let docs = match feature {
            Feature::Rules => {
                let selected = resolver::select(&self.sources.rules, tool, requested);
                if selected.is_empty() {
                    return Ok(Vec::new());
                }
                rules::generate(&rules::rule_adapter(tool), &selected)
            }
            Feature::Commands => {
                let Some(spec) = commands::command_adapter(tool) else {
                    return Ok(Vec::new());
                };
                commands::generate(&spec, &resolver::select(&self.sources.commands, tool, requested))
            }
            Feature::Subagents => {
                let Some(spec) = subagents::subagent_adapter(tool) else {
                    return Ok(Vec::new());
                };
                subagents::generate(&spec, &resolver::select(&self.sources.subagents, tool, requested))
            }
            Feature::Ignore => {
                let Some(output) = ignore::ignore_output(tool) else {
                    return Ok(Vec::new());
                };
                if let Some(doc) = ignore_doc
                    && !resolver::include(&doc.relative_file_path, &doc.frontmatter.targets, tool, requested)
                {
                    return Ok(Vec::new());
                }
                let existing = Self::existing_content(plan, &base_dir.join(output.path()))?;
                let rule_bodies: Vec<&str> = resolver::select(&self.sources.rules, tool, requested)
                    .into_iter()
                    .map(|r| r.body.as_str())
                    .collect();
                ignore::generate(tool, ignore_doc, &rule_bodies, existing.as_deref())?
                    .into_iter()
                    .collect()
            }
            Feature::Mcp => {
                let Some(path) = mcp::config_path(tool) else {
                    return Ok(Vec::new());
                };
                let existing = Self::existing_content(plan, &base_dir.join(path))?;
                let content = mcp::render_for_tool(
                    &self.sources.mcp,
                    tool,
                    existing.as_deref(),
                    self.options.mcp_merge_strategy,
                )?;
                content
                    .map(|content| raw_document(tool, ArtifactKind::Mcp, path, content))
                    .into_iter()
                    .collect()
            }
        };
        Ok(docs)
    }

    /// Remove every conventional rule, command and subagent output of the
    /// selected tools. Shared settings files are never removed.
    pub fn delete_outputs(&self) -> Result<usize> {
        let mut deleted = 0;
        for base_dir in &self.options.base_dirs {
            for &tool in &self.options.targets {
                for path in deletable_paths(tool, &self.options.features) {
                    if fs::remove_path(base_dir, Path::new(path))? {
                        tracing::debug!(tool = %tool, path = %path, "deleted previous output");
                        deleted += 1;
                    }
                }
            }
        }
        Ok(deleted)
    }

    /// Plan, optionally delete, then write.
    pub fn run(&self) -> Result<GenerateResult> {
        let plan = self.plan()?;
        let mut result = GenerateResult {
            skipped: plan.skipped.len(),
            errors: plan.errors.len(),
            ..Default::default()
        };

        if self.options.delete {
            result.deleted = self.delete_outputs()?;
        }

        for file in &plan.files {
            match write_if_changed(file) {
                Ok(true) => {
                    result.written += 1;
                    tracing::debug!(path = %file.path.display(), "wrote");
                }
                Ok(false) => result.unchanged += 1,
                Err(e) => {
                    tracing::error!(path = %file.path.display(), error = %e, "failed to write output");
                    result.errors += 1;
                }
            }
        }

        Ok(result)
    }
}

fn raw_document(tool: ToolTarget, kind: ArtifactKind, path: &str, content: String) -> ToolDocument {
    let (dir, file) = crate::adapters::split_path(path);
    let mut doc = ToolDocument::new(tool, kind, dir, file);
    doc.format = crate::model::FileFormat::Raw;
    doc.body = content;
    doc
}

fn planned_file(base_dir: &Path, doc: ToolDocument) -> Result<PlannedFile> {
    doc.validate()?;
    let content = doc
        .render()
        .with_context(|| format!("Failed to render {}", doc.relative_path().display()))?;
    Ok(PlannedFile {
        path: doc.file_path(base_dir),
        base_dir: base_dir.to_path_buf(),
        tool: doc.tool,
        kind: doc.kind,
        content,
    })
}

fn write_if_changed(file: &PlannedFile) -> Result<bool> {
    if fs::read_text_if_exists(&file.path)?.as_deref() == Some(file.content.as_str()) {
        return Ok(false);
    }
    fs::write_text(&file.path, &file.content)?;
    Ok(true)
}

/// Conventional outputs `--delete` may remove for `tool`.
pub fn deletable_paths(tool: ToolTarget, features: &[Feature]) -> Vec<&'static str> {
    let mut paths = Vec::new();
    for feature in features {
        match feature {
            Feature::Rules => {
                let spec = rules::rule_adapter(tool);
                paths.extend(spec.layout.output_paths());
                paths.extend(spec.legacy_file);
            }
            Feature::Commands => {
                if let Some(spec) = commands::command_adapter(tool) {
                    paths.extend(spec.layout.output_paths());
                }
            }
            Feature::Subagents => {
                if let Some(spec) = subagents::subagent_adapter(tool) {
                    paths.extend(spec.layout.output_paths());
                }
            }
            Feature::Ignore | Feature::Mcp => {}
        }
    }
    paths.sort();
    paths.dedup();
    paths
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mcp::{McpConfig, McpMergeStrategy, McpServer};
    use crate::model::{Document, RuleDocument, RuleFrontmatter};
    use crate::source::RULES_DIR;
    use crate::targets::TargetSpec;
    use tempfile::TempDir;

    fn options(root: &Path, tools: &[ToolTarget], features: &[Feature]) -> ResolvedOptions {
        ResolvedOptions {
            project_root: root.to_path_buf(),
            targets: tools.to_vec(),
            default_targets: tools.to_vec(),
            features: features.to_vec(),
            base_dirs: vec![root.to_path_buf()],
            delete: false,
            verbose: false,
            mcp_merge_strategy: McpMergeStrategy::Overwrite,
        }
    }

    fn rule(path: &str, root: bool, targets: TargetSpec, body: &str) -> RuleDocument {
        let mut fm = RuleFrontmatter::new(path.trim_end_matches(".md"));
        fm.root = root;
        fm.targets = targets;
        Document::new(fm, body, RULES_DIR, path)
    }

    #[test]
    fn test_plan_renders_rules_per_tool() {
        let temp_dir = TempDir::new().unwrap();
        let sources = SourceSet {
            rules: vec![rule("overview.md", true, TargetSpec::Wildcard, "Be kind.")],
            ..Default::default()
        };
        let opts = options(temp_dir.path(), &[ToolTarget::ClaudeCode, ToolTarget::Cursor], &[Feature::Rules]);
        let plan = Generator::new(&opts, &sources).plan().unwrap();

        assert!(plan.content(&temp_dir.path().join("CLAUDE.md")).unwrap().contains("Be kind."));
        assert!(plan.content(&temp_dir.path().join(".cursor/rules/overview.mdc")).is_some());
        assert!(plan.errors.is_empty());
    }

    #[test]
    fn test_tool_without_artifacts_is_skipped() {
        let temp_dir = TempDir::new().unwrap();
        let sources = SourceSet {
            rules: vec![rule("a.md", false, TargetSpec::only(ToolTarget::Cursor), "x")],
            ..Default::default()
        };
        let opts = options(temp_dir.path(), &[ToolTarget::Cursor, ToolTarget::Copilot], &[Feature::Rules]);
        let plan = Generator::new(&opts, &sources).plan().unwrap();
        assert_eq!(plan.skipped, vec![(temp_dir.path().to_path_buf(), ToolTarget::Copilot)]);
    }

    #[test]
    fn test_shared_agents_md_last_writer_wins() {
        let temp_dir = TempDir::new().unwrap();
        let sources = SourceSet {
            rules: vec![
                rule("specification-agentsmd-a.md", true, TargetSpec::Wildcard, "from agentsmd"),
                rule("specification-opencode-b.md", false, TargetSpec::Wildcard, "from opencode"),
            ],
            ..Default::default()
        };
        let opts = options(temp_dir.path(), &[ToolTarget::AgentsMd, ToolTarget::OpenCode], &[Feature::Rules]);
        let plan = Generator::new(&opts, &sources).plan().unwrap();

        let agents = plan.content(&temp_dir.path().join("AGENTS.md")).unwrap();
        assert!(agents.contains(".opencode/memories/specification-opencode-b.md"));
        assert!(!agents.contains("from agentsmd"));
    }

    #[test]
    fn test_run_writes_then_reports_unchanged() {
        let temp_dir = TempDir::new().unwrap();
        let sources = SourceSet {
            rules: vec![rule("overview.md", true, TargetSpec::Wildcard, "Root")],
            ..Default::default()
        };
        let opts = options(temp_dir.path(), &[ToolTarget::GeminiCli], &[Feature::Rules]);

        let first = Generator::new(&opts, &sources).run().unwrap();
        assert_eq!(first.written, 1);
        let second = Generator::new(&opts, &sources).run().unwrap();
        assert_eq!(second.written, 0);
        assert_eq!(second.unchanged, 1);
    }

    #[test]
    fn test_delete_removes_stale_outputs_only() {
        let temp_dir = TempDir::new().unwrap();
        fs::write_text(&temp_dir.path().join(".cursor/rules/stale.mdc"), "old").unwrap();
        fs::write_text(&temp_dir.path().join(".cursor/mcp.json"), "{}").unwrap();

        let sources = SourceSet {
            rules: vec![rule("overview.md", true, TargetSpec::Wildcard, "Root")],
            ..Default::default()
        };
        let mut opts = options(temp_dir.path(), &[ToolTarget::Cursor], &[Feature::Rules, Feature::Mcp]);
        opts.delete = true;

        let result = Generator::new(&opts, &sources).run().unwrap();
        assert!(result.deleted >= 1);
        assert!(!temp_dir.path().join(".cursor/rules/stale.mdc").exists());
        assert!(temp_dir.path().join(".cursor/rules/overview.mdc").exists());
        assert!(temp_dir.path().join(".cursor/mcp.json").exists());
    }

    #[test]
    fn test_mcp_and_ignore_share_opencode_json() {
        let temp_dir = TempDir::new().unwrap();
        let mut mcp = McpConfig::default();
        mcp.servers.insert("fs".to_string(), McpServer::stdio("npx", &["fs"]));
        let sources = SourceSet {
            mcp,
            ignore: Some(ignore::to_canonical(&["dist/".to_string()])),
            ..Default::default()
        };
        let opts = options(temp_dir.path(), &[ToolTarget::OpenCode], &[Feature::Mcp, Feature::Ignore]);

        let plan = Generator::new(&opts, &sources).plan().unwrap();
        let content = plan.content(&temp_dir.path().join("opencode.json")).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(content).unwrap();
        assert!(parsed["mcp"].get("fs").is_some());
        assert_eq!(parsed["permission"]["read"]["dist/"], "deny");
    }

    #[test]
    fn test_opencode_permissions_from_rules_alone() {
        let temp_dir = TempDir::new().unwrap();
        let body = "Be careful.\n\n```json\n{\"permission\": {\"run\": {\"rm -rf\": \"deny\"}}}\n```";
        let sources = SourceSet {
            rules: vec![rule("overview.md", true, TargetSpec::Wildcard, body)],
            ..Default::default()
        };
        let opts = options(temp_dir.path(), &[ToolTarget::OpenCode], &[Feature::Rules, Feature::Ignore]);

        let plan = Generator::new(&opts, &sources).plan().unwrap();
        let content = plan.content(&temp_dir.path().join("opencode.json")).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(content).unwrap();
        assert_eq!(parsed["permission"]["run"]["rm -rf"], "deny");
        assert_eq!(parsed["permission"]["read"][".env"], "deny");
    }

    #[test]
    fn test_deletable_paths_exclude_settings() {
        let paths = deletable_paths(ToolTarget::ClaudeCode, Feature::all());
        assert!(paths.contains(&"CLAUDE.md"));
        assert!(paths.contains(&".claude/commands"));
        assert!(!paths.contains(&".mcp.json"));
        assert!(!paths.contains(&".claude/settings.json"));
    }
}
