//! Tool files back to canonical sources.
//!
//! Import walks every requested (tool, feature) pair and is tolerant of partial
//! failure: a malformed file is reported and skipped, a missing anchor file
//! aborts only that tool's rules, and whatever converted cleanly is written.

use anyhow::{Result, bail};
use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::adapters::{commands, ignore, rules, subagents};
use crate::error::SyncError;
use crate::mcp::{self, McpConfig};
use crate::model::{Document, IgnoreDocument, RuleDocument};
use crate::source::{self, IgnoreCache};
use crate::targets::{Feature, ToolTarget};

/// Result of an import run
#[derive(Debug, Default)]
pub struct ImportResult {
    pub imported: usize,
    pub errors: usize,
    /// Canonical files written, absolute.
    pub files: Vec<PathBuf>,
}

impl ImportResult {
    fn record(&mut self, path: PathBuf) {
        self.imported += 1;
        if !self.files.contains(&path) {
            self.files.push(path);
        }
    }

    fn fail(&mut self, tool: ToolTarget, feature: Feature, error: &anyhow::Error) {
        tracing::error!(tool = %tool, feature = %feature, error = %error, "import failed");
        self.errors += 1;
    }
}

pub struct Importer<'a> {
    project_root: &'a Path,
    base_dir: &'a Path,
    /// Canonical path of the root rule, existing or imported.
    root_rule: Option<PathBuf>,
    ignore_cache: IgnoreCache,
}

impl<'a> Importer<'a> {
    /// Import from tool files under `base_dir` into sources under `project_root`.
    pub fn new(project_root: &'a Path, base_dir: &'a Path) -> Self {
        Self {
            project_root,
            base_dir,
            root_rule: None,
            ignore_cache: IgnoreCache::new(),
        }
    }

    pub fn run(&mut self, tools: &[ToolTarget], features: &[Feature]) -> Result<ImportResult> {
        if tools.is_empty() {
            bail!("import needs at least one tool (use --targets)");
        }

        if features.contains(&Feature::Rules) && self.root_rule.is_none() {
            self.root_rule = source::load_rules(self.project_root)?
                .into_iter()
                .find(|rule| rule.frontmatter.root)
                .map(|rule| rule.relative_path());
        }

        let mut result = ImportResult::default();
        for &tool in tools {
            for &feature in features {
                let outcome = match feature {
                    Feature::Rules => self.import_rules(tool, &mut result),
                    Feature::Commands => self.import_commands(tool, &mut result),
                    Feature::Subagents => self.import_subagents(tool, &mut result),
                    Feature::Ignore => self.import_ignore(tool, &mut result),
                    Feature::Mcp => self.import_mcp(tool, &mut result),
                };
                if let Err(e) = outcome {
                    result.fail(tool, feature, &e);
                }
            }
        }

        tracing::debug!(imported = result.imported, errors = result.errors, "import finished");
        Ok(result)
    }

    fn import_rules(&mut self, tool: ToolTarget, result: &mut ImportResult) -> Result<()> {
        let spec = rules::rule_adapter(tool);
        let scan = match rules::scan_native(&spec, self.base_dir) {
            Ok(scan) => scan,
            Err(e) if matches!(e.downcast_ref::<SyncError>(), Some(SyncError::MissingAnchor { .. })) => {
                tracing::warn!(tool = %tool, error = %e, "skipping rules import");
                result.errors += 1;
                return Ok(());
            }
            Err(e) => return Err(e),
        };

        for error in &scan.errors {
            result.fail(tool, Feature::Rules, error);
        }

        for doc in &scan.docs {
            let rule = rules::to_canonical(&spec, doc)?;
            if self.is_taken(tool, Feature::Rules, &rule, result) {
                continue;
            }
            if rule.frontmatter.root && !self.claim_root(tool, &rule, result) {
                continue;
            }
            result.record(source::write_document(self.project_root, &rule)?);
        }
        Ok(())
    }

    /// The project keeps one root rule; an imported root that would be a
    /// second one is reported and skipped.
    fn claim_root(&mut self, tool: ToolTarget, rule: &RuleDocument, result: &mut ImportResult) -> bool {
        if let Some(path) = &self.root_rule {
            let err = SyncError::DuplicateRoot(vec![path.clone(), rule.relative_path()]);
            result.fail(tool, Feature::Rules, &anyhow::Error::new(err));
            return false;
        }
        self.root_rule = Some(rule.relative_path());
        true
    }

    /// Existing canonical files are never replaced by an import.
    fn is_taken<F>(
        &self,
        tool: ToolTarget,
        feature: Feature,
        doc: &Document<F>,
        result: &mut ImportResult,
    ) -> bool {
        if !doc.path(self.project_root).exists() {
            return false;
        }
        let err = SyncError::AlreadyExists(doc.relative_path());
        result.fail(tool, feature, &anyhow::Error::new(err));
        true
    }

    fn write_new<F: Serialize>(
        &self,
        tool: ToolTarget,
        feature: Feature,
        doc: &Document<F>,
        result: &mut ImportResult,
    ) -> Result<()> {
        if !self.is_taken(tool, feature, doc, result) {
            result.record(source::write_document(self.project_root, doc)?);
        }
        Ok(())
    }

    fn import_commands(&mut self, tool: ToolTarget, result: &mut ImportResult) -> Result<()> {
        let Some(spec) = commands::command_adapter(tool) else {
            return Ok(());
        };
        if spec.simulated {
            tracing::warn!(tool = %tool, "command files are generated only, not importing");
            return Ok(());
        }

        for file in commands::native_files(&spec, self.base_dir)? {
            let imported = commands::from_native_file(&spec, self.base_dir, &file)
                .and_then(|doc| Ok(commands::to_canonical(&spec, &doc)?));
            match imported {
                Ok(command) => self.write_new(tool, Feature::Commands, &command, result)?,
                Err(e) => result.fail(tool, Feature::Commands, &e),
            }
        }
        Ok(())
    }

    fn import_subagents(&mut self, tool: ToolTarget, result: &mut ImportResult) -> Result<()> {
        let Some(spec) = subagents::subagent_adapter(tool) else {
            return Ok(());
        };
        if spec.simulated {
            tracing::warn!(tool = %tool, "subagent files are generated only, not importing");
            return Ok(());
        }

        for file in subagents::native_files(&spec, self.base_dir)? {
            let imported = subagents::from_native_file(&spec, self.base_dir, &file)
                .and_then(|doc| Ok(subagents::to_canonical(&spec, &doc)?));
            match imported {
                Ok(subagent) => self.write_new(tool, Feature::Subagents, &subagent, result)?,
                Err(e) => result.fail(tool, Feature::Subagents, &e),
            }
        }
        Ok(())
    }

    /// Union the tool's patterns into `.rulesyncignore`.
    fn import_ignore(&mut self, tool: ToolTarget, result: &mut ImportResult) -> Result<()> {
        let Some(patterns) = ignore::read_native(tool, self.base_dir)? else {
            return Ok(());
        };
        if patterns.is_empty() {
            return Ok(());
        }

        let mut merged = self
            .ignore_cache
            .get(self.project_root)?
            .map(IgnoreDocument::patterns)
            .unwrap_or_default();
        for pattern in patterns {
            if !merged.contains(&pattern) {
                merged.push(pattern);
            }
        }

        let doc = ignore::to_canonical(&merged);
        let path = source::write_ignore(self.project_root, &doc)?;
        self.ignore_cache.insert(self.project_root, Some(doc));
        result.record(path);
        Ok(())
    }

    /// Merge the tool's servers over the canonical ones.
    fn import_mcp(&mut self, tool: ToolTarget, result: &mut ImportResult) -> Result<()> {
        let servers = mcp::import_from_tool(tool, self.base_dir)?;
        if servers.is_empty() {
            return Ok(());
        }

        let mut config = McpConfig::load_canonical(self.project_root)?;
        let count = servers.len();
        config.merge_from(servers);
        let path = config.write_canonical(self.project_root)?;
        tracing::debug!(tool = %tool, servers = count, "imported MCP servers");
        result.record(path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs;
    use crate::source::{RULES_DIR, load_sources};
    use crate::targets::TargetSpec;
    use tempfile::TempDir;

    #[test]
    fn test_import_requires_a_tool() {
        let temp_dir = TempDir::new().unwrap();
        let mut importer = Importer::new(temp_dir.path(), temp_dir.path());
        assert!(importer.run(&[], Feature::all()).is_err());
    }

    #[test]
    fn test_import_claude_rules_and_commands() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::write_text(&root.join("CLAUDE.md"), "# Project\n\nUse TypeScript.\n").unwrap();
        fs::write_text(
            &root.join(".claude/commands/review.md"),
            "---\ndescription: Review code\n---\nReview $ARGUMENTS\n",
        )
        .unwrap();

        let result = Importer::new(root, root)
            .run(&[ToolTarget::ClaudeCode], &[Feature::Rules, Feature::Commands])
            .unwrap();
        assert_eq!(result.imported, 2);
        assert_eq!(result.errors, 0);

        let sources = load_sources(root).unwrap();
        assert_eq!(sources.rules.len(), 1);
        assert!(sources.rules[0].frontmatter.root);
        assert_eq!(sources.rules[0].frontmatter.targets, TargetSpec::only(ToolTarget::ClaudeCode));
        assert_eq!(sources.commands[0].description(), "Review code");
    }

    #[test]
    fn test_missing_anchor_aborts_only_that_tool() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::write_text(&root.join("GEMINI.md"), "Gemini rules\n").unwrap();

        let result = Importer::new(root, root)
            .run(&[ToolTarget::ClaudeCode, ToolTarget::GeminiCli], &[Feature::Rules])
            .unwrap();
        assert_eq!(result.errors, 1);
        assert_eq!(result.imported, 1);
        assert!(root.join(RULES_DIR).join("overview.md").exists());
    }

    #[test]
    fn test_duplicate_root_is_skipped() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::write_text(&root.join("CLAUDE.md"), "Claude root\n").unwrap();
        fs::write_text(&root.join("GEMINI.md"), "Gemini root\n").unwrap();

        let result = Importer::new(root, root)
            .run(&[ToolTarget::ClaudeCode, ToolTarget::GeminiCli], &[Feature::Rules])
            .unwrap();
        assert_eq!(result.imported, 1);

        let overview = fs::read_text(&root.join(RULES_DIR).join("overview.md")).unwrap();
        assert!(overview.contains("Claude root"));
    }

    #[test]
    fn test_existing_root_rule_blocks_imported_root() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::write_text(
            &root.join(RULES_DIR).join("main.md"),
            "---\nroot: true\ndescription: Main\n---\nMain rules\n",
        )
        .unwrap();
        fs::write_text(&root.join("CLAUDE.md"), "Claude root\n").unwrap();

        let result = Importer::new(root, root)
            .run(&[ToolTarget::ClaudeCode], &[Feature::Rules])
            .unwrap();
        assert_eq!(result.imported, 0);
        assert_eq!(result.errors, 1);
        assert!(!root.join(RULES_DIR).join("overview.md").exists());

        let sources = load_sources(root).unwrap();
        assert_eq!(sources.rules.len(), 1);
        assert_eq!(sources.rules[0].body, "Main rules");
    }

    #[test]
    fn test_import_never_replaces_canonical_files() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        let overview = "---\nroot: true\ndescription: Overview\n---\nHand-written rules\n";
        fs::write_text(&root.join(RULES_DIR).join("overview.md"), overview).unwrap();
        fs::write_text(
            &root.join(".cursor/rules/overview.mdc"),
            "---\ndescription: From cursor\nalwaysApply: true\n---\nCursor text\n",
        )
        .unwrap();
        fs::write_text(
            &root.join(".cursor/rules/style.mdc"),
            "---\ndescription: Style\n---\nStyle text\n",
        )
        .unwrap();

        let result = Importer::new(root, root)
            .run(&[ToolTarget::Cursor], &[Feature::Rules])
            .unwrap();
        assert_eq!(result.imported, 1);
        assert_eq!(result.errors, 1);

        assert_eq!(fs::read_text(&root.join(RULES_DIR).join("overview.md")).unwrap(), overview);
        assert!(root.join(RULES_DIR).join("style.md").exists());
    }

    #[test]
    fn test_import_ignore_unions_patterns() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::write_text(&root.join(".cursorignore"), "dist/\n").unwrap();
        fs::write_text(&root.join(".rooignore"), "dist/\n*.log\n").unwrap();

        Importer::new(root, root)
            .run(&[ToolTarget::Cursor, ToolTarget::Roo], &[Feature::Ignore])
            .unwrap();

        let content = fs::read_text(&root.join(".rulesyncignore")).unwrap();
        assert_eq!(content, "dist/\n*.log\n");
    }

    #[test]
    fn test_import_mcp_merges_over_existing() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::write_text(
            &root.join(".rulesync/.mcp.json"),
            r#"{"mcpServers": {"keep": {"command": "keep"}}}"#,
        )
        .unwrap();
        fs::write_text(
            &root.join(".cursor/mcp.json"),
            r#"{"mcpServers": {"new": {"command": "npx", "args": ["new"]}}}"#,
        )
        .unwrap();

        Importer::new(root, root)
            .run(&[ToolTarget::Cursor], &[Feature::Mcp])
            .unwrap();

        let config = McpConfig::load_canonical(root).unwrap();
        assert!(config.servers.contains_key("keep"));
        assert_eq!(config.servers["new"].args, vec!["new"]);
        assert_eq!(config.servers["new"].targets, Some(TargetSpec::only(ToolTarget::Cursor)));
    }
}
