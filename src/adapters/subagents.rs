//! Subagent adapters.
//!
//! Only Claude Code has a native subagent format; the other tools receive a
//! titled markdown document they can be pointed at, which cannot be imported.

use anyhow::Result;
use std::path::{Path, PathBuf};

use super::{AdapterSpec, Layout, Naming, canonical_from_native, detail_path};
use crate::error::SyncError;
use crate::frontmatter;
use crate::fs;
use crate::model::{
    ArtifactKind, ClaudecodeSubagentOptions, Document, SubagentDocument, SubagentFrontmatter,
    ToolDocument,
};
use crate::source::SUBAGENTS_DIR;
use crate::targets::{TargetSpec, ToolTarget};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubagentDialect {
    /// `name`, `description`, `model`.
    Claude,
    /// `# <name>` heading, description paragraph, then the body.
    Titled,
}

pub type SubagentAdapter = AdapterSpec<SubagentDialect>;

const fn entry(tool: ToolTarget, dir: &'static str, dialect: SubagentDialect) -> SubagentAdapter {
    AdapterSpec {
        tool,
        layout: Layout::Directory {
            dir,
            ext: ".md",
            naming: Naming::Flat,
        },
        dialect,
        simulated: matches!(dialect, SubagentDialect::Titled),
        legacy_file: None,
    }
}

pub fn subagent_adapter(tool: ToolTarget) -> Option<SubagentAdapter> {
    let spec = match tool {
        ToolTarget::ClaudeCode => entry(tool, ".claude/agents", SubagentDialect::Claude),
        ToolTarget::Copilot => entry(tool, ".github/subagents", SubagentDialect::Titled),
        ToolTarget::Cursor => entry(tool, ".cursor/subagents", SubagentDialect::Titled),
        ToolTarget::CodexCli => entry(tool, ".codex/subagents", SubagentDialect::Titled),
        ToolTarget::AgentsMd => entry(tool, ".agents/subagents", SubagentDialect::Titled),
        _ => return None,
    };
    Some(spec)
}

fn directory(spec: &SubagentAdapter) -> &'static str {
    match spec.layout {
        Layout::Directory { dir, .. } => dir,
        Layout::Split { detail_dir, .. } => detail_dir,
        Layout::SingleFile { path } => path,
    }
}

pub fn from_canonical(spec: &SubagentAdapter, subagent: &SubagentDocument) -> ToolDocument {
    let fm = &subagent.frontmatter;
    let file = detail_path(&subagent.relative_file_path, Naming::Flat, ".md");

    let mut doc = ToolDocument::new(spec.tool, ArtifactKind::Subagent, directory(spec), file);
    doc.description = fm.description.clone();
    doc.name = Some(fm.name.clone());

    match spec.dialect {
        SubagentDialect::Claude => {
            doc.frontmatter.insert("name".into(), fm.name.clone().into());
            doc.frontmatter
                .insert("description".into(), fm.description.clone().into());
            if let Some(model) = fm.claudecode.as_ref().and_then(|c| c.model.clone()) {
                doc.frontmatter.insert("model".into(), model.into());
            }
            doc.body = subagent.body.clone();
        }
        SubagentDialect::Titled => {
            doc.body = format!("# {}\n\n{}\n\n{}", fm.name, fm.description, subagent.body)
                .trim()
                .to_string();
        }
    }
    doc
}

pub fn generate(spec: &SubagentAdapter, subagents: &[&SubagentDocument]) -> Vec<ToolDocument> {
    subagents.iter().map(|s| from_canonical(spec, s)).collect()
}

pub fn to_canonical(spec: &SubagentAdapter, doc: &ToolDocument) -> Result<SubagentDocument, SyncError> {
    if spec.simulated {
        return Err(SyncError::SimulatedAdapter {
            tool: spec.tool,
            kind: ArtifactKind::Subagent,
        });
    }

    let name = doc.name.clone().unwrap_or_else(|| {
        doc.relative_file_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default()
    });
    let claudecode = frontmatter::get_str(&doc.frontmatter, "model").map(|model| {
        ClaudecodeSubagentOptions {
            model: Some(model.to_string()),
        }
    });

    let fm = SubagentFrontmatter {
        targets: TargetSpec::only(spec.tool),
        name,
        description: doc.description.clone(),
        claudecode,
    };
    Ok(Document::new(
        fm,
        &doc.body,
        SUBAGENTS_DIR,
        canonical_from_native(&doc.relative_file_path, ".md"),
    ))
}

pub fn from_native_file(spec: &SubagentAdapter, base_dir: &Path, file: &Path) -> Result<ToolDocument> {
    let dir = directory(spec);
    let relative = Path::new(dir).join(file);
    let content = fs::read_text(&base_dir.join(&relative))?;
    let (mapping, body) = frontmatter::parse_mapping(&relative, &content)?;

    let mut doc = ToolDocument::new(spec.tool, ArtifactKind::Subagent, dir, file);
    doc.name = frontmatter::get_str(&mapping, "name").map(str::to_string);
    doc.description = frontmatter::get_str(&mapping, "description")
        .unwrap_or_default()
        .to_string();
    doc.frontmatter = mapping;
    doc.body = body;
    Ok(doc)
}

pub fn native_files(spec: &SubagentAdapter, base_dir: &Path) -> Result<Vec<PathBuf>> {
    let files = fs::list_files(&base_dir.join(directory(spec)), Some(".md"))?;
    Ok(files
        .into_iter()
        .filter(|f| f.components().count() == 1)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn subagent(model: Option<&str>) -> SubagentDocument {
        let fm = SubagentFrontmatter {
            targets: TargetSpec::Wildcard,
            name: "reviewer".to_string(),
            description: "Reviews diffs".to_string(),
            claudecode: model.map(|m| ClaudecodeSubagentOptions {
                model: Some(m.to_string()),
            }),
        };
        Document::new(fm, "Be thorough.", SUBAGENTS_DIR, "reviewer.md")
    }

    #[test]
    fn test_claude_subagent_frontmatter() {
        let spec = subagent_adapter(ToolTarget::ClaudeCode).unwrap();
        let doc = from_canonical(&spec, &subagent(Some("sonnet")));
        assert_eq!(doc.relative_path(), PathBuf::from(".claude/agents/reviewer.md"));
        assert_eq!(frontmatter::get_str(&doc.frontmatter, "model"), Some("sonnet"));

        let back = to_canonical(&spec, &doc).unwrap();
        assert_eq!(back.frontmatter.name, "reviewer");
        assert_eq!(back.description(), "Reviews diffs");
        assert_eq!(back.body, "Be thorough.");
        assert_eq!(
            back.frontmatter.claudecode.unwrap().model.as_deref(),
            Some("sonnet")
        );
    }

    #[test]
    fn test_titled_subagent_is_simulated() {
        let spec = subagent_adapter(ToolTarget::Cursor).unwrap();
        let doc = from_canonical(&spec, &subagent(None));
        assert_eq!(doc.body, "# reviewer\n\nReviews diffs\n\nBe thorough.");
        assert!(doc.frontmatter.is_empty());
        assert!(to_canonical(&spec, &doc).is_err());
    }

    #[test]
    fn test_no_adapter_for_rules_only_tools() {
        assert!(subagent_adapter(ToolTarget::Kiro).is_none());
    }

    #[test]
    fn test_from_native_file() {
        let temp_dir = TempDir::new().unwrap();
        fs::write_text(
            &temp_dir.path().join(".claude/agents/planner.md"),
            "---\nname: planner\ndescription: Plans work\n---\nPlan first.\n",
        )
        .unwrap();

        let spec = subagent_adapter(ToolTarget::ClaudeCode).unwrap();
        let files = native_files(&spec, temp_dir.path()).unwrap();
        let doc = from_native_file(&spec, temp_dir.path(), &files[0]).unwrap();
        let canonical = to_canonical(&spec, &doc).unwrap();
        assert_eq!(canonical.frontmatter.name, "planner");
        assert_eq!(canonical.body, "Plan first.");
        assert!(canonical.frontmatter.claudecode.is_none());
    }
}
