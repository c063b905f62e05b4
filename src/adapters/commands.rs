//! Command adapters: canonical slash-commands to and from tool command files.

use anyhow::Result;
use std::path::{Path, PathBuf};

use super::{AdapterSpec, Layout, Naming, canonical_from_native, detail_path};
use crate::error::SyncError;
use crate::frontmatter;
use crate::fs;
use crate::model::{ArtifactKind, CommandDocument, CommandFrontmatter, Document, FileFormat, ToolDocument};
use crate::source::COMMANDS_DIR;
use crate::targets::{TargetSpec, ToolTarget};

/// Canonical argument placeholder.
pub const ARGUMENTS_PLACEHOLDER: &str = "$ARGUMENTS";

/// Argument placeholder used by TOML command files.
pub const TOML_ARGS_PLACEHOLDER: &str = "{{args}}";

/// Frontmatter dialect of a tool's command files.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandDialect {
    /// Body only.
    Plain,
    /// `description`.
    Description,
    /// TOML file with `description` and `prompt`.
    Toml,
    /// `description`, `argument-hint`.
    Roo,
    /// `mode: agent`, `description`.
    CopilotPrompt,
}

pub type CommandAdapter = AdapterSpec<CommandDialect>;

const fn entry(
    tool: ToolTarget,
    dir: &'static str,
    ext: &'static str,
    naming: Naming,
    dialect: CommandDialect,
    simulated: bool,
) -> CommandAdapter {
    AdapterSpec {
        tool,
        layout: Layout::Directory { dir, ext, naming },
        dialect,
        simulated,
        legacy_file: None,
    }
}

/// The command adapter for `tool`, or `None` when the tool has no commands.
pub fn command_adapter(tool: ToolTarget) -> Option<CommandAdapter> {
    use CommandDialect as D;
    use Naming::{Flat, Hierarchical};

    let spec = match tool {
        ToolTarget::ClaudeCode => entry(tool, ".claude/commands", ".md", Hierarchical, D::Description, false),
        ToolTarget::GeminiCli => entry(tool, ".gemini/commands", ".toml", Hierarchical, D::Toml, false),
        ToolTarget::QwenCode => entry(tool, ".qwen/commands", ".toml", Hierarchical, D::Toml, false),
        ToolTarget::Roo => entry(tool, ".roo/commands", ".md", Flat, D::Roo, false),
        ToolTarget::Copilot => {
            entry(tool, ".github/prompts", ".prompt.md", Flat, D::CopilotPrompt, false)
        }
        ToolTarget::OpenCode => entry(tool, ".opencode/command", ".md", Flat, D::Description, false),
        ToolTarget::Cursor => entry(tool, ".cursor/commands", ".md", Flat, D::Plain, true),
        ToolTarget::CodexCli => entry(tool, ".codex/prompts", ".md", Flat, D::Plain, true),
        ToolTarget::Cline => entry(tool, ".clinerules/workflows", ".md", Flat, D::Plain, true),
        ToolTarget::AgentsMd => entry(tool, ".agents/commands", ".md", Flat, D::Plain, true),
        ToolTarget::AmazonQCli
        | ToolTarget::AugmentCode
        | ToolTarget::AugmentCodeLegacy
        | ToolTarget::Junie
        | ToolTarget::Kiro
        | ToolTarget::Windsurf => return None,
    };
    Some(spec)
}

fn layout_parts(spec: &CommandAdapter) -> (&'static str, &'static str, Naming) {
    match spec.layout {
        Layout::Directory { dir, ext, naming } => (dir, ext, naming),
        Layout::Split {
            detail_dir,
            ext,
            naming,
            ..
        } => (detail_dir, ext, naming),
        Layout::SingleFile { path } => (path, "", Naming::Flat),
    }
}

/// Convert one canonical command into the tool's document. Pure.
pub fn from_canonical(spec: &CommandAdapter, command: &CommandDocument) -> ToolDocument {
    let (dir, ext, naming) = layout_parts(spec);
    let file = detail_path(&command.relative_file_path, naming, ext);
    let description = command.frontmatter.description.clone();

    let mut doc = ToolDocument::new(spec.tool, ArtifactKind::Command, dir, file);
    doc.description = description.clone();
    doc.body = command.body.clone();

    let fm = &mut doc.frontmatter;
    match spec.dialect {
        CommandDialect::Plain => {}
        CommandDialect::Description | CommandDialect::Roo => {
            fm.insert("description".into(), description.into());
        }
        CommandDialect::CopilotPrompt => {
            fm.insert("mode".into(), "agent".into());
            fm.insert("description".into(), description.into());
        }
        CommandDialect::Toml => {
            fm.insert("description".into(), description.into());
            doc.format = FileFormat::Toml;
            doc.body = command.body.replace(ARGUMENTS_PLACEHOLDER, TOML_ARGS_PLACEHOLDER);
        }
    }
    doc
}

/// Produce every output document for `commands` (already selected for this tool).
pub fn generate(spec: &CommandAdapter, commands: &[&CommandDocument]) -> Vec<ToolDocument> {
    commands.iter().map(|c| from_canonical(spec, c)).collect()
}

/// Convert a tool command back into a canonical command.
///
/// Always fails for simulated adapters.
pub fn to_canonical(spec: &CommandAdapter, doc: &ToolDocument) -> Result<CommandDocument, SyncError> {
    if spec.simulated {
        return Err(SyncError::SimulatedAdapter {
            tool: spec.tool,
            kind: ArtifactKind::Command,
        });
    }

    let (_, ext, _) = layout_parts(spec);
    let body = if spec.dialect == CommandDialect::Toml {
        doc.body.replace(TOML_ARGS_PLACEHOLDER, ARGUMENTS_PLACEHOLDER)
    } else {
        doc.body.clone()
    };
    let fm = CommandFrontmatter {
        targets: TargetSpec::only(spec.tool),
        description: doc.description.clone(),
    };

    Ok(Document::new(
        fm,
        body,
        COMMANDS_DIR,
        canonical_from_native(&doc.relative_file_path, ext),
    ))
}

/// Parse one native command file. `file` is relative to the command directory.
pub fn from_native_file(spec: &CommandAdapter, base_dir: &Path, file: &Path) -> Result<ToolDocument> {
    let (dir, _, _) = layout_parts(spec);
    let relative = Path::new(dir).join(file);
    let content = fs::read_text(&base_dir.join(&relative))?;

    let mut doc = ToolDocument::new(spec.tool, ArtifactKind::Command, dir, file);
    if spec.dialect == CommandDialect::Toml {
        let (description, prompt) = ToolDocument::parse_toml_command(&relative, &content)?;
        doc.format = FileFormat::Toml;
        doc.description = description.clone().unwrap_or_default();
        if let Some(description) = description {
            doc.frontmatter.insert("description".into(), description.into());
        }
        doc.body = prompt;
    } else {
        let (mapping, body) = frontmatter::parse_mapping(&relative, &content)?;
        doc.description = frontmatter::get_str(&mapping, "description")
            .unwrap_or_default()
            .to_string();
        doc.frontmatter = mapping;
        doc.body = body;
    }
    Ok(doc)
}

/// Every native command file of one tool. A missing directory yields nothing.
pub fn native_files(spec: &CommandAdapter, base_dir: &Path) -> Result<Vec<PathBuf>> {
    let (dir, ext, naming) = layout_parts(spec);
    let files = fs::list_files(&base_dir.join(dir), Some(ext))?;
    Ok(match naming {
        Naming::Hierarchical => files,
        Naming::Flat => files
            .into_iter()
            .filter(|f| f.components().count() == 1)
            .collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn command(path: &str, description: &str, body: &str) -> CommandDocument {
        let fm = CommandFrontmatter {
            targets: TargetSpec::Wildcard,
            description: description.to_string(),
        };
        Document::new(fm, body, COMMANDS_DIR, path)
    }

    #[test]
    fn test_unsupported_tools_have_no_adapter() {
        assert!(command_adapter(ToolTarget::Kiro).is_none());
        assert!(command_adapter(ToolTarget::Windsurf).is_none());
        assert!(command_adapter(ToolTarget::ClaudeCode).is_some());
    }

    #[test]
    fn test_claude_commands_are_hierarchical() {
        let spec = command_adapter(ToolTarget::ClaudeCode).unwrap();
        let doc = from_canonical(&spec, &command("git/commit.md", "Commit", "Do it"));
        assert_eq!(doc.relative_path(), PathBuf::from(".claude/commands/git/commit.md"));
        assert_eq!(doc.render().unwrap(), "---\ndescription: Commit\n---\n\nDo it\n");
    }

    #[test]
    fn test_roo_commands_are_flat() {
        let spec = command_adapter(ToolTarget::Roo).unwrap();
        let doc = from_canonical(&spec, &command("git/commit.md", "Commit", "Do it"));
        assert_eq!(doc.relative_path(), PathBuf::from(".roo/commands/git-commit.md"));
    }

    #[test]
    fn test_copilot_prompt_mode() {
        let spec = command_adapter(ToolTarget::Copilot).unwrap();
        let doc = from_canonical(&spec, &command("review.md", "Review", "Review it"));
        assert_eq!(doc.relative_path(), PathBuf::from(".github/prompts/review.prompt.md"));
        assert_eq!(frontmatter::get_str(&doc.frontmatter, "mode"), Some("agent"));
    }

    #[test]
    fn test_gemini_toml_swaps_placeholder() {
        let spec = command_adapter(ToolTarget::GeminiCli).unwrap();
        let doc = from_canonical(&spec, &command("review.md", "Review", "Review $ARGUMENTS"));
        assert_eq!(doc.relative_path(), PathBuf::from(".gemini/commands/review.toml"));

        let rendered = doc.render().unwrap();
        assert!(rendered.contains("{{args}}"));
        assert!(!rendered.contains("$ARGUMENTS"));

        let back = to_canonical(&spec, &doc).unwrap();
        assert_eq!(back.body, "Review $ARGUMENTS");
        assert_eq!(back.relative_file_path, PathBuf::from("review.md"));
    }

    #[test]
    fn test_simulated_adapters_refuse_import() {
        for tool in [ToolTarget::Cursor, ToolTarget::CodexCli, ToolTarget::Cline, ToolTarget::AgentsMd] {
            let spec = command_adapter(tool).unwrap();
            assert!(spec.simulated);
            let doc = from_canonical(&spec, &command("a.md", "A", "body"));
            assert!(doc.frontmatter.is_empty());
            assert!(matches!(
                to_canonical(&spec, &doc),
                Err(SyncError::SimulatedAdapter { .. })
            ));
        }
    }

    #[test]
    fn test_round_trip_native_adapters() {
        let source = command("git/commit.md", "Commit changes", "Write a commit for $ARGUMENTS");
        for tool in ToolTarget::all() {
            let Some(spec) = command_adapter(*tool) else {
                continue;
            };
            if spec.simulated {
                continue;
            }
            let back = to_canonical(&spec, &from_canonical(&spec, &source)).unwrap();
            assert_eq!(back.description(), "Commit changes", "{}", tool);
            assert_eq!(back.body, source.body, "{}", tool);
        }
    }

    #[test]
    fn test_from_native_file_toml() {
        let temp_dir = TempDir::new().unwrap();
        fs::write_text(
            &temp_dir.path().join(".qwen/commands/fix.toml"),
            "description = \"Fix\"\nprompt = \"Fix {{args}}\"\n",
        )
        .unwrap();

        let spec = command_adapter(ToolTarget::QwenCode).unwrap();
        let files = native_files(&spec, temp_dir.path()).unwrap();
        assert_eq!(files, vec![PathBuf::from("fix.toml")]);

        let doc = from_native_file(&spec, temp_dir.path(), &files[0]).unwrap();
        assert_eq!(doc.description, "Fix");
        let canonical = to_canonical(&spec, &doc).unwrap();
        assert_eq!(canonical.body, "Fix $ARGUMENTS");
    }
}
