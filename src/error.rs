//! Domain errors that callers need to tell apart.
//!
//! Most of the crate propagates `anyhow::Error`; these variants ride inside it
//! and can be recovered with `downcast_ref` when the category matters (exit
//! codes, partial-failure bookkeeping).

use std::path::PathBuf;
use thiserror::Error;

use crate::model::ArtifactKind;
use crate::targets::ToolTarget;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("{}: invalid frontmatter: {message}", path.display())]
    InvalidFrontmatter { path: PathBuf, message: String },

    #[error("{}: missing `---` frontmatter block", path.display())]
    MissingFrontmatter { path: PathBuf },

    #[error("unknown target `{0}`")]
    UnknownTarget(String),

    #[error("unknown feature `{0}` (expected one of: rules, commands, mcp, ignore, subagents, *)")]
    UnknownFeature(String),

    #[error("multiple root rules found, only one rule may set `root: true`: {}", join_paths(.0))]
    DuplicateRoot(Vec<PathBuf>),

    #[error("duplicate {kind} source path: {}", path.display())]
    DuplicatePath { kind: ArtifactKind, path: PathBuf },

    #[error("{tool} {kind} files cannot be converted back to rulesync sources (simulated output)")]
    SimulatedAdapter { tool: ToolTarget, kind: ArtifactKind },

    #[error("{tool}: required file not found: {}", path.display())]
    MissingAnchor { tool: ToolTarget, path: PathBuf },

    #[error("{}: invalid MCP config: {message}", path.display())]
    InvalidMcpConfig { path: PathBuf, message: String },

    #[error("MCP server `{name}`: {message}")]
    InvalidMcpServer { name: String, message: String },

    #[error("{} already exists", .0.display())]
    AlreadyExists(PathBuf),

    #[error("refusing to delete protected path: {}", .0.display())]
    DangerousDelete(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

fn join_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

impl SyncError {
    /// Whether this error describes invalid user input rather than an I/O fault.
    pub fn is_validation(&self) -> bool {
        !matches!(self, SyncError::Io(_) | SyncError::AlreadyExists(_))
    }
}

/// Every problem found while loading a source tree, reported together.
#[derive(Debug, Error)]
#[error("{} problem(s) found in rulesync sources:\n{}", .0.len(), list_errors(.0))]
pub struct ValidationErrors(pub Vec<SyncError>);

fn list_errors(errors: &[SyncError]) -> String {
    errors
        .iter()
        .map(|e| format!("  - {}", e))
        .collect::<Vec<_>>()
        .join("\n")
}
