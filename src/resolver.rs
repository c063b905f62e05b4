//! Decides which artifacts apply to which tool.
//!
//! Everything here is a pure function of its arguments; the configured default
//! tool list is passed in explicitly.

use std::path::Path;

use crate::error::SyncError;
use crate::model::{Document, Targeted};
use crate::targets::{self, Feature, TargetSpec, ToolTarget};

/// Filename prefix that pins an artifact to a single tool.
pub const RESERVED_PREFIX: &str = "specification-";

/// Requested tools and features after wildcard expansion and validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub tools: Vec<ToolTarget>,
    pub features: Vec<Feature>,
}

/// Expand and validate the requested tool and feature names.
pub fn resolve_request<S: AsRef<str>, T: AsRef<str>>(
    tools: &[S],
    features: &[T],
    default_tools: &[ToolTarget],
) -> Result<Request, SyncError> {
    Ok(Request {
        tools: targets::parse_tool_list(tools, default_tools)?,
        features: targets::parse_feature_list(features)?,
    })
}

/// Tools an artifact's own `targets` declaration resolves to.
pub fn expand_targets(spec: &TargetSpec, default_tools: &[ToolTarget]) -> Vec<ToolTarget> {
    match spec {
        TargetSpec::Wildcard => default_tools.to_vec(),
        TargetSpec::Tools(tools) if tools.is_empty() => default_tools.to_vec(),
        TargetSpec::Tools(tools) => tools.iter().copied().collect(),
    }
}

/// Shared target test for artifacts and MCP servers: absent, empty or wildcard
/// declarations match every tool.
pub fn targets_include(targets: Option<&TargetSpec>, tool: ToolTarget) -> bool {
    match targets {
        None | Some(TargetSpec::Wildcard) => true,
        Some(TargetSpec::Tools(tools)) => tools.is_empty() || tools.contains(&tool),
    }
}

/// Tool named by a `specification-<tool>-*` file name, if any.
///
/// The longest matching id wins so `augmentcode-legacy` is not read as
/// `augmentcode`.
pub fn reserved_tool(path: &Path) -> Option<ToolTarget> {
    let name = path.file_name()?.to_string_lossy().to_ascii_lowercase();
    let rest = name.strip_prefix(RESERVED_PREFIX)?;

    ToolTarget::all()
        .iter()
        .copied()
        .filter(|tool| {
            rest.strip_prefix(tool.id())
                .is_some_and(|tail| tail.starts_with('-'))
        })
        .max_by_key(|tool| tool.id().len())
}

/// Whether the artifact is reserved for a tool other than `tool`.
pub fn reserved_for_other_tool(path: &Path, tool: ToolTarget) -> bool {
    reserved_tool(path).is_some_and(|owner| owner != tool)
}

/// Inclusion predicate for one artifact and one tool.
///
/// A `specification-<tool>-*` file name takes precedence over `targets`.
pub fn include(path: &Path, targets: &TargetSpec, tool: ToolTarget, requested: &[ToolTarget]) -> bool {
    if !requested.contains(&tool) {
        return false;
    }
    if reserved_tool(path).is_some() {
        return !reserved_for_other_tool(path, tool);
    }
    targets_include(Some(targets), tool)
}

/// Documents that apply to `tool`, in their original order.
pub fn select<'a, F: Targeted>(
    docs: &'a [Document<F>],
    tool: ToolTarget,
    requested: &[ToolTarget],
) -> Vec<&'a Document<F>> {
    docs.iter()
        .filter(|doc| include(&doc.relative_file_path, doc.targets(), tool, requested))
        .collect()
}
