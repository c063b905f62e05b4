//! Gitignore management
//!
//! Keeps a marked section of `.gitignore` listing every file rulesync
//! generates for the configured tools.

use anyhow::{Context, Result};
use colored::Colorize;
use std::fs;
use std::path::Path;

use crate::adapters::{commands, ignore, rules, subagents};
use crate::mcp;
use crate::mcp::formatter_for;
use crate::targets::{Feature, ToolTarget};

/// Generated paths for `tools` and `features`, sorted and deduplicated.
///
/// Settings files that also hold hand-written configuration are left out.
pub fn generated_entries(tools: &[ToolTarget], features: &[Feature]) -> Vec<String> {
    let mut entries: Vec<String> = Vec::new();

    for &tool in tools {
        for feature in features {
            match feature {
                Feature::Rules => {
                    let spec = rules::rule_adapter(tool);
                    entries.extend(spec.layout.output_paths().iter().map(|p| p.to_string()));
                    if let Some(legacy) = spec.legacy_file {
                        entries.push(legacy.to_string());
                    }
                }
                Feature::Commands => {
                    if let Some(spec) = commands::command_adapter(tool) {
                        entries.extend(spec.layout.output_paths().iter().map(|p| p.to_string()));
                    }
                }
                Feature::Subagents => {
                    if let Some(spec) = subagents::subagent_adapter(tool) {
                        entries.extend(spec.layout.output_paths().iter().map(|p| p.to_string()));
                    }
                }
                Feature::Ignore => {
                    if let Some(output) = ignore::ignore_output(tool)
                        && !output.is_shared()
                    {
                        entries.push(output.path().to_string());
                    }
                }
                Feature::Mcp => {
                    let shared = formatter_for(tool).is_none_or(|f| f.preserve_on_overwrite());
                    if let Some(path) = mcp::config_path(tool)
                        && !shared
                    {
                        entries.push(path.to_string());
                    }
                }
            }
        }
    }

    entries.sort();
    entries.dedup();
    entries
}

/// Update .gitignore with managed entries. Returns whether the file changed.
pub fn update_gitignore(project_root: &Path, marker: &str, entries: &[String]) -> Result<bool> {
    let gitignore_path = project_root.join(".gitignore");
    let start_marker = format!("# START {}", marker);
    let end_marker = format!("# END {}", marker);

    let existing_content = if gitignore_path.exists() {
        fs::read_to_string(&gitignore_path)
            .with_context(|| format!("Failed to read .gitignore: {}", gitignore_path.display()))?
    } else {
        String::new()
    };

    let content_without_managed =
        remove_managed_section(&existing_content, &start_marker, &end_marker);

    let mut managed_section = String::new();
    managed_section.push_str(&start_marker);
    managed_section.push('\n');
    for entry in entries {
        managed_section.push_str(entry);
        managed_section.push('\n');
    }
    managed_section.push_str(&end_marker);
    managed_section.push('\n');

    let base = content_without_managed.trim_end();
    let new_content = if base.is_empty() {
        managed_section
    } else {
        format!("{}\n\n{}", base, managed_section)
    };

    if new_content == existing_content {
        println!("  {} .gitignore already up to date", "✔".green());
        return Ok(false);
    }

    fs::write(&gitignore_path, new_content)
        .with_context(|| format!("Failed to write .gitignore: {}", gitignore_path.display()))?;

    println!(
        "  {} Updated .gitignore with {} managed entries",
        "✔".green(),
        entries.len()
    );

    Ok(true)
}

/// Remove the managed section from gitignore content
fn remove_managed_section(content: &str, start_marker: &str, end_marker: &str) -> String {
    let mut result = String::new();
    let mut in_managed_section = false;

    for line in content.lines() {
        if line.trim() == start_marker {
            in_managed_section = true;
            continue;
        }
        if line.trim() == end_marker {
            in_managed_section = false;
            continue;
        }
        if !in_managed_section {
            result.push_str(line);
            result.push('\n');
        }
    }

    result
}
