//! Scaffolding for new projects
//!
//! `init` lays down a minimal `.rulesync/` tree and a `rulesync.toml`; `add`
//! creates one more rule file from a template.

use anyhow::{Context, Result};
use colored::Colorize;
use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::error::SyncError;
use crate::fs;
use crate::source::{COMMANDS_DIR, MCP_FILE, RULES_DIR};

/// Root rule written by `init`.
pub const OVERVIEW_RULE: &str = r#"---
root: true
targets: ["*"]
description: "Project overview and general development guidelines"
globs: ["**/*"]
---

# Project Overview

## General Guidelines

- Use TypeScript for all new code
- Follow consistent naming conventions
- Write self-documenting code with clear variable and function names
- Prefer composition over inheritance
- Use meaningful comments for complex business logic

## Code Style

- Use 2 spaces for indentation
- Use semicolons
- Use double quotes for strings
- Use trailing commas in multi-line objects and arrays

## Architecture Principles

- Organize code by feature, not by file type
- Keep related files close together
- Use dependency injection for better testability
- Implement proper error handling
"#;

/// Example command written by `init`.
pub const EXAMPLE_COMMAND: &str = r#"---
description: "Review the current changes"
targets: ["*"]
---

Review the changes in $ARGUMENTS for correctness, readability and test coverage.
Point out bugs first, then style issues.
"#;

pub const EMPTY_MCP_CONFIG: &str = "{\n  \"mcpServers\": {}\n}\n";

fn rule_template(name: &str) -> String {
    format!(
        r#"---
root: false
targets: ["*"]
description: "{name}"
globs: []
---

# {name}

Add your rules here.
"#
    )
}

/// Write `content` to `path` unless it exists and `force` is off.
fn write_scaffold(project_root: &Path, relative: &str, content: &str, force: bool) -> Result<bool> {
    let path = project_root.join(relative);
    if path.exists() && !force {
        println!(
            "  {} {} already exists (use --force to overwrite)",
            "!".yellow(),
            relative
        );
        return Ok(false);
    }
    fs::write_text(&path, content)?;
    println!("  {} Created: {}", "✔".green(), relative);
    Ok(true)
}

/// Initialize a new rulesync project in `project_root`.
pub fn init(project_root: &Path, force: bool) -> Result<()> {
    write_scaffold(
        project_root,
        &format!("{}/overview.md", RULES_DIR),
        OVERVIEW_RULE,
        force,
    )?;
    write_scaffold(
        project_root,
        &format!("{}/review.md", COMMANDS_DIR),
        EXAMPLE_COMMAND,
        force,
    )?;
    write_scaffold(project_root, MCP_FILE, EMPTY_MCP_CONFIG, force)?;

    match Config::write_default(project_root, force)? {
        Some(path) => println!(
            "  {} Created: {}",
            "✔".green(),
            fs::display_relative(&path, project_root)
        ),
        None => println!(
            "  {} rulesync.toml already exists (use --force to overwrite)",
            "!".yellow()
        ),
    }

    Ok(())
}

/// Create `.rulesync/rules/<name>.md` from the non-root template.
///
/// Fails with [`SyncError::AlreadyExists`] rather than overwriting.
pub fn add_rule(project_root: &Path, name: &str) -> Result<PathBuf> {
    let name = name.trim().trim_end_matches(".md");
    if name.is_empty() || name.split('/').any(|part| part.is_empty() || part == "..") {
        anyhow::bail!("invalid rule name `{}`", name);
    }

    let path = project_root.join(RULES_DIR).join(format!("{}.md", name));
    if path.exists() {
        return Err(SyncError::AlreadyExists(path).into());
    }

    fs::write_text(&path, &rule_template(name))
        .with_context(|| format!("Failed to create rule {}", name))?;
    Ok(path)
}
