use anyhow::Result;
use colored::Colorize;
use serde::Serialize;
use std::path::Path;

use rulesync::fs;
use rulesync::generate::{Plan, PlannedFile};

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FileState {
    Ok,
    Outdated,
    Missing,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct StatusEntry {
    pub path: String,
    pub tool: String,
    pub kind: String,
    pub state: FileState,
}

/// Compare a planned file with what is on disk.
pub fn file_state(file: &PlannedFile) -> Result<FileState> {
    Ok(match fs::read_text_if_exists(&file.path)? {
        None => FileState::Missing,
        Some(current) if current == file.content => FileState::Ok,
        Some(_) => FileState::Outdated,
    })
}

pub fn collect_entries(plan: &Plan, project_root: &Path) -> Result<Vec<StatusEntry>> {
    plan.files
        .iter()
        .map(|file| -> Result<StatusEntry> {
            Ok(StatusEntry {
                path: fs::display_relative(&file.path, project_root),
                tool: file.tool.id().to_string(),
                kind: file.kind.id().to_string(),
                state: file_state(file)?,
            })
        })
        .collect()
}

pub fn entry_is_problematic(entry: &StatusEntry) -> bool {
    entry.state != FileState::Ok
}

/// Print the status of every planned output. Returns whether all are up to date.
pub fn run_status(plan: &Plan, project_root: &Path, json: bool) -> Result<bool> {
    let entries = collect_entries(plan, project_root)?;
    let problems = entries.iter().filter(|e| entry_is_problematic(e)).count();

    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(problems == 0);
    }

    for e in &entries {
        match e.state {
            FileState::Ok => println!("{} OK: {} ({})", "✔".green(), e.path, e.tool),
            FileState::Outdated => println!("{} Outdated: {} ({})", "!".yellow(), e.path, e.tool),
            FileState::Missing => println!("{} Missing: {} ({})", "✘".red(), e.path, e.tool),
        }
    }

    if problems > 0 {
        println!("\nStatus: {} of {} files need regenerating", problems, entries.len());
    } else {
        println!("\nStatus: All good");
    }
    Ok(problems == 0)
}
