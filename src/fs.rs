//! File system utilities.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Component, Path, PathBuf};
use walkdir::WalkDir;

use crate::error::SyncError;

/// Paths that must never be deleted, even when computed as an output root.
pub const PROTECTED_DELETE_TARGETS: &[&str] = &[".", "/", "~", "src", "node_modules"];

pub fn read_text(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("Failed to read file: {}", path.display()))
}

/// Read a file that may legitimately be absent.
pub fn read_text_if_exists(path: &Path) -> Result<Option<String>> {
    if path.is_file() {
        read_text(path).map(Some)
    } else {
        Ok(None)
    }
}

/// Write a file, creating parent directories as needed.
pub fn write_text(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
        && !parent.exists()
    {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    fs::write(path, content).with_context(|| format!("Failed to write file: {}", path.display()))
}

pub fn exists(path: &Path) -> bool {
    path.exists()
}

/// Files below `dir`, relative to `dir`, sorted. A missing directory is empty.
pub fn list_files(dir: &Path, extension: Option<&str>) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(dir).follow_links(true) {
        let entry =
            entry.with_context(|| format!("Failed to list directory: {}", dir.display()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy();
        if let Some(ext) = extension
            && !name.ends_with(ext)
        {
            continue;
        }
        if let Ok(relative) = entry.path().strip_prefix(dir) {
            files.push(relative.to_path_buf());
        }
    }

    files.sort();
    Ok(files)
}

/// Whether deleting `target` could destroy something outside generated output.
pub fn is_dangerous_delete_target(base_dir: &Path, target: &Path) -> bool {
    let raw = target.to_string_lossy();
    let trimmed = raw.trim_end_matches(['/', '\\']);
    if trimmed.is_empty() || PROTECTED_DELETE_TARGETS.contains(&trimmed) {
        return true;
    }

    if target.parent().is_none() {
        return true;
    }
    if let Some(home) = std::env::var_os("HOME")
        && target == Path::new(&home)
    {
        return true;
    }

    let relative = if target.is_absolute() || target.starts_with(base_dir) {
        match target.strip_prefix(base_dir) {
            Ok(rel) => rel.to_path_buf(),
            Err(_) => return true,
        }
    } else {
        target.to_path_buf()
    };

    if relative
        .components()
        .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
    {
        return true;
    }

    let normalized: PathBuf = relative
        .components()
        .filter(|c| matches!(c, Component::Normal(_)))
        .collect();
    let normalized = normalized.to_string_lossy();
    normalized.is_empty() || PROTECTED_DELETE_TARGETS.contains(&normalized.as_ref())
}

/// Remove a generated file or directory below `base_dir`.
///
/// Returns `Ok(false)` when nothing was there.
pub fn remove_path(base_dir: &Path, target: &Path) -> Result<bool> {
    if is_dangerous_delete_target(base_dir, target) {
        return Err(SyncError::DangerousDelete(target.to_path_buf()).into());
    }

    if target.is_dir() {
        fs::remove_dir_all(target)
            .with_context(|| format!("Failed to remove directory: {}", target.display()))?;
        Ok(true)
    } else if target.exists() {
        fs::remove_file(target)
            .with_context(|| format!("Failed to remove file: {}", target.display()))?;
        Ok(true)
    } else {
        Ok(false)
    }
}

/// Display `path` relative to `base` when possible.
pub fn display_relative(path: &Path, base: &Path) -> String {
    pathdiff::diff_paths(path, base)
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| path.to_path_buf())
        .display()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_write_text_creates_parents() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("a/b/c.md");
        write_text(&path, "hello").unwrap();
        assert_eq!(read_text(&path).unwrap(), "hello");
    }

    #[test]
    fn test_list_files_sorted_and_filtered() {
        let temp_dir = TempDir::new().unwrap();
        write_text(&temp_dir.path().join("b.md"), "").unwrap();
        write_text(&temp_dir.path().join("git/commit.md"), "").unwrap();
        write_text(&temp_dir.path().join("a.txt"), "").unwrap();

        let files = list_files(temp_dir.path(), Some(".md")).unwrap();
        assert_eq!(
            files,
            vec![PathBuf::from("b.md"), PathBuf::from("git/commit.md")]
        );
    }

    #[test]
    fn test_list_files_missing_dir_is_empty() {
        let temp_dir = TempDir::new().unwrap();
        assert!(
            list_files(&temp_dir.path().join("nope"), None)
                .unwrap()
                .is_empty()
        );
    }

    #[test]
    fn test_protected_targets_are_dangerous() {
        let base = Path::new("/repo");
        for target in [".", "/", "~", "src", "node_modules", "src/"] {
            assert!(
                is_dangerous_delete_target(base, Path::new(target)),
                "{} should be protected",
                target
            );
        }
        assert!(is_dangerous_delete_target(base, Path::new("/repo")));
        assert!(is_dangerous_delete_target(base, Path::new("/repo/src")));
        assert!(is_dangerous_delete_target(base, Path::new("/repo/node_modules")));
        assert!(is_dangerous_delete_target(base, Path::new("/elsewhere/.cursor")));
        assert!(is_dangerous_delete_target(base, Path::new("../.cursor")));
    }

    #[test]
    fn test_generated_dirs_are_not_dangerous() {
        let base = Path::new("/repo");
        assert!(!is_dangerous_delete_target(base, Path::new("/repo/.cursor/rules")));
        assert!(!is_dangerous_delete_target(base, Path::new(".claude/memories")));
        assert!(!is_dangerous_delete_target(base, Path::new("/repo/CLAUDE.md")));
    }

    #[test]
    fn test_remove_path_refuses_protected() {
        let temp_dir = TempDir::new().unwrap();
        let src = temp_dir.path().join("src");
        fs::create_dir_all(&src).unwrap();

        let err = remove_path(temp_dir.path(), &src).unwrap_err();
        assert!(err.downcast_ref::<SyncError>().is_some());
        assert!(src.exists());
    }

    #[test]
    fn test_remove_path_removes_generated_dir() {
        let temp_dir = TempDir::new().unwrap();
        let rules = temp_dir.path().join(".cursor/rules");
        write_text(&rules.join("a.mdc"), "x").unwrap();

        assert!(remove_path(temp_dir.path(), &rules).unwrap());
        assert!(!rules.exists());
        assert!(!remove_path(temp_dir.path(), &rules).unwrap());
    }
}
