//! Per-tool adapter tables.
//!
//! Each (artifact kind, tool) pair is one [`AdapterSpec`] entry: where files
//! live, which frontmatter dialect they speak, and whether the native format
//! can be converted back to canonical sources. A handful of generic functions
//! per kind interpret the table; there is no per-tool adapter type.

pub mod commands;
pub mod ignore;
pub mod rules;
pub mod subagents;

use std::path::{Path, PathBuf};

use crate::targets::ToolTarget;

/// How canonical sub-paths map to output file names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Naming {
    /// `a/b.md` becomes `<dir>/a-b<ext>`.
    Flat,
    /// `a/b.md` becomes `<dir>/a/b<ext>`.
    Hierarchical,
}

/// Where a tool keeps the files of one artifact kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    /// A primary file plus a directory of satellite documents.
    Split {
        root: &'static str,
        detail_dir: &'static str,
        ext: &'static str,
        naming: Naming,
        /// Append a reference list of satellites to the primary file.
        references: bool,
    },
    /// One file per document in a single directory.
    Directory {
        dir: &'static str,
        ext: &'static str,
        naming: Naming,
    },
    /// Everything concatenated into one file.
    SingleFile { path: &'static str },
}

impl Layout {
    /// Conventional output locations, for deletion and `.gitignore`.
    pub fn output_paths(&self) -> Vec<&'static str> {
        match self {
            Layout::Split {
                root, detail_dir, ..
            } => vec![*root, *detail_dir],
            Layout::Directory { dir, .. } => vec![*dir],
            Layout::SingleFile { path } => vec![*path],
        }
    }

    /// Extension of per-document files, if the layout has any.
    pub fn extension(&self) -> Option<&'static str> {
        match self {
            Layout::Split { ext, .. } | Layout::Directory { ext, .. } => Some(*ext),
            Layout::SingleFile { .. } => None,
        }
    }
}

/// One adapter table entry, generic over the kind's frontmatter dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdapterSpec<D> {
    pub tool: ToolTarget,
    pub layout: Layout,
    pub dialect: D,
    /// The native format cannot carry canonical metadata; import is refused.
    pub simulated: bool,
    /// Older single-file location the tool still reads.
    pub legacy_file: Option<&'static str>,
}

/// Split a base-relative file path into `(relative_dir_path, relative_file_path)`.
pub fn split_path(path: &str) -> (PathBuf, PathBuf) {
    let path = Path::new(path);
    let dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
    let file = path
        .file_name()
        .map(PathBuf::from)
        .unwrap_or_else(|| path.to_path_buf());
    (dir, file)
}

fn path_segments(path: &Path) -> Vec<String> {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect()
}

/// Output file path (inside the tool directory) for a canonical sub-path.
///
/// Hierarchical layouts keep `git/commit.md` as `git/commit<ext>`; flat
/// layouts produce `git-commit<ext>`.
pub fn detail_path(source: &Path, naming: Naming, ext: &str) -> PathBuf {
    let mut segments = path_segments(source);
    if let Some(last) = segments.last_mut()
        && let Some(stem) = last.strip_suffix(".md")
    {
        *last = stem.to_string();
    }

    match naming {
        Naming::Hierarchical => {
            let mut path: PathBuf = segments.iter().collect();
            let file = format!(
                "{}{}",
                path.file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default(),
                ext
            );
            path.set_file_name(file);
            path
        }
        Naming::Flat => PathBuf::from(format!("{}{}", segments.join("-"), ext)),
    }
}

/// Canonical `.md` sub-path for a native file path (inverse of [`detail_path`]).
///
/// Flat names cannot be split back into directories and stay flat.
pub fn canonical_from_native(native: &Path, ext: &str) -> PathBuf {
    let segments = path_segments(native);
    let mut path: PathBuf = segments.iter().collect();
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let stem = name.strip_suffix(ext).unwrap_or(&name);
    path.set_file_name(format!("{}.md", stem));
    path
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hierarchical_keeps_segments() {
        let path = detail_path(Path::new("git/commit.md"), Naming::Hierarchical, ".md");
        assert!(path.ends_with("git/commit.md"));
        assert_eq!(path, PathBuf::from("git/commit.md"));
    }

    #[test]
    fn test_flat_joins_segments() {
        let path = detail_path(Path::new("git/commit.md"), Naming::Flat, ".md");
        assert_eq!(path, PathBuf::from("git-commit.md"));
    }

    #[test]
    fn test_extensionless_source_name() {
        assert_eq!(
            detail_path(Path::new("git/commit"), Naming::Hierarchical, ".md"),
            PathBuf::from("git/commit.md")
        );
        assert_eq!(
            detail_path(Path::new("git/commit"), Naming::Flat, ".md"),
            PathBuf::from("git-commit.md")
        );
    }

    #[test]
    fn test_custom_extension() {
        assert_eq!(
            detail_path(Path::new("naming.md"), Naming::Flat, ".instructions.md"),
            PathBuf::from("naming.instructions.md")
        );
        assert_eq!(
            detail_path(Path::new("review.md"), Naming::Hierarchical, ".toml"),
            PathBuf::from("review.toml")
        );
    }

    #[test]
    fn test_canonical_from_native() {
        assert_eq!(
            canonical_from_native(Path::new("naming.mdc"), ".mdc"),
            PathBuf::from("naming.md")
        );
        assert_eq!(
            canonical_from_native(Path::new("git/commit.toml"), ".toml"),
            PathBuf::from("git/commit.md")
        );
        assert_eq!(
            canonical_from_native(Path::new("naming.instructions.md"), ".instructions.md"),
            PathBuf::from("naming.md")
        );
    }

    #[test]
    fn test_split_path() {
        assert_eq!(
            split_path(".github/copilot-instructions.md"),
            (PathBuf::from(".github"), PathBuf::from("copilot-instructions.md"))
        );
        assert_eq!(split_path("CLAUDE.md"), (PathBuf::new(), PathBuf::from("CLAUDE.md")));
    }

    #[test]
    fn test_output_paths() {
        let layout = Layout::Split {
            root: "CLAUDE.md",
            detail_dir: ".claude/memories",
            ext: ".md",
            naming: Naming::Hierarchical,
            references: true,
        };
        assert_eq!(layout.output_paths(), vec!["CLAUDE.md", ".claude/memories"]);
    }
}
