//! Configuration parsing for rulesync
//!
//! Handles the optional `rulesync.toml` project file and merges it with
//! command-line overrides into the options every pipeline runs with.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::mcp::McpMergeStrategy;
use crate::resolver;
use crate::targets::{self, Feature, ToolTarget, WILDCARD};

/// Default configuration file name
pub const CONFIG_FILE_NAME: &str = "rulesync.toml";

/// Content written by `config --init` and `init`.
pub const DEFAULT_CONFIG: &str = r#"# rulesync configuration
#
# Tools to generate for ("*" expands to default_targets).
targets = ["*"]

# Features to generate: rules, commands, mcp, ignore, subagents, or "*".
features = ["*"]

# Output roots, relative to this file.
base_dirs = ["."]

# Remove previously generated rule, command and subagent files before writing.
delete = false

verbose = false

[mcp]
# "overwrite" replaces each tool's server list, "merge" keeps servers already there.
merge_strategy = "overwrite"

[gitignore]
enabled = true
marker = "rulesync"
entries = []
"#;

/// Root configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default = "default_wildcard")]
    pub targets: Vec<String>,

    /// What the `*` target expands to. Defaults to every supported tool
    /// except the legacy Augment single file.
    #[serde(default)]
    pub default_targets: Option<Vec<String>>,

    #[serde(default = "default_wildcard")]
    pub features: Vec<String>,

    #[serde(default = "default_base_dirs")]
    pub base_dirs: Vec<String>,

    #[serde(default)]
    pub delete: bool,

    #[serde(default)]
    pub verbose: bool,

    #[serde(default)]
    pub mcp: McpSettings,

    /// Gitignore management settings
    #[serde(default)]
    pub gitignore: GitignoreConfig,
}

fn default_wildcard() -> Vec<String> {
    vec![WILDCARD.to_string()]
}

fn default_base_dirs() -> Vec<String> {
    vec![".".to_string()]
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct McpSettings {
    #[serde(default)]
    pub merge_strategy: McpMergeStrategy,
}

/// Gitignore management configuration
#[derive(Debug, Clone, Deserialize)]
pub struct GitignoreConfig {
    /// Whether to manage .gitignore
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Marker text for the managed section
    #[serde(default = "default_marker")]
    pub marker: String,

    /// Additional entries to add to .gitignore
    #[serde(default)]
    pub entries: Vec<String>,
}

fn default_marker() -> String {
    "rulesync".to_string()
}

impl Default for GitignoreConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            marker: default_marker(),
            entries: Vec::new(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            targets: default_wildcard(),
            default_targets: None,
            features: default_wildcard(),
            base_dirs: default_base_dirs(),
            delete: false,
            verbose: false,
            mcp: McpSettings::default(),
            gitignore: GitignoreConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Find configuration file by searching up from `start_dir`
    pub fn find_config(start_dir: &Path) -> Result<PathBuf> {
        let mut current = start_dir.to_path_buf();

        loop {
            let config_path = current.join(CONFIG_FILE_NAME);
            if config_path.exists() {
                return Ok(config_path);
            }

            if !current.pop() {
                anyhow::bail!(
                    "Could not find {} in {} or any parent directory",
                    CONFIG_FILE_NAME,
                    start_dir.display()
                );
            }
        }
    }

    /// Get the project root directory (location of the config file)
    pub fn project_root(config_path: &Path) -> PathBuf {
        config_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."))
    }

    /// Load `explicit`, or the nearest `rulesync.toml` above `start_dir`.
    ///
    /// Without any config file the built-in defaults apply and `start_dir` is
    /// the project root.
    pub fn discover(start_dir: &Path, explicit: Option<&Path>) -> Result<(Self, PathBuf)> {
        if let Some(path) = explicit {
            return Ok((Self::load(path)?, Self::project_root(path)));
        }
        match Self::find_config(start_dir) {
            Ok(path) => Ok((Self::load(&path)?, Self::project_root(&path))),
            Err(_) => {
                tracing::debug!(dir = %start_dir.display(), "no rulesync.toml found, using defaults");
                Ok((Self::default(), start_dir.to_path_buf()))
            }
        }
    }

    /// Write the default config file, refusing to overwrite unless `force`.
    pub fn write_default(project_root: &Path, force: bool) -> Result<Option<PathBuf>> {
        let path = project_root.join(CONFIG_FILE_NAME);
        if path.exists() && !force {
            return Ok(None);
        }
        fs::write(&path, DEFAULT_CONFIG)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        Ok(Some(path))
    }

    pub fn default_tools(&self) -> Result<Vec<ToolTarget>> {
        match &self.default_targets {
            Some(names) => Ok(targets::parse_tool_list(names, &ToolTarget::builtin_defaults())?),
            None => Ok(ToolTarget::builtin_defaults()),
        }
    }
}

// =============================================================================
// Resolved options
// =============================================================================

/// Values given on the command line; `None` means "use the config file".
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub targets: Option<Vec<String>>,
    pub features: Option<Vec<String>>,
    pub base_dirs: Option<Vec<String>>,
    pub delete: bool,
    pub verbose: bool,
}

/// Validated options handed to the pipelines.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedOptions {
    pub project_root: PathBuf,
    pub targets: Vec<ToolTarget>,
    pub default_targets: Vec<ToolTarget>,
    pub features: Vec<Feature>,
    /// Absolute output roots.
    pub base_dirs: Vec<PathBuf>,
    pub delete: bool,
    pub verbose: bool,
    pub mcp_merge_strategy: McpMergeStrategy,
}

impl ResolvedOptions {
    /// Apply command line over config file over defaults, validating every
    /// tool and feature name.
    pub fn resolve(config: &Config, project_root: &Path, overrides: &CliOverrides) -> Result<Self> {
        let default_targets = config.default_tools()?;
        let target_names = overrides.targets.as_ref().unwrap_or(&config.targets);
        let feature_names = overrides.features.as_ref().unwrap_or(&config.features);
        let base_dirs = overrides.base_dirs.as_ref().unwrap_or(&config.base_dirs);

        let request = resolver::resolve_request(target_names, feature_names, &default_targets)?;

        let mut dirs: Vec<PathBuf> = base_dirs
            .iter()
            .map(|dir| match dir.trim() {
                "" | "." => project_root.to_path_buf(),
                dir => project_root.join(dir),
            })
            .collect();
        if dirs.is_empty() {
            dirs.push(project_root.to_path_buf());
        }
        dirs.sort();
        dirs.dedup();

        Ok(Self {
            project_root: project_root.to_path_buf(),
            targets: request.tools,
            default_targets,
            features: request.features,
            base_dirs: dirs,
            delete: overrides.delete || config.delete,
            verbose: overrides.verbose || config.verbose,
            mcp_merge_strategy: config.mcp.merge_strategy,
        })
    }

    pub fn has_feature(&self, feature: Feature) -> bool {
        self.features.contains(&feature)
    }
}
