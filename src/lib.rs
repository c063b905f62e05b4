//! rulesync - AI Assistant Configuration Synchronization
//!
//! Rules, commands, subagents, ignore patterns and MCP servers are written once
//! under `.rulesync/` and generated into the native files of each supported
//! tool. The same adapters read those files back, so existing tool
//! configuration can be imported into the shared format.

pub mod adapters;
pub mod config;
pub mod error;
pub mod frontmatter;
pub mod fs;
pub mod generate;
pub mod gitignore;
pub mod import;
pub mod init;
pub mod mcp;
pub mod model;
pub mod resolver;
pub mod source;
pub mod targets;
pub mod watch;

pub use config::{CliOverrides, Config, ResolvedOptions};
pub use error::{SyncError, ValidationErrors};
pub use generate::{GenerateResult, Generator};
pub use import::{ImportResult, Importer};
pub use source::{SourceSet, load_sources};
pub use targets::{Feature, ToolTarget};
