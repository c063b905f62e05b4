//! rulesync CLI
//!
//! Command-line interface for generating and importing AI assistant configurations.

mod commands;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use is_terminal::IsTerminal;
use std::env;
use std::path::PathBuf;
use std::process;
use tracing::Level;

use rulesync::config::{CliOverrides, Config, ResolvedOptions};
use rulesync::error::ValidationErrors;
use rulesync::generate::Generator;
use rulesync::import::Importer;
use rulesync::source::load_sources;
use rulesync::watch::{self, WatchOptions};
use rulesync::{fs, gitignore, init};

/// Exit code for invalid sources or options.
const EXIT_VALIDATION: i32 = 1;
/// Exit code when `add` cannot create its file.
const EXIT_ADD_FAILED: i32 = 2;

#[derive(Parser)]
#[command(name = "rulesync")]
#[command(
    author,
    version,
    about = "Write AI assistant rules once, generate every tool's configuration"
)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Options shared by every command that runs a pipeline
#[derive(Args, Debug, Clone, Default)]
struct CommonArgs {
    /// Project root directory (default: current directory)
    #[arg(short, long)]
    path: Option<PathBuf>,

    /// Path to configuration file
    #[arg(short, long, env = "RULESYNC_CONFIG")]
    config: Option<PathBuf>,

    /// Tools to target (comma-separated, `*` for the defaults)
    #[arg(short, long, value_delimiter = ',')]
    targets: Option<Vec<String>>,

    /// Features to process (comma-separated, `*` for all)
    #[arg(short, long, value_delimiter = ',')]
    features: Option<Vec<String>>,

    /// Output base directories (comma-separated, relative to the project root)
    #[arg(long = "base-dir", value_delimiter = ',')]
    base_dirs: Option<Vec<String>>,

    /// Remove previously generated files before writing
    #[arg(long)]
    delete: bool,

    /// Show detailed output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a starter .rulesync/ tree and rulesync.toml
    Init {
        /// Project root directory (default: current directory)
        #[arg(short, long)]
        path: Option<PathBuf>,

        /// Overwrite existing files
        #[arg(long)]
        force: bool,
    },

    /// Add a new rule file
    Add {
        /// Rule name, becomes .rulesync/rules/<name>.md
        name: String,

        /// Project root directory (default: current directory)
        #[arg(short, long)]
        path: Option<PathBuf>,
    },

    /// Generate tool configuration from .rulesync/
    Generate {
        #[command(flatten)]
        common: CommonArgs,
    },

    /// Import existing tool configuration into .rulesync/
    Import {
        #[command(flatten)]
        common: CommonArgs,
    },

    /// Check every source file and report all problems
    Validate {
        #[command(flatten)]
        common: CommonArgs,
    },

    /// Show which generated files are missing or out of date
    Status {
        #[command(flatten)]
        common: CommonArgs,

        /// Output machine-readable JSON
        #[arg(long)]
        json: bool,
    },

    /// Regenerate whenever sources change
    Watch {
        #[command(flatten)]
        common: CommonArgs,
    },

    /// Show the resolved configuration
    Config {
        #[command(flatten)]
        common: CommonArgs,

        /// Write a default rulesync.toml
        #[arg(long)]
        init: bool,

        /// Overwrite an existing rulesync.toml with --init
        #[arg(long)]
        force: bool,
    },

    /// Update the managed .gitignore section with generated files
    Gitignore {
        #[command(flatten)]
        common: CommonArgs,
    },
}

impl Commands {
    fn verbose(&self) -> bool {
        match self {
            Commands::Init { .. } | Commands::Add { .. } => false,
            Commands::Generate { common }
            | Commands::Import { common }
            | Commands::Validate { common }
            | Commands::Status { common, .. }
            | Commands::Watch { common }
            | Commands::Config { common, .. }
            | Commands::Gitignore { common } => common.verbose,
        }
    }
}

fn main() {
    let cli = Cli::parse();

    if !std::io::stdout().is_terminal() {
        colored::control::set_override(false);
    }
    tracing_subscriber::fmt()
        .with_max_level(if cli.command.verbose() {
            Level::DEBUG
        } else {
            Level::WARN
        })
        .with_target(false)
        .with_ansi(std::io::stderr().is_terminal())
        .with_writer(std::io::stderr)
        .init();

    match run(cli.command) {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("{} {:#}", "✘".red(), e);
            process::exit(EXIT_VALIDATION);
        }
    }
}

fn start_dir(path: Option<PathBuf>) -> Result<PathBuf> {
    match path {
        Some(p) => Ok(p),
        None => env::current_dir().context("Failed to determine current directory"),
    }
}

fn resolve(common: &CommonArgs) -> Result<ResolvedOptions> {
    Ok(resolve_with_config(common)?.1)
}

fn resolve_with_config(common: &CommonArgs) -> Result<(Config, ResolvedOptions)> {
    let start = start_dir(common.path.clone())?;
    let (config, project_root) = Config::discover(&start, common.config.as_deref())?;
    let overrides = CliOverrides {
        targets: common.targets.clone(),
        features: common.features.clone(),
        base_dirs: common.base_dirs.clone(),
        delete: common.delete,
        verbose: common.verbose,
    };
    let options = ResolvedOptions::resolve(&config, &project_root, &overrides)?;
    tracing::debug!(root = %options.project_root.display(), "resolved options");
    Ok((config, options))
}

fn run(command: Commands) -> Result<i32> {
    match command {
        Commands::Init { path, force } => {
            let project_root = start_dir(path)?;
            println!("{}", "Initializing rulesync project...\n".cyan());
            init::init(&project_root, force)?;
            println!("\n{}", "✨ Initialization complete!".green().bold());
            println!(
                "\nNext steps:\n  1. Edit {} with your project rules\n  2. Run {} to write tool files",
                ".rulesync/rules/overview.md".cyan(),
                "rulesync generate".cyan()
            );
            Ok(0)
        }

        Commands::Add { name, path } => {
            let project_root = start_dir(path)?;
            match init::add_rule(&project_root, &name) {
                Ok(created) => {
                    println!(
                        "  {} Created: {}",
                        "✔".green(),
                        fs::display_relative(&created, &project_root)
                    );
                    Ok(0)
                }
                Err(e) => {
                    eprintln!("{} {:#}", "✘".red(), e);
                    Ok(EXIT_ADD_FAILED)
                }
            }
        }

        Commands::Generate { common } => {
            let options = resolve(&common)?;
            println!("{}", "➤ Generating tool configuration".cyan().bold());
            generate_once(&options)
        }

        Commands::Import { common } => {
            if common.targets.is_none() {
                anyhow::bail!("import needs at least one tool (use --targets)");
            }
            let options = resolve(&common)?;
            let base_dir = options
                .base_dirs
                .first()
                .unwrap_or(&options.project_root)
                .clone();

            println!("{}", "➤ Importing tool configuration".cyan().bold());
            let result = Importer::new(&options.project_root, &base_dir)
                .run(&options.targets, &options.features)?;

            for file in &result.files {
                println!(
                    "  {} Wrote: {}",
                    "✔".green(),
                    fs::display_relative(file, &options.project_root)
                );
            }
            println!("\n{}", "✨ Import complete!".green().bold());
            println!(
                "  Imported: {}, Errors: {}",
                result.imported.to_string().green(),
                error_count(result.errors)
            );
            Ok(if result.errors > 0 { EXIT_VALIDATION } else { 0 })
        }

        Commands::Validate { common } => {
            let options = resolve(&common)?;
            match load_sources(&options.project_root) {
                Ok(sources) => {
                    println!(
                        "{} {} rules, {} commands, {} subagents, {} MCP servers are valid",
                        "✔".green(),
                        sources.rules.len(),
                        sources.commands.len(),
                        sources.subagents.len(),
                        sources.mcp.servers.len()
                    );
                    Ok(0)
                }
                Err(e) => match e.downcast_ref::<ValidationErrors>() {
                    Some(errors) => {
                        for error in &errors.0 {
                            println!("{} {}", "✘".red(), error);
                        }
                        println!("\n{} problem(s) found", errors.0.len());
                        Ok(EXIT_VALIDATION)
                    }
                    None => Err(e),
                },
            }
        }

        Commands::Status { common, json } => {
            let options = resolve(&common)?;
            let sources = load_sources(&options.project_root)?;
            let plan = Generator::new(&options, &sources).plan()?;
            let all_ok = commands::status::run_status(&plan, &options.project_root, json)?;
            Ok(if all_ok { 0 } else { 1 })
        }

        Commands::Watch { common } => {
            let options = resolve(&common)?;
            println!(
                "{} Watching {} for changes (Ctrl+C to stop)",
                "➤".cyan(),
                options.project_root.display()
            );
            if let Err(e) = generate_once(&options) {
                eprintln!("{} {:#}", "✘".red(), e);
            }
            watch::watch(
                &options.project_root,
                WatchOptions::default(),
                || {
                    println!(
                        "\n{} [{}] Sources changed, regenerating",
                        "➤".cyan(),
                        chrono::Local::now().format("%H:%M:%S")
                    );
                    generate_once(&options).map(|_| ())
                },
                || false,
            )?;
            Ok(0)
        }

        Commands::Config {
            common,
            init,
            force,
        } => {
            if init {
                let root = start_dir(common.path.clone())?;
                match Config::write_default(&root, force)? {
                    Some(path) => println!("  {} Created: {}", "✔".green(), path.display()),
                    None => println!(
                        "  {} rulesync.toml already exists (use --force to overwrite)",
                        "!".yellow()
                    ),
                }
                return Ok(0);
            }
            let options = resolve(&common)?;
            println!("{}", serde_json::to_string_pretty(&options)?);
            Ok(0)
        }

        Commands::Gitignore { common } => {
            let (config, options) = resolve_with_config(&common)?;
            update_gitignore(&config, &options)?;
            Ok(0)
        }
    }
}

/// Load sources and run one generation, printing a summary.
fn generate_once(options: &ResolvedOptions) -> Result<i32> {
    let sources = match load_sources(&options.project_root) {
        Ok(sources) => sources,
        Err(e) => {
            if let Some(errors) = e.downcast_ref::<ValidationErrors>() {
                for error in &errors.0 {
                    eprintln!("{} {}", "✘".red(), error);
                }
                return Ok(EXIT_VALIDATION);
            }
            return Err(e);
        }
    };

    let result = Generator::new(options, &sources).run()?;

    println!("\n{}", "✨ Generate complete!".green().bold());
    println!(
        "  Written: {}, Unchanged: {}, Skipped: {}, Deleted: {}, Errors: {}",
        result.written.to_string().green(),
        result.unchanged.to_string().dimmed(),
        result.skipped.to_string().dimmed(),
        result.deleted.to_string().yellow(),
        error_count(result.errors)
    );

    Ok(if result.is_success() { 0 } else { EXIT_VALIDATION })
}

fn update_gitignore(config: &Config, options: &ResolvedOptions) -> Result<()> {
    if !config.gitignore.enabled {
        println!("  {} Gitignore management is disabled", "!".yellow());
        return Ok(());
    }
    let mut entries = gitignore::generated_entries(&options.targets, &options.features);
    entries.extend(config.gitignore.entries.iter().cloned());
    entries.sort();
    entries.dedup();

    println!("{}", "➤ Updating .gitignore".cyan().bold());
    gitignore::update_gitignore(&options.project_root, &config.gitignore.marker, &entries)?;
    Ok(())
}

fn error_count(errors: usize) -> colored::ColoredString {
    if errors > 0 {
        errors.to_string().red()
    } else {
        errors.to_string().dimmed()
    }
}
