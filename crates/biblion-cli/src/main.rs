//! Biblion CLI
//!
//! Command-line interface for biblion - a plain-file bibliography manager.

use std::fs::OpenOptions;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use biblion_core::{Config, LibraryError, Markup, Style, UpdateScope};

mod commands;
mod output;

use commands::cite::CiteOptions;
use commands::library::ImportArgs;
use output::{Output, OutputFormat};

#[derive(Parser)]
#[command(name = "biblion")]
#[command(about = "Biblion - BibTeX references as plain files and Markdown notes")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Quiet mode - minimal output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Use this config file instead of the default one
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the entries of a .bib file
    Parse {
        /// BibTeX file to read
        file: PathBuf,
    },
    /// Normalize an author list ("and"-separated)
    Normalize {
        /// Authors, e.g. "Smith, John and Jane Doe"
        authors: String,
    },
    /// Generate free citation keys for the entries of a .bib file
    Key {
        /// BibTeX file to read
        file: PathBuf,
        /// Library whose keys must be avoided (defaults to the configured one)
        #[arg(short, long)]
        library: Option<PathBuf>,
    },
    /// Format citations for the entries of a .bib file
    Cite {
        /// BibTeX file to read
        file: PathBuf,
        /// Citation style for full references
        #[arg(short, long, value_parser = ["apa", "mla", "chicago", "harvard", "vancouver", "abnt"])]
        style: Option<String>,
        /// Markup of the output
        #[arg(short, long, default_value = "plain", value_parser = ["plain", "html", "md", "tex"])]
        markup: String,
        /// Full reference instead of the in-text citation
        #[arg(long)]
        full: bool,
        /// Link the in-text citation to its DOI or URL
        #[arg(long, conflicts_with = "full")]
        link: bool,
    },
    /// Import a folder of .bib files (and matching PDFs) into the library
    Import {
        /// Folder holding the .bib files
        src: PathBuf,
        /// Target library (defaults to the configured one)
        #[arg(short, long)]
        library: Option<PathBuf>,
        /// Tag added to every imported note (repeatable)
        #[arg(short, long = "tag")]
        tags: Vec<String>,
        /// Note linked from every imported note (repeatable)
        #[arg(short, long)]
        related: Vec<String>,
        /// Skip the CrossRef lookup
        #[arg(long)]
        no_lookup: bool,
        /// Leave the source files in place
        #[arg(long)]
        keep_source: bool,
        /// Import each subfolder, tagging it with the folder name
        #[arg(long)]
        tree: bool,
    },
    /// Refresh the managed sections of every note in the library
    Update {
        /// Library to update (defaults to the configured one)
        #[arg(short, long)]
        library: Option<PathBuf>,
        /// Rewrite the metadata section
        #[arg(long)]
        head: bool,
        /// Rewrite the summary section
        #[arg(long)]
        body: bool,
        /// Rewrite the bibliography section
        #[arg(long)]
        tail: bool,
    },
    /// Split a multi-entry .bib file into one file per entry
    Explode {
        /// BibTeX file to split
        file: PathBuf,
    },
    /// Show or set configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand, Clone)]
enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Set a configuration value
    Set {
        /// Configuration key (library_dir, template, lookup_enabled, style, ...)
        key: String,
        /// Configuration value
        value: String,
    },
}

fn main() {
    let cli = Cli::parse();
    let output = Output::new(OutputFormat::from_flags(cli.json, cli.quiet));

    if let Err(e) = run(cli, &output) {
        eprintln!("Error: {:#}", e);
        if let Some(hint) = e
            .downcast_ref::<LibraryError>()
            .and_then(LibraryError::recovery_suggestion)
        {
            output.hint(hint);
        }
        std::process::exit(1);
    }
}

fn run(cli: Cli, output: &Output) -> Result<()> {
    // Config commands work on the file itself, before any loading
    if let Commands::Config { command } = &cli.command {
        return handle_config_command(command.clone(), cli.config.as_ref(), output);
    }

    let config =
        Config::load_with_cli_override(cli.config.as_ref()).context("Failed to load configuration")?;
    init_logging(&config);

    match cli.command {
        Commands::Parse { file } => commands::bib::parse(&file, output),
        Commands::Normalize { authors } => commands::bib::normalize(&authors, output),
        Commands::Key { file, library } => {
            let library = library.unwrap_or_else(|| config.library_dir.clone());
            commands::bib::key(&file, &library, output)
        }
        Commands::Cite {
            file,
            style,
            markup,
            full,
            link,
        } => handle_cite_command(file, style, &markup, full, link, &config, output),
        Commands::Import {
            src,
            library,
            tags,
            related,
            no_lookup,
            keep_source,
            tree,
        } => {
            let args = ImportArgs {
                src,
                library,
                tags,
                related,
                no_lookup,
                keep_source,
                tree,
            };
            commands::library::import(args, &config, output)
        }
        Commands::Update {
            library,
            head,
            body,
            tail,
        } => handle_update_command(library, head, body, tail, &config, output),
        Commands::Explode { file } => commands::bib::explode(&file, output),
        Commands::Config { .. } => unreachable!("handled above"),
    }
}

fn handle_config_command(
    command: Option<ConfigCommands>,
    config_path: Option<&PathBuf>,
    output: &Output,
) -> Result<()> {
    match command {
        Some(ConfigCommands::Show) | None => commands::config::show(config_path, output),
        Some(ConfigCommands::Set { key, value }) => {
            commands::config::set(key, value, config_path, output)
        }
    }
}

fn handle_cite_command(
    file: PathBuf,
    style: Option<String>,
    markup: &str,
    full: bool,
    link: bool,
    config: &Config,
    output: &Output,
) -> Result<()> {
    let options = CiteOptions {
        style: style
            .as_deref()
            .map(Style::parse)
            .unwrap_or_else(|| config.citation_style()),
        markup: Markup::parse(markup),
        full,
        link,
    };
    commands::cite::cite(&file, options, output)
}

fn handle_update_command(
    library: Option<PathBuf>,
    head: bool,
    body: bool,
    tail: bool,
    config: &Config,
    output: &Output,
) -> Result<()> {
    let scope = UpdateScope::from_flags(head, body, tail);
    commands::library::update(library, scope, config, output)
}

/// Initialize logging when BIBLION_LOG is set
///
/// Logs go to the configured log file when there is one, otherwise to
/// stderr so they never mix with command output.
fn init_logging(config: &Config) {
    let Ok(log_level) = std::env::var("BIBLION_LOG") else {
        return;
    };

    let env_filter = EnvFilter::new(format!(
        "biblion_core={},biblion_cli={}",
        log_level, log_level
    ));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false);

    match &config.log_file {
        Some(log_path) => {
            let log_file = match OpenOptions::new().create(true).append(true).open(log_path) {
                Ok(f) => f,
                Err(e) => {
                    eprintln!("Warning: Could not open log file {:?}: {}", log_path, e);
                    return;
                }
            };
            let _ = builder.with_ansi(false).with_writer(log_file).try_init();
            info!("Logging initialized to {:?}", log_path);
        }
        None => {
            let _ = builder.with_writer(std::io::stderr).try_init();
        }
    }
}
