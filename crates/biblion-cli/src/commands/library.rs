//! Import and update command handlers

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use tracing::info;

use biblion_core::library::{self, ImportOptions, ImportReport, UpdateScope};
use biblion_core::{Config, CrossrefClient, ReferenceLookup};

use crate::output::Output;

/// Flags of the import command
#[derive(Debug, Clone, Default)]
pub struct ImportArgs {
    pub src: PathBuf,
    pub library: Option<PathBuf>,
    pub tags: Vec<String>,
    pub related: Vec<String>,
    pub no_lookup: bool,
    pub keep_source: bool,
    pub tree: bool,
}

impl ImportArgs {
    fn options(&self, config: &Config) -> ImportOptions {
        ImportOptions {
            tags: self.tags.clone(),
            related: self.related.clone(),
            lookup: config.lookup_enabled && !self.no_lookup,
            keep_source: self.keep_source,
            style: config.citation_style(),
        }
    }
}

/// Import a folder (or a tree of folders) of `.bib` files
pub fn import(args: ImportArgs, config: &Config, output: &Output) -> Result<()> {
    if !args.src.is_dir() {
        bail!("Source folder not found: {}", args.src.display());
    }
    let library_dir = args.library.clone().unwrap_or_else(|| config.library_dir.clone());
    let template = config.template_text()?;
    let options = args.options(config);

    let client = if options.lookup {
        Some(
            CrossrefClient::new(config.lookup_timeout(), config.mailto.as_deref())
                .context("Failed to create CrossRef client")?,
        )
    } else {
        None
    };
    let lookup = client.as_ref().map(|c| c as &dyn ReferenceLookup);

    info!(src = %args.src.display(), library = %library_dir.display(), tree = args.tree, "import started");

    let report = run_import(&args.src, &library_dir, &options, lookup, &template, args.tree)?;
    output.print_import_report(&report);

    if !report.failed.is_empty() {
        bail!(
            "{} of {} reference(s) failed to import",
            report.failed.len(),
            report.failed.len() + report.imported.len()
        );
    }
    Ok(())
}

fn run_import(
    src: &Path,
    library_dir: &Path,
    options: &ImportOptions,
    lookup: Option<&dyn ReferenceLookup>,
    template: &str,
    tree: bool,
) -> Result<ImportReport> {
    let report = if tree {
        library::import_tree(src, library_dir, options, lookup, template)?
    } else {
        library::import_folder(src, library_dir, options, lookup, template)?
    };
    Ok(report)
}

/// Rewrite the managed sections of every note in the library
pub fn update(
    library: Option<PathBuf>,
    scope: UpdateScope,
    config: &Config,
    output: &Output,
) -> Result<()> {
    let library_dir = library.unwrap_or_else(|| config.library_dir.clone());
    if !library_dir.is_dir() {
        bail!("Library folder not found: {}", library_dir.display());
    }

    let report = library::update_notes(&library_dir, scope, config.citation_style())?;
    output.print_update_report(&report);

    if !report.failed.is_empty() {
        bail!("{} note(s) could not be updated", report.failed.len());
    }
    Ok(())
}
