//! Handlers for commands that work on single `.bib` files

use std::path::Path;

use anyhow::{Context, Result};

use biblion_core::{authors, bibtex, citekey, library, BibEntry};

use crate::output::{KeyRow, Output};

/// Parse a `.bib` file and list its entries
pub fn parse(file: &Path, output: &Output) -> Result<()> {
    let entries = bibtex::read_file(file)?;
    output.print_entries(&entries);
    Ok(())
}

/// Normalize an author list given on the command line
pub fn normalize(authors_text: &str, output: &Output) -> Result<()> {
    output.print_value("authors", &authors::normalize(authors_text));
    Ok(())
}

/// Generate a free citation key for each entry of a file
pub fn key(file: &Path, library_dir: &Path, output: &Output) -> Result<()> {
    let entries = bibtex::read_file(file)?;
    let rows = generate_keys(&entries, library_dir)?;
    output.print_keys(&rows);
    Ok(())
}

fn generate_keys(entries: &[BibEntry], library_dir: &Path) -> Result<Vec<KeyRow>> {
    let mut existing = if library_dir.is_dir() {
        library::existing_keys(library_dir)
            .with_context(|| format!("Failed to read library {:?}", library_dir))?
    } else {
        Default::default()
    };

    let mut rows = Vec::with_capacity(entries.len());
    for entry in entries {
        let key = citekey::generate(entry, Some(&existing))?;
        existing.insert(key.clone());
        rows.push(KeyRow {
            source_key: entry.citation_key.clone(),
            key,
        });
    }
    Ok(rows)
}

/// Split a multi-entry `.bib` file into one file per entry
pub fn explode(file: &Path, output: &Output) -> Result<()> {
    let created = library::explode(file)?;
    output.print_paths(&created);
    Ok(())
}
