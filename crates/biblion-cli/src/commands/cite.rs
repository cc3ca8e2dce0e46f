//! Cite command handler

use std::path::Path;

use anyhow::Result;

use biblion_core::cite::{cite_full, cite_in_text, cite_in_text_linked};
use biblion_core::{bibtex, BibEntry, LibraryError, Markup, Style};

use crate::output::{CitationRow, Output};

/// How citations should be rendered
#[derive(Debug, Clone, Copy)]
pub struct CiteOptions {
    pub style: Style,
    pub markup: Markup,
    pub full: bool,
    pub link: bool,
}

/// Print a citation for every entry of a `.bib` file
pub fn cite(file: &Path, options: CiteOptions, output: &Output) -> Result<()> {
    let entries = bibtex::read_file(file)?;
    if entries.is_empty() {
        return Err(LibraryError::EmptyBibFile {
            path: file.to_path_buf(),
        }
        .into());
    }

    let rows: Vec<CitationRow> = entries.iter().map(|e| citation_row(e, options)).collect();
    output.print_citations(&rows);
    Ok(())
}

fn citation_row(entry: &BibEntry, options: CiteOptions) -> CitationRow {
    let citation = if options.full {
        cite_full(entry, options.style, options.markup, &entry.entry_type)
    } else if options.link {
        cite_in_text_linked(entry, options.markup)
    } else {
        cite_in_text(entry, options.markup)
    };
    CitationRow {
        key: entry.citation_key.clone(),
        citation,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn beven() -> BibEntry {
        bibtex::parse(
            "@article{Beven1989a,\n  author = {Beven, K},\n  year = {1989},\n  title = {Changing ideas},\n  journal = {HSJ},\n  volume = {34},\n  number = {3},\n  pages = {1-12},\n  doi = {10.1/x}\n}\n",
        )
        .remove(0)
    }

    fn options(full: bool, link: bool) -> CiteOptions {
        CiteOptions {
            style: Style::Apa,
            markup: Markup::Markdown,
            full,
            link,
        }
    }

    #[test]
    fn test_in_text_row() {
        let row = citation_row(&beven(), options(false, false));
        assert_eq!(row.key, "Beven1989a");
        assert_eq!(row.citation, "Beven (1989)");
    }

    #[test]
    fn test_linked_row() {
        let row = citation_row(&beven(), options(false, true));
        assert_eq!(row.citation, "[Beven (1989)](https://doi.org/10.1/x)");
    }

    #[test]
    fn test_full_row_uses_style() {
        let row = citation_row(&beven(), options(true, false));
        assert!(row.citation.starts_with("Beven, K (1989)."));
        assert!(row.citation.contains("Changing ideas"));
    }
}
