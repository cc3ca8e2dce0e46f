//! Biblion Core Library
//!
//! This crate provides the core functionality for biblion, a personal
//! bibliography manager that keeps references as plain files: one `.bib`
//! entry, one Markdown note and an optional PDF per citation key.
//!
//! # Quick Start
//!
//! ```text
//! let entries = bibtex::read_file(Path::new("inbox/smith.bib"))?;
//! let mut entry = entries.into_iter().next().unwrap();
//!
//! // Normalize authors and assign a free key
//! let existing = library::existing_keys(Path::new("library"))?;
//! let key = citekey::standardize(&mut entry, Some(&existing))?;
//!
//! // Cite it
//! let text = cite::cite_full(&entry, Style::Apa, Markup::Markdown, &entry.entry_type);
//! ```
//!
//! # Modules
//!
//! - `bibtex`: Tolerant BibTeX reader and writer
//! - `authors`: Author list normalization
//! - `citekey`: Citation key generation
//! - `cite`: In-text and full citations in six styles
//! - `note`: Markdown notes as section trees
//! - `reference_note`: Notes bound to a reference
//! - `lookup`: CrossRef enrichment
//! - `library`: Import and update flows over a library folder
//! - `config`: Application configuration

pub mod authors;
pub mod bibtex;
pub mod cite;
pub mod citekey;
pub mod config;
pub mod error;
pub mod library;
pub mod lookup;
pub mod models;
pub mod note;
pub mod reference_note;

pub use cite::{Markup, Style};
pub use config::Config;
pub use error::{LibraryError, LibraryResult};
pub use library::{ImportOptions, ImportPlan, ImportReport, UpdateReport, UpdateScope};
pub use lookup::{CrossrefClient, LookupRecord, ReferenceLookup};
pub use models::{BibEntry, EntryType};
pub use note::{NoteDocument, NoteState};
pub use reference_note::{NoteContext, ReferenceNote};
