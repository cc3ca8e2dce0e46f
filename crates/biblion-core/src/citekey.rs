//! Citation key generation
//!
//! Keys look like `Beven1989a`: capitalized first-author surname, year and
//! a one-letter suffix that advances past keys already in the library.

use std::collections::BTreeSet;

use tracing::debug;

use crate::authors;
use crate::error::{LibraryError, LibraryResult};
use crate::models::BibEntry;

/// Surname used when an entry has no author
const ANONYMOUS: &str = "Anon";

/// Year used when an entry has no year
const NO_YEAR: &str = "nd";

/// Capitalize like a title word: first letter upper, the rest lower
fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}

/// The key without its suffix, e.g. `Beven1989`
pub fn key_base(entry: &BibEntry) -> String {
    let surname = entry
        .author
        .as_deref()
        .map(authors::split)
        .and_then(|names| names.into_iter().next())
        .map(|first| {
            authors::last_name(&first)
                .chars()
                .filter(|c| c.is_alphanumeric())
                .collect::<String>()
        })
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| ANONYMOUS.to_string());

    let year: String = entry
        .year
        .as_deref()
        .map(|y| y.chars().filter(|c| c.is_alphanumeric()).collect())
        .filter(|y: &String| !y.is_empty())
        .unwrap_or_else(|| NO_YEAR.to_string());

    format!("{}{}", capitalize(&surname), year)
}

/// Generate a citation key for an entry
///
/// Without a conflict set the suffix is always `a`. With one, the suffix
/// advances `a..=z` until the key is free; running past `z` is an error.
pub fn generate(entry: &BibEntry, existing: Option<&BTreeSet<String>>) -> LibraryResult<String> {
    let base = key_base(entry);

    let Some(existing) = existing else {
        return Ok(format!("{}a", base));
    };

    for suffix in 'a'..='z' {
        let candidate = format!("{}{}", base, suffix);
        if !existing.contains(&candidate) {
            debug!(key = %candidate, "generated citation key");
            return Ok(candidate);
        }
    }

    Err(LibraryError::KeySpaceExhausted { base })
}

/// Normalize the author list and assign a fresh key in place
///
/// The returned key is the one written to the entry.
pub fn standardize(
    entry: &mut BibEntry,
    existing: Option<&BTreeSet<String>>,
) -> LibraryResult<String> {
    if let Some(author) = entry.author.as_deref() {
        entry.author = Some(authors::normalize(author));
    }
    let key = generate(entry, existing)?;
    entry.citation_key = key.clone();
    Ok(key)
}
