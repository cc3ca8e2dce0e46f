//! BibTeX reading and writing
//!
//! The parser is line oriented and forgiving: it never fails, it only
//! produces incomplete entries when the input is odd. The writer always
//! emits one `key = {value}` line per field and closes with `\n}\n`.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use tracing::debug;

use crate::error::{LibraryError, LibraryResult};
use crate::models::BibEntry;

/// `@` blocks that are not bibliographic entries
const NON_ENTRY_BLOCKS: &[&str] = &["comment", "preamble", "string"];

/// Parser state while scanning lines
#[derive(Default)]
struct Scanner {
    entries: Vec<BibEntry>,
    current: Option<BibEntry>,
    /// Field receiving continuation lines
    last_key: Option<String>,
    /// Unclosed `{` inside the current field value
    depth: i32,
    /// Inside an `@comment`/`@string`/`@preamble` block
    skipping: bool,
}

impl Scanner {
    fn flush(&mut self) {
        if let Some(mut entry) = self.current.take() {
            entry.trim_values();
            debug!(key = %entry.citation_key, "parsed entry");
            self.entries.push(entry);
        }
        self.last_key = None;
        self.depth = 0;
    }

    fn open_entry(&mut self, line: &str) {
        self.flush();
        let header = line.trim_start_matches('@');
        let (entry_type, key) = match header.split_once('{') {
            Some((t, k)) => (t.trim(), k),
            None => (header.trim(), ""),
        };

        if NON_ENTRY_BLOCKS.contains(&entry_type.to_lowercase().as_str()) {
            self.skipping = true;
            return;
        }
        self.skipping = false;

        let key = key.trim().trim_end_matches(',').trim();
        self.current = Some(BibEntry::new(entry_type, key));
    }

    fn assign(&mut self, line: &str) {
        let Some(entry) = self.current.as_mut() else {
            return;
        };
        let Some((key, raw)) = line.split_once('=') else {
            return;
        };
        let key = key.trim().to_lowercase();
        if key.is_empty() {
            return;
        }
        // `issue` and `number` share one slot
        let key = if key == "issue" {
            "number".to_string()
        } else {
            key
        };

        self.depth = brace_balance(raw);
        entry.set(&key, strip_value(raw));
        self.last_key = Some(key);
    }

    fn continue_value(&mut self, line: &str) {
        let (Some(entry), Some(key)) = (self.current.as_mut(), self.last_key.as_ref()) else {
            return;
        };
        self.depth += brace_balance(line);
        let piece = strip_value(line);
        if piece.is_empty() {
            return;
        }
        let joined = match entry.get(key) {
            Some(existing) if !existing.is_empty() => format!("{} {}", existing, piece),
            _ => piece,
        };
        entry.set(key, joined);
    }

    fn scan(&mut self, raw_line: &str) {
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with('%') {
            return;
        }

        if line.starts_with('@') {
            self.open_entry(line);
            return;
        }
        if self.skipping {
            return;
        }

        if line == "}" {
            self.last_key = None;
            self.depth = 0;
            return;
        }

        if self.depth <= 0 && line.contains('=') && self.current.is_some() {
            self.assign(line);
        } else {
            self.continue_value(line);
        }
    }
}

/// Count of `{` minus `}` in a piece of text
fn brace_balance(text: &str) -> i32 {
    text.chars().fold(0, |acc, c| match c {
        '{' => acc + 1,
        '}' => acc - 1,
        _ => acc,
    })
}

/// Strip one layer of delimiters and the trailing comma from a raw value
fn strip_value(raw: &str) -> String {
    let mut value = raw.trim();
    value = value.strip_suffix(',').unwrap_or(value).trim_end();

    if let Some(inner) = value.strip_prefix('"') {
        value = inner.strip_suffix('"').unwrap_or(inner);
        return value.trim().to_string();
    }

    value = value.strip_prefix('{').unwrap_or(value);
    value = value.strip_suffix('}').unwrap_or(value);

    // A closing brace of the entry itself may share the line
    let mut owned = value.trim().to_string();
    while brace_balance(&owned) < 0 && owned.ends_with('}') {
        owned.pop();
        owned = owned.trim_end().trim_end_matches(',').to_string();
    }
    owned
}

/// Parse BibTeX text into entries
///
/// Never fails: lines that fit no pattern are ignored.
pub fn parse(text: &str) -> Vec<BibEntry> {
    let mut scanner = Scanner::default();
    for line in text.lines() {
        scanner.scan(line);
    }
    scanner.flush();
    scanner.entries
}

/// Serialize one entry to BibTeX text
pub fn serialize(entry: &BibEntry) -> String {
    let mut body = String::new();
    for (key, value) in entry.fields() {
        body.push_str(&format!(" {} = {{{}}},\n", key, value));
    }
    let body = body.trim_end_matches('\n').trim_end_matches(',');

    let mut result = format!("@{}{{{},\n", entry.entry_type, entry.citation_key);
    result.push_str(body);
    result.push_str("\n}\n");
    result
}

/// Serialize several entries, separated by a blank line
pub fn serialize_all(entries: &[BibEntry]) -> String {
    entries
        .iter()
        .map(serialize)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Read and parse a `.bib` file
pub fn read_file(path: &Path) -> LibraryResult<Vec<BibEntry>> {
    let text =
        fs::read_to_string(path).map_err(|e| LibraryError::from_read(e, path.to_path_buf()))?;
    Ok(parse(&text))
}

/// Write one entry to a `.bib` file, replacing it
pub fn write_file(path: &Path, entry: &BibEntry) -> LibraryResult<()> {
    fs::write(path, serialize(entry)).map_err(|e| LibraryError::from_write(e, path.to_path_buf()))
}

/// Decode the structured note convention `{key=value; key=value}`
///
/// Some reference managers export reading notes this way inside the
/// `note` field. Pieces without `=` are dropped.
pub fn parse_note_field(note: &str) -> BTreeMap<String, String> {
    let mut parsed = BTreeMap::new();
    let trimmed = note.trim().trim_start_matches('{').trim_end_matches('}');

    for piece in trimmed.split(';') {
        let Some((key, value)) = piece.split_once('=') else {
            continue;
        };
        let key = key.replace("<br/>", "").replace('\\', "");
        let key = key.trim();
        if key.is_empty() {
            continue;
        }
        let value = value
            .replace('\\', "")
            .trim()
            .trim_start_matches('{')
            .trim_end_matches('}')
            .trim()
            .to_string();
        parsed.insert(key.to_string(), value);
    }
    parsed
}
