//! Reference notes
//!
//! A reference note is a Markdown note with three managed sections: the
//! head holds `key: value` metadata, the body holds citations generated from
//! it, and the tail holds the BibTeX snippet with tags and related links.
//! Updates replace only a section's own lines, so sub-sections written by
//! hand survive regeneration.

use std::collections::BTreeMap;
use std::path::Path;

use lazy_static::lazy_static;
use regex::Regex;

use crate::bibtex;
use crate::cite::{self, Markup, Style};
use crate::error::LibraryResult;
use crate::models::BibEntry;
use crate::note::{render_template, NoteDocument};

/// Head section title
pub const HEAD: &str = "Metadata";
/// Body section title
pub const BODY: &str = "Summary";
/// Tail section title
pub const TAIL: &str = "Bibliography";
/// Child of the tail listing works cited by the reference
pub const CITED_REFERENCES: &str = "Cited References";

/// Template used when none is configured
pub const DEFAULT_TEMPLATE: &str = "\
---
aliases:
  - {{CitationIn}}
---

# Metadata

# Summary

## Notes

# Bibliography
";

/// Metadata keys that are not BibTeX fields
///
/// Note-only keys carry a `note_` prefix so BibTeX fields such as `file`
/// or `tags` keep their own lines.
mod keys {
    pub const TYPE: &str = "entry_type";
    pub const CITATION_KEY: &str = "citation_key";
    pub const CITATION_IN: &str = "citation_in";
    pub const FILE: &str = "note_file";
    pub const TAGS: &str = "note_tags";
    pub const RELATED: &str = "note_related";
    pub const TIMESTAMP: &str = "note_timestamp";

    pub const DERIVED: &[&str] = &[CITATION_IN, FILE, TAGS, RELATED, TIMESTAMP];
}

lazy_static! {
    static ref METADATA_LINE: Regex =
        Regex::new(r"^\s*([A-Za-z][A-Za-z0-9_-]*)\s*:\s*(.*?)\s*$").unwrap();
}

/// Ordered `key: value` pairs stored in the head section
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Metadata {
    fields: Vec<(String, String)>,
}

impl Metadata {
    /// Type, key and every set field of an entry
    pub fn from_entry(entry: &BibEntry) -> Self {
        let mut metadata = Self::default();
        metadata.set(keys::TYPE, entry.entry_type.as_str());
        metadata.set(keys::CITATION_KEY, &entry.citation_key);
        for (name, value) in entry.fields() {
            metadata.set(name, value);
        }
        metadata
    }

    /// Read `key: value` lines; anything else is ignored
    pub fn parse(lines: &[String]) -> Self {
        let mut metadata = Self::default();
        for line in lines {
            if let Some(caps) = METADATA_LINE.captures(line) {
                metadata.set(&caps[1], &caps[2]);
            }
        }
        metadata
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Set a value in place, appending new keys
    ///
    /// Values are collapsed to one line; empty values remove the key.
    pub fn set(&mut self, key: &str, value: &str) {
        let value = value.split_whitespace().collect::<Vec<_>>().join(" ");
        if value.is_empty() {
            self.remove(key);
            return;
        }
        match self.fields.iter_mut().find(|(k, _)| k == key) {
            Some((_, existing)) => *existing = value,
            None => self.fields.push((key.to_string(), value)),
        }
    }

    pub fn remove(&mut self, key: &str) {
        self.fields.retain(|(k, _)| k != key);
    }

    /// Comma-separated list value
    pub fn list(&self, key: &str) -> Vec<String> {
        self.get(key)
            .map(|v| {
                v.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn set_list(&mut self, key: &str, items: &[String]) {
        self.set(key, &items.join(", "));
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Template tokens: `citation_key` becomes `{{CitationKey}}`
    pub fn tokens(&self) -> BTreeMap<String, String> {
        self.iter()
            .map(|(k, v)| (token_name(k), v.to_string()))
            .collect()
    }

    fn lines(&self) -> Vec<String> {
        let mut lines = vec![String::new()];
        lines.extend(self.iter().map(|(k, v)| format!("{}: {}", k, v)));
        lines.push(String::new());
        lines
    }
}

fn token_name(key: &str) -> String {
    key.split(['_', '-'])
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect()
}

/// `- key: value` lines for a note field written as `{key=value; ...}`
fn structured_note_lines(note: &str) -> Vec<String> {
    if !note.trim_start().starts_with('{') {
        return Vec::new();
    }
    bibtex::parse_note_field(note)
        .into_iter()
        .map(|(key, value)| format!("- {}: {}", key, value))
        .collect()
}

/// Paragraph blocks separated and surrounded by blank lines
fn blocks(parts: Vec<Vec<String>>) -> Vec<String> {
    let mut lines = vec![String::new()];
    for part in parts.into_iter().filter(|p| !p.is_empty()) {
        lines.extend(part);
        lines.push(String::new());
    }
    lines
}

/// Derived values attached to a new note
#[derive(Debug, Clone, Default)]
pub struct NoteContext {
    pub timestamp: String,
    /// File name of the companion document, if any
    pub file: Option<String>,
    pub tags: Vec<String>,
    pub related: Vec<String>,
    /// Works cited by the reference, from an online lookup
    pub references: Vec<String>,
    pub style: Style,
}

/// A note bound to one bibliographic reference
#[derive(Debug, Clone)]
pub struct ReferenceNote {
    doc: NoteDocument,
    metadata: Metadata,
    style: Style,
}

impl ReferenceNote {
    /// Build a note for an entry from a template
    pub fn from_entry(entry: &BibEntry, template: &str, ctx: &NoteContext) -> Self {
        let mut metadata = Metadata::from_entry(entry);
        metadata.set(keys::CITATION_IN, &cite::cite_in_text(entry, Markup::Plain));
        if let Some(file) = &ctx.file {
            metadata.set(keys::FILE, file);
        }
        metadata.set_list(keys::TAGS, &ctx.tags);
        metadata.set_list(keys::RELATED, &ctx.related);
        metadata.set(keys::TIMESTAMP, &ctx.timestamp);

        let text = render_template(template, &metadata.tokens());
        let mut note = Self {
            doc: NoteDocument::parse(&text),
            metadata,
            style: ctx.style,
        };
        note.update_head();
        note.update_body();
        note.update_tail();

        if !ctx.references.is_empty() {
            note.doc.push_section(CITED_REFERENCES, Some(TAIL));
            let mut lines = vec![String::new()];
            lines.extend(ctx.references.iter().map(|r| format!("- {}", r)));
            lines.push(String::new());
            note.doc.set_content(CITED_REFERENCES, lines);
        }
        note
    }

    /// Parse a note from text, reading metadata from the head section
    pub fn parse(text: &str) -> Self {
        Self::from_document(NoteDocument::parse(text))
    }

    pub fn load(path: &Path) -> LibraryResult<Self> {
        Ok(Self::from_document(NoteDocument::load(path)?))
    }

    fn from_document(doc: NoteDocument) -> Self {
        let metadata = Metadata::parse(doc.content(HEAD).unwrap_or_default());
        Self {
            doc,
            metadata,
            style: Style::default(),
        }
    }

    /// Style used for the full citation in the body
    pub fn with_style(mut self, style: Style) -> Self {
        self.style = style;
        self
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    pub fn metadata_mut(&mut self) -> &mut Metadata {
        &mut self.metadata
    }

    pub fn document(&self) -> &NoteDocument {
        &self.doc
    }

    pub fn citation_key(&self) -> Option<&str> {
        self.metadata.get(keys::CITATION_KEY)
    }

    pub fn tags(&self) -> Vec<String> {
        self.metadata.list(keys::TAGS)
    }

    pub fn related(&self) -> Vec<String> {
        self.metadata.list(keys::RELATED)
    }

    /// Rebuild the bibliographic entry from metadata
    pub fn entry(&self) -> BibEntry {
        let mut entry = BibEntry::new(
            self.metadata.get(keys::TYPE).unwrap_or("misc"),
            self.metadata.get(keys::CITATION_KEY).unwrap_or_default(),
        );
        for (key, value) in self.metadata.iter() {
            if key == keys::TYPE || key == keys::CITATION_KEY || keys::DERIVED.contains(&key) {
                continue;
            }
            entry.set(key, value);
        }
        entry
    }

    /// Rewrite the head from metadata
    pub fn update_head(&mut self) {
        self.doc.set_content(HEAD, self.metadata.lines());
    }

    /// Rewrite the body's own lines: citations, file link, structured
    /// reading notes and abstract
    pub fn update_body(&mut self) {
        let entry = self.entry();

        let mut summary = vec![
            format!(
                "- In-text: {}",
                cite::cite_in_text_linked(&entry, Markup::Markdown)
            ),
            format!(
                "- Reference: {}",
                cite::cite_full(&entry, self.style, Markup::Markdown, &entry.entry_type)
            ),
        ];
        if let Some(file) = self.metadata.get(keys::FILE) {
            summary.push(format!("- File: [[{}]]", file));
        }

        let reading = entry
            .get("note")
            .map(structured_note_lines)
            .unwrap_or_default();

        let abstract_text = entry
            .abstract_text
            .as_deref()
            .map(|a| vec![a.to_string()])
            .unwrap_or_default();

        self.doc
            .set_content(BODY, blocks(vec![summary, reading, abstract_text]));
    }

    /// Rewrite the tail's own lines: BibTeX snippet, tags and related links
    pub fn update_tail(&mut self) {
        let entry = self.entry();

        let mut snippet = vec!["```bibtex".to_string()];
        snippet.extend(bibtex::serialize(&entry).lines().map(str::to_string));
        snippet.push("```".to_string());

        let tags = self.tags();
        let tag_line = if tags.is_empty() {
            Vec::new()
        } else {
            let tags: Vec<String> = tags.iter().map(|t| format!("#{}", t)).collect();
            vec![format!("Tags: {}", tags.join(" "))]
        };

        let related = self.related();
        let related_line = if related.is_empty() {
            Vec::new()
        } else {
            let links: Vec<String> = related.iter().map(|r| format!("[[{}]]", r)).collect();
            vec![format!("Related: {}", links.join(" "))]
        };

        self.doc
            .set_content(TAIL, blocks(vec![snippet, tag_line, related_line]));
    }

    pub fn render(&self) -> String {
        self.doc.render()
    }

    pub fn save(&mut self, path: &Path) -> LibraryResult<()> {
        self.doc.save(path)
    }
}
