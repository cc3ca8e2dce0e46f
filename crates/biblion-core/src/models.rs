//! Data models for biblion
//!
//! Defines the bibliographic record (`BibEntry`) and its entry-type
//! vocabulary. Known BibTeX fields are typed; anything else lands in an
//! open extension map so unusual `.bib` files survive a round trip.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// BibTeX entry type
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum EntryType {
    Article,
    Book,
    InBook,
    InCollection,
    Proceedings,
    InProceedings,
    Conference,
    PhdThesis,
    MastersThesis,
    TechReport,
    Manual,
    Unpublished,
    Misc,
    /// Any type outside the vocabulary, kept lowercase as written
    Other(String),
}

impl EntryType {
    /// Parse a type name, case-insensitively
    pub fn parse(name: &str) -> Self {
        let lower = name.trim().to_lowercase();
        match lower.as_str() {
            "article" => EntryType::Article,
            "book" => EntryType::Book,
            "inbook" => EntryType::InBook,
            "incollection" => EntryType::InCollection,
            "proceedings" => EntryType::Proceedings,
            "inproceedings" => EntryType::InProceedings,
            "conference" => EntryType::Conference,
            "phdthesis" => EntryType::PhdThesis,
            "mastersthesis" => EntryType::MastersThesis,
            "techreport" => EntryType::TechReport,
            "manual" => EntryType::Manual,
            "unpublished" => EntryType::Unpublished,
            "misc" => EntryType::Misc,
            _ => EntryType::Other(lower),
        }
    }

    /// The BibTeX name of this type
    pub fn as_str(&self) -> &str {
        match self {
            EntryType::Article => "article",
            EntryType::Book => "book",
            EntryType::InBook => "inbook",
            EntryType::InCollection => "incollection",
            EntryType::Proceedings => "proceedings",
            EntryType::InProceedings => "inproceedings",
            EntryType::Conference => "conference",
            EntryType::PhdThesis => "phdthesis",
            EntryType::MastersThesis => "mastersthesis",
            EntryType::TechReport => "techreport",
            EntryType::Manual => "manual",
            EntryType::Unpublished => "unpublished",
            EntryType::Misc => "misc",
            EntryType::Other(name) => name,
        }
    }

    /// Whether this type belongs to the fixed vocabulary
    pub fn is_known(&self) -> bool {
        !matches!(self, EntryType::Other(_))
    }
}

impl Default for EntryType {
    fn default() -> Self {
        EntryType::Misc
    }
}

impl fmt::Display for EntryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for EntryType {
    fn from(s: String) -> Self {
        EntryType::parse(&s)
    }
}

impl From<&str> for EntryType {
    fn from(s: &str) -> Self {
        EntryType::parse(s)
    }
}

impl From<EntryType> for String {
    fn from(t: EntryType) -> Self {
        t.as_str().to_string()
    }
}

/// Names of the typed fields, in canonical output order
pub const KNOWN_FIELDS: &[&str] = &[
    "author",
    "title",
    "year",
    "journal",
    "booktitle",
    "volume",
    "number",
    "pages",
    "doi",
    "url",
    "publisher",
    "address",
    "school",
    "institution",
    "note",
    "abstract",
    "keywords",
];

/// A single bibliographic record: one `@type{key, ...}` block
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BibEntry {
    /// Entry type (article, book, ...)
    pub entry_type: EntryType,
    /// Citation key, unique within a library
    pub citation_key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub journal: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub booktitle: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volume: Option<String>,
    /// Issue number (`issue` is accepted as an alias)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pages: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doi: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub publisher: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub school: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub institution: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(rename = "abstract", skip_serializing_if = "Option::is_none")]
    pub abstract_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keywords: Option<String>,
    /// Fields outside the typed set, keyed by lowercase name
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, String>,
}

impl BibEntry {
    /// Create an entry with the given type and citation key
    pub fn new(entry_type: impl Into<EntryType>, citation_key: impl Into<String>) -> Self {
        Self {
            entry_type: entry_type.into(),
            citation_key: citation_key.into(),
            ..Default::default()
        }
    }

    fn slot(&self, name: &str) -> Option<&Option<String>> {
        let slot = match name {
            "author" => &self.author,
            "title" => &self.title,
            "year" => &self.year,
            "journal" => &self.journal,
            "booktitle" => &self.booktitle,
            "volume" => &self.volume,
            "number" | "issue" => &self.number,
            "pages" => &self.pages,
            "doi" => &self.doi,
            "url" => &self.url,
            "publisher" => &self.publisher,
            "address" => &self.address,
            "school" => &self.school,
            "institution" => &self.institution,
            "note" => &self.note,
            "abstract" => &self.abstract_text,
            "keywords" => &self.keywords,
            _ => return None,
        };
        Some(slot)
    }

    fn slot_mut(&mut self, name: &str) -> Option<&mut Option<String>> {
        let slot = match name {
            "author" => &mut self.author,
            "title" => &mut self.title,
            "year" => &mut self.year,
            "journal" => &mut self.journal,
            "booktitle" => &mut self.booktitle,
            "volume" => &mut self.volume,
            "number" | "issue" => &mut self.number,
            "pages" => &mut self.pages,
            "doi" => &mut self.doi,
            "url" => &mut self.url,
            "publisher" => &mut self.publisher,
            "address" => &mut self.address,
            "school" => &mut self.school,
            "institution" => &mut self.institution,
            "note" => &mut self.note,
            "abstract" => &mut self.abstract_text,
            "keywords" => &mut self.keywords,
            _ => return None,
        };
        Some(slot)
    }

    /// Get a field by name (case-insensitive)
    ///
    /// `entry_type` and `citation_key` are readable through here too. A
    /// BibTeX `type` field (e.g. the kind of a thesis) is an ordinary field.
    pub fn get(&self, name: &str) -> Option<&str> {
        let name = name.trim().to_lowercase();
        match name.as_str() {
            "entry_type" => Some(self.entry_type.as_str()),
            "citation_key" => Some(self.citation_key.as_str()),
            _ => match self.slot(&name) {
                Some(slot) => slot.as_deref(),
                None => self.extra.get(&name).map(String::as_str),
            },
        }
    }

    /// Set a field by name (case-insensitive)
    pub fn set(&mut self, name: &str, value: impl Into<String>) {
        let name = name.trim().to_lowercase();
        let value = value.into();
        match name.as_str() {
            "entry_type" => self.entry_type = EntryType::parse(&value),
            "citation_key" => self.citation_key = value,
            _ => match self.slot_mut(&name) {
                Some(slot) => *slot = Some(value),
                None => {
                    self.extra.insert(name, value);
                }
            },
        }
    }

    /// Remove a field by name, returning its previous value
    pub fn remove(&mut self, name: &str) -> Option<String> {
        let name = name.trim().to_lowercase();
        match self.slot_mut(&name) {
            Some(slot) => slot.take(),
            None => self.extra.remove(&name),
        }
    }

    /// Whether a field is set (empty strings count as set)
    pub fn has(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// All set fields except type and key, in canonical order
    pub fn fields(&self) -> Vec<(&str, &str)> {
        let mut fields: Vec<(&str, &str)> = KNOWN_FIELDS
            .iter()
            .filter_map(|&name| {
                self.slot(name)
                    .and_then(|slot| slot.as_deref())
                    .map(|value| (name, value))
            })
            .collect();
        fields.extend(self.extra.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        fields
    }

    /// Trim whitespace around every value
    pub fn trim_values(&mut self) {
        self.citation_key = self.citation_key.trim().to_string();
        for name in KNOWN_FIELDS {
            if let Some(Some(value)) = self.slot_mut(name) {
                *value = value.trim().to_string();
            }
        }
        for value in self.extra.values_mut() {
            *value = value.trim().to_string();
        }
    }

    /// The container title: journal, falling back to booktitle
    pub fn container(&self) -> Option<&str> {
        self.journal.as_deref().or(self.booktitle.as_deref())
    }

    /// Link target for this entry: the DOI resolver if a DOI is set, else the URL
    pub fn link(&self) -> Option<String> {
        match (&self.doi, &self.url) {
            (Some(doi), _) if !doi.trim().is_empty() => {
                Some(format!("https://doi.org/{}", doi.trim()))
            }
            (_, Some(url)) if !url.trim().is_empty() => Some(url.trim().to_string()),
            _ => None,
        }
    }
}
