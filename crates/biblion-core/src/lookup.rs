//! Online reference lookup
//!
//! Enriches references from the CrossRef works API. Lookups degrade
//! gracefully: any network or decoding failure is logged and yields `None`,
//! and the caller carries on with what it has.

use std::time::Duration;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::models::{BibEntry, EntryType};

/// CrossRef works endpoint
pub const CROSSREF_API: &str = "https://api.crossref.org/works";

/// Default lookup timeout in seconds
pub const LOOKUP_TIMEOUT: u64 = 10;

/// Metadata found for a free-text query
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LookupRecord {
    pub entry_type: Option<EntryType>,
    pub doi: Option<String>,
    pub title: Option<String>,
    pub author: Option<String>,
    pub year: Option<String>,
    pub journal: Option<String>,
    pub volume: Option<String>,
    pub number: Option<String>,
    pub pages: Option<String>,
    pub publisher: Option<String>,
    pub url: Option<String>,
    /// Works cited by the record, as free text or DOI
    #[serde(default)]
    pub references: Vec<String>,
}

impl LookupRecord {
    /// Build an entry from the record under the given key
    pub fn to_entry(&self, citation_key: &str) -> BibEntry {
        let mut entry = BibEntry::new(
            self.entry_type.clone().unwrap_or_default(),
            citation_key,
        );
        let fields = [
            ("doi", &self.doi),
            ("title", &self.title),
            ("author", &self.author),
            ("year", &self.year),
            ("journal", &self.journal),
            ("volume", &self.volume),
            ("number", &self.number),
            ("pages", &self.pages),
            ("publisher", &self.publisher),
            ("url", &self.url),
        ];
        for (name, value) in fields {
            if let Some(value) = value {
                entry.set(name, value.as_str());
            }
        }
        entry
    }
}

/// Source of reference metadata
pub trait ReferenceLookup {
    /// Best match for a free-text bibliographic query
    fn lookup(&self, query: &str) -> Option<LookupRecord>;
}

/// Query text for an entry: title, author and year
pub fn query_for(entry: &BibEntry) -> String {
    [&entry.title, &entry.author, &entry.year]
        .into_iter()
        .filter_map(|v| v.as_deref())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .collect::<Vec<_>>()
        .join(" AND ")
}

#[derive(Debug, Deserialize)]
struct CrossrefResponse {
    message: CrossrefWorkList,
}

#[derive(Debug, Deserialize)]
struct CrossrefWorkList {
    #[serde(default)]
    items: Vec<CrossrefWork>,
}

#[derive(Debug, Deserialize)]
struct CrossrefWork {
    #[serde(rename = "DOI")]
    doi: Option<String>,
    #[serde(rename = "type")]
    work_type: Option<String>,
    title: Option<Vec<String>>,
    author: Option<Vec<CrossrefAuthor>>,
    #[serde(rename = "container-title")]
    container_title: Option<Vec<String>>,
    issued: Option<CrossrefDate>,
    volume: Option<String>,
    issue: Option<String>,
    page: Option<String>,
    publisher: Option<String>,
    #[serde(rename = "URL")]
    url: Option<String>,
    reference: Option<Vec<CrossrefReference>>,
}

#[derive(Debug, Deserialize)]
struct CrossrefAuthor {
    given: Option<String>,
    family: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CrossrefDate {
    #[serde(rename = "date-parts")]
    date_parts: Option<Vec<Vec<Option<i32>>>>,
}

#[derive(Debug, Deserialize)]
struct CrossrefReference {
    unstructured: Option<String>,
    #[serde(rename = "DOI")]
    doi: Option<String>,
}

/// BibTeX type for a CrossRef work type
pub fn entry_type_for(work_type: &str) -> EntryType {
    match work_type {
        "journal-article" => EntryType::Article,
        "book" => EntryType::Book,
        "book-chapter" => EntryType::InCollection,
        "proceedings-article" => EntryType::InProceedings,
        "dissertation" => EntryType::PhdThesis,
        "report" => EntryType::TechReport,
        _ => EntryType::Misc,
    }
}

fn first(values: Option<Vec<String>>) -> Option<String> {
    values
        .and_then(|v| v.into_iter().next())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn map_work(work: CrossrefWork) -> LookupRecord {
    let author = work
        .author
        .unwrap_or_default()
        .into_iter()
        .filter_map(|a| match (a.family, a.given) {
            (Some(family), Some(given)) => Some(format!("{}, {}", family, given)),
            (Some(family), None) => Some(family),
            (None, Some(given)) => Some(given),
            (None, None) => None,
        })
        .collect::<Vec<_>>();

    let year = work
        .issued
        .and_then(|d| d.date_parts)
        .and_then(|parts| parts.into_iter().next())
        .and_then(|parts| parts.into_iter().next().flatten())
        .map(|y| y.to_string());

    let references = work
        .reference
        .unwrap_or_default()
        .into_iter()
        .filter_map(|r| r.unstructured.or(r.doi))
        .map(|r| r.split_whitespace().collect::<Vec<_>>().join(" "))
        .collect();

    LookupRecord {
        entry_type: work.work_type.as_deref().map(entry_type_for),
        doi: work.doi,
        title: first(work.title),
        author: if author.is_empty() {
            None
        } else {
            Some(author.join(" and "))
        },
        year,
        journal: first(work.container_title),
        volume: work.volume,
        number: work.issue,
        pages: work.page,
        publisher: work.publisher,
        url: work.url,
        references,
    }
}

/// Decode a works search response, keeping the first hit
pub fn parse_response(json: &str) -> Result<Option<LookupRecord>> {
    let response: CrossrefResponse = serde_json::from_str(json)?;
    Ok(response.message.items.into_iter().next().map(map_work))
}

/// CrossRef client on a blocking HTTP connection
pub struct CrossrefClient {
    client: reqwest::blocking::Client,
    base_url: String,
    mailto: Option<String>,
}

impl CrossrefClient {
    /// Create a client; `mailto` joins CrossRef's polite pool
    pub fn new(timeout: Duration, mailto: Option<&str>) -> Result<Self> {
        let agent = match mailto {
            Some(mail) => format!("biblion/{} (mailto:{})", env!("CARGO_PKG_VERSION"), mail),
            None => format!("biblion/{}", env!("CARGO_PKG_VERSION")),
        };
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(agent)
            .build()?;
        Ok(Self {
            client,
            base_url: CROSSREF_API.to_string(),
            mailto: mailto.map(str::to_string),
        })
    }

    /// Point the client at another works endpoint
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Request URL for a query
    pub fn query_url(&self, query: &str) -> String {
        let mut url = format!(
            "{}?query.bibliographic={}&rows=1",
            self.base_url,
            urlencoding::encode(query)
        );
        if let Some(mail) = &self.mailto {
            url.push_str("&mailto=");
            url.push_str(&urlencoding::encode(mail));
        }
        url
    }

    fn lookup_inner(&self, query: &str) -> Result<Option<LookupRecord>> {
        let url = self.query_url(query);
        debug!(%url, "querying crossref");

        let response = self.client.get(&url).send()?;
        if !response.status().is_success() {
            anyhow::bail!("crossref returned {}", response.status());
        }
        parse_response(&response.text()?)
    }
}

impl ReferenceLookup for CrossrefClient {
    fn lookup(&self, query: &str) -> Option<LookupRecord> {
        if query.trim().is_empty() {
            return None;
        }
        match self.lookup_inner(query) {
            Ok(record) => record,
            Err(e) => {
                warn!(query, error = %e, "reference lookup failed");
                None
            }
        }
    }
}
