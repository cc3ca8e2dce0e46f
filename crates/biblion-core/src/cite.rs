//! Citation formatting
//!
//! Renders in-text (author-year) and full bibliographic citations from a
//! `BibEntry`. Full citations are looked up by style and entry type; every
//! template tolerates missing fields, so formatting never fails.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::authors;
use crate::bibtex;
use crate::models::{BibEntry, EntryType};

/// Fallback author label
pub const UNKNOWN_AUTHOR: &str = "Unknown Author";
/// Fallback year
pub const NO_DATE: &str = "n.d.";
/// Fallback title
pub const UNTITLED: &str = "Untitled";

/// Output text format of a citation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Markup {
    #[default]
    Plain,
    Html,
    #[serde(rename = "md")]
    Markdown,
    Tex,
}

impl Markup {
    /// Parse a markup name; anything unknown is plain text
    pub fn parse(name: &str) -> Self {
        match name.trim().to_lowercase().as_str() {
            "html" | "htm" => Markup::Html,
            "md" | "markdown" => Markup::Markdown,
            "tex" | "latex" => Markup::Tex,
            _ => Markup::Plain,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Markup::Plain => "plain",
            Markup::Html => "html",
            Markup::Markdown => "md",
            Markup::Tex => "tex",
        }
    }

    fn italic(&self, text: &str) -> String {
        match self {
            Markup::Plain => text.to_string(),
            Markup::Html => format!("<i>{}</i>", text),
            Markup::Markdown => format!("*{}*", text),
            Markup::Tex => format!("\\textit{{{}}}", text),
        }
    }

    fn bold(&self, text: &str) -> String {
        match self {
            Markup::Plain => text.to_string(),
            Markup::Html => format!("<b>{}</b>", text),
            Markup::Markdown => format!("**{}**", text),
            Markup::Tex => format!("\\textbf{{{}}}", text),
        }
    }

    fn et_al(&self) -> String {
        self.italic("et al.")
    }

    fn ampersand(&self) -> &'static str {
        match self {
            Markup::Plain | Markup::Markdown => "&",
            Markup::Html => "&amp;",
            Markup::Tex => "\\&",
        }
    }

    /// Wrap text in a hyperlink; plain text has no links
    fn link(&self, text: &str, url: &str) -> String {
        match self {
            Markup::Plain => text.to_string(),
            Markup::Html => format!("<a href=\"{}\">{}</a>", url, text),
            Markup::Markdown => format!("[{}]({})", text, url),
            Markup::Tex => format!("\\href{{{}}}{{{}}}", url, text),
        }
    }
}

impl fmt::Display for Markup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Named citation style
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Style {
    #[default]
    Apa,
    Mla,
    Chicago,
    Harvard,
    Vancouver,
    Abnt,
}

impl Style {
    pub const ALL: [Style; 6] = [
        Style::Apa,
        Style::Mla,
        Style::Chicago,
        Style::Harvard,
        Style::Vancouver,
        Style::Abnt,
    ];

    /// Parse a style name; anything unknown falls back to APA
    pub fn parse(name: &str) -> Self {
        match name.trim().to_lowercase().as_str() {
            "mla" => Style::Mla,
            "chicago" => Style::Chicago,
            "harvard" => Style::Harvard,
            "vancouver" => Style::Vancouver,
            "abnt" => Style::Abnt,
            _ => Style::Apa,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Style::Apa => "apa",
            Style::Mla => "mla",
            Style::Chicago => "chicago",
            Style::Harvard => "harvard",
            Style::Vancouver => "vancouver",
            Style::Abnt => "abnt",
        }
    }
}

impl fmt::Display for Style {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn year_of(entry: &BibEntry) -> &str {
    non_empty(entry.year.as_deref()).unwrap_or(NO_DATE)
}

/// In-text citation: `Surname (Year)`, `A & B (Year)` or `A et al. (Year)`
pub fn cite_in_text(entry: &BibEntry, markup: Markup) -> String {
    let names = entry
        .author
        .as_deref()
        .map(authors::split)
        .unwrap_or_default();
    let surnames: Vec<&str> = names.iter().map(|n| authors::last_name(n)).collect();

    let label = match surnames.as_slice() {
        [] => UNKNOWN_AUTHOR.to_string(),
        [only] => only.to_string(),
        [first, second] => format!("{} {} {}", first, markup.ampersand(), second),
        [first, ..] => format!("{} {}", first, markup.et_al()),
    };

    format!("{} ({})", label, year_of(entry))
}

/// In-text citation wrapped in a link to the DOI (or URL)
///
/// Unchanged when the entry has neither or the markup is plain.
pub fn cite_in_text_linked(entry: &BibEntry, markup: Markup) -> String {
    let citation = cite_in_text(entry, markup);
    match entry.link() {
        Some(url) => markup.link(&citation, &url),
        None => citation,
    }
}

/// Template family an entry type is rendered with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Family {
    Article,
    Book,
    InBook,
    InCollection,
    Proceedings,
    InProceedings,
    PhdThesis,
    MastersThesis,
    TechReport,
    Manual,
    Unpublished,
    Misc,
}

impl Family {
    fn of(entry_type: &EntryType) -> Self {
        match entry_type {
            EntryType::Article | EntryType::Other(_) => Family::Article,
            EntryType::Book => Family::Book,
            EntryType::InBook => Family::InBook,
            EntryType::InCollection => Family::InCollection,
            EntryType::Proceedings => Family::Proceedings,
            EntryType::InProceedings | EntryType::Conference => Family::InProceedings,
            EntryType::PhdThesis => Family::PhdThesis,
            EntryType::MastersThesis => Family::MastersThesis,
            EntryType::TechReport => Family::TechReport,
            EntryType::Manual => Family::Manual,
            EntryType::Unpublished => Family::Unpublished,
            EntryType::Misc => Family::Misc,
        }
    }
}

/// `prefix + value + suffix`, or nothing when the value is missing
fn wrap(prefix: &str, value: Option<&str>, suffix: &str) -> String {
    match value {
        Some(v) if !v.is_empty() => format!("{}{}{}", prefix, v, suffix),
        _ => String::new(),
    }
}

/// Join the present parts with a separator
fn join(sep: &str, parts: &[Option<String>]) -> Option<String> {
    let present: Vec<&str> = parts
        .iter()
        .filter_map(|p| p.as_deref())
        .filter(|p| !p.is_empty())
        .collect();
    if present.is_empty() {
        None
    } else {
        Some(present.join(sep))
    }
}

fn ends_sentence(text: &str) -> bool {
    text.ends_with(['.', '?', '!'])
}

/// Terminate with a period unless the text already ends a sentence
fn sentence(text: &str) -> String {
    if ends_sentence(text) {
        text.to_string()
    } else {
        format!("{}.", text)
    }
}

/// Field values prepared for one rendering
struct Parts<'a> {
    markup: Markup,
    authors: String,
    year: &'a str,
    title: &'a str,
    container: Option<&'a str>,
    volume: Option<&'a str>,
    number: Option<&'a str>,
    pages: Option<&'a str>,
    publisher: Option<&'a str>,
    address: Option<&'a str>,
    school: Option<&'a str>,
    institution: Option<&'a str>,
    note: Option<&'a str>,
    doi: Option<&'a str>,
    url: Option<&'a str>,
}

impl<'a> Parts<'a> {
    fn new(entry: &'a BibEntry, markup: Markup) -> Self {
        let names = entry
            .author
            .as_deref()
            .map(authors::split)
            .unwrap_or_default();
        let authors = if names.is_empty() {
            UNKNOWN_AUTHOR.to_string()
        } else {
            authors::oxford_join(&names)
        };

        Self {
            markup,
            authors,
            year: year_of(entry),
            title: non_empty(entry.title.as_deref()).unwrap_or(UNTITLED),
            container: non_empty(entry.container()),
            volume: non_empty(entry.volume.as_deref()),
            number: non_empty(entry.number.as_deref()),
            pages: non_empty(entry.pages.as_deref()),
            publisher: non_empty(entry.publisher.as_deref()),
            address: non_empty(entry.address.as_deref()),
            school: non_empty(entry.school.as_deref()),
            institution: non_empty(entry.institution.as_deref()),
            note: non_empty(entry.note.as_deref()),
            doi: non_empty(entry.doi.as_deref()),
            url: non_empty(entry.url.as_deref()),
        }
    }

    /// Author list closed with a period
    fn author_sentence(&self) -> String {
        sentence(&self.authors)
    }

    /// Emphasized title without trailing punctuation
    fn title(&self) -> String {
        self.markup.italic(self.title)
    }

    /// Emphasized title closed with a period
    fn title_sentence(&self) -> String {
        let title = self.markup.italic(self.title);
        if ends_sentence(self.title) {
            title
        } else {
            format!("{}.", title)
        }
    }

    fn container(&self) -> Option<String> {
        self.container.map(|c| self.markup.bold(c))
    }

    /// Publisher, falling back to the institution
    fn publisher(&self) -> Option<&'a str> {
        self.publisher.or(self.institution)
    }

    /// `Address: Publisher` with whichever part exists
    fn place_publisher(&self) -> Option<String> {
        match (self.address, self.publisher()) {
            (Some(a), Some(p)) => Some(format!("{}: {}", a, p)),
            (None, Some(p)) => Some(p.to_string()),
            (Some(a), None) => Some(a.to_string()),
            (None, None) => None,
        }
    }

    /// `Address: Institution` for reports
    fn place_institution(&self) -> Option<String> {
        match (self.address, self.institution.or(self.publisher)) {
            (Some(a), Some(i)) => Some(format!("{}: {}", a, i)),
            (None, Some(i)) => Some(i.to_string()),
            (Some(a), None) => Some(a.to_string()),
            (None, None) => None,
        }
    }

    /// `34(3)`, `34` or `(3)`
    fn volume_issue(&self) -> Option<String> {
        match (self.volume, self.number) {
            (None, None) => None,
            (v, n) => Some(format!("{}{}", v.unwrap_or(""), wrap("(", n, ")"))),
        }
    }

    fn doi_url(&self) -> Option<String> {
        self.doi.map(|d| format!("https://doi.org/{}", d))
    }

    /// DOI resolver link, falling back to the URL
    fn link(&self) -> Option<String> {
        self.doi_url().or_else(|| self.url.map(str::to_string))
    }

    fn owned(value: Option<&str>) -> Option<String> {
        value.map(str::to_string)
    }
}

/// Full citation of an entry, rendered as the given entry type
///
/// Unknown styles parse to APA and unknown types render as articles, so
/// every combination has a template.
pub fn cite_full(entry: &BibEntry, style: Style, markup: Markup, entry_type: &EntryType) -> String {
    let parts = Parts::new(entry, markup);
    let family = Family::of(entry_type);
    match style {
        Style::Apa => apa(&parts, family),
        Style::Mla => mla(&parts, family),
        Style::Chicago => chicago(&parts, family),
        Style::Harvard => harvard(&parts, family),
        Style::Vancouver => vancouver(&parts, family),
        Style::Abnt => abnt(&parts, family),
    }
}

fn apa(p: &Parts, family: Family) -> String {
    let head = format!("{} ({}).", p.authors, p.year);
    let doi = wrap(" ", p.doi_url().as_deref(), "");
    match family {
        Family::Article => {
            let source = join(
                ", ",
                &[p.container(), p.volume_issue(), Parts::owned(p.pages)],
            );
            format!(
                "{} {}{}{}",
                head,
                p.title_sentence(),
                wrap(" ", source.as_deref(), "."),
                doi
            )
        }
        Family::Book | Family::Proceedings | Family::Manual => format!(
            "{} {}{}{}",
            head,
            p.title_sentence(),
            wrap(" ", p.publisher(), "."),
            doi
        ),
        Family::InBook | Family::InCollection | Family::InProceedings => {
            let within = p
                .container()
                .map(|c| format!(" In {}{}.", c, wrap(" (pp. ", p.pages, ")")))
                .unwrap_or_default();
            format!(
                "{} {}{}{}{}",
                head,
                p.title_sentence(),
                within,
                wrap(" ", p.publisher, "."),
                doi
            )
        }
        Family::PhdThesis | Family::MastersThesis => {
            let kind = if family == Family::PhdThesis {
                "Doctoral dissertation"
            } else {
                "Master's thesis"
            };
            format!(
                "{} {} [{}{}].{}",
                head,
                p.title(),
                kind,
                wrap(", ", p.school, ""),
                doi
            )
        }
        Family::TechReport => format!(
            "{} {}{}.{}{}",
            head,
            p.title(),
            wrap(" (Report No. ", p.number, ")"),
            wrap(" ", p.institution.or(p.publisher), "."),
            doi
        ),
        Family::Unpublished => format!(
            "{} {} [Unpublished manuscript].{}",
            head,
            p.title(),
            wrap(" ", p.note, ".")
        ),
        Family::Misc => format!(
            "{} {}{}{}",
            head,
            p.title_sentence(),
            wrap(" ", p.note, "."),
            wrap(" ", p.link().as_deref(), "")
        ),
    }
}

fn mla(p: &Parts, family: Family) -> String {
    let head = format!("{} {}", p.author_sentence(), p.title_sentence());
    let doi = wrap(" ", p.doi_url().as_deref(), ".");
    let year = Some(p.year.to_string());
    let tail = |parts: &[Option<String>]| wrap(" ", join(", ", parts).as_deref(), ".");
    match family {
        Family::Article => format!(
            "{}{}{}",
            head,
            tail(&[
                p.container(),
                p.volume.map(|v| format!("vol. {}", v)),
                p.number.map(|n| format!("no. {}", n)),
                year,
                p.pages.map(|pg| format!("pp. {}", pg)),
            ]),
            doi
        ),
        Family::Book | Family::Proceedings | Family::Manual => format!(
            "{}{}{}",
            head,
            tail(&[Parts::owned(p.publisher()), year]),
            doi
        ),
        Family::InBook | Family::InCollection | Family::InProceedings => format!(
            "{}{}{}",
            head,
            tail(&[
                p.container(),
                Parts::owned(p.publisher),
                year,
                p.pages.map(|pg| format!("pp. {}", pg)),
            ]),
            doi
        ),
        Family::PhdThesis | Family::MastersThesis => {
            let kind = if family == Family::PhdThesis {
                "PhD dissertation"
            } else {
                "Master's thesis"
            };
            format!(
                "{} {}.{}",
                head,
                p.year,
                tail(&[Parts::owned(p.school), Some(kind.to_string())])
            )
        }
        Family::TechReport => format!(
            "{}{}{}",
            head,
            tail(&[
                Parts::owned(p.institution.or(p.publisher)),
                p.number.map(|n| format!("Report no. {}", n)),
                year,
            ]),
            doi
        ),
        Family::Unpublished => format!("{} {}. Unpublished manuscript.", head, p.year),
        Family::Misc => format!(
            "{} {}.{}{}",
            head,
            p.year,
            wrap(" ", p.note, "."),
            wrap(" ", p.link().as_deref(), ".")
        ),
    }
}

fn chicago(p: &Parts, family: Family) -> String {
    let head = format!("{} {}. {}", p.author_sentence(), p.year, p.title_sentence());
    let doi = wrap(" ", p.doi_url().as_deref(), ".");
    match family {
        Family::Article => {
            let volume = join(
                " ",
                &[
                    Parts::owned(p.volume),
                    p.number.map(|n| format!("({})", n)),
                ],
            );
            let source = join(" ", &[p.container(), volume]);
            let locator = format!(
                "{}{}",
                wrap(" ", source.as_deref(), ""),
                wrap(": ", p.pages, "")
            );
            if locator.is_empty() {
                format!("{}{}", head, doi)
            } else {
                format!("{}{}.{}", head, locator, doi)
            }
        }
        Family::Book | Family::Proceedings | Family::Manual => format!(
            "{}{}{}",
            head,
            wrap(" ", p.place_publisher().as_deref(), "."),
            doi
        ),
        Family::InBook | Family::InCollection | Family::InProceedings => {
            let within = p
                .container()
                .map(|c| format!(" In {}{}.", c, wrap(", ", p.pages, "")))
                .unwrap_or_default();
            format!(
                "{}{}{}{}",
                head,
                within,
                wrap(" ", p.place_publisher().as_deref(), "."),
                doi
            )
        }
        Family::PhdThesis | Family::MastersThesis => {
            let kind = if family == Family::PhdThesis {
                "PhD diss."
            } else {
                "Master's thesis"
            };
            format!(
                "{} {}",
                head,
                sentence(&format!("{}{}", kind, wrap(", ", p.school, "")))
            )
        }
        Family::TechReport => format!(
            "{}{}{}{}",
            head,
            wrap(" Report ", p.number, "."),
            wrap(" ", p.place_institution().as_deref(), "."),
            doi
        ),
        Family::Unpublished => format!(
            "{} Unpublished manuscript.{}",
            head,
            wrap(" ", p.note, ".")
        ),
        Family::Misc => format!(
            "{}{}{}",
            head,
            wrap(" ", p.note, "."),
            wrap(" ", p.link().as_deref(), ".")
        ),
    }
}

fn harvard(p: &Parts, family: Family) -> String {
    let head = format!("{} ({}) {}", p.authors, p.year, p.title_sentence());
    let available = wrap(" Available at: ", p.doi_url().as_deref(), ".");
    match family {
        Family::Article => {
            let source = join(
                ", ",
                &[
                    p.container(),
                    p.volume_issue(),
                    p.pages.map(|pg| format!("pp. {}", pg)),
                ],
            );
            format!("{}{}{}", head, wrap(" ", source.as_deref(), "."), available)
        }
        Family::Book | Family::Proceedings | Family::Manual => format!(
            "{}{}{}",
            head,
            wrap(" ", p.place_publisher().as_deref(), "."),
            available
        ),
        Family::InBook | Family::InCollection | Family::InProceedings => {
            let within = p
                .container()
                .map(|c| format!(" In: {}.", c))
                .unwrap_or_default();
            let source = join(
                ", ",
                &[
                    p.place_publisher(),
                    p.pages.map(|pg| format!("pp. {}", pg)),
                ],
            );
            format!(
                "{}{}{}{}",
                head,
                within,
                wrap(" ", source.as_deref(), "."),
                available
            )
        }
        Family::PhdThesis | Family::MastersThesis => {
            let kind = if family == Family::PhdThesis {
                "PhD thesis"
            } else {
                "Master's thesis"
            };
            format!("{} {}.{}", head, kind, wrap(" ", p.school, "."))
        }
        Family::TechReport => {
            let source = join(
                ", ",
                &[
                    Parts::owned(p.institution.or(p.publisher)),
                    p.number.map(|n| format!("Report {}", n)),
                ],
            );
            format!("{}{}{}", head, wrap(" ", source.as_deref(), "."), available)
        }
        Family::Unpublished => format!("{} Unpublished manuscript.", head),
        Family::Misc => format!(
            "{}{}{}",
            head,
            wrap(" ", p.note, "."),
            wrap(" Available at: ", p.link().as_deref(), ".")
        ),
    }
}

fn vancouver(p: &Parts, family: Family) -> String {
    let authors = p.author_sentence();
    let doi = wrap(" doi:", p.doi, ".");
    match family {
        Family::Article => {
            let locator = format!(
                "{}{}{}",
                p.year,
                wrap(";", p.volume_issue().as_deref(), ""),
                wrap(":", p.pages, "")
            );
            format!(
                "{} {}{} {}.{}",
                authors,
                p.title_sentence(),
                wrap(" ", p.container().as_deref(), "."),
                locator,
                doi
            )
        }
        Family::Book | Family::Proceedings | Family::Manual => format!(
            "{} {}{} {}.{}",
            authors,
            p.title_sentence(),
            wrap(" ", p.place_publisher().as_deref(), ";"),
            p.year,
            doi
        ),
        Family::InBook | Family::InCollection | Family::InProceedings => format!(
            "{} {}{}{} {}.{}{}",
            authors,
            p.title_sentence(),
            wrap(" In: ", p.container().as_deref(), "."),
            wrap(" ", p.place_publisher().as_deref(), ";"),
            p.year,
            wrap(" p. ", p.pages, "."),
            doi
        ),
        Family::PhdThesis | Family::MastersThesis => {
            let kind = if family == Family::PhdThesis {
                "dissertation"
            } else {
                "master's thesis"
            };
            format!(
                "{} {} [{}].{} {}.",
                authors,
                p.title(),
                kind,
                wrap(" ", p.school, ";"),
                p.year
            )
        }
        Family::TechReport => format!(
            "{} {}{} {}.{}{}",
            authors,
            p.title_sentence(),
            wrap(" ", p.place_institution().as_deref(), ";"),
            p.year,
            wrap(" Report No.: ", p.number, "."),
            doi
        ),
        Family::Unpublished => format!("{} {} [unpublished]. {}.", authors, p.title(), p.year),
        Family::Misc => format!(
            "{} {} {}.{}",
            authors,
            p.title_sentence(),
            p.year,
            wrap(" Available from: ", p.link().as_deref(), "")
        ),
    }
}

fn abnt(p: &Parts, family: Family) -> String {
    let head = format!("{} {}", p.author_sentence(), p.title_sentence());
    let doi = wrap(" DOI: ", p.doi_url().as_deref(), ".");
    let year = Some(p.year.to_string());
    match family {
        Family::Article => {
            let source = join(
                ", ",
                &[
                    p.container(),
                    p.volume.map(|v| format!("v. {}", v)),
                    p.number.map(|n| format!("n. {}", n)),
                    p.pages.map(|pg| format!("p. {}", pg)),
                    year,
                ],
            );
            format!("{}{}{}", head, wrap(" ", source.as_deref(), "."), doi)
        }
        Family::Book | Family::Proceedings | Family::Manual => {
            let source = join(", ", &[p.place_publisher(), year]);
            format!("{}{}{}", head, wrap(" ", source.as_deref(), "."), doi)
        }
        Family::InBook | Family::InCollection | Family::InProceedings => {
            let source = join(", ", &[p.place_publisher(), year]);
            format!(
                "{}{}{}{}{}",
                head,
                wrap(" In: ", p.container().as_deref(), "."),
                wrap(" ", source.as_deref(), "."),
                wrap(" p. ", p.pages, "."),
                doi
            )
        }
        Family::PhdThesis | Family::MastersThesis => {
            let kind = if family == Family::PhdThesis {
                "Tese (Doutorado)"
            } else {
                "Dissertação (Mestrado)"
            };
            format!(
                "{} {}. {}{}.",
                head,
                p.year,
                kind,
                wrap(" - ", p.school, "")
            )
        }
        Family::TechReport => {
            let source = join(", ", &[p.place_institution(), year]);
            format!(
                "{}{}{}{}",
                head,
                wrap(" ", source.as_deref(), "."),
                wrap(" Relatório ", p.number, "."),
                doi
            )
        }
        Family::Unpublished => format!("{} {}. Não publicado.", head, p.year),
        Family::Misc => format!(
            "{} {}.{}{}",
            head,
            p.year,
            wrap(" ", p.note, "."),
            wrap(" Disponível em: ", p.link().as_deref(), ".")
        ),
    }
}

/// BibTeX text of an entry, for embedding in notes
pub fn bib_to_string(entry: &BibEntry) -> String {
    bibtex::serialize(entry)
}

/// First entry of a BibTeX snippet, if any
pub fn from_string(text: &str) -> Option<BibEntry> {
    bibtex::parse(text).into_iter().next()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(fields: &[(&str, &str)]) -> BibEntry {
        let mut e = BibEntry::new("article", "Key");
        for (k, v) in fields {
            e.set(k, *v);
        }
        e
    }

    fn beven_article() -> BibEntry {
        entry(&[
            ("author", "Beven, K"),
            ("year", "1989"),
            ("title", "Changing ideas"),
            ("journal", "HSJ"),
            ("volume", "34"),
            ("issue", "3"),
            ("pages", "1-12"),
        ])
    }

    #[test]
    fn test_parse_markup_and_style() {
        assert_eq!(Markup::parse("MD"), Markup::Markdown);
        assert_eq!(Markup::parse("latex"), Markup::Tex);
        assert_eq!(Markup::parse("rtf"), Markup::Plain);
        assert_eq!(Style::parse("Vancouver"), Style::Vancouver);
        assert_eq!(Style::parse("ieee"), Style::Apa);
    }

    #[test]
    fn test_in_text_author_counts() {
        let one = entry(&[("author", "Darwin, C"), ("year", "1859")]);
        assert_eq!(cite_in_text(&one, Markup::Plain), "Darwin (1859)");

        let two = entry(&[("author", "Beven, K and Binley, A"), ("year", "1989")]);
        assert_eq!(cite_in_text(&two, Markup::Plain), "Beven & Binley (1989)");

        let three = entry(&[
            ("author", "Beven, K and Binley, A and Freer, J"),
            ("year", "1989"),
        ]);
        assert_eq!(cite_in_text(&three, Markup::Plain), "Beven et al. (1989)");
    }

    #[test]
    fn test_in_text_normalizes_authors() {
        let e = entry(&[("author", "Keith Beven and Andrew Binley"), ("year", "1989")]);
        assert_eq!(cite_in_text(&e, Markup::Plain), "Beven & Binley (1989)");
    }

    #[test]
    fn test_in_text_fallbacks() {
        let e = BibEntry::new("misc", "K");
        assert_eq!(cite_in_text(&e, Markup::Plain), "Unknown Author (n.d.)");
    }

    #[test]
    fn test_in_text_markup_transforms() {
        let single = entry(&[("author", "Darwin, C"), ("year", "1859")]);
        assert_eq!(cite_in_text(&single, Markup::Markdown), "Darwin (1859)");

        let three = entry(&[("author", "A, a and B, b and C, c"), ("year", "2000")]);
        assert_eq!(cite_in_text(&three, Markup::Markdown), "A *et al.* (2000)");
        assert_eq!(cite_in_text(&three, Markup::Html), "A <i>et al.</i> (2000)");
        assert_eq!(cite_in_text(&three, Markup::Tex), "A \\textit{et al.} (2000)");

        let two = entry(&[("author", "A, a and B, b"), ("year", "2000")]);
        assert_eq!(cite_in_text(&two, Markup::Html), "A &amp; B (2000)");
        assert_eq!(cite_in_text(&two, Markup::Tex), "A \\& B (2000)");
        assert_eq!(cite_in_text(&two, Markup::Markdown), "A & B (2000)");
    }

    #[test]
    fn test_in_text_linked() {
        let mut e = entry(&[("author", "Darwin, C"), ("year", "1859")]);
        assert_eq!(cite_in_text_linked(&e, Markup::Markdown), "Darwin (1859)");

        e.set("url", "https://example.com/origin");
        assert_eq!(
            cite_in_text_linked(&e, Markup::Markdown),
            "[Darwin (1859)](https://example.com/origin)"
        );

        e.set("doi", "10.5962/bhl.title.68064");
        assert_eq!(
            cite_in_text_linked(&e, Markup::Html),
            "<a href=\"https://doi.org/10.5962/bhl.title.68064\">Darwin (1859)</a>"
        );
        assert_eq!(
            cite_in_text_linked(&e, Markup::Tex),
            "\\href{https://doi.org/10.5962/bhl.title.68064}{Darwin (1859)}"
        );
        assert_eq!(cite_in_text_linked(&e, Markup::Plain), "Darwin (1859)");
    }

    #[test]
    fn test_full_apa_article() {
        let e = beven_article();
        assert_eq!(
            cite_full(&e, Style::Apa, Markup::Plain, &EntryType::Article),
            "Beven, K (1989). Changing ideas. HSJ, 34(3), 1-12."
        );
    }

    #[test]
    fn test_full_apa_article_markup() {
        let e = beven_article();
        assert_eq!(
            cite_full(&e, Style::Apa, Markup::Markdown, &EntryType::Article),
            "Beven, K (1989). *Changing ideas*. **HSJ**, 34(3), 1-12."
        );
        assert_eq!(
            cite_full(&e, Style::Apa, Markup::Html, &EntryType::Article),
            "Beven, K (1989). <i>Changing ideas</i>. <b>HSJ</b>, 34(3), 1-12."
        );
        assert_eq!(
            cite_full(&e, Style::Apa, Markup::Tex, &EntryType::Article),
            "Beven, K (1989). \\textit{Changing ideas}. \\textbf{HSJ}, 34(3), 1-12."
        );
    }

    #[test]
    fn test_full_apa_with_doi_and_missing_parts() {
        let mut e = entry(&[
            ("author", "Beven, K and Binley, A and Freer, J"),
            ("year", "1989"),
            ("title", "Changing ideas"),
            ("journal", "HSJ"),
        ]);
        e.set("doi", "10.1/abc");
        assert_eq!(
            cite_full(&e, Style::Apa, Markup::Plain, &EntryType::Article),
            "Beven, K, Binley, A, and Freer, J (1989). Changing ideas. HSJ. https://doi.org/10.1/abc"
        );
    }

    #[test]
    fn test_full_fallback_strings() {
        let e = BibEntry::new("article", "K");
        assert_eq!(
            cite_full(&e, Style::Apa, Markup::Plain, &EntryType::Article),
            "Unknown Author (n.d.). Untitled."
        );
    }

    #[test]
    fn test_full_unknown_type_uses_article() {
        let e = beven_article();
        let other = EntryType::Other("dataset".to_string());
        assert_eq!(
            cite_full(&e, Style::Apa, Markup::Plain, &other),
            cite_full(&e, Style::Apa, Markup::Plain, &EntryType::Article)
        );
    }

    #[test]
    fn test_full_unknown_style_uses_apa() {
        let e = beven_article();
        assert_eq!(
            cite_full(&e, Style::parse("ieee"), Markup::Plain, &EntryType::Article),
            cite_full(&e, Style::Apa, Markup::Plain, &EntryType::Article)
        );
    }

    #[test]
    fn test_full_article_other_styles() {
        let e = beven_article();
        assert_eq!(
            cite_full(&e, Style::Mla, Markup::Plain, &EntryType::Article),
            "Beven, K. Changing ideas. HSJ, vol. 34, no. 3, 1989, pp. 1-12."
        );
        assert_eq!(
            cite_full(&e, Style::Chicago, Markup::Plain, &EntryType::Article),
            "Beven, K. 1989. Changing ideas. HSJ 34 (3): 1-12."
        );
        assert_eq!(
            cite_full(&e, Style::Harvard, Markup::Plain, &EntryType::Article),
            "Beven, K (1989) Changing ideas. HSJ, 34(3), pp. 1-12."
        );
        assert_eq!(
            cite_full(&e, Style::Vancouver, Markup::Plain, &EntryType::Article),
            "Beven, K. Changing ideas. HSJ. 1989;34(3):1-12."
        );
        assert_eq!(
            cite_full(&e, Style::Abnt, Markup::Plain, &EntryType::Article),
            "Beven, K. Changing ideas. HSJ, v. 34, n. 3, p. 1-12, 1989."
        );
    }

    #[test]
    fn test_full_book() {
        let e = entry(&[
            ("author", "Charles Darwin"),
            ("year", "1859"),
            ("title", "On the Origin of Species"),
            ("publisher", "John Murray"),
            ("address", "London"),
        ]);
        assert_eq!(
            cite_full(&e, Style::Apa, Markup::Plain, &EntryType::Book),
            "Darwin, Charles (1859). On the Origin of Species. John Murray."
        );
        assert_eq!(
            cite_full(&e, Style::Chicago, Markup::Plain, &EntryType::Book),
            "Darwin, Charles. 1859. On the Origin of Species. London: John Murray."
        );
        assert_eq!(
            cite_full(&e, Style::Abnt, Markup::Plain, &EntryType::Book),
            "Darwin, Charles. On the Origin of Species. London: John Murray, 1859."
        );
    }

    #[test]
    fn test_full_thesis_and_chapter() {
        let thesis = entry(&[
            ("author", "Doe, Jane"),
            ("year", "2015"),
            ("title", "Soil moisture"),
            ("school", "University of Lancaster"),
        ]);
        assert_eq!(
            cite_full(&thesis, Style::Apa, Markup::Plain, &EntryType::PhdThesis),
            "Doe, Jane (2015). Soil moisture [Doctoral dissertation, University of Lancaster]."
        );
        assert_eq!(
            cite_full(&thesis, Style::Apa, Markup::Plain, &EntryType::MastersThesis),
            "Doe, Jane (2015). Soil moisture [Master's thesis, University of Lancaster]."
        );

        let chapter = entry(&[
            ("author", "Doe, Jane"),
            ("year", "2015"),
            ("title", "Floods"),
            ("booktitle", "Handbook"),
            ("pages", "10-20"),
            ("publisher", "Wiley"),
        ]);
        assert_eq!(
            cite_full(&chapter, Style::Apa, Markup::Plain, &EntryType::InCollection),
            "Doe, Jane (2015). Floods. In Handbook (pp. 10-20). Wiley."
        );
        assert_eq!(
            cite_full(&chapter, Style::Apa, Markup::Plain, &EntryType::Conference),
            cite_full(&chapter, Style::Apa, Markup::Plain, &EntryType::InProceedings)
        );
    }

    #[test]
    fn test_full_title_with_question_mark() {
        let e = entry(&[("author", "Doe, J"), ("year", "2000"), ("title", "Why rivers?")]);
        assert_eq!(
            cite_full(&e, Style::Apa, Markup::Plain, &EntryType::Misc),
            "Doe, J (2000). Why rivers?"
        );
    }

    #[test]
    fn test_every_cell_renders() {
        let e = beven_article();
        let types = [
            "article",
            "book",
            "inbook",
            "incollection",
            "proceedings",
            "inproceedings",
            "conference",
            "phdthesis",
            "mastersthesis",
            "techreport",
            "manual",
            "unpublished",
            "misc",
        ];
        for style in Style::ALL {
            for name in types {
                let text = cite_full(&e, style, Markup::Plain, &EntryType::parse(name));
                assert!(text.starts_with("Beven, K"), "{} {}: {}", style, name, text);
                assert!(text.contains("Changing ideas"), "{} {}: {}", style, name, text);
                assert!(!text.contains(".."), "{} {}: {}", style, name, text);
            }
        }
    }

    #[test]
    fn test_bib_string_round_trip() {
        let e = beven_article();
        let text = bib_to_string(&e);
        assert!(text.starts_with("@article{Key,"));
        assert_eq!(from_string(&text), Some(e));
        assert_eq!(from_string("no entries here"), None);
    }
}
