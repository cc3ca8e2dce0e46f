//! Library folder operations
//!
//! A library is a flat folder of `<key>.bib`, `<key>.md` and optional
//! `<key>.pdf` files. Importing a reference is split into a planning step
//! that decides the key and renders every file, and an apply step that
//! writes them. Batch flows run items one at a time and record per-item
//! failures instead of stopping.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::bibtex;
use crate::cite::Style;
use crate::citekey;
use crate::error::{LibraryError, LibraryResult};
use crate::lookup::{query_for, ReferenceLookup};
use crate::models::BibEntry;
use crate::reference_note::{NoteContext, ReferenceNote};

/// Per-folder tag list file
pub const TAGS_FILE: &str = "tags.txt";
/// Per-folder related-notes list file
pub const RELATED_FILE: &str = "related.txt";

/// Timestamp written into new notes
pub fn timestamp() -> String {
    chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

fn has_extension(path: &Path, ext: &str) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(ext))
}

fn file_stem(path: &Path) -> Option<String> {
    path.file_stem()
        .and_then(|s| s.to_str())
        .map(str::to_string)
}

fn read_dir_sorted(dir: &Path) -> LibraryResult<Vec<PathBuf>> {
    let entries =
        fs::read_dir(dir).map_err(|e| LibraryError::from_read(e, dir.to_path_buf()))?;
    let mut paths = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| LibraryError::from_read(e, dir.to_path_buf()))?;
        paths.push(entry.path());
    }
    paths.sort();
    Ok(paths)
}

fn ensure_dir(dir: &Path) -> LibraryResult<()> {
    if !dir.exists() {
        fs::create_dir_all(dir).map_err(|e| LibraryError::CreateDirectory {
            path: dir.to_path_buf(),
            source: e,
        })?;
    }
    Ok(())
}

/// Keys already used in a library: stems of its `.bib`, `.md` and `.pdf` files
///
/// A missing library folder has no keys.
pub fn existing_keys(library: &Path) -> LibraryResult<BTreeSet<String>> {
    if !library.exists() {
        return Ok(BTreeSet::new());
    }
    Ok(read_dir_sorted(library)?
        .iter()
        .filter(|p| ["bib", "md", "pdf"].iter().any(|ext| has_extension(p, ext)))
        .filter_map(|p| file_stem(p))
        .collect())
}

/// A `.bib` file waiting for import and its companion document
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CatalogItem {
    pub bib: PathBuf,
    pub pdf: Option<PathBuf>,
}

impl CatalogItem {
    fn for_bib(bib: PathBuf) -> Self {
        let pdf = bib.with_extension("pdf");
        Self {
            pdf: pdf.is_file().then_some(pdf),
            bib,
        }
    }
}

/// `.bib` files in a source folder, each paired with a same-stem `.pdf`
pub fn catalog(src: &Path) -> LibraryResult<Vec<CatalogItem>> {
    Ok(read_dir_sorted(src)?
        .into_iter()
        .filter(|p| p.is_file() && has_extension(p, "bib"))
        .map(CatalogItem::for_bib)
        .collect())
}

/// Stem usable as a file name: path separators and other awkward
/// characters become `_`, leading dots are dropped
fn safe_stem(key: &str) -> String {
    let stem: String = key
        .trim()
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, '-' | '_' | '+' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();
    stem.trim_start_matches('.').to_string()
}

/// First `<stem>.<ext>`, `<stem>-2.<ext>`, ... not present in `dir`
fn free_path(dir: &Path, stem: &str, ext: &str) -> PathBuf {
    let mut candidate = dir.join(format!("{}.{}", stem, ext));
    let mut n = 2;
    while candidate.exists() {
        candidate = dir.join(format!("{}-{}.{}", stem, n, ext));
        n += 1;
    }
    candidate
}

/// Split a multi-entry `.bib` file into one file per entry beside it
///
/// Files are named after the entry keys; a name already taken gets a
/// numeric suffix, so no existing file is overwritten. Returns the files
/// written. The source file is left in place.
pub fn explode(path: &Path) -> LibraryResult<Vec<PathBuf>> {
    let entries = bibtex::read_file(path)?;
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let fallback = file_stem(path).unwrap_or_default();

    let mut created = Vec::new();
    for (index, entry) in entries.iter().enumerate() {
        let mut stem = safe_stem(&entry.citation_key);
        if stem.is_empty() {
            stem = format!("{}-{}", fallback, index + 1);
        }
        let target = free_path(dir, &stem, "bib");
        bibtex::write_file(&target, entry)?;
        created.push(target);
    }
    debug!(path = %path.display(), entries = created.len(), "exploded bib file");
    Ok(created)
}

/// One item per line; blank lines and surrounding whitespace dropped
pub fn read_list_file(path: &Path) -> LibraryResult<Vec<String>> {
    let text =
        fs::read_to_string(path).map_err(|e| LibraryError::from_read(e, path.to_path_buf()))?;
    Ok(text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect())
}

/// Settings for an import run
#[derive(Debug, Clone, Serialize)]
pub struct ImportOptions {
    pub tags: Vec<String>,
    pub related: Vec<String>,
    /// Query the lookup service for missing DOIs and cited works
    pub lookup: bool,
    /// Leave source files in place after import
    pub keep_source: bool,
    pub style: Style,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            tags: Vec::new(),
            related: Vec::new(),
            lookup: true,
            keep_source: false,
            style: Style::default(),
        }
    }
}

/// Everything needed to write one reference into the library
#[derive(Debug, Clone)]
pub struct ImportPlan {
    pub key: String,
    pub entry: BibEntry,
    pub bib_text: String,
    pub note_text: String,
    /// Source document to copy in as `<key>.pdf`
    pub pdf: Option<PathBuf>,
    /// Whether the lookup service returned a record
    pub enriched: bool,
}

impl ImportPlan {
    pub fn bib_path(&self, library: &Path) -> PathBuf {
        library.join(format!("{}.bib", self.key))
    }

    pub fn note_path(&self, library: &Path) -> PathBuf {
        library.join(format!("{}.md", self.key))
    }

    pub fn pdf_path(&self, library: &Path) -> PathBuf {
        library.join(format!("{}.pdf", self.key))
    }
}

/// Fields a lookup may fill in; author, title and year stay as imported
const ENRICHED_FIELDS: &[&str] = &[
    "doi",
    "journal",
    "volume",
    "number",
    "pages",
    "publisher",
    "url",
];

fn fill_missing(entry: &mut BibEntry, found: &BibEntry) {
    for &name in ENRICHED_FIELDS {
        if entry.has(name) {
            continue;
        }
        if let Some(value) = found.get(name) {
            debug!(key = %entry.citation_key, field = name, value = %value, "field added from lookup");
            entry.set(name, value);
        }
    }
}

/// Standardize an entry, enrich it and render its files
///
/// Touches no files; the only side effect is the injected lookup.
pub fn plan_import(
    mut entry: BibEntry,
    pdf: Option<&Path>,
    existing: &BTreeSet<String>,
    options: &ImportOptions,
    lookup: Option<&dyn ReferenceLookup>,
    template: &str,
    timestamp: &str,
) -> LibraryResult<ImportPlan> {
    entry.trim_values();
    let key = citekey::standardize(&mut entry, Some(existing))?;

    let mut references = Vec::new();
    let mut enriched = false;
    if let (true, Some(service)) = (options.lookup, lookup) {
        if let Some(record) = service.lookup(&query_for(&entry)) {
            enriched = true;
            fill_missing(&mut entry, &record.to_entry(&key));
            references = record.references;
        }
    }

    let ctx = NoteContext {
        timestamp: timestamp.to_string(),
        file: pdf.map(|_| format!("{}.pdf", key)),
        tags: options.tags.clone(),
        related: options.related.clone(),
        references,
        style: options.style,
    };
    let note = ReferenceNote::from_entry(&entry, template, &ctx);

    Ok(ImportPlan {
        bib_text: bibtex::serialize(&entry),
        note_text: note.render(),
        pdf: pdf.map(Path::to_path_buf),
        key,
        entry,
        enriched,
    })
}

/// Write a planned reference into the library, returning the files written
///
/// On failure the files already written are removed again, so a failed
/// import does not reserve its key.
pub fn apply_plan(plan: &ImportPlan, library: &Path) -> LibraryResult<Vec<PathBuf>> {
    ensure_dir(library)?;

    let mut written = Vec::new();
    if let Err(e) = write_plan(plan, library, &mut written) {
        for path in &written {
            remove_quietly(path);
        }
        return Err(e);
    }
    Ok(written)
}

fn write_plan(plan: &ImportPlan, library: &Path, written: &mut Vec<PathBuf>) -> LibraryResult<()> {
    let bib_path = plan.bib_path(library);
    fs::write(&bib_path, &plan.bib_text).map_err(|e| LibraryError::from_write(e, bib_path.clone()))?;
    written.push(bib_path);

    let note_path = plan.note_path(library);
    fs::write(&note_path, &plan.note_text)
        .map_err(|e| LibraryError::from_write(e, note_path.clone()))?;
    written.push(note_path);

    if let Some(pdf) = &plan.pdf {
        let target = plan.pdf_path(library);
        fs::copy(pdf, &target).map_err(|e| LibraryError::from_write(e, target.clone()))?;
        written.push(target);
    }
    Ok(())
}

/// A reference that made it into the library
#[derive(Debug, Clone, Serialize)]
pub struct ImportedItem {
    pub key: String,
    pub source: PathBuf,
    pub files: Vec<PathBuf>,
    pub enriched: bool,
}

/// A file (or one entry of it) that could not be processed
#[derive(Debug, Clone, Serialize)]
pub struct FailedItem {
    pub path: PathBuf,
    /// Key of the failed entry as found in the source file
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    pub error: String,
}

/// Outcome of an import run
#[derive(Debug, Clone, Default, Serialize)]
pub struct ImportReport {
    pub imported: Vec<ImportedItem>,
    pub failed: Vec<FailedItem>,
}

impl ImportReport {
    pub fn merge(&mut self, other: ImportReport) {
        self.imported.extend(other.imported);
        self.failed.extend(other.failed);
    }

    fn fail(&mut self, path: &Path, error: &LibraryError) {
        warn!(path = %path.display(), error = %error, "import failed");
        self.failed.push(FailedItem {
            path: path.to_path_buf(),
            key: None,
            error: error.to_string(),
        });
    }

    fn fail_entry(&mut self, path: &Path, key: &str, error: &LibraryError) {
        warn!(path = %path.display(), key = %key, error = %error, "import failed");
        self.failed.push(FailedItem {
            path: path.to_path_buf(),
            key: Some(key.to_string()),
            error: error.to_string(),
        });
    }
}

fn remove_quietly(path: &Path) {
    if let Err(e) = fs::remove_file(path) {
        warn!(path = %path.display(), error = %e, "failed to remove file");
    }
}

/// One entry waiting for import
struct BatchItem {
    source: PathBuf,
    entry: BibEntry,
    pdf: Option<PathBuf>,
    /// Index into `Batch::bundles` when the entry came from a multi-entry file
    bundle: Option<usize>,
}

/// A multi-entry source file and the entries of it that failed
struct Bundle {
    path: PathBuf,
    total: usize,
    failed: Vec<BibEntry>,
}

struct Batch {
    items: Vec<BatchItem>,
    bundles: Vec<Bundle>,
}

/// Read every `.bib` file of a folder into entries, in path order
///
/// Multi-entry files are split in memory; nothing is written to the
/// source folder.
fn prepare_batch(src: &Path, report: &mut ImportReport) -> LibraryResult<Batch> {
    let mut batch = Batch {
        items: Vec::new(),
        bundles: Vec::new(),
    };

    for item in catalog(src)? {
        let mut entries = match bibtex::read_file(&item.bib) {
            Ok(entries) => entries,
            Err(e) => {
                report.fail(&item.bib, &e);
                continue;
            }
        };

        match entries.len() {
            0 => report.fail(&item.bib, &LibraryError::EmptyBibFile { path: item.bib.clone() }),
            1 => batch.items.push(BatchItem {
                entry: entries.remove(0),
                source: item.bib,
                pdf: item.pdf,
                bundle: None,
            }),
            total => {
                let bundle = batch.bundles.len();
                for entry in entries {
                    batch.items.push(BatchItem {
                        source: item.bib.clone(),
                        entry,
                        pdf: None,
                        bundle: Some(bundle),
                    });
                }
                batch.bundles.push(Bundle {
                    path: item.bib,
                    total,
                    failed: Vec::new(),
                });
            }
        }
    }

    Ok(batch)
}

/// Remove an imported multi-entry source, or shrink it to its failed entries
fn settle_bundle(bundle: &Bundle) {
    if bundle.failed.is_empty() {
        remove_quietly(&bundle.path);
        return;
    }
    if bundle.failed.len() == bundle.total {
        return;
    }
    if let Err(e) = fs::write(&bundle.path, bibtex::serialize_all(&bundle.failed)) {
        warn!(path = %bundle.path.display(), error = %e, "failed to rewrite source file");
    }
}

fn import_item(
    item: &BatchItem,
    library: &Path,
    existing: &BTreeSet<String>,
    options: &ImportOptions,
    lookup: Option<&dyn ReferenceLookup>,
    template: &str,
) -> LibraryResult<ImportedItem> {
    let plan = plan_import(
        item.entry.clone(),
        item.pdf.as_deref(),
        existing,
        options,
        lookup,
        template,
        &timestamp(),
    )?;
    let files = apply_plan(&plan, library)?;

    Ok(ImportedItem {
        key: plan.key,
        source: item.source.clone(),
        files,
        enriched: plan.enriched,
    })
}

/// Import every `.bib` file of a folder into the library
///
/// Entries run in path order (then file order); each imported key joins
/// the conflict set before the next entry is planned. Unless
/// `keep_source` is set, imported sources are removed. A multi-entry
/// file is removed only when all of its entries made it; otherwise it is
/// rewritten to hold just the failed ones, ready for another run.
pub fn import_folder(
    src: &Path,
    library: &Path,
    options: &ImportOptions,
    lookup: Option<&dyn ReferenceLookup>,
    template: &str,
) -> LibraryResult<ImportReport> {
    let mut report = ImportReport::default();
    let mut batch = prepare_batch(src, &mut report)?;
    let mut existing = existing_keys(library)?;

    info!(src = %src.display(), items = batch.items.len(), "importing folder");

    for item in &batch.items {
        match import_item(item, library, &existing, options, lookup, template) {
            Ok(imported) => {
                info!(key = %imported.key, source = %item.source.display(), "imported reference");
                existing.insert(imported.key.clone());
                if !options.keep_source && item.bundle.is_none() {
                    remove_quietly(&item.source);
                    if let Some(pdf) = &item.pdf {
                        remove_quietly(pdf);
                    }
                }
                report.imported.push(imported);
            }
            Err(e) => {
                report.fail_entry(&item.source, &item.entry.citation_key, &e);
                if let Some(index) = item.bundle {
                    batch.bundles[index].failed.push(item.entry.clone());
                }
            }
        }
    }

    if !options.keep_source {
        for bundle in &batch.bundles {
            settle_bundle(bundle);
        }
    }

    Ok(report)
}

/// Tag derived from a folder name: lowercase, spaces as dashes
pub fn folder_tag(name: &str) -> String {
    name.trim().to_lowercase().replace(' ', "-")
}

fn strip_link(item: &str) -> String {
    item.trim()
        .trim_start_matches("[[")
        .trim_end_matches("]]")
        .to_string()
}

/// Extra tags and related links listed in a folder
fn folder_lists(dir: &Path) -> LibraryResult<(Vec<String>, Vec<String>)> {
    let read = |name: &str| {
        let path = dir.join(name);
        if path.is_file() {
            read_list_file(&path)
        } else {
            Ok(Vec::new())
        }
    };
    Ok((read(TAGS_FILE)?, read(RELATED_FILE)?))
}

/// Import each subfolder of `src` not starting with `_`
///
/// A subfolder adds its own tag and related link, plus whatever its
/// `tags.txt` and `related.txt` list.
pub fn import_tree(
    src: &Path,
    library: &Path,
    options: &ImportOptions,
    lookup: Option<&dyn ReferenceLookup>,
    template: &str,
) -> LibraryResult<ImportReport> {
    let mut report = ImportReport::default();

    for dir in read_dir_sorted(src)?.into_iter().filter(|p| p.is_dir()) {
        let Some(name) = dir.file_name().and_then(|n| n.to_str()).map(str::to_string) else {
            continue;
        };
        if name.starts_with('_') || name.starts_with('.') {
            debug!(folder = %name, "skipping folder");
            continue;
        }

        let mut folder_options = options.clone();
        folder_options.tags.push(folder_tag(&name));
        folder_options.related.push(name.clone());

        match folder_lists(&dir) {
            Ok((tags, related)) => {
                folder_options.tags.extend(tags);
                folder_options
                    .related
                    .extend(related.iter().map(|r| strip_link(r)));
            }
            Err(e) => {
                report.fail(&dir, &e);
                continue;
            }
        }

        match import_folder(&dir, library, &folder_options, lookup, template) {
            Ok(folder_report) => report.merge(folder_report),
            Err(e) => report.fail(&dir, &e),
        }
    }

    Ok(report)
}

/// Which managed sections a note update rewrites
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct UpdateScope {
    pub head: bool,
    pub body: bool,
    pub tail: bool,
}

impl UpdateScope {
    pub const ALL: UpdateScope = UpdateScope {
        head: true,
        body: true,
        tail: true,
    };

    /// Build from command-line flags; no flags means head and tail
    pub fn from_flags(head: bool, body: bool, tail: bool) -> Self {
        if !head && !body && !tail {
            Self::default()
        } else {
            Self { head, body, tail }
        }
    }
}

impl Default for UpdateScope {
    fn default() -> Self {
        Self {
            head: true,
            body: false,
            tail: true,
        }
    }
}

/// Outcome of a note update run
#[derive(Debug, Clone, Default, Serialize)]
pub struct UpdateReport {
    pub updated: Vec<PathBuf>,
    /// Markdown files without reference metadata
    pub skipped: Vec<PathBuf>,
    pub failed: Vec<FailedItem>,
}

fn update_note(path: &Path, scope: UpdateScope, style: Style) -> LibraryResult<bool> {
    let mut note = ReferenceNote::load(path)?.with_style(style);
    if note.citation_key().is_none() {
        return Ok(false);
    }
    if scope.head {
        note.update_head();
    }
    if scope.body {
        note.update_body();
    }
    if scope.tail {
        note.update_tail();
    }
    note.save(path)?;
    Ok(true)
}

/// Regenerate managed sections of every note in the library
pub fn update_notes(library: &Path, scope: UpdateScope, style: Style) -> LibraryResult<UpdateReport> {
    let mut report = UpdateReport::default();

    for path in read_dir_sorted(library)?
        .into_iter()
        .filter(|p| p.is_file() && has_extension(p, "md"))
    {
        match update_note(&path, scope, style) {
            Ok(true) => {
                info!(path = %path.display(), "updated note");
                report.updated.push(path);
            }
            Ok(false) => {
                debug!(path = %path.display(), "not a reference note");
                report.skipped.push(path);
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "note update failed");
                report.failed.push(FailedItem {
                    path,
                    key: None,
                    error: e.to_string(),
                });
            }
        }
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lookup::LookupRecord;
    use crate::reference_note::DEFAULT_TEMPLATE;
    use std::cell::RefCell;
    use tempfile::TempDir;

    /// Lookup that answers every query with the same record
    struct FakeLookup {
        record: Option<LookupRecord>,
        queries: RefCell<Vec<String>>,
    }

    impl FakeLookup {
        fn new(record: Option<LookupRecord>) -> Self {
            Self {
                record,
                queries: RefCell::new(Vec::new()),
            }
        }
    }

    impl ReferenceLookup for FakeLookup {
        fn lookup(&self, query: &str) -> Option<LookupRecord> {
            self.queries.borrow_mut().push(query.to_string());
            self.record.clone()
        }
    }

    const SMITH: &str = "@article{whatever,\n author = {John Smith},\n title = {Rivers},\n year = {2020}\n}\n";

    fn smith() -> BibEntry {
        bibtex::parse(SMITH).remove(0)
    }

    fn write(path: &Path, text: &str) {
        fs::write(path, text).unwrap();
    }

    #[test]
    fn test_existing_keys() {
        let temp = TempDir::new().unwrap();
        write(&temp.path().join("Smith2020a.bib"), SMITH);
        write(&temp.path().join("Smith2020a.md"), "# Metadata\n");
        write(&temp.path().join("Doe1999a.pdf"), "pdf");
        write(&temp.path().join("notes.txt"), "ignored");

        let keys = existing_keys(temp.path()).unwrap();
        assert_eq!(
            keys.into_iter().collect::<Vec<_>>(),
            vec!["Doe1999a", "Smith2020a"]
        );
        assert!(existing_keys(&temp.path().join("missing")).unwrap().is_empty());
    }

    #[test]
    fn test_catalog_pairs_pdfs() {
        let temp = TempDir::new().unwrap();
        write(&temp.path().join("b.bib"), SMITH);
        write(&temp.path().join("a.bib"), SMITH);
        write(&temp.path().join("a.pdf"), "pdf");

        let items = catalog(temp.path()).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].bib, temp.path().join("a.bib"));
        assert_eq!(items[0].pdf, Some(temp.path().join("a.pdf")));
        assert_eq!(items[1].pdf, None);
    }

    #[test]
    fn test_explode() {
        let temp = TempDir::new().unwrap();
        let src = temp.path().join("src.bib");
        write(
            &src,
            "@article{One2000a,\n title = {One}\n}\n@book{Two2001a,\n title = {Two}\n}\n",
        );

        let created = explode(&src).unwrap();
        assert_eq!(
            created,
            vec![temp.path().join("One2000a.bib"), temp.path().join("Two2001a.bib")]
        );
        let two = bibtex::read_file(&created[1]).unwrap();
        assert_eq!(two[0].title.as_deref(), Some("Two"));
        assert!(src.exists());
    }

    #[test]
    fn test_read_list_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join(TAGS_FILE);
        write(&path, "hydrology\n\n  models  \n");
        assert_eq!(read_list_file(&path).unwrap(), vec!["hydrology", "models"]);
    }

    #[test]
    fn test_plan_import_standardizes() {
        let existing: BTreeSet<String> = ["Smith2020a".to_string()].into();
        let plan = plan_import(
            smith(),
            None,
            &existing,
            &ImportOptions::default(),
            None,
            DEFAULT_TEMPLATE,
            "2026-10-18 09:30:00",
        )
        .unwrap();

        assert_eq!(plan.key, "Smith2020b");
        assert_eq!(plan.entry.author.as_deref(), Some("Smith, John"));
        assert!(plan.bib_text.starts_with("@article{Smith2020b,\n"));
        assert!(plan.note_text.contains("citation_key: Smith2020b\n"));
        assert!(!plan.note_text.contains("note_file: "));
        assert!(!plan.enriched);
    }

    #[test]
    fn test_plan_import_enriches_from_lookup() {
        let fake = FakeLookup::new(Some(LookupRecord {
            doi: Some("10.1/rivers".to_string()),
            references: vec!["Doe (1999) Streams".to_string()],
            ..Default::default()
        }));
        let plan = plan_import(
            smith(),
            Some(Path::new("/tmp/source.pdf")),
            &BTreeSet::new(),
            &ImportOptions::default(),
            Some(&fake),
            DEFAULT_TEMPLATE,
            "2026-10-18 09:30:00",
        )
        .unwrap();

        assert!(plan.enriched);
        assert_eq!(plan.entry.doi.as_deref(), Some("10.1/rivers"));
        assert!(plan.bib_text.contains("doi = {10.1/rivers}"));
        assert!(plan.note_text.contains("note_file: Smith2020a.pdf\n"));
        assert!(plan.note_text.contains("- Doe (1999) Streams\n"));
        assert_eq!(fake.queries.borrow().as_slice(), &["Rivers AND Smith, John AND 2020"]);
    }

    #[test]
    fn test_plan_import_keeps_existing_doi() {
        let mut entry = smith();
        entry.set("doi", "10.1/original");
        let fake = FakeLookup::new(Some(LookupRecord {
            doi: Some("10.1/other".to_string()),
            ..Default::default()
        }));
        let plan = plan_import(
            entry,
            None,
            &BTreeSet::new(),
            &ImportOptions::default(),
            Some(&fake),
            DEFAULT_TEMPLATE,
            "now",
        )
        .unwrap();
        assert_eq!(plan.entry.doi.as_deref(), Some("10.1/original"));
    }

    #[test]
    fn test_plan_import_lookup_disabled() {
        let fake = FakeLookup::new(None);
        let options = ImportOptions {
            lookup: false,
            ..Default::default()
        };
        plan_import(
            smith(),
            None,
            &BTreeSet::new(),
            &options,
            Some(&fake),
            DEFAULT_TEMPLATE,
            "now",
        )
        .unwrap();
        assert!(fake.queries.borrow().is_empty());
    }

    #[test]
    fn test_import_folder() {
        let temp = TempDir::new().unwrap();
        let src = temp.path().join("inbox");
        let library = temp.path().join("library");
        fs::create_dir_all(&src).unwrap();
        write(&src.join("a.bib"), SMITH);
        write(&src.join("a.pdf"), "pdf bytes");
        write(&src.join("b.bib"), SMITH);
        write(&src.join("empty.bib"), "% nothing here\n");

        let report =
            import_folder(&src, &library, &ImportOptions::default(), None, DEFAULT_TEMPLATE)
                .unwrap();

        let keys: Vec<&str> = report.imported.iter().map(|i| i.key.as_str()).collect();
        assert_eq!(keys, vec!["Smith2020a", "Smith2020b"]);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].path, src.join("empty.bib"));

        assert!(library.join("Smith2020a.bib").exists());
        assert!(library.join("Smith2020a.md").exists());
        assert_eq!(
            fs::read_to_string(library.join("Smith2020a.pdf")).unwrap(),
            "pdf bytes"
        );
        assert!(library.join("Smith2020b.md").exists());
        assert!(!library.join("Smith2020b.pdf").exists());

        assert!(!src.join("a.bib").exists());
        assert!(!src.join("a.pdf").exists());
        assert!(src.join("empty.bib").exists());
    }

    #[test]
    fn test_import_folder_respects_library_keys() {
        let temp = TempDir::new().unwrap();
        let src = temp.path().join("inbox");
        let library = temp.path().join("library");
        fs::create_dir_all(&src).unwrap();
        fs::create_dir_all(&library).unwrap();
        write(&library.join("Smith2020a.md"), "# Metadata\n");
        write(&src.join("a.bib"), SMITH);

        let options = ImportOptions {
            keep_source: true,
            ..Default::default()
        };
        let report = import_folder(&src, &library, &options, None, DEFAULT_TEMPLATE).unwrap();
        assert_eq!(report.imported[0].key, "Smith2020b");
        assert!(src.join("a.bib").exists());
    }

    #[test]
    fn test_import_folder_explodes_multi_entry_files() {
        let temp = TempDir::new().unwrap();
        let src = temp.path().join("inbox");
        let library = temp.path().join("library");
        fs::create_dir_all(&src).unwrap();
        write(
            &src.join("export.bib"),
            "@article{x1,\n author = {Ann Lee},\n year = {2010}\n}\n@book{x2,\n author = {Bo Kim},\n year = {2011}\n}\n",
        );

        let report =
            import_folder(&src, &library, &ImportOptions::default(), None, DEFAULT_TEMPLATE)
                .unwrap();

        let keys: Vec<&str> = report.imported.iter().map(|i| i.key.as_str()).collect();
        assert_eq!(keys, vec!["Lee2010a", "Kim2011a"]);
        assert!(report.failed.is_empty());
        assert!(!src.join("x1.bib").exists());
        assert!(!src.join("x2.bib").exists());
        assert!(!src.join("export.bib").exists());
    }

    #[test]
    fn test_import_folder_keeps_failed_entries_of_multi_entry_file() {
        let temp = TempDir::new().unwrap();
        let src = temp.path().join("inbox");
        let library = temp.path().join("library");
        fs::create_dir_all(&src).unwrap();
        fs::create_dir_all(&library).unwrap();
        for suffix in 'a'..='z' {
            write(&library.join(format!("Lee2010{}.md", suffix)), "# Metadata\n");
        }
        write(
            &src.join("export.bib"),
            "@article{x1,\n author = {Ann Lee},\n year = {2010}\n}\n@book{x2,\n author = {Bo Kim},\n year = {2011}\n}\n",
        );

        let report =
            import_folder(&src, &library, &ImportOptions::default(), None, DEFAULT_TEMPLATE)
                .unwrap();

        let keys: Vec<&str> = report.imported.iter().map(|i| i.key.as_str()).collect();
        assert_eq!(keys, vec!["Kim2011a"]);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].path, src.join("export.bib"));
        assert_eq!(report.failed[0].key.as_deref(), Some("x1"));

        let left = bibtex::read_file(&src.join("export.bib")).unwrap();
        assert_eq!(left.len(), 1);
        assert_eq!(left[0].citation_key, "x1");
        assert_eq!(left[0].author.as_deref(), Some("Ann Lee"));
    }

    #[test]
    fn test_import_folder_leaves_sources_untouched_with_keep_source() {
        let temp = TempDir::new().unwrap();
        let src = temp.path().join("inbox");
        let library = temp.path().join("library");
        fs::create_dir_all(&src).unwrap();
        let mine = "@article{Smith2020a,\n author = {John Smith},\n title = {Mine},\n year = {2020}\n}\n";
        let export = "@article{Smith2020a,\n author = {John Smith},\n title = {Theirs},\n year = {2020}\n}\n@book{k2,\n author = {Bo Kim},\n year = {2011}\n}\n";
        write(&src.join("Smith2020a.bib"), mine);
        write(&src.join("export.bib"), export);

        let options = ImportOptions {
            keep_source: true,
            ..Default::default()
        };
        let report = import_folder(&src, &library, &options, None, DEFAULT_TEMPLATE).unwrap();

        let keys: Vec<&str> = report.imported.iter().map(|i| i.key.as_str()).collect();
        assert_eq!(keys, vec!["Smith2020a", "Smith2020b", "Kim2011a"]);
        assert_eq!(fs::read_to_string(src.join("Smith2020a.bib")).unwrap(), mine);
        assert_eq!(fs::read_to_string(src.join("export.bib")).unwrap(), export);
        assert_eq!(fs::read_dir(&src).unwrap().count(), 2);

        let title = |key: &str| {
            bibtex::read_file(&library.join(format!("{}.bib", key))).unwrap()[0]
                .title
                .clone()
        };
        assert_eq!(title("Smith2020a").as_deref(), Some("Mine"));
        assert_eq!(title("Smith2020b").as_deref(), Some("Theirs"));
    }

    #[test]
    fn test_explode_never_overwrites() {
        let temp = TempDir::new().unwrap();
        let src = temp.path().join("export.bib");
        write(&temp.path().join("One2000a.bib"), "mine");
        write(
            &src,
            "@article{One2000a,\n title = {One}\n}\n@article{One2000a,\n title = {Again}\n}\n@misc{../up/Key,\n title = {Odd}\n}\n",
        );

        let created = explode(&src).unwrap();
        assert_eq!(
            created,
            vec![
                temp.path().join("One2000a-2.bib"),
                temp.path().join("One2000a-3.bib"),
                temp.path().join("_up_Key.bib"),
            ]
        );
        assert_eq!(fs::read_to_string(temp.path().join("One2000a.bib")).unwrap(), "mine");
        let again = bibtex::read_file(&created[1]).unwrap();
        assert_eq!(again[0].title.as_deref(), Some("Again"));
    }

    #[test]
    fn test_apply_plan_removes_partial_files_on_failure() {
        let temp = TempDir::new().unwrap();
        let library = temp.path();
        let plan = plan_import(
            smith(),
            None,
            &BTreeSet::new(),
            &ImportOptions::default(),
            None,
            DEFAULT_TEMPLATE,
            "now",
        )
        .unwrap();
        fs::create_dir_all(plan.note_path(library)).unwrap();

        assert!(apply_plan(&plan, library).is_err());
        assert!(!plan.bib_path(library).exists());
    }

    #[test]
    fn test_plan_import_fills_missing_fields_only() {
        let mut entry = smith();
        entry.set("volume", "7");
        let fake = FakeLookup::new(Some(LookupRecord {
            title: Some("Another title".to_string()),
            journal: Some("Water Research".to_string()),
            volume: Some("99".to_string()),
            ..Default::default()
        }));
        let plan = plan_import(
            entry,
            None,
            &BTreeSet::new(),
            &ImportOptions::default(),
            Some(&fake),
            DEFAULT_TEMPLATE,
            "now",
        )
        .unwrap();

        assert_eq!(plan.entry.journal.as_deref(), Some("Water Research"));
        assert_eq!(plan.entry.volume.as_deref(), Some("7"));
        assert_eq!(plan.entry.title.as_deref(), Some("Rivers"));
    }

    #[test]
    fn test_import_tree() {
        let temp = TempDir::new().unwrap();
        let src = temp.path().join("incoming");
        let library = temp.path().join("library");
        let papers = src.join("Flood Models");
        let ignored = src.join("_drafts");
        fs::create_dir_all(&papers).unwrap();
        fs::create_dir_all(&ignored).unwrap();
        write(&papers.join("a.bib"), SMITH);
        write(&papers.join(TAGS_FILE), "hydrology\n");
        write(&papers.join(RELATED_FILE), "[[Rivers MOC]]\n");
        write(&ignored.join("b.bib"), SMITH);

        let report =
            import_tree(&src, &library, &ImportOptions::default(), None, DEFAULT_TEMPLATE)
                .unwrap();

        assert_eq!(report.imported.len(), 1);
        let note = ReferenceNote::load(&library.join("Smith2020a.md")).unwrap();
        assert_eq!(note.tags(), vec!["flood-models", "hydrology"]);
        assert_eq!(note.related(), vec!["Flood Models", "Rivers MOC"]);
        assert!(note
            .render()
            .contains("Tags: #flood-models #hydrology\n\nRelated: [[Flood Models]] [[Rivers MOC]]\n"));
        assert!(ignored.join("b.bib").exists());
    }

    #[test]
    fn test_update_scope_flags() {
        assert_eq!(UpdateScope::from_flags(false, false, false), UpdateScope::default());
        assert!(!UpdateScope::default().body);
        assert_eq!(
            UpdateScope::from_flags(false, true, false),
            UpdateScope {
                head: false,
                body: true,
                tail: false
            }
        );
    }

    #[test]
    fn test_update_notes() {
        let temp = TempDir::new().unwrap();
        let library = temp.path();
        let plan = plan_import(
            smith(),
            None,
            &BTreeSet::new(),
            &ImportOptions::default(),
            None,
            DEFAULT_TEMPLATE,
            "now",
        )
        .unwrap();
        apply_plan(&plan, library).unwrap();

        let note_path = plan.note_path(library);
        let edited = fs::read_to_string(&note_path)
            .unwrap()
            .replace("title: Rivers\n", "title: Big Rivers\n");
        fs::write(&note_path, edited).unwrap();
        write(&library.join("README.md"), "# Readme\njust text\n");

        let report = update_notes(library, UpdateScope::default(), Style::Apa).unwrap();
        assert_eq!(report.updated, vec![note_path.clone()]);
        assert_eq!(report.skipped, vec![library.join("README.md")]);
        assert!(report.failed.is_empty());

        let text = fs::read_to_string(&note_path).unwrap();
        assert!(text.contains(" title = {Big Rivers},\n"));
        assert!(text.contains("*Rivers*"));

        let report = update_notes(library, UpdateScope::ALL, Style::Apa).unwrap();
        assert_eq!(report.updated.len(), 1);
        let text = fs::read_to_string(&note_path).unwrap();
        assert!(text.contains("*Big Rivers*"));
    }
}
