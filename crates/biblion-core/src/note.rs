//! Markdown note documents
//!
//! A note is a forest of sections keyed by heading title. Each section
//! remembers its parent and its own content lines; children are rendered
//! after the parent's content, so `render` is a pre-order walk with heading
//! level equal to tree depth plus one. Lines before the first heading are
//! kept as a preamble.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{LibraryError, LibraryResult};

/// Deepest ATX heading level
const MAX_HEADING: usize = 6;

/// Lifecycle of a note document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NoteState {
    /// Created empty, nothing read yet
    #[default]
    Unloaded,
    /// Parsed from text or a file
    Loaded,
    /// Edited since it was loaded or saved
    Modified,
    /// Written to disk
    Saved,
}

/// One heading and the lines directly under it
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Section {
    pub title: String,
    pub parent: Option<String>,
    pub content: Vec<String>,
}

/// A Markdown note split into titled sections
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NoteDocument {
    path: Option<PathBuf>,
    preamble: Vec<String>,
    sections: Vec<Section>,
    state: NoteState,
}

/// Parse an ATX heading into (depth, title)
fn heading(line: &str) -> Option<(usize, &str)> {
    let depth = line.chars().take_while(|c| *c == '#').count();
    if depth == 0 || depth > MAX_HEADING {
        return None;
    }
    let rest = &line[depth..];
    if rest.is_empty() || rest.starts_with(' ') || rest.starts_with('\t') {
        Some((depth, rest.trim()))
    } else {
        None
    }
}

/// Opening marker of a fenced code block, if the line starts one
fn fence_marker(line: &str) -> Option<&'static str> {
    let trimmed = line.trim_start();
    if trimmed.starts_with("```") {
        Some("```")
    } else if trimmed.starts_with("~~~") {
        Some("~~~")
    } else {
        None
    }
}

impl NoteDocument {
    /// An empty, unloaded document
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse Markdown text into sections
    pub fn parse(text: &str) -> Self {
        let mut doc = Self::new();
        let mut open: Vec<(String, usize)> = Vec::new();
        let mut current: Option<usize> = None;
        let mut fence: Option<&'static str> = None;

        for line in text.lines() {
            if let Some(marker) = fence {
                if line.trim_start().starts_with(marker) {
                    fence = None;
                }
                doc.push_line(current, line);
                continue;
            }

            if let Some(marker) = fence_marker(line) {
                fence = Some(marker);
                doc.push_line(current, line);
                continue;
            }

            let Some((depth, title)) = heading(line) else {
                doc.push_line(current, line);
                continue;
            };

            while open.last().is_some_and(|(_, d)| *d >= depth) {
                open.pop();
            }
            let parent = open.last().map(|(t, _)| t.clone());

            current = match doc.index_of(title) {
                Some(index) => {
                    debug!(title, "repeated heading continues existing section");
                    Some(index)
                }
                None => {
                    doc.sections.push(Section {
                        title: title.to_string(),
                        parent,
                        content: Vec::new(),
                    });
                    Some(doc.sections.len() - 1)
                }
            };
            open.push((title.to_string(), depth));
        }

        doc.state = NoteState::Loaded;
        doc
    }

    /// Read and parse a note file
    pub fn load(path: &Path) -> LibraryResult<Self> {
        let text =
            fs::read_to_string(path).map_err(|e| LibraryError::from_read(e, path.to_path_buf()))?;
        let mut doc = Self::parse(&text);
        doc.path = Some(path.to_path_buf());
        debug!(path = %path.display(), sections = doc.sections.len(), "loaded note");
        Ok(doc)
    }

    /// Render back to Markdown
    pub fn render(&self) -> String {
        let mut out = String::new();
        for line in &self.preamble {
            out.push_str(line);
            out.push('\n');
        }
        for root in self.sections.iter().filter(|s| s.parent.is_none()) {
            self.render_section(root, 1, &mut out);
        }
        out
    }

    fn render_section(&self, section: &Section, level: usize, out: &mut String) {
        out.push_str(&"#".repeat(level));
        out.push(' ');
        out.push_str(&section.title);
        out.push('\n');
        for line in &section.content {
            out.push_str(line);
            out.push('\n');
        }
        for child in self.child_sections(&section.title) {
            self.render_section(child, level + 1, out);
        }
    }

    /// Write the rendered note to a file
    pub fn save(&mut self, path: &Path) -> LibraryResult<()> {
        fs::write(path, self.render()).map_err(|e| LibraryError::from_write(e, path.to_path_buf()))?;
        self.path = Some(path.to_path_buf());
        self.state = NoteState::Saved;
        debug!(path = %path.display(), "saved note");
        Ok(())
    }

    /// Save back to the file the note was loaded from or last saved to
    pub fn save_in_place(&mut self) -> LibraryResult<()> {
        let path = self.path.clone().ok_or_else(|| LibraryError::NotFound {
            path: PathBuf::new(),
        })?;
        self.save(&path)
    }

    pub fn state(&self) -> NoteState {
        self.state
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn preamble(&self) -> &[String] {
        &self.preamble
    }

    pub fn section(&self, title: &str) -> Option<&Section> {
        self.sections.iter().find(|s| s.title == title)
    }

    pub fn content(&self, title: &str) -> Option<&[String]> {
        self.section(title).map(|s| s.content.as_slice())
    }

    pub fn has_section(&self, title: &str) -> bool {
        self.index_of(title).is_some()
    }

    /// Section titles in first-seen order
    pub fn titles(&self) -> Vec<&str> {
        self.sections.iter().map(|s| s.title.as_str()).collect()
    }

    /// Direct children of a section, in first-seen order
    pub fn children(&self, title: &str) -> Vec<&str> {
        self.sections
            .iter()
            .filter(|s| s.parent.as_deref() == Some(title))
            .map(|s| s.title.as_str())
            .collect()
    }

    /// Replace the direct content of a section, creating it as a root if missing
    ///
    /// Child sections are left alone.
    pub fn set_content(&mut self, title: &str, lines: Vec<String>) {
        match self.index_of(title) {
            Some(index) => self.sections[index].content = lines,
            None => self.sections.push(Section {
                title: title.to_string(),
                parent: None,
                content: lines,
            }),
        }
        self.touch();
    }

    /// Add an empty section under `parent` (or as a root)
    ///
    /// Returns false when the title is taken or the parent does not exist.
    pub fn push_section(&mut self, title: &str, parent: Option<&str>) -> bool {
        if self.has_section(title) {
            return false;
        }
        if let Some(parent) = parent {
            if !self.has_section(parent) {
                return false;
            }
        }
        self.sections.push(Section {
            title: title.to_string(),
            parent: parent.map(str::to_string),
            content: Vec::new(),
        });
        self.touch();
        true
    }

    fn child_sections<'a>(&'a self, title: &'a str) -> impl Iterator<Item = &'a Section> + 'a {
        self.sections
            .iter()
            .filter(move |s| s.parent.as_deref() == Some(title))
    }

    fn index_of(&self, title: &str) -> Option<usize> {
        self.sections.iter().position(|s| s.title == title)
    }

    fn push_line(&mut self, section: Option<usize>, line: &str) {
        match section {
            Some(index) => self.sections[index].content.push(line.to_string()),
            None => self.preamble.push(line.to_string()),
        }
    }

    fn touch(&mut self) {
        self.state = NoteState::Modified;
    }
}

/// Replace `{{Token}}` placeholders in one left-to-right pass
///
/// Substituted values are never scanned again and unknown tokens are kept
/// verbatim, so the result does not depend on table order.
pub fn render_template(template: &str, tokens: &BTreeMap<String, String>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];

        let replacement = after.find("}}").and_then(|end| {
            let name = &after[..end];
            if name.contains('\n') {
                return None;
            }
            tokens.get(name.trim()).map(|value| (value, end))
        });

        match replacement {
            Some((value, end)) => {
                out.push_str(value);
                rest = &after[end + 2..];
            }
            None => {
                out.push_str("{{");
                rest = after;
            }
        }
    }

    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    const SAMPLE: &str = "\
---
title: sample
---

# Metadata
type: article
citation_key: Beven1989a

# Summary
Some summary text.

## Notes
- first note

### Detail
deep

## Quotes
> a quote

# Bibliography

```bibtex
# not a heading
@article{Beven1989a,
}
```
";

    fn tokens(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_parse_structure() {
        let doc = NoteDocument::parse(SAMPLE);
        assert_eq!(doc.state(), NoteState::Loaded);
        assert_eq!(
            doc.titles(),
            vec!["Metadata", "Summary", "Notes", "Detail", "Quotes", "Bibliography"]
        );
        assert_eq!(doc.children("Summary"), vec!["Notes", "Quotes"]);
        assert_eq!(doc.children("Notes"), vec!["Detail"]);
        assert_eq!(doc.section("Detail").unwrap().parent.as_deref(), Some("Notes"));
        assert_eq!(doc.section("Bibliography").unwrap().parent, None);
        assert_eq!(doc.preamble(), &["---", "title: sample", "---", ""]);
    }

    #[test]
    fn test_fenced_code_is_content() {
        let doc = NoteDocument::parse(SAMPLE);
        let content = doc.content("Bibliography").unwrap();
        assert!(content.contains(&"# not a heading".to_string()));
        assert!(!doc.has_section("not a heading"));
    }

    #[test]
    fn test_round_trip() {
        let doc = NoteDocument::parse(SAMPLE);
        assert_eq!(doc.render(), SAMPLE);
    }

    #[test]
    fn test_hash_without_space_is_content() {
        let doc = NoteDocument::parse("# Tags\n#hydrology #models\n");
        assert_eq!(doc.titles(), vec!["Tags"]);
        assert_eq!(doc.content("Tags").unwrap(), &["#hydrology #models"]);
    }

    #[test]
    fn test_repeated_title_continues_section() {
        let doc = NoteDocument::parse("# A\none\n# B\ntwo\n# A\nthree\n");
        assert_eq!(doc.titles(), vec!["A", "B"]);
        assert_eq!(doc.content("A").unwrap(), &["one", "three"]);
    }

    #[test]
    fn test_set_content_keeps_children() {
        let mut doc = NoteDocument::parse(SAMPLE);
        doc.set_content("Summary", vec!["".to_string(), "new".to_string(), "".to_string()]);
        assert_eq!(doc.state(), NoteState::Modified);
        assert_eq!(doc.children("Summary"), vec!["Notes", "Quotes"]);
        assert!(doc.render().contains("# Summary\n\nnew\n\n## Notes\n- first note\n"));
    }

    #[test]
    fn test_set_content_creates_missing_root() {
        let mut doc = NoteDocument::parse("# A\ntext\n");
        doc.set_content("B", vec!["b".to_string()]);
        assert_eq!(doc.render(), "# A\ntext\n# B\nb\n");
    }

    #[test]
    fn test_push_section() {
        let mut doc = NoteDocument::new();
        assert_eq!(doc.state(), NoteState::Unloaded);
        assert!(doc.push_section("Root", None));
        assert!(doc.push_section("Child", Some("Root")));
        assert!(!doc.push_section("Child", Some("Root")));
        assert!(!doc.push_section("Orphan", Some("Missing")));
        assert_eq!(doc.render(), "# Root\n## Child\n");
    }

    #[test]
    fn test_load_and_save() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("Beven1989a.md");
        fs::write(&path, SAMPLE).unwrap();

        let mut doc = NoteDocument::load(&path).unwrap();
        assert_eq!(doc.path(), Some(path.as_path()));
        doc.set_content("Quotes", vec!["> replaced".to_string()]);
        doc.save_in_place().unwrap();
        assert_eq!(doc.state(), NoteState::Saved);

        let reloaded = NoteDocument::load(&path).unwrap();
        assert_eq!(reloaded.content("Quotes").unwrap(), &["> replaced"]);
        assert_eq!(reloaded.children("Summary"), vec!["Notes", "Quotes"]);
    }

    #[test]
    fn test_load_missing_file() {
        let temp = TempDir::new().unwrap();
        let err = NoteDocument::load(&temp.path().join("missing.md")).unwrap_err();
        assert!(matches!(err, LibraryError::NotFound { .. }));
    }

    #[test]
    fn test_render_template_replaces_tokens() {
        let table = tokens(&[("Title", "Changing ideas"), ("Year", "1989")]);
        assert_eq!(
            render_template("# {{Title}}\nyear: {{Year}} {{Unknown}}", &table),
            "# Changing ideas\nyear: 1989 {{Unknown}}"
        );
    }

    #[test]
    fn test_render_template_never_rescans_values() {
        let table = tokens(&[("A", "{{B}}"), ("B", "oops")]);
        assert_eq!(render_template("{{A}} {{B}}", &table), "{{B}} oops");
    }

    #[test]
    fn test_render_template_unterminated_and_nested() {
        let table = tokens(&[("B", "b")]);
        assert_eq!(render_template("{{ {{B}}", &table), "{{ b");
        assert_eq!(render_template("open {{B", &table), "open {{B");
        assert_eq!(render_template("{{B\n}}", &table), "{{B\n}}");
    }
}
