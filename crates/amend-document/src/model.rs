//! Paragraph-addressable document model
//!
//! A [`Document`] is an ordered list of [`Paragraph`]s. Paragraphs are
//! either headings (with a level) or body text, and may carry review
//! comments. Comments are not part of the searchable text, so annotating a
//! paragraph never shifts the indexes or anchors later changes rely on.

use std::ops::Range;

use crate::hash::ContentHash;

/// Kind of paragraph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ParagraphKind {
    /// Heading with an outline level (1 = top level)
    Heading { level: u8 },
    /// Ordinary body paragraph
    Body,
}

/// One paragraph of a document
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Paragraph {
    /// Heading or body
    pub kind: ParagraphKind,
    /// Visible text
    pub text: String,
    /// Review comments attached to this paragraph
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub comments: Vec<String>,
}

impl Paragraph {
    /// Body paragraph with the given text
    #[must_use]
    pub fn body(text: impl Into<String>) -> Self {
        Self {
            kind: ParagraphKind::Body,
            text: text.into(),
            comments: Vec::new(),
        }
    }

    /// Heading paragraph; level is clamped to at least 1
    #[must_use]
    pub fn heading(text: impl Into<String>, level: u8) -> Self {
        Self {
            kind: ParagraphKind::Heading {
                level: level.max(1),
            },
            text: text.into(),
            comments: Vec::new(),
        }
    }

    /// Attach a comment
    #[inline]
    #[must_use]
    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comments.push(comment.into());
        self
    }

    /// True if this is a heading
    #[inline]
    #[must_use]
    pub fn is_heading(&self) -> bool {
        matches!(self.kind, ParagraphKind::Heading { .. })
    }
}

/// An in-memory document
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Document {
    paragraphs: Vec<Paragraph>,
}

impl Document {
    /// Empty document
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from paragraphs
    #[must_use]
    pub fn from_paragraphs(paragraphs: Vec<Paragraph>) -> Self {
        Self { paragraphs }
    }

    /// Build a document of body paragraphs, one per item
    #[must_use]
    pub fn from_lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            paragraphs: lines.into_iter().map(Paragraph::body).collect(),
        }
    }

    /// All paragraphs in order
    #[inline]
    #[must_use]
    pub fn paragraphs(&self) -> &[Paragraph] {
        &self.paragraphs
    }

    /// Consume into the paragraph list
    #[must_use]
    pub fn into_paragraphs(self) -> Vec<Paragraph> {
        self.paragraphs
    }

    /// Paragraph at `index`
    #[inline]
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Paragraph> {
        self.paragraphs.get(index)
    }

    /// Mutable paragraph at `index`
    #[inline]
    pub fn get_mut(&mut self, index: usize) -> Option<&mut Paragraph> {
        self.paragraphs.get_mut(index)
    }

    /// Number of paragraphs
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.paragraphs.len()
    }

    /// True if the document has no paragraphs
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.paragraphs.is_empty()
    }

    /// Append a paragraph, returning its index
    pub fn push(&mut self, paragraph: Paragraph) -> usize {
        self.paragraphs.push(paragraph);
        self.paragraphs.len() - 1
    }

    /// Insert a paragraph at `index`, shifting later paragraphs down
    ///
    /// Returns `None` when `index > len`.
    pub fn insert(&mut self, index: usize, paragraph: Paragraph) -> Option<usize> {
        if index > self.paragraphs.len() {
            return None;
        }
        self.paragraphs.insert(index, paragraph);
        Some(index)
    }

    /// Remove and return the paragraph at `index`
    pub fn remove(&mut self, index: usize) -> Option<Paragraph> {
        (index < self.paragraphs.len()).then(|| self.paragraphs.remove(index))
    }

    /// Full visible text, one paragraph per line
    #[must_use]
    pub fn text(&self) -> String {
        self.paragraphs
            .iter()
            .map(|p| p.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Every literal occurrence of `needle`, in paragraph then offset order
    #[must_use]
    pub fn find(&self, needle: &str, match_case: bool) -> Vec<TextMatch> {
        self.paragraphs
            .iter()
            .enumerate()
            .flat_map(|(index, paragraph)| {
                find_occurrences(&paragraph.text, needle, match_case)
                    .into_iter()
                    .map(move |range| TextMatch {
                        paragraph_index: index,
                        offset: range.start,
                        matched: paragraph.text[range].to_string(),
                        paragraph_text: paragraph.text.clone(),
                    })
            })
            .collect()
    }

    /// Fingerprint covering kinds, text and comments of every paragraph
    #[must_use]
    pub fn content_hash(&self) -> ContentHash {
        let mut parts = Vec::with_capacity(self.paragraphs.len() * 2);
        for paragraph in &self.paragraphs {
            let tag = match paragraph.kind {
                ParagraphKind::Heading { level } => format!("h{level}"),
                ParagraphKind::Body => "p".to_string(),
            };
            parts.push(tag);
            parts.push(paragraph.text.clone());
            for comment in &paragraph.comments {
                parts.push("c".to_string());
                parts.push(comment.clone());
            }
        }
        ContentHash::compute_parts(parts.iter().map(String::as_str))
    }
}

/// One occurrence of a searched literal
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct TextMatch {
    /// Index of the paragraph containing the match
    pub paragraph_index: usize,
    /// Byte offset of the match inside the paragraph text
    pub offset: usize,
    /// The matched text as it appears in the document
    pub matched: String,
    /// Full text of the containing paragraph
    pub paragraph_text: String,
}

/// A literal substitution inside one paragraph
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Replacement {
    /// Literal to look for
    pub old: String,
    /// Text to put in its place
    pub new: String,
    /// Case-sensitive matching
    pub match_case: bool,
    /// Upper bound on substitutions; `None` replaces every occurrence
    pub limit: Option<usize>,
}

impl Replacement {
    /// Replace every occurrence, case-sensitively
    #[must_use]
    pub fn all(old: impl Into<String>, new: impl Into<String>) -> Self {
        Self {
            old: old.into(),
            new: new.into(),
            match_case: true,
            limit: None,
        }
    }

    /// Replace only the first occurrence
    #[inline]
    #[must_use]
    pub fn first_only(mut self) -> Self {
        self.limit = Some(1);
        self
    }

    /// Set case sensitivity
    #[inline]
    #[must_use]
    pub fn with_match_case(mut self, match_case: bool) -> Self {
        self.match_case = match_case;
        self
    }

    /// Apply to `text`, returning the new text and the substitution count
    #[must_use]
    pub fn apply(&self, text: &str) -> (String, usize) {
        let mut ranges = find_occurrences(text, &self.old, self.match_case);
        if let Some(limit) = self.limit {
            ranges.truncate(limit);
        }
        if ranges.is_empty() {
            return (text.to_string(), 0);
        }

        let mut out = String::with_capacity(text.len());
        let mut cursor = 0;
        for range in &ranges {
            out.push_str(&text[cursor..range.start]);
            out.push_str(&self.new);
            cursor = range.end;
        }
        out.push_str(&text[cursor..]);
        (out, ranges.len())
    }
}

/// Byte ranges of non-overlapping literal occurrences of `needle`
///
/// Case-insensitive matching uses Unicode case folding, so Cyrillic text
/// matches regardless of case and ranges always fall on char boundaries.
#[must_use]
pub fn find_occurrences(haystack: &str, needle: &str, match_case: bool) -> Vec<Range<usize>> {
    if needle.is_empty() {
        return Vec::new();
    }
    if match_case {
        return haystack
            .match_indices(needle)
            .map(|(start, m)| start..start + m.len())
            .collect();
    }

    match regex::RegexBuilder::new(&regex::escape(needle))
        .case_insensitive(true)
        .build()
    {
        Ok(re) => re.find_iter(haystack).map(|m| m.range()).collect(),
        Err(err) => {
            tracing::warn!(error = %err, "could not build case-insensitive matcher");
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn find_orders_by_paragraph_then_offset() {
        let doc = Document::from_lines(["Компания и Компания", "нет", "Компания"]);
        let found = doc.find("Компания", true);
        let positions: Vec<_> = found.iter().map(|m| (m.paragraph_index, m.offset)).collect();
        assert_eq!(positions, vec![(0, 0), (0, 20), (2, 0)]);
        assert_eq!(found[1].paragraph_text, "Компания и Компания");
    }

    #[test]
    fn case_insensitive_matches_cyrillic() {
        let ranges = find_occurrences("КОМПАНИЯ и компания", "Компания", false);
        assert_eq!(ranges.len(), 2);
        assert!(find_occurrences("КОМПАНИЯ", "Компания", true).is_empty());
    }

    #[test]
    fn empty_needle_matches_nothing() {
        assert!(find_occurrences("text", "", true).is_empty());
        assert!(find_occurrences("text", "", false).is_empty());
    }

    #[test]
    fn needle_with_regex_metacharacters_is_literal() {
        let ranges = find_occurrences("a.b (c) a*b", "(c)", false);
        assert_eq!(ranges, vec![4..7]);
    }

    #[test]
    fn replacement_respects_limit() {
        let (text, count) = Replacement::all("a", "b").first_only().apply("a a a");
        assert_eq!(text, "b a a");
        assert_eq!(count, 1);

        let (text, count) = Replacement::all("a", "b").apply("a a a");
        assert_eq!(text, "b b b");
        assert_eq!(count, 3);
    }

    #[test]
    fn replacement_preserves_surrounding_text_case_insensitive() {
        let (text, count) = Replacement::all("компания", "Общество")
            .with_match_case(false)
            .apply("ООО «КОМПАНИЯ» и компания");
        assert_eq!(text, "ООО «Общество» и Общество");
        assert_eq!(count, 2);
    }

    #[test]
    fn insert_and_remove_bounds() {
        let mut doc = Document::from_lines(["a", "b"]);
        assert_eq!(doc.insert(2, Paragraph::body("c")), Some(2));
        assert_eq!(doc.insert(5, Paragraph::body("x")), None);
        assert_eq!(doc.remove(0).map(|p| p.text), Some("a".to_string()));
        assert!(doc.remove(9).is_none());
        assert_eq!(doc.text(), "b\nc");
    }

    #[test]
    fn content_hash_tracks_comments_and_kinds() {
        let plain = Document::from_lines(["Глава 1"]);
        let heading = Document::from_paragraphs(vec![Paragraph::heading("Глава 1", 1)]);
        assert_ne!(plain.content_hash(), heading.content_hash());

        let commented =
            Document::from_paragraphs(vec![Paragraph::body("Глава 1").with_comment("note")]);
        assert_ne!(plain.content_hash(), commented.content_hash());
        assert_eq!(plain.content_hash(), plain.clone().content_hash());
    }

    #[test]
    fn heading_level_is_at_least_one() {
        let p = Paragraph::heading("x", 0);
        assert_eq!(p.kind, ParagraphKind::Heading { level: 1 });
        assert!(p.is_heading());
    }
}
