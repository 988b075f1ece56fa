//! Anchor resolution
//!
//! Instruction text rarely quotes a document verbatim. An anchor is tried
//! in several spellings, in order:
//!
//! 1. for bare point numbers (`30`), the markers `30.` and `30)`
//! 2. whitespace-collapsed
//! 3. as written
//!
//! The first spelling with any hit wins. For point markers a paragraph that
//! *starts* with the marker beats one that merely mentions it, so `30.`
//! resolves to the point itself rather than to "see p. 30." elsewhere.

use amend_change::{normalize, Anchor};
use amend_document::{AccessError, DocumentAccessor, DocumentId, TextMatch};

/// Paragraph an anchor resolved to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnchorHit {
    /// Zero-based index of the resolved paragraph
    pub paragraph_index: usize,
    /// Its text at resolution time
    pub paragraph_text: String,
    /// Spelling that matched
    pub variant: String,
    /// Distinct paragraphs containing that spelling
    pub candidates: usize,
}

/// Spellings to try for `anchor`, most specific first, without duplicates
#[must_use]
pub fn variants(anchor: &str) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(4);
    let mut push = |candidate: String| {
        if !candidate.is_empty() && !out.contains(&candidate) {
            out.push(candidate);
        }
    };

    let collapsed = normalize(anchor, true);
    if is_bare_number(&collapsed) {
        push(format!("{collapsed}."));
        push(format!("{collapsed})"));
    }
    push(collapsed);
    push(anchor.to_string());
    out
}

/// `30`, `60-1`
fn is_bare_number(text: &str) -> bool {
    !text.is_empty()
        && text.starts_with(|c: char| c.is_ascii_digit())
        && text.chars().all(|c| c.is_ascii_digit() || c == '-')
}

/// `30.`, `3)`, `60-1.`
#[must_use]
pub fn is_point_marker(text: &str) -> bool {
    let Some(body) = text.strip_suffix('.').or_else(|| text.strip_suffix(')')) else {
        return false;
    };
    let body = body.trim_start_matches('(');
    is_bare_number(body)
        || (body.chars().count() == 1 && body.chars().all(char::is_alphabetic))
}

/// Locate the paragraph `anchor` refers to in the current document state
///
/// Returns `Ok(None)` when no spelling matches.
///
/// # Errors
/// Propagates accessor failures
pub async fn resolve<A>(
    accessor: &A,
    doc: &DocumentId,
    anchor: &Anchor,
) -> Result<Option<AnchorHit>, AccessError>
where
    A: DocumentAccessor + ?Sized,
{
    for variant in variants(&anchor.text) {
        let matches = accessor.find(doc, &variant, anchor.match_case).await?;
        tracing::debug!(%variant, hits = matches.len(), "anchor lookup");
        if matches.is_empty() {
            continue;
        }

        let chosen = if is_point_marker(&variant) {
            matches
                .iter()
                .find(|m| starts_with(&m.paragraph_text, &variant, anchor.match_case))
                .unwrap_or(&matches[0])
        } else {
            &matches[0]
        };

        return Ok(Some(AnchorHit {
            paragraph_index: chosen.paragraph_index,
            paragraph_text: chosen.paragraph_text.clone(),
            variant: variant.clone(),
            candidates: distinct_paragraphs(&matches),
        }));
    }
    Ok(None)
}

fn starts_with(paragraph: &str, prefix: &str, match_case: bool) -> bool {
    let paragraph = paragraph.trim_start();
    if match_case {
        paragraph.starts_with(prefix)
    } else {
        paragraph.to_lowercase().starts_with(&prefix.to_lowercase())
    }
}

fn distinct_paragraphs(matches: &[TextMatch]) -> usize {
    let mut count = 0;
    let mut last = None;
    for m in matches {
        if last != Some(m.paragraph_index) {
            count += 1;
            last = Some(m.paragraph_index);
        }
    }
    count
}
