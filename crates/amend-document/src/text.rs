//! Plain-text document codec
//!
//! Line-oriented format used by the command line tool and test fixtures:
//!
//! - `# Title` is a level-1 heading, `## Title` level 2, and so on
//! - `> note` attaches a comment to the paragraph above
//! - any other line is a body paragraph (blank lines included)
//! - a leading `\` escapes a body line that would otherwise start with `#` or `>`

use crate::error::CodecError;
use crate::model::{Document, Paragraph, ParagraphKind};

/// Parse the line format into a document
///
/// # Errors
/// Returns error for a heading marker with no text or a comment line at the
/// very top of the input.
pub fn parse(input: &str) -> Result<Document, CodecError> {
    let mut doc = Document::new();

    for (number, line) in input.lines().enumerate() {
        let line_no = number + 1;

        if let Some(comment) = line.strip_prefix('>') {
            let index = doc
                .len()
                .checked_sub(1)
                .ok_or(CodecError::OrphanComment { line: line_no })?;
            if let Some(paragraph) = doc.get_mut(index) {
                paragraph.comments.push(comment.trim_start().to_string());
            }
            continue;
        }

        if line.starts_with('#') {
            let level = line.chars().take_while(|c| *c == '#').count();
            let text = line[level..].trim();
            if text.is_empty() {
                return Err(CodecError::EmptyHeading { line: line_no });
            }
            let level = u8::try_from(level).unwrap_or(u8::MAX);
            doc.push(Paragraph::heading(text, level));
            continue;
        }

        let text = line.strip_prefix('\\').unwrap_or(line);
        doc.push(Paragraph::body(text));
    }

    Ok(doc)
}

/// Render a document in the line format
#[must_use]
pub fn render(doc: &Document) -> String {
    let mut out = String::new();
    for paragraph in doc.paragraphs() {
        match paragraph.kind {
            ParagraphKind::Heading { level } => {
                out.push_str(&"#".repeat(usize::from(level)));
                out.push(' ');
                out.push_str(&paragraph.text);
            }
            ParagraphKind::Body => {
                if paragraph.text.starts_with(&['#', '>', '\\'][..]) {
                    out.push('\\');
                }
                out.push_str(&paragraph.text);
            }
        }
        out.push('\n');
        for comment in &paragraph.comments {
            out.push_str("> ");
            out.push_str(&comment.replace('\n', " "));
            out.push('\n');
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_headings_bodies_and_comments() {
        let doc = parse("# Глава 1\n1. Текст\n> [CHG-001] note\n\n## Раздел\n").unwrap();
        assert_eq!(doc.len(), 4);
        assert_eq!(doc.paragraphs()[0].kind, ParagraphKind::Heading { level: 1 });
        assert_eq!(doc.paragraphs()[1].comments, vec!["[CHG-001] note"]);
        assert_eq!(doc.paragraphs()[2].text, "");
        assert_eq!(doc.paragraphs()[3].kind, ParagraphKind::Heading { level: 2 });
    }

    #[test]
    fn render_then_parse_preserves_document() {
        let doc = Document::from_paragraphs(vec![
            Paragraph::heading("Глава 2", 2),
            Paragraph::body("# not a heading"),
            Paragraph::body("\\ backslash").with_comment("c1"),
            Paragraph::body(">quoted"),
        ]);
        let text = render(&doc);
        assert_eq!(parse(&text).unwrap(), doc);
    }

    #[test]
    fn rejects_malformed_lines() {
        assert!(matches!(
            parse("> comment first"),
            Err(CodecError::OrphanComment { line: 1 })
        ));
        assert!(matches!(
            parse("a\n###  \n"),
            Err(CodecError::EmptyHeading { line: 2 })
        ));
    }
}
