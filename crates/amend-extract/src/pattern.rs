//! Rule-based instruction extraction
//!
//! Recognises the recurring phrasings of amendment instructions in Russian
//! legal documents, line by line:
//!
//! - "По всему тексту слово «X» заменить словом «Y»" → REPLACE_TEXT (all)
//! - "Пункт N исключить" → DELETE_PARAGRAPH on `N.`
//! - "В пункте N слова «X» исключить" → REPLACE_TEXT to empty (first)
//! - "В пункте N слово «X» заменить словом «Y»" → REPLACE_TEXT (first)
//! - "Подпункт K) пункта N изложить ..." → REPLACE_POINT_TEXT on `K)`
//! - "Пункт N изложить в следующей редакции: ..." → REPLACE_POINT_TEXT on `N.`
//! - "Главу N дополнить пунктами A и B ..." → INSERT_PARAGRAPH per point
//! - "Главу N дополнить пунктом M ..." → INSERT_PARAGRAPH after `(M-1).`
//! - "Приложение №N изложить ..." → REPLACE_POINT_TEXT on `Приложение №N`
//! - "Дополнить Приложением №N[-M] ..." → INSERT_SECTION
//!
//! Text that matches none of these is ignored; the semantic pass is
//! expected to pick it up. Multi-line payloads run from the line after the
//! instruction (or the text after its colon) up to the next instruction.

use once_cell::sync::Lazy;
use regex::Regex;

use amend_change::{Change, ChangeId, Edit};

fn re(pattern: &str) -> Regex {
    match Regex::new(pattern) {
        Ok(re) => re,
        Err(err) => unreachable!("invalid built-in pattern {pattern}: {err}"),
    }
}

const REWRITE: &str = r"изло(?:ж|[іи]?к)ить";

static QUOTED: Lazy<Regex> = Lazy::new(|| re(r#"[«"“„]([^»"”“„]+)[»"”“]"#));
static MASS_FALLBACK: Lazy<Regex> = Lazy::new(|| {
    re(r#"(?i)слов[оа]\s*[«"“„]?([^»"”“„]+?)[»"”“]?\s.*?заменить.*?слов(?:ом|ами)\s*[«"“„]?([^»"”“„\s]+)"#)
});
static DELETE_POINT: Lazy<Regex> = Lazy::new(|| re(r"(?i)\bпункт\s+(\d+)\s+исключить"));
static REMOVE_WORDS: Lazy<Regex> = Lazy::new(|| {
    re(r#"(?i)\bв\s+пункте\s+(\d+)\s+слов[оа]\s+[«"“„]([^»"”“„]+)[»"”“]\s+исключить"#)
});
static SUBPOINT: Lazy<Regex> = Lazy::new(|| {
    re(&format!(
        r"(?i)\bподпункт\s+(\d+)\)?\s+пункта\s+(\d+)[\s\-]*{REWRITE}"
    ))
});
static REWRITE_POINT: Lazy<Regex> = Lazy::new(|| {
    re(&format!(r"(?i)\bпу[іи]?н(?:к|[‹<])?т\s+(\d+)[\s\-]*{REWRITE}"))
});
static REPLACE_IN_POINT: Lazy<Regex> = Lazy::new(|| {
    re(r#"(?i)\bв\s+пункте\s+(\d+)\s+слово\s+[«"“„]([^»"”“„]+)[»"”“]?\s+заменить\s+словом\s+[«"“„]?([^»"”“„]+)[»"”“]?"#)
});
static INSERT_POINTS: Lazy<Regex> = Lazy::new(|| {
    re(r"(?i)\b(?:главу|раздел)\s+([0-9IVXLC]+)\s+дополнить\s+пунктами\s+(.+)")
});
static INSERT_POINT: Lazy<Regex> = Lazy::new(|| {
    re(r"(?i)\b(?:главу|раздел)\s+([0-9IVXLC]+)\s+дополнить\s+пунктом\s+(\d+(?:-\d+)?)")
});
static POINT_NUMBER: Lazy<Regex> = Lazy::new(|| re(r"\d+(?:-\d+)?"));
static REWRITE_APPENDIX: Lazy<Regex> = Lazy::new(|| {
    re(&format!(
        r"(?i)\bприложен[а-яё]*\s*[N№.]?\s*(\d+)[\s\-]*{REWRITE}"
    ))
});
static ADD_APPENDIX: Lazy<Regex> = Lazy::new(|| {
    re(r"(?i)\bдополнить\s+приложением\s*[N№.]?\s*(\d+)(?:\s*[-.]\s*(\d+))?")
});
static NEW_INSTRUCTION: Lazy<Regex> = Lazy::new(|| {
    re(r"(?i)^(?:\d+[.)]\s+)?(?:по\s+всему\s+тексту|пу[іи]?н(?:к|[‹<])?т\s+\d+|в\s+пункте\s+\d+|подпункт\s+\d+|(?:главу|раздел)\s+\S+\s+дополнить|приложен|дополнить\s+приложением)")
});
static SUB_POINT_START: Lazy<Regex> = Lazy::new(|| re(r"^\d+[-.]\d+\."));

const QUOTES: &[char] = &['«', '»', '"', '\'', '“', '”', '„'];
const FRAGMENT_TRIM: &[char] = &['«', '»', '"', '\'', '“', '”', '„', '.', ',', ';', ':', '›'];

/// Deterministic extractor for well-known instruction phrasings
#[derive(Debug, Clone, Copy, Default)]
pub struct PatternExtractor;

impl PatternExtractor {
    /// Create an extractor
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Scan instruction text and return changes in document order
    #[must_use]
    pub fn extract(&self, instruction_text: &str) -> Vec<Change> {
        let lines: Vec<&str> = instruction_text.lines().map(str::trim).collect();
        let mut scan = Scan {
            lines: &lines,
            changes: Vec::new(),
        };

        let mut i = 0;
        while i < lines.len() {
            i = if lines[i].is_empty() { i + 1 } else { scan.line(i) };
        }

        tracing::info!(count = scan.changes.len(), "pattern extraction finished");
        scan.changes
    }
}

/// True if the line starts a new instruction
fn is_instruction_line(line: &str) -> bool {
    NEW_INSTRUCTION.is_match(line.trim())
}

struct Scan<'a> {
    lines: &'a [&'a str],
    changes: Vec<Change>,
}

impl Scan<'_> {
    fn push(&mut self, description: String, edit: Edit) {
        let id = ChangeId::sequential(self.changes.len() + 1);
        tracing::debug!(change_id = %id, operation = %edit.operation(), %description, "pattern matched");
        self.changes.push(Change::new(id, description, edit));
    }

    /// Handle line `i`, returning the index of the next line to scan
    fn line(&mut self, i: usize) -> usize {
        let line = self.lines[i];
        let lower = line.to_lowercase();

        if lower.contains("по всему тексту") && lower.contains("заменить") {
            if let Some((old, new)) = mass_replacement(line) {
                let description = format!("Массовая замена: '{old}' → '{new}'");
                self.push(description, Edit::replace_all(old, new));
            }
            return i + 1;
        }

        if let Some(caps) = DELETE_POINT.captures(line) {
            let point = &caps[1];
            self.push(format!("Удаление пункта {point}"), Edit::delete(format!("{point}.")));
            return i + 1;
        }

        if let Some(caps) = REMOVE_WORDS.captures(line) {
            let point = &caps[1];
            let words = caps[2].trim();
            self.push(
                format!("Удаление слов '{words}' из пункта {point}"),
                Edit::replace_first(words, ""),
            );
            return i + 1;
        }

        if let Some(caps) = SUBPOINT.captures(line) {
            let (sub, point) = (caps[1].to_string(), caps[2].to_string());
            let tail = tail_after(line, &caps);
            return self.with_block(i, tail, |text| {
                (
                    format!("Изменение подпункта {sub} пункта {point}"),
                    Edit::replace_point(format!("{sub})"), text),
                )
            });
        }

        if let Some(caps) = REWRITE_POINT.captures(line) {
            let point = caps[1].to_string();
            let tail = tail_after(line, &caps);
            return self.with_block(i, tail, |text| {
                (
                    format!("Изменение пункта {point}"),
                    Edit::replace_point(format!("{point}."), text),
                )
            });
        }

        if let Some(caps) = REPLACE_IN_POINT.captures(line) {
            let point = &caps[1];
            let old = clean_fragment(&caps[2]);
            let new = clean_fragment(&caps[3]);
            if !old.is_empty() && !new.is_empty() {
                self.push(
                    format!("Замена '{old}' на '{new}' в пункте {point}"),
                    Edit::replace_first(old, new),
                );
                return i + 1;
            }
        }

        if let Some(caps) = INSERT_POINTS.captures(line) {
            let chapter = caps[1].to_string();
            let points: Vec<String> = POINT_NUMBER
                .find_iter(&caps[2])
                .map(|m| m.as_str().to_string())
                .collect();
            let (texts, next) = self.multiple_blocks(i + 1);
            if texts.is_empty() {
                return i + 1;
            }
            self.push_inserted_points(&chapter, &points, &texts);
            return next;
        }

        if let Some(caps) = INSERT_POINT.captures(line) {
            let chapter = caps[1].to_string();
            let point = caps[2].to_string();
            let Some(after) = preceding_point_anchor(&point) else {
                return i + 1;
            };
            let tail = tail_after(line, &caps);
            return self.with_block(i, tail, |text| {
                (
                    format!("Добавление пункта {point} в главу {chapter}"),
                    Edit::insert_after(after, text),
                )
            });
        }

        if let Some(caps) = REWRITE_APPENDIX.captures(line) {
            let number = caps[1].to_string();
            let tail = tail_after(line, &caps);
            return self.with_block(i, tail, |text| {
                (
                    format!("Изменение Приложения №{number}"),
                    Edit::replace_point(format!("Приложение №{number}"), text),
                )
            });
        }

        if let Some(caps) = ADD_APPENDIX.captures(line) {
            let heading = match caps.get(2) {
                Some(sub) => format!("Приложение №{}-{}", &caps[1], sub.as_str()),
                None => format!("Приложение №{}", &caps[1]),
            };
            let tail = tail_after(line, &caps);
            return self.with_block(i, tail, |text| {
                let paragraphs = text.lines().map(str::to_string).collect();
                (format!("Добавление {heading}"), Edit::section(heading, paragraphs))
            });
        }

        i + 1
    }

    /// Collect the payload block for the instruction on line `i` and push the
    /// change built from it; without a payload the instruction is skipped
    fn with_block(
        &mut self,
        i: usize,
        inline: Option<String>,
        build: impl FnOnce(String) -> (String, Edit),
    ) -> usize {
        let (block, next) = self.block(i + 1);
        let text = match (inline, block) {
            (Some(first), Some(rest)) => Some(format!("{first}\n{rest}")),
            (first, rest) => first.or(rest),
        };
        match text {
            Some(text) => {
                let (description, edit) = build(text);
                self.push(description, edit);
                next
            }
            None => i + 1,
        }
    }

    /// Lines from `start` up to the next instruction, quotes stripped
    fn block(&self, start: usize) -> (Option<String>, usize) {
        let mut i = start;
        while i < self.lines.len() && self.lines[i].is_empty() {
            i += 1;
        }

        let mut parts = Vec::new();
        while i < self.lines.len() && !is_instruction_line(self.lines[i]) {
            let line = self.lines[i].trim_matches(QUOTES).trim();
            if !line.is_empty() {
                parts.push(line);
            }
            i += 1;
        }

        let text = parts.join("\n");
        ((!text.is_empty()).then_some(text), i)
    }

    /// Payload blocks split at sub-point markers like `60-1.` or `60.2.`
    fn multiple_blocks(&self, start: usize) -> (Vec<String>, usize) {
        let mut texts = Vec::new();
        let mut current: Vec<&str> = Vec::new();
        let mut i = start;

        while i < self.lines.len() && !is_instruction_line(self.lines[i]) {
            let line = self.lines[i];
            if SUB_POINT_START.is_match(line) && !current.is_empty() {
                texts.push(current.join("\n"));
                current.clear();
            }
            if !line.is_empty() {
                current.push(line.trim_matches(QUOTES).trim());
            }
            i += 1;
        }
        if !current.is_empty() {
            texts.push(current.join("\n"));
        }

        texts.retain(|t| !t.trim().is_empty());
        (texts, i)
    }

    /// One INSERT_PARAGRAPH per text; the first goes after the point that
    /// precedes the new range, each later one after the one inserted before it
    fn push_inserted_points(&mut self, chapter: &str, points: &[String], texts: &[String]) {
        let base = points
            .first()
            .map(|p| p.split('-').next().unwrap_or(p).to_string())
            .unwrap_or_default();
        let Some(mut after) = preceding_point_anchor(&base) else {
            return;
        };

        for (idx, text) in texts.iter().enumerate() {
            let point = points
                .get(idx)
                .cloned()
                .unwrap_or_else(|| format!("{base}-{}", idx + 1));
            self.push(
                format!("Добавление пункта {point} в главу {chapter}"),
                Edit::insert_after(after.clone(), text.clone()),
            );
            after = leading_marker(text).unwrap_or_else(|| first_line(text).to_string());
        }
    }
}

/// `"60-1"` → `"59."`; `None` for point 1 or non-numeric input
fn preceding_point_anchor(point: &str) -> Option<String> {
    point
        .split('-')
        .next()?
        .parse::<u32>()
        .ok()?
        .checked_sub(1)
        .filter(|n| *n > 0)
        .map(|n| format!("{n}."))
}

fn leading_marker(text: &str) -> Option<String> {
    SUB_POINT_START.find(text).map(|m| m.as_str().to_string())
}

fn first_line(text: &str) -> &str {
    text.lines().next().unwrap_or(text)
}

/// Text after the colon that follows a match, e.g. the inline payload of
/// "Пункт 5 изложить в следующей редакции: «5. ...»"
fn tail_after(line: &str, caps: &regex::Captures<'_>) -> Option<String> {
    let end = caps.get(0)?.end();
    let rest = &line[end..];
    let (_, tail) = rest.split_once(':')?;
    let tail = tail.trim().trim_matches(QUOTES).trim();
    (!tail.is_empty()).then(|| tail.to_string())
}

fn clean_fragment(fragment: &str) -> String {
    fragment.trim().trim_matches(FRAGMENT_TRIM).trim().to_string()
}

/// Old and new text of a "по всему тексту ... заменить ..." line
fn mass_replacement(line: &str) -> Option<(String, String)> {
    let quoted: Vec<String> = QUOTED
        .captures_iter(line)
        .map(|caps| clean_fragment(&caps[1]))
        .filter(|s| !s.is_empty())
        .collect();
    if let [old, new, ..] = quoted.as_slice() {
        return Some((old.clone(), new.clone()));
    }

    let caps = MASS_FALLBACK.captures(line)?;
    let old = clean_fragment(&caps[1]);
    let new = clean_fragment(&caps[2]);
    (!old.is_empty() && !new.is_empty()).then_some((old, new))
}

#[cfg(test)]
mod tests {
    use super::*;
    use amend_change::{ChangeOperation, TextTarget};
    use pretty_assertions::assert_eq;

    fn extract(text: &str) -> Vec<Change> {
        PatternExtractor::new().extract(text)
    }

    #[test]
    fn mass_replacement_is_replace_all() {
        let changes = extract("По всему тексту слово «Компания» заменить словом «Общество».");
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].change_id.as_str(), "CHG-001");
        assert_eq!(changes[0].edit, Edit::replace_all("Компания", "Общество"));
    }

    #[test]
    fn mass_replacement_accepts_straight_quotes() {
        let changes = extract(r#"по всему тексту слова "Генеральный директор" заменить словами "Президент""#);
        assert_eq!(changes[0].edit, Edit::replace_all("Генеральный директор", "Президент"));
    }

    #[test]
    fn point_deletion() {
        let changes = extract("Пункт 30 исключить.");
        assert_eq!(changes[0].edit, Edit::delete("30."));
        assert_eq!(changes[0].description, "Удаление пункта 30");
    }

    #[test]
    fn point_rewrite_collects_block_until_next_instruction() {
        let text = "Пункт 36 изложить в следующей редакции:\n\
                    «36. Новый текст пункта\n\
                    продолжение.»\n\
                    \n\
                    Пункт 40 исключить.";
        let changes = extract(text);
        assert_eq!(changes.len(), 2);
        assert_eq!(
            changes[0].edit,
            Edit::replace_point("36.", "36. Новый текст пункта\nпродолжение.")
        );
        assert_eq!(changes[1].edit, Edit::delete("40."));
        assert_eq!(changes[1].change_id.as_str(), "CHG-002");
    }

    #[test]
    fn inline_payload_after_colon() {
        let changes = extract("Пункт 5 изложить в следующей редакции: «5. Коротко.»");
        assert_eq!(changes[0].edit, Edit::replace_point("5.", "5. Коротко."));
    }

    #[test]
    fn typo_spellings_are_accepted() {
        let changes = extract("Пуін‹т 12 излоікить:\n12. Текст.");
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].edit, Edit::replace_point("12.", "12. Текст."));
    }

    #[test]
    fn subpoint_rewrite_anchors_on_parenthesis() {
        let changes = extract("Подпункт 3) пункта 8 изложить в следующей редакции:\n3) новый подпункт;");
        assert_eq!(changes[0].edit, Edit::replace_point("3)", "3) новый подпункт;"));
        assert_eq!(changes[0].description, "Изменение подпункта 3 пункта 8");
    }

    #[test]
    fn words_removed_from_point() {
        let changes = extract("В пункте 7 слова «и иных лиц» исключить.");
        assert_eq!(changes[0].edit, Edit::replace_first("и иных лиц", ""));
    }

    #[test]
    fn word_replaced_in_point() {
        let changes = extract("В пункте 9 слово «месяц» заменить словом «квартал».");
        match &changes[0].edit {
            Edit::ReplaceText { target, new_text } => {
                assert_eq!(
                    target,
                    &TextTarget {
                        text: "месяц".into(),
                        replace_all: false,
                        match_case: false
                    }
                );
                assert_eq!(new_text, "квартал");
            }
            other => panic!("unexpected edit {other:?}"),
        }
    }

    #[test]
    fn chapter_gets_points_in_order() {
        let text = "Главу 5 дополнить пунктами 60-1 и 60-2 в следующей редакции:\n\
                    60-1. Первый новый пункт.\n\
                    60-2. Второй новый пункт.\n\
                    Пункт 70 исключить.";
        let changes = extract(text);
        assert_eq!(changes.len(), 3);
        assert_eq!(changes[0].edit, Edit::insert_after("59.", "60-1. Первый новый пункт."));
        assert_eq!(changes[1].edit, Edit::insert_after("60-1.", "60-2. Второй новый пункт."));
        assert_eq!(changes[1].description, "Добавление пункта 60-2 в главу 5");
        assert_eq!(changes[2].operation(), ChangeOperation::DeleteParagraph);
    }

    #[test]
    fn single_point_goes_after_predecessor() {
        let changes = extract("Главу 3 дополнить пунктом 25 следующего содержания:\n25. Текст.");
        assert_eq!(changes[0].edit, Edit::insert_after("24.", "25. Текст."));
    }

    #[test]
    fn appendix_rewrite_and_addition() {
        let text = "Приложение №2 изложить в новой редакции:\nТекст приложения.\n\
                    Дополнить Приложением №3-1 следующего содержания:\nСтрока 1\nСтрока 2";
        let changes = extract(text);
        assert_eq!(changes.len(), 2);
        assert_eq!(
            changes[0].edit,
            Edit::replace_point("Приложение №2", "Текст приложения.")
        );
        assert_eq!(
            changes[1].edit,
            Edit::section(
                "Приложение №3-1",
                vec!["Строка 1".to_string(), "Строка 2".to_string()]
            )
        );
    }

    #[test]
    fn unrecognised_text_yields_nothing() {
        assert!(extract("Общие положения.\nНастоящий документ вступает в силу.").is_empty());
        assert!(extract("").is_empty());
    }

    #[test]
    fn rewrite_without_payload_is_skipped() {
        assert!(extract("Пункт 5 изложить в следующей редакции:").is_empty());
    }

    #[test]
    fn numbered_instruction_lines_end_blocks() {
        let text = "1. Пункт 4 изложить в следующей редакции:\n4. Новый.\n2. Пункт 6 исключить.";
        let changes = extract(text);
        assert_eq!(changes.len(), 2);
        assert_eq!(changes[0].edit, Edit::replace_point("4.", "4. Новый."));
        assert_eq!(changes[1].edit, Edit::delete("6."));
    }

    #[test]
    fn preceding_anchor_rules() {
        assert_eq!(preceding_point_anchor("60-1").as_deref(), Some("59."));
        assert_eq!(preceding_point_anchor("2").as_deref(), Some("1."));
        assert!(preceding_point_anchor("1").is_none());
        assert!(preceding_point_anchor("x").is_none());
    }
}
