//! Prompt templates for the semantic extractor
//!
//! Templates are plain markdown files so operators can tune wording
//! without rebuilding. Lines starting with `#` are titles for humans and
//! are stripped before sending. The user template may contain a
//! `{changes_list}` placeholder that receives the instruction text.

use std::path::Path;

use amend_change::Change;

/// File name of the system template
pub const SYSTEM_PROMPT_FILE: &str = "instruction_check_system.md";
/// File name of the user template
pub const USER_PROMPT_FILE: &str = "instruction_check_user.md";

const DEFAULT_SYSTEM: &str = include_str!("../prompts/instruction_check_system.md");
const DEFAULT_USER: &str = include_str!("../prompts/instruction_check_user.md");

/// System and user prompt templates
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplates {
    pub system: String,
    pub user: String,
}

impl Default for PromptTemplates {
    fn default() -> Self {
        Self {
            system: strip_markdown_headings(DEFAULT_SYSTEM),
            user: strip_markdown_headings(DEFAULT_USER),
        }
    }
}

impl PromptTemplates {
    /// Build from raw template text
    #[must_use]
    pub fn new(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            user: user.into(),
        }
    }

    /// Load both templates from `dir`, using the built-in text for any file
    /// that is missing or unreadable
    #[must_use]
    pub fn load(dir: &Path) -> Self {
        let defaults = Self::default();
        Self {
            system: read_template(dir, SYSTEM_PROMPT_FILE).unwrap_or(defaults.system),
            user: read_template(dir, USER_PROMPT_FILE).unwrap_or(defaults.user),
        }
    }

    /// User message for one extraction call
    ///
    /// Appends a note about candidates already found by the pattern pass and
    /// the full instruction text.
    #[must_use]
    pub fn render_user(&self, instruction_text: &str, seed: &[Change]) -> String {
        let mut prompt = self.user.replace("{changes_list}", instruction_text);

        if !seed.is_empty() {
            prompt.push_str("\n\nУЖЕ РАСПОЗНАННЫЕ ИЗМЕНЕНИЯ (для справки):\n");
            for change in seed {
                prompt.push_str(&format!(
                    "- {} {}: {}\n",
                    change.change_id,
                    change.operation(),
                    change.description
                ));
            }
            prompt.push_str(
                "Включи их в ответ и найди ВСЕ остальные изменения, которые могли быть пропущены.\n",
            );
        }

        prompt.push_str("\n\nИНСТРУКЦИИ ДЛЯ АНАЛИЗА:\n'''");
        prompt.push_str(instruction_text);
        prompt.push_str("'''");
        prompt
    }
}

fn read_template(dir: &Path, file: &str) -> Option<String> {
    let path = dir.join(file);
    match std::fs::read_to_string(&path) {
        Ok(content) => Some(strip_markdown_headings(&content)),
        Err(err) => {
            tracing::warn!(path = %path.display(), error = %err, "prompt file unavailable, using built-in template");
            None
        }
    }
}

/// Remove lines whose first non-blank character is `#`
#[must_use]
pub fn strip_markdown_headings(content: &str) -> String {
    content
        .lines()
        .filter(|line| !line.trim_start().starts_with('#'))
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}
