//! Prompt assembly.
//!
//! The prompt is a fixed instruction, a bulleted context section with each
//! passage shortened to a display width, the question verbatim, and an
//! answer directive:
//!
//! ```text
//! <SYSTEM_MSG>
//!
//! ### Context
//! - first passage…
//! - second passage
//!
//! ### Question
//! <question>
//!
//! ### Answer (markdown):
//! ```

use solorag_core::ScoredPassage;

/// Instruction placed at the top of every prompt.
pub const SYSTEM_MSG: &str = "You are a concise yet thorough Stripe support agent. Answer **only** from the provided context. If the question cannot be answered from the context, say so.";

/// Marker appended to shortened passages.
pub const ELLIPSIS: &str = "…";

/// Default maximum display width of one context bullet, in characters.
pub const DEFAULT_SNIPPET_WIDTH: usize = 300;

/// Collapse whitespace and shorten `text` to at most `width` characters.
///
/// Text that fits after collapsing is returned as is. Otherwise whole words
/// are kept while they fit in `width - 1`, then [`ELLIPSIS`] is appended. A
/// first word longer than that is cut mid-word. A zero width yields an
/// empty string.
pub fn shorten(text: &str, width: usize) -> String {
    if width == 0 {
        return String::new();
    }
    let words: Vec<&str> = text.split_whitespace().collect();
    let collapsed = words.join(" ");
    if collapsed.chars().count() <= width {
        return collapsed;
    }

    let budget = width.saturating_sub(ELLIPSIS.chars().count());
    let mut out = String::new();
    let mut used = 0;
    for word in words {
        let len = word.chars().count();
        let needed = if out.is_empty() { len } else { len + 1 };
        if used + needed > budget {
            if out.is_empty() {
                out.extend(word.chars().take(budget));
            }
            break;
        }
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(word);
        used += needed;
    }
    out.push_str(ELLIPSIS);
    out
}

/// Builds prompts with a configurable snippet width.
#[derive(Debug, Clone, Copy)]
pub struct PromptComposer {
    snippet_width: usize,
}

impl Default for PromptComposer {
    fn default() -> Self {
        Self {
            snippet_width: DEFAULT_SNIPPET_WIDTH,
        }
    }
}

impl PromptComposer {
    /// Create a composer with the given snippet width.
    pub fn new(snippet_width: usize) -> Self {
        Self { snippet_width }
    }

    /// Maximum characters per context bullet.
    pub fn snippet_width(&self) -> usize {
        self.snippet_width
    }

    /// Render the prompt for `question` grounded in `passages`.
    pub fn build(&self, question: &str, passages: &[ScoredPassage]) -> String {
        let bullets = passages
            .iter()
            .map(|p| format!("- {}", shorten(&p.text, self.snippet_width)))
            .collect::<Vec<_>>()
            .join("\n");
        format!(
            "{SYSTEM_MSG}\n\n### Context\n{bullets}\n\n### Question\n{question}\n\n### Answer (markdown):"
        )
    }
}

/// Render the prompt with the default snippet width.
pub fn build_prompt(question: &str, passages: &[ScoredPassage]) -> String {
    PromptComposer::default().build(question, passages)
}

// ============================================================================
// Tests
// ============================================================================
