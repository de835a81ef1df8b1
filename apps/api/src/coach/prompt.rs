//! Prompt Context Builder — renders the single prompt string sent to the
//! completion model.

use crate::coach::message::Message;
use crate::llm_client::prompts::COACH_SYSTEM;

/// Default number of recent messages rendered as context.
pub const DEFAULT_CONTEXT_WINDOW: usize = 6;

/// Renders the coach persona, the recent context lines and the new utterance.
/// The output is a pure function of its inputs.
pub fn build_context_prompt(current_message: &str, recent: &[&Message]) -> String {
    if recent.is_empty() {
        return format!("{COACH_SYSTEM}\n\nUser: {current_message}\nAssistant:");
    }

    let context_lines = recent
        .iter()
        .map(|m| format!("{}: {}", m.origin().label(), m.text()))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "{COACH_SYSTEM}\n\nRecent conversation context:\n{context_lines}\n\nUser: {current_message}\nAssistant:"
    )
}
