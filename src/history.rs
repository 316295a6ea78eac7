//! Session history and the bounded window sent with each prompt.

use crate::models::{ConversationTurn, Role};

/// Append-only history owned by an interactive loop.
#[derive(Debug, Default, Clone)]
pub struct ConversationLog {
    turns: Vec<ConversationTurn>,
}

impl ConversationLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_user(&mut self, content: impl Into<String>) {
        self.turns.push(ConversationTurn::user(content));
    }

    pub fn push_assistant(&mut self, content: impl Into<String>) {
        self.turns.push(ConversationTurn::assistant(content));
    }

    pub fn turns(&self) -> &[ConversationTurn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}

/// The last `window_size` turns, minus the in-flight question.
///
/// When the caller has already appended the current question, the newest
/// turn is a user turn equal to `current_input`; it is dropped so the
/// question is not repeated in the history block.
pub fn build_context(
    history: &[ConversationTurn],
    window_size: usize,
    current_input: &str,
) -> Vec<ConversationTurn> {
    if window_size == 0 || history.is_empty() {
        return Vec::new();
    }
    let start = history.len().saturating_sub(window_size);
    let mut window = history[start..].to_vec();
    if let Some(last) = window.last() {
        if last.role == Role::User && last.content == current_input {
            window.pop();
        }
    }
    window
}
