//! Prompt templates.
//!
//! Both builders are pure string assembly: the same inputs always produce the
//! same bytes. The history block is emitted only when there is history.

use std::fmt::Write;

use crate::models::{ConversationTurn, Role};

const RAG_INSTRUCTIONS: &str = "\
You are an assistant answering questions from a personal knowledge base.
Answer only from the knowledge base content below. Do not add facts that are not in it.";

const RAG_GUIDELINES: &str = "\
- Give a clear, concise and accurate answer.
- Combine related passages into one coherent answer.
- If the content does not answer the question, say the knowledge base does not contain it.
- Quote specific details from the content where they help.";

const DIRECT_INSTRUCTIONS: &str = "\
You are a helpful assistant. Answer clearly, concisely and accurately.
The answer is shown in a terminal, so use plain text.";

const DIRECT_GUIDELINES: &str = "\
- Separate paragraphs with a blank line.
- Use '-' bullets for lists.
- Avoid markdown emphasis such as **bold** or *italic*.";

fn history_block(history: &[ConversationTurn]) -> String {
    if history.is_empty() {
        return String::new();
    }
    let mut out = String::from("<conversation_history>\nPREVIOUS CONVERSATION:\n");
    for turn in history {
        let label = match turn.role {
            Role::User => "User",
            Role::Assistant => "Assistant",
        };
        let _ = writeln!(out, "{}: {}", label, turn.content);
    }
    out.push_str("</conversation_history>\n\n");
    out
}

/// Retrieval-augmented prompt.
pub fn build(question: &str, context: &str, history: &[ConversationTurn]) -> String {
    let mut prompt = String::new();
    prompt.push_str("<prompt>\n<instruction>\n");
    prompt.push_str(RAG_INSTRUCTIONS);
    if !history.is_empty() {
        prompt.push_str("\nUse the conversation history to keep answers consistent with what was already said.");
    }
    prompt.push_str("\n</instruction>\n<instruction>\n");
    prompt.push_str(RAG_GUIDELINES);
    prompt.push_str("\n</instruction>\n\n");
    prompt.push_str(&history_block(history));
    let _ = write!(
        prompt,
        "<context>\nKNOWLEDGE BASE CONTENT:\n{}\n</context>\n\n<input>\nUser Question: {}\n</input>\n\n<answer>\n",
        context.trim_end(),
        question
    );
    prompt.push_str("Answer based on the context above.\n</answer>\n</prompt>");
    prompt
}

/// Prompt for the direct chat, without retrieval.
pub fn build_direct(input: &str, history: &[ConversationTurn]) -> String {
    let mut prompt = String::new();
    prompt.push_str("<prompt>\n<instruction>\n");
    prompt.push_str(DIRECT_INSTRUCTIONS);
    prompt.push_str("\n</instruction>\n\n<formatting_guidelines>\n");
    prompt.push_str(DIRECT_GUIDELINES);
    prompt.push_str("\n</formatting_guidelines>\n\n");
    prompt.push_str(&history_block(history));
    let _ = write!(prompt, "<user_input>\n{}\n</user_input>\n</prompt>", input);
    prompt
}
