//! One question → one answer.
//!
//! Window the history, retrieve, assemble context, build the prompt and
//! generate. The caller owns the session history: it appends the user turn
//! before calling [`QueryPipeline::answer`] and the assistant turn after.

use tracing::debug;

use crate::error::Result;
use crate::generation::GenerationRouter;
use crate::history::{build_context, ConversationLog};
use crate::models::{GenerationResponse, RetrievalResult};
use crate::prompt;
use crate::retrieval::{assemble_context, RetrievalClient};

#[derive(Debug, Clone)]
pub struct Answer {
    pub text: String,
    pub retrieval: RetrievalResult,
    pub generation: GenerationResponse,
}

pub struct QueryPipeline<'a> {
    retrieval: RetrievalClient<'a>,
    generation: &'a GenerationRouter,
}

impl<'a> QueryPipeline<'a> {
    pub fn new(retrieval: RetrievalClient<'a>, generation: &'a GenerationRouter) -> Self {
        Self {
            retrieval,
            generation,
        }
    }

    pub fn retrieval(&self) -> &RetrievalClient<'a> {
        &self.retrieval
    }

    pub async fn answer(
        &self,
        question: &str,
        history: Option<&ConversationLog>,
        window_size: usize,
        model: Option<&str>,
    ) -> Result<Answer> {
        let retrieval = self.retrieval.retrieve(question).await?;
        self.answer_from(question, retrieval, history, window_size, model)
            .await
    }

    /// Generate from an already retrieved result.
    pub async fn answer_from(
        &self,
        question: &str,
        retrieval: RetrievalResult,
        history: Option<&ConversationLog>,
        window_size: usize,
        model: Option<&str>,
    ) -> Result<Answer> {
        let window = history
            .map(|log| build_context(log.turns(), window_size, question))
            .unwrap_or_default();

        let context = assemble_context(&retrieval);
        let prompt = prompt::build(question, &context, &window);
        debug!(
            history_turns = window.len(),
            documents = retrieval.citations.len(),
            prompt_chars = prompt.len(),
            "built prompt"
        );

        let model = self.generation.resolve_model(model);
        let generation = self.generation.generate(&prompt, &model).await?;
        Ok(Answer {
            text: generation.text.clone(),
            retrieval,
            generation,
        })
    }
}

/// Direct chat turn without retrieval.
pub async fn answer_direct(
    generation: &GenerationRouter,
    input: &str,
    history: Option<&ConversationLog>,
    window_size: usize,
    model: &str,
) -> Result<GenerationResponse> {
    let window = history
        .map(|log| build_context(log.turns(), window_size, input))
        .unwrap_or_default();
    let prompt = prompt::build_direct(input, &window);
    generation.generate(&prompt, model).await
}
