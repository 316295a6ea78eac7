//! Interactive chat loops for `brain rag` and `brain llm`.
//!
//! Both loops read one line at a time, stop on `exit`, an empty line or end
//! of input, and race each answer against Ctrl-C so a slow provider call can
//! be abandoned without leaving the session. Errors are logged and the loop
//! asks for the next question.

use std::future::Future;
use std::io::Write;

use async_trait::async_trait;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::error;

use crate::error::Result;
use crate::generation::GenerationRouter;
use crate::history::ConversationLog;
use crate::pipeline::{answer_direct, QueryPipeline};
use crate::results::ResultStore;
use crate::state::StateSlot;

/// Answers one line of user input.
#[async_trait]
pub trait ChatTurn: Send + Sync {
    async fn respond(&self, input: &str, history: Option<&ConversationLog>) -> Result<String>;
}

pub struct RagTurn<'a, S> {
    pub pipeline: &'a QueryPipeline<'a>,
    pub store: &'a ResultStore<S>,
    pub window: usize,
    pub model: Option<String>,
}

#[async_trait]
impl<S: StateSlot> ChatTurn for RagTurn<'_, S> {
    async fn respond(&self, input: &str, history: Option<&ConversationLog>) -> Result<String> {
        let answer = self
            .pipeline
            .answer(input, history, self.window, self.model.as_deref())
            .await?;
        self.store.save(&answer.retrieval)?;
        Ok(answer.text)
    }
}

pub struct DirectTurn<'a> {
    pub router: &'a GenerationRouter,
    pub window: usize,
    pub model: String,
}

#[async_trait]
impl ChatTurn for DirectTurn<'_> {
    async fn respond(&self, input: &str, history: Option<&ConversationLog>) -> Result<String> {
        let response = answer_direct(self.router, input, history, self.window, &self.model).await?;
        Ok(response.text)
    }
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct ChatStats {
    pub answered: usize,
    pub failed: usize,
    pub cancelled: usize,
}

fn prompt_label(history: bool, window: usize) -> String {
    if history {
        format!("H:on|{}> ", window)
    } else {
        "H:off> ".to_string()
    }
}

pub async fn run_chat<R, T>(
    input: R,
    out: &mut dyn Write,
    turn: &T,
    history: bool,
    window: usize,
) -> Result<ChatStats>
where
    R: AsyncBufRead + Unpin,
    T: ChatTurn + ?Sized,
{
    run_chat_until(input, out, turn, history, window, || async {
        let _ = tokio::signal::ctrl_c().await;
    })
    .await
}

/// [`run_chat`] with an explicit interrupt source. An interrupt while
/// waiting for input ends the session; during a turn it cancels that turn.
pub async fn run_chat_until<R, T, I, F>(
    mut input: R,
    out: &mut dyn Write,
    turn: &T,
    history: bool,
    window: usize,
    interrupt: I,
) -> Result<ChatStats>
where
    R: AsyncBufRead + Unpin,
    T: ChatTurn + ?Sized,
    I: Fn() -> F,
    F: Future<Output = ()>,
{
    let mut log = ConversationLog::new();
    let mut stats = ChatStats::default();
    let label = prompt_label(history, window);

    loop {
        write!(out, "{}", label)?;
        out.flush()?;

        let mut line = String::new();
        let read = tokio::select! {
            biased;
            read = input.read_line(&mut line) => Some(read?),
            _ = interrupt() => None,
        };
        match read {
            Some(0) | None => {
                writeln!(out)?;
                break;
            }
            Some(_) => {}
        }
        let question = line.trim();
        if question.is_empty() || question.eq_ignore_ascii_case("exit") {
            break;
        }

        if history {
            log.push_user(question);
        }
        let context = if history { Some(&log) } else { None };

        let result = tokio::select! {
            result = turn.respond(question, context) => Some(result),
            _ = interrupt() => None,
        };

        match result {
            Some(Ok(answer)) => {
                writeln!(out, "\n{}\n", answer.trim_end())?;
                if history && !answer.trim().is_empty() {
                    log.push_assistant(answer);
                }
                stats.answered += 1;
            }
            Some(Err(e)) if e.is_fatal() => return Err(e),
            Some(Err(e)) => {
                error!(error = %e, "chat turn failed");
                writeln!(out, "error: {}\n", e)?;
                stats.failed += 1;
            }
            None => {
                writeln!(out, "\n(cancelled)\n")?;
                stats.cancelled += 1;
            }
        }
    }

    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Error, ProviderError};
    use std::sync::Mutex;
    use std::time::Duration;

    /// Echoes the input and records how much history each call saw.
    #[derive(Default)]
    struct EchoTurn {
        seen_history: Mutex<Vec<usize>>,
    }

    #[async_trait]
    impl ChatTurn for EchoTurn {
        async fn respond(&self, input: &str, history: Option<&ConversationLog>) -> Result<String> {
            self.seen_history
                .lock()
                .unwrap()
                .push(history.map(|h| h.len()).unwrap_or(0));
            if input == "fail" {
                return Err(ProviderError::new("provider down").into());
            }
            if input == "fatal" {
                return Err(Error::config("bad token"));
            }
            if input == "slow" {
                tokio::time::sleep(Duration::from_secs(30)).await;
            }
            Ok(format!("echo {input}"))
        }
    }

    async fn drive(script: &str, history: bool) -> (ChatStats, String, Vec<usize>) {
        let turn = EchoTurn::default();
        let mut out = Vec::new();
        let stats = run_chat(script.as_bytes(), &mut out, &turn, history, 5)
            .await
            .unwrap();
        let seen = turn.seen_history.lock().unwrap().clone();
        (stats, String::from_utf8(out).unwrap(), seen)
    }

    #[tokio::test]
    async fn answers_until_exit() {
        let (stats, out, _) = drive("one\ntwo\nexit\nthree\n", false).await;
        assert_eq!(stats.answered, 2);
        assert!(out.contains("echo one"));
        assert!(out.contains("echo two"));
        assert!(!out.contains("echo three"));
        assert!(out.starts_with("H:off> "));
    }

    #[tokio::test]
    async fn stops_at_end_of_input_and_on_empty_line() {
        let (stats, _, _) = drive("one", false).await;
        assert_eq!(stats.answered, 1);
        let (stats, _, _) = drive("one\n\ntwo\n", false).await;
        assert_eq!(stats.answered, 1);
    }

    #[tokio::test]
    async fn errors_do_not_end_the_session() {
        let (stats, out, _) = drive("fail\nok\n", false).await;
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.answered, 1);
        assert!(out.contains("error: provider down"));
        assert!(out.contains("echo ok"));
    }

    #[tokio::test]
    async fn fatal_errors_end_the_session() {
        let turn = EchoTurn::default();
        let mut out = Vec::new();
        let err = run_chat("fatal\nok\n".as_bytes(), &mut out, &turn, false, 5)
            .await
            .unwrap_err();
        assert!(err.is_fatal());
    }

    #[tokio::test]
    async fn history_grows_with_each_answered_turn() {
        let (_, out, seen) = drive("a\nb\nc\n", true).await;
        // user turn is appended before each call
        assert_eq!(seen, vec![1, 3, 5]);
        assert!(out.starts_with("H:on|5> "));
    }

    #[tokio::test]
    async fn history_off_passes_nothing() {
        let (_, _, seen) = drive("a\nb\n", false).await;
        assert_eq!(seen, vec![0, 0]);
    }

    #[tokio::test]
    async fn interrupt_at_the_prompt_ends_the_session() {
        let turn = EchoTurn::default();
        let mut out = Vec::new();
        // writer kept open so the read never completes
        let (_writer, reader) = tokio::io::duplex(64);
        let stats = run_chat_until(
            tokio::io::BufReader::new(reader),
            &mut out,
            &turn,
            false,
            5,
            || async {},
        )
        .await
        .unwrap();

        assert_eq!(stats, ChatStats::default());
        assert!(turn.seen_history.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn interrupt_during_a_turn_cancels_only_that_turn() {
        let turn = EchoTurn::default();
        let mut out = Vec::new();
        let stats = run_chat_until("slow\nok\n".as_bytes(), &mut out, &turn, false, 5, || {
            tokio::time::sleep(Duration::from_millis(50))
        })
        .await
        .unwrap();

        let out = String::from_utf8(out).unwrap();
        assert_eq!(stats.cancelled, 1);
        assert_eq!(stats.answered, 1);
        assert!(out.contains("(cancelled)"));
        assert!(out.contains("echo ok"));
    }
}
