//! # Second Brain
//!
//! Keep a folder of personal documents synced into a knowledge base and ask
//! it questions from the terminal.
//!
//! Two pipelines share one configuration file:
//!
//! ```text
//! ┌──────────┐   ┌─────────┐   ┌──────────┐   ┌──────────────┐
//! │  folder  │──▶│ scanner │──▶│ planner  │──▶│   importer   │──▶ knowledge base
//! └──────────┘   └─────────┘   └────┬─────┘   └──────────────┘
//!                                   │ cursor
//!                                   ▼
//!                             last_sync.txt
//!
//! question ──▶ history window ──▶ retrieval ──▶ prompt ──▶ generation ──▶ answer
//!                                                          (Ollama | Workers AI)
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! brain init                     # create the local index
//! brain sync                     # import new and changed documents
//! brain query "when is the offsite?" --sources
//! brain rag --history            # interactive session over the knowledge base
//! brain tree                     # passages behind the last answer
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`cursor`] | Persisted last-sync timestamp |
//! | [`scanner`] | Supported documents in the folder |
//! | [`planner`] | Which documents a sync imports |
//! | [`importer`] | Import one document |
//! | [`sync`] | Batch orchestration and `brain sync` |
//! | [`knowledge`] | Knowledge base trait and backends |
//! | [`retrieval`] | Search and context assembly |
//! | [`prompt`] | Prompt templates |
//! | [`generation`] | Local and hosted text generation |
//! | [`pipeline`] | Question to answer |
//! | [`chat`] | Interactive sessions |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |

pub mod chat;
pub mod chunk;
pub mod clock;
pub mod config;
pub mod cursor;
pub mod db;
pub mod error;
pub mod extract;
pub mod generation;
pub mod history;
pub mod importer;
pub mod kb_http;
pub mod kb_sqlite;
pub mod knowledge;
pub mod migrate;
pub mod models;
pub mod pipeline;
pub mod planner;
pub mod progress;
pub mod prompt;
pub mod query;
pub mod results;
pub mod retrieval;
pub mod scanner;
pub mod search;
pub mod state;
pub mod status;
pub mod sync;

pub use error::{Error, Result};
