//! `brain query`: one-shot retrieval and answer.

use crate::config::Config;
use crate::error::Result;
use crate::generation::GenerationRouter;
use crate::knowledge;
use crate::models::RetrievalResult;
use crate::pipeline::QueryPipeline;
use crate::results::{preview, store_for};
use crate::retrieval::RetrievalClient;

/// Characters of each passage shown in the sources table.
const TABLE_PREVIEW_CHARS: usize = 100;

pub struct QueryOptions {
    pub limit: Option<usize>,
    /// Also list the documents the answer drew on.
    pub sources: bool,
    /// Retrieval only; never call the generation provider.
    pub no_llm: bool,
    pub model: Option<String>,
}

pub async fn run_query(config: &Config, question: &str, options: QueryOptions) -> Result<()> {
    let kb = knowledge::open(config).await?;
    let limit = options.limit.unwrap_or(config.knowledge_base.limit).max(1);
    let retrieval = RetrievalClient::new(
        kb.as_ref(),
        config.knowledge_base.index.clone(),
        limit,
        config.knowledge_base.min_relevance,
    );
    let store = store_for(config);

    if options.no_llm {
        let result = retrieval.retrieve(question).await?;
        store.save(&result)?;
        if result.is_empty() {
            println!("No relevant sources found for: {}", question);
        } else {
            print_sources_table(&result);
        }
        return Ok(());
    }

    let router = GenerationRouter::from_config(config)?;
    let pipeline = QueryPipeline::new(retrieval, &router);
    let result = pipeline.retrieval().retrieve(question).await?;
    store.save(&result)?;
    if result.is_empty() {
        println!("No relevant sources found for: {}", question);
        println!("Try rephrasing the question or run `brain sync` first.");
        return Ok(());
    }

    let answer = pipeline
        .answer_from(question, result, None, 0, options.model.as_deref())
        .await?;

    println!("{}", answer.text.trim_end());
    if options.sources {
        println!();
        print_sources_table(&answer.retrieval);
        println!();
        println!("Sources:");
        for id in answer.retrieval.document_ids() {
            println!("  - {}", id);
        }
    }
    Ok(())
}

pub fn format_sources_table(result: &RetrievalResult) -> String {
    let mut out = format!("{:<30} {:>9}  {}\n", "DOCUMENT", "RELEVANCE", "PREVIEW");
    for citation in &result.citations {
        for partition in &citation.partitions {
            out.push_str(&format!(
                "{:<30} {:>9.3}  {}\n",
                citation.document_id,
                partition.relevance,
                preview(&partition.text, TABLE_PREVIEW_CHARS)
            ));
        }
    }
    out
}

fn print_sources_table(result: &RetrievalResult) {
    print!("{}", format_sources_table(result));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Citation, Partition};

    #[test]
    fn sources_table_has_one_row_per_partition() {
        let result = RetrievalResult {
            citations: vec![Citation {
                document_id: "plan".into(),
                partitions: vec![
                    Partition {
                        text: "x".repeat(150),
                        relevance: 0.75,
                    },
                    Partition {
                        text: "short".into(),
                        relevance: 0.5,
                    },
                ],
            }],
        };
        let table = format_sources_table(&result);
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[1].contains("0.750"));
        assert!(lines[1].ends_with(&format!("{}...", "x".repeat(100))));
        assert!(lines[2].ends_with("short"));
    }
}
