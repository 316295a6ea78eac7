//! Incremental sync orchestration.
//!
//! Scan → plan → import each file in order → advance the cursor. Imports are
//! strictly sequential and the cursor only moves after the whole batch, to
//! the instant captured when the batch started, and only when at least one
//! import succeeded on a non-forced run.

use std::path::{Path, PathBuf};
use std::time::Instant;

use chrono::{DateTime, Utc};
use tracing::info;

use crate::clock::{Clock, SystemClock};
use crate::config::Config;
use crate::cursor::{format_timestamp, parse_timestamp, SyncCursor};
use crate::error::{Error, Result};
use crate::importer::DocumentImporter;
use crate::knowledge::{self, KnowledgeBase};
use crate::models::BatchSummary;
use crate::planner::{self, SyncPlan};
use crate::progress::{ProgressMode, SyncProgressEvent, SyncProgressReporter};
use crate::scanner;
use crate::state::{FileSlot, StateSlot};

pub struct SyncOrchestrator<'a, S: StateSlot> {
    kb: &'a dyn KnowledgeBase,
    cursor: &'a SyncCursor<S>,
    clock: &'a dyn Clock,
}

impl<'a, S: StateSlot> SyncOrchestrator<'a, S> {
    pub fn new(kb: &'a dyn KnowledgeBase, cursor: &'a SyncCursor<S>, clock: &'a dyn Clock) -> Self {
        Self { kb, cursor, clock }
    }

    pub async fn run(
        &self,
        folder: &Path,
        force: bool,
        since_override: Option<DateTime<Utc>>,
        progress: &dyn SyncProgressReporter,
    ) -> Result<BatchSummary> {
        let batch_started_at = self.clock.now();
        let started = Instant::now();

        let candidates = scanner::scan(folder)?;
        info!(folder = %folder.display(), found = candidates.len(), "scanned document folder");
        if candidates.is_empty() {
            return Ok(BatchSummary::default());
        }

        let cursor = match since_override {
            Some(since) => since,
            None => self.cursor.get()?,
        };
        let plan = planner::plan(candidates, cursor, force);
        info!(
            planned = plan.len(),
            cursor = %format_timestamp(&cursor),
            force,
            "planned sync"
        );

        let importer = DocumentImporter::new(self.kb);
        let total = plan.len();
        let mut outcomes = Vec::with_capacity(total);
        for (index, candidate) in plan.candidates.iter().enumerate() {
            progress.report(SyncProgressEvent::Started {
                index,
                total,
                file: candidate.name.clone(),
            });
            let outcome = importer.import(candidate).await?;
            progress.report(SyncProgressEvent::Finished {
                completed: index + 1,
                total,
                file: candidate.name.clone(),
                succeeded: outcome.succeeded,
            });
            outcomes.push(outcome);
        }

        let summary = BatchSummary::from_outcomes(&outcomes, started.elapsed().as_millis() as u64);
        info!(
            succeeded = summary.succeeded_count,
            failed = summary.failed_count,
            duration_ms = summary.total_duration_ms,
            "sync batch finished"
        );

        if !force && summary.succeeded_count > 0 {
            self.cursor.set(batch_started_at)?;
        }

        Ok(summary)
    }
}

/// Scan `folder` and build the plan without importing anything.
pub fn preview<S: StateSlot>(
    folder: &Path,
    cursor: &SyncCursor<S>,
    force: bool,
    since_override: Option<DateTime<Utc>>,
) -> Result<SyncPlan> {
    let candidates = scanner::scan(folder)?;
    let cursor = match since_override {
        Some(since) => since,
        None => cursor.get()?,
    };
    Ok(planner::plan(candidates, cursor, force))
}

pub fn cursor_for(config: &Config) -> SyncCursor<FileSlot> {
    SyncCursor::new(
        FileSlot::new(&config.sync.cursor_path),
        config.sync.default_last_run.clone(),
    )
}

/// `brain sync`.
pub async fn run_sync(
    config: &Config,
    folder: Option<PathBuf>,
    force: bool,
    dry_run: bool,
    since: Option<String>,
    progress: ProgressMode,
) -> Result<()> {
    let folder = folder.unwrap_or_else(|| config.documents.folder.clone());
    let since = match since {
        Some(raw) => Some(parse_timestamp(&raw).ok_or_else(|| {
            Error::config(format!("--since '{}' is not a valid date or timestamp", raw))
        })?),
        None => None,
    };
    let cursor = cursor_for(config);
    let clock = SystemClock;

    if dry_run {
        let plan = preview(&folder, &cursor, force, since)?;
        print_dry_run(&folder, &plan);
        return Ok(());
    }

    if !folder.is_dir() {
        return Err(Error::NotFound(folder));
    }
    let kb = knowledge::open(config).await?;
    info!(knowledge_base = %kb.describe(), "opened knowledge base");
    let orchestrator = SyncOrchestrator::new(kb.as_ref(), &cursor, &clock);
    let reporter = progress.reporter();
    let summary = orchestrator
        .run(&folder, force, since, reporter.as_ref())
        .await?;

    println!("sync {}", folder.display());
    if summary.attempted() == 0 {
        println!("  No documents to sync.");
    } else {
        println!("  imported: {}", summary.succeeded_count);
        println!("  failed: {}", summary.failed_count);
        println!(
            "  duration: {:.1}s",
            summary.total_duration_ms as f64 / 1000.0
        );
    }
    if !force && summary.succeeded_count > 0 {
        println!("  last sync: {}", format_timestamp(&cursor.get()?));
    }
    println!("ok");
    Ok(())
}

fn print_dry_run(folder: &Path, plan: &SyncPlan) {
    println!("sync {} (dry-run)", folder.display());
    if plan.force {
        println!("  mode: force (all documents)");
    } else {
        println!("  last sync: {}", format_timestamp(&plan.cursor));
    }
    if plan.is_empty() {
        println!("  No documents to sync.");
        return;
    }
    println!("  {:<40} {:>10}  {}", "FILE", "SIZE (MB)", "TYPE");
    for candidate in &plan.candidates {
        println!(
            "  {:<40} {:>10.2}  .{}",
            candidate.name,
            candidate.size_bytes as f64 / (1024.0 * 1024.0),
            candidate.extension
        );
    }
    println!("  would import: {}", plan.len());
}
