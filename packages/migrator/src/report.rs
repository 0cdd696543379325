use std::fmt;

use serde::Serialize;
use tracing::warn;

use crate::error::{ItemError, Stage};

/// One failed item.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ItemFailure {
    /// What failed, e.g. `file 42` or `tag 7 "RPG"`.
    pub subject: String,
    pub stage: Stage,
    pub error: String,
}

/// Outcome counts of one run of one step. Lives for the process only.
#[derive(Debug, Clone, Serialize)]
pub struct MigrationReport {
    pub step: &'static str,
    pub dry_run: bool,
    pub attempted: u64,
    pub succeeded: u64,
    pub failed: u64,
    /// Items looked at but not touched (dry-run plans, already present rows).
    pub skipped: u64,
    pub failures: Vec<ItemFailure>,
}

impl MigrationReport {
    pub fn new(step: &'static str, dry_run: bool) -> Self {
        Self {
            step,
            dry_run,
            attempted: 0,
            succeeded: 0,
            failed: 0,
            skipped: 0,
            failures: Vec::new(),
        }
    }

    /// Fold one item's result into the report.
    pub fn record(&mut self, subject: impl fmt::Display, result: Result<(), ItemError>) {
        self.attempted += 1;
        match result {
            Ok(()) => self.succeeded += 1,
            Err(err) => {
                let subject = subject.to_string();
                warn!(step = self.step, subject = %subject, stage = %err.stage, error = %err.message, "Item failed");
                self.failed += 1;
                self.failures.push(ItemFailure {
                    subject,
                    stage: err.stage,
                    error: err.message,
                });
            }
        }
    }

    pub fn record_skipped(&mut self) {
        self.attempted += 1;
        self.skipped += 1;
    }

    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }
}

impl fmt::Display for MigrationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mode = if self.dry_run { " (dry run)" } else { "" };
        writeln!(f, "=== {}{mode} ===", self.step)?;
        writeln!(f, "attempted: {}", self.attempted)?;
        writeln!(f, "succeeded: {}", self.succeeded)?;
        writeln!(f, "skipped:   {}", self.skipped)?;
        writeln!(f, "failed:    {}", self.failed)?;
        if !self.failures.is_empty() {
            writeln!(f, "failures:")?;
            for failure in &self.failures {
                writeln!(
                    f,
                    "  {} [{}]: {}",
                    failure.subject, failure.stage, failure.error
                )?;
            }
        }
        Ok(())
    }
}
