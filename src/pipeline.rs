//! Render, persist, validate, apply
//!
//! Every validation error happens before [`Pipeline::commit`] is reached,
//! so a failed run never leaves a partially applied state behind. A
//! rejected document stays on disk next to its backup for manual recovery.

use crate::apply::{ApplyRunner, ApplyStatus, NetplanBackend, RunMode};
use crate::document::DocumentBuilder;
use crate::error::NetcfgResult;
use crate::intent::ConfigIntent;
use crate::writer::{SafeWriter, WriteResult};
use tracing::info;

/// Result of a committed run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    pub write: Option<WriteResult>,
    pub status: ApplyStatus,
}

pub struct Pipeline<B> {
    builder: DocumentBuilder,
    writer: SafeWriter,
    runner: ApplyRunner<B>,
}

impl<B: NetplanBackend> Pipeline<B> {
    pub fn new(builder: DocumentBuilder, writer: SafeWriter, runner: ApplyRunner<B>) -> Self {
        Self {
            builder,
            writer,
            runner,
        }
    }

    pub fn mode(&self) -> RunMode {
        self.runner.mode()
    }

    /// Rendered document text, shown to the user before anything is written
    pub fn render(&self, intent: &ConfigIntent) -> NetcfgResult<String> {
        self.builder.build(intent)?.to_yaml()
    }

    /// Write `rendered` to the intent's target and hand it to the network manager
    ///
    /// Dry-run returns before the writer or the backend is touched. Apply
    /// preconditions (root) are checked before the target is backed up.
    pub async fn commit(&self, intent: &ConfigIntent, rendered: &str) -> NetcfgResult<Outcome> {
        if self.runner.mode() == RunMode::DryRun {
            info!("Dry run: {} left unchanged", intent.target_file().display());
            return Ok(Outcome {
                write: None,
                status: ApplyStatus::Skipped,
            });
        }

        self.runner.preflight()?;
        let write = self.writer.persist_text(rendered, intent.target_file()).await?;
        let status = self.runner.run().await?;

        Ok(Outcome {
            write: Some(write),
            status,
        })
    }

    /// Render and commit in one step
    pub async fn execute(&self, intent: &ConfigIntent) -> NetcfgResult<Outcome> {
        let rendered = self.render(intent)?;
        self.commit(intent, &rendered).await
    }
}
