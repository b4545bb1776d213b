//! Structured lifecycle events for backup and restore runs.
//!
//! - [`CommandSpan`]: RAII guard tagging every log line of one CLI command
//!   with the console host and CPC
//! - `emit_*` functions for provisioning and backup milestones
//!
//! Events are emitted at `info!` level; `RUST_LOG` filters them and
//! `--json` turns them into JSON lines.

use std::path::Path;

use tracing::info;

use crate::provision::Stage;

/// RAII guard that enters a command-scoped span.
///
/// ```ignore
/// let _span = CommandSpan::enter("restore-partitions", "hmc01", "CPC1");
/// ```
pub struct CommandSpan {
    _span: tracing::span::EnteredSpan,
}

impl CommandSpan {
    pub fn enter(command: &str, host: &str, cpc: &str) -> Self {
        let span = tracing::info_span!("dpm.command", command = %command, hmc = %host, cpc = %cpc);
        Self {
            _span: span.entered(),
        }
    }
}

pub fn emit_provision_started(entities: usize) {
    info!(event = "provision.started", entities = entities);
}

/// Emit event: one entity reached its final state.
pub fn emit_entity_finished(name: &str, stage: Stage, success: bool) {
    info!(
        event = "entity.finished",
        entity = %name,
        stage = %stage,
        success = success,
    );
}

pub fn emit_provision_finished(succeeded: usize, failed: usize, duration_ms: u64) {
    info!(
        event = "provision.finished",
        succeeded = succeeded,
        failed = failed,
        duration_ms = duration_ms,
    );
}

/// Emit event: a backup file was written.
pub fn emit_backup_written(path: &Path, sections: usize) {
    info!(event = "backup.written", path = %path.display(), sections = sections);
}

/// Emit event: a sub-resource step failed on an otherwise created entity.
pub fn emit_subresource_issue(entity: &str, step: &str, error: &dyn std::fmt::Display) {
    tracing::warn!(event = "entity.issue", entity = %entity, step = %step, error = %error);
}
