//! Backup collectors and backup file output.
//!
//! A [`BackupCollector`] reads one entity kind from the console into
//! per-entity config maps; [`write_backup`] lays them out with the matching
//! schema and writes `<dir>/<cpc>-<kind>-<timestamp>.cfg`.

pub mod partition;
pub mod storage_group;

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Local};
use dpm_config::{ConfigDocument, ConfigValue, EntityConfig, Schema};
use hmc_rest::extract;
use serde_json::Value;
use tracing::{info, instrument};

use crate::error::Result;
use crate::obs;
use crate::session::HmcSession;

pub use partition::PartitionCollector;
pub use storage_group::StorageGroupCollector;

const TIMESTAMP_FORMAT: &str = "%Y%m%d-%H%M%S";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackupKind {
    Partitions,
    StorageGroups,
}

impl BackupKind {
    /// Infix used in backup file names.
    pub fn label(&self) -> &'static str {
        match self {
            BackupKind::Partitions => "Partitions",
            BackupKind::StorageGroups => "StorGroups",
        }
    }
}

impl fmt::Display for BackupKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Reads one kind of entity from the console.
#[async_trait]
pub trait BackupCollector: Send + Sync {
    fn kind(&self) -> BackupKind;

    fn schema(&self) -> &'static Schema;

    /// Entity name -> config, for every entity of this kind on the CPC.
    async fn collect(&self, session: &HmcSession) -> Result<BTreeMap<String, EntityConfig>>;
}

/// Where a backup went.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupSummary {
    pub path: PathBuf,
    pub sections: Vec<String>,
}

pub fn backup_file_path(dir: &Path, cpc: &str, kind: BackupKind, at: DateTime<Local>) -> PathBuf {
    dir.join(format!(
        "{cpc}-{}-{}.cfg",
        kind.label(),
        at.format(TIMESTAMP_FORMAT)
    ))
}

/// Collect with `collector` and write the backup file under `dir`.
#[instrument(skip(session, collector), fields(kind = %collector.kind()))]
pub async fn write_backup(
    session: &HmcSession,
    collector: &dyn BackupCollector,
    dir: &Path,
) -> Result<BackupSummary> {
    let entities = collector.collect(session).await?;
    let document = ConfigDocument::from_entities(&entities, collector.schema());
    let path = backup_file_path(dir, &session.cpc().name, collector.kind(), Local::now());
    document.write_file(&path)?;

    let sections: Vec<String> = entities.keys().cloned().collect();
    obs::emit_backup_written(&path, sections.len());
    info!(path = %path.display(), count = sections.len(), "backup written");
    Ok(BackupSummary { path, sections })
}

/// Property as a config value; absent keys read as `None`.
pub(crate) fn property(object: &Value, key: &str) -> ConfigValue {
    extract::optional_value(object, key)
        .map(ConfigValue::from_json)
        .unwrap_or(ConfigValue::None)
}

/// Text property with line breaks removed, as single-line config values need.
pub(crate) fn single_line(object: &Value, key: &str) -> ConfigValue {
    ConfigValue::Text(
        extract::optional_str(object, key)
            .unwrap_or_default()
            .replace('\n', ""),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn test_backup_file_name() {
        let at = Local.with_ymd_and_hms(2024, 3, 9, 7, 5, 1).unwrap();
        let path = backup_file_path(Path::new("/backups"), "CPC1", BackupKind::StorageGroups, at);
        assert_eq!(path, PathBuf::from("/backups/CPC1-StorGroups-20240309-070501.cfg"));
    }

    #[test]
    fn test_property_helpers() {
        let object = json!({"description": "line one\nline two", "shared": true, "x": null});
        assert_eq!(single_line(&object, "description"), ConfigValue::from("line oneline two"));
        assert_eq!(property(&object, "shared"), ConfigValue::Bool(true));
        assert_eq!(property(&object, "x"), ConfigValue::None);
        assert_eq!(property(&object, "missing"), ConfigValue::None);
    }
}
