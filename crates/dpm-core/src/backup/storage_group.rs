//! Storage group backup.

use std::collections::BTreeMap;

use async_trait::async_trait;
use dpm_config::{ConfigValue, EntityConfig, Schema, STORAGE_GROUP_SCHEMA};
use hmc_rest::{extract, ResultExt};
use serde_json::Value;
use tracing::info;

use super::{property, BackupCollector, BackupKind};
use crate::error::Result;
use crate::resources::storage::{
    list_storage_groups, storage_group_properties, storage_volume_properties, storage_volumes_of,
};
use crate::session::HmcSession;

/// Collects every storage group owned by the session's CPC.
#[derive(Debug, Default, Clone, Copy)]
pub struct StorageGroupCollector;

#[async_trait]
impl BackupCollector for StorageGroupCollector {
    fn kind(&self) -> BackupKind {
        BackupKind::StorageGroups
    }

    fn schema(&self) -> &'static Schema {
        &STORAGE_GROUP_SCHEMA
    }

    async fn collect(&self, session: &HmcSession) -> Result<BTreeMap<String, EntityConfig>> {
        let transport = session.transport();
        let mut groups = BTreeMap::new();
        for group in list_storage_groups(transport).await? {
            if extract::optional_str(&group, "cpc-uri").as_deref() != Some(session.cpc().uri.as_str()) {
                continue;
            }
            let name = extract::str_at(&group, "name").within("collect_storage_groups")?;
            let uri = extract::str_at(&group, "object-uri").within("collect_storage_groups")?;
            let config = collect_group(session, &uri).await?;
            info!(group = %name, kind = %config.get("storType").map(|t| t.render()).unwrap_or_default(), "storage group backed up");
            groups.insert(name, config);
        }
        Ok(groups)
    }
}

async fn collect_group(session: &HmcSession, group_uri: &str) -> Result<EntityConfig> {
    let transport = session.transport();
    let properties = storage_group_properties(transport, group_uri).await?;
    let storage_type = extract::optional_str(&properties, "type").unwrap_or_default();

    let mut config = EntityConfig::new();
    config.insert("sgDesc".into(), property(&properties, "description"));
    config.insert("storType".into(), property(&properties, "type"));
    config.insert("sgShared".into(), property(&properties, "shared"));
    config.insert("numOfPaths".into(), property(&properties, "connectivity"));
    if storage_type == "fcp" {
        config.insert("maxNumOfPars".into(), property(&properties, "max-partitions"));
    }

    let mut volumes = Vec::new();
    for entry in storage_volumes_of(transport, group_uri).await? {
        let volume_uri = extract::str_at(&entry, "element-uri").within("collect_storage_groups")?;
        let volume = storage_volume_properties(transport, &volume_uri).await?;
        if let Some(volume) = volume_config(&storage_type, &volume) {
            volumes.push(ConfigValue::Map(volume));
        }
    }
    config.insert("sgStorVolsCfg".into(), ConfigValue::List(volumes));
    Ok(config)
}

/// Saved fields of one volume; FICON alias volumes are skipped.
fn volume_config(storage_type: &str, volume: &Value) -> Option<BTreeMap<String, ConfigValue>> {
    let mut config = BTreeMap::new();
    config.insert("storVolDesc".to_string(), property(volume, "description"));
    config.insert("storVolUse".to_string(), property(volume, "usage"));
    config.insert("storVolSize".to_string(), property(volume, "size"));

    if storage_type == "fc" {
        if extract::optional_str(volume, "eckd-type").as_deref() != Some("base") {
            return None;
        }
        let model = property(volume, "model");
        // Only extended address volumes carry a size of their own.
        if model.as_str() != Some("EAV") {
            config.remove("storVolSize");
        }
        config.insert("storVolModel".to_string(), model);
        config.insert("storVolDevNum".to_string(), property(volume, "device-number"));
    }
    config.retain(|_, v| !v.is_none());
    Some(config)
}
