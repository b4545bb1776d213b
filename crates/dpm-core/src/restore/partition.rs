//! Recreate partitions from a partition backup.
//!
//! Creating the partition is all-or-nothing for the entity. Everything
//! attached afterwards (NICs, storage groups, accelerators, cryptos, boot
//! option) is best effort: a failed step becomes a [`RestoreIssue`] on the
//! outcome and the remaining steps still run.

use std::collections::BTreeMap;

use dpm_config::ConfigDocument;
use hmc_rest::{extract, ResultExt};
use serde_json::{json, Map, Value};
use tracing::{debug, info, instrument, warn};

use super::{split_sections, RestoreIssue};
use crate::error::{DpmError, Result};
use crate::obs;
use crate::provision::{provision, ProvisionConfig, ProvisioningReport, Stage, StageTracker};
use crate::resources::adapter::{select_adapter, select_virtual_switch};
use crate::resources::partition::{
    attach_storage_group, create_nic, create_partition, create_virtual_function,
    increase_crypto_configuration, update_partition,
};
use crate::resources::storage::{
    control_unit_properties, list_virtual_storage_resources, select_storage_group,
    storage_group_properties, storage_volume_properties, update_virtual_storage_resource,
};
use crate::session::HmcSession;
use crate::template::{build_partition_plan, AcceleratorSpec, BootOption, CryptoSpec, NicSpec};

/// A created partition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionOutcome {
    pub uri: String,
    pub issues: Vec<RestoreIssue>,
    /// Whether the boot option was applied
    pub boot_configured: bool,
}

struct Issues<'a> {
    partition: &'a str,
    list: Vec<RestoreIssue>,
}

impl Issues<'_> {
    fn record(&mut self, step: &'static str, subject: &str, error: &DpmError) {
        obs::emit_subresource_issue(self.partition, step, error);
        self.list.push(RestoreIssue {
            step,
            subject: subject.to_string(),
            message: error.to_string(),
        });
    }
}

/// Recreate one partition and its sub-resources.
#[instrument(skip(session, flat, tracker), fields(cpc = %session.cpc().name))]
pub async fn restore_partition(
    session: &HmcSession,
    name: &str,
    flat: &BTreeMap<String, String>,
    tracker: &StageTracker,
) -> Result<PartitionOutcome> {
    let plan = build_partition_plan(name, flat)?;
    tracker.advance(Stage::TemplateBuilt);

    let uri = create_partition(session.transport(), session.cpc_id(), &plan.template)
        .await
        .within("restore_partition")?;
    tracker.advance(Stage::Created);
    info!(partition = %name, uri = %uri, "partition created");

    let mut issues = Issues {
        partition: name,
        list: Vec::new(),
    };

    for nic in &plan.nics {
        if nic.adapter_name().is_none() {
            let err = DpmError::restore(name, "only OSA backed NICs can be restored");
            issues.record("create_nic", nic.name(), &err);
            continue;
        }
        match restore_nic(session, &uri, nic).await {
            Ok(nic_uri) => debug!(partition = %name, nic = %nic.name(), uri = %nic_uri, "NIC created"),
            Err(e) => issues.record("create_nic", nic.name(), &e),
        }
    }

    for (group, devices) in &plan.storage_group_devices {
        match attach_group(session, &uri, group).await {
            Ok(group_uri) => {
                if let Err(e) = set_device_numbers(session, &uri, &group_uri, group, devices).await {
                    issues.record("set_device_numbers", group, &e);
                }
            }
            Err(e) => issues.record("attach_storage_group", group, &e),
        }
    }

    for group in &plan.ficon_groups {
        if let Err(e) = attach_group(session, &uri, group).await {
            issues.record("attach_storage_group", group, &e);
        }
    }

    for accelerator in &plan.accelerators {
        if let Err(e) = restore_accelerator(session, &uri, accelerator).await {
            issues.record("create_virtual_function", accelerator.name(), &e);
        }
    }

    if let Some(crypto) = &plan.crypto {
        if let Err(e) = restore_crypto(session, &uri, crypto).await {
            issues.record("increase_crypto_configuration", &crypto.adapter_names.join(","), &e);
        }
    }
    tracker.advance(Stage::SubresourcesAttached);

    let mut boot_configured = false;
    match &plan.boot {
        Some(boot) if boot.is_storage_volume() => match set_boot_option(session, &uri, boot).await {
            Ok(()) => boot_configured = true,
            Err(e) => issues.record(
                "set_boot_option",
                boot.storage_group.as_deref().unwrap_or_default(),
                &e,
            ),
        },
        Some(boot) => info!(
            partition = %name,
            device = %boot.device,
            "boot option left unset, only storage-volume boot is restored"
        ),
        None => {}
    }
    tracker.advance(Stage::Done);

    Ok(PartitionOutcome {
        uri,
        issues: issues.list,
        boot_configured,
    })
}

async fn restore_nic(session: &HmcSession, partition_uri: &str, nic: &NicSpec) -> Result<String> {
    let transport = session.transport();
    let adapter_name = nic.adapter_name().unwrap_or_default();
    let adapter = select_adapter(transport, session.cpc_id(), adapter_name).await?;
    let port = nic.adapter_port()?;
    let vswitch = select_virtual_switch(transport, session.cpc_id(), &adapter.uri, port)
        .await?
        .ok_or_else(|| {
            DpmError::restore(
                nic.name(),
                format!("no virtual switch for adapter '{adapter_name}' port {port}"),
            )
        })?;
    let template = nic.to_template(&vswitch)?;
    Ok(create_nic(transport, partition_uri, &template).await?)
}

async fn attach_group(session: &HmcSession, partition_uri: &str, group: &str) -> Result<String> {
    let transport = session.transport();
    let group_uri = select_storage_group(transport, group)
        .await?
        .ok_or_else(|| DpmError::restore(group, "storage group does not exist on the console"))?;
    attach_storage_group(transport, partition_uri, &group_uri).await?;
    debug!(group = %group, partition = %partition_uri, "storage group attached");
    Ok(group_uri)
}

/// Hand out the saved device numbers to this partition's VSRs, last first.
async fn set_device_numbers(
    session: &HmcSession,
    partition_uri: &str,
    group_uri: &str,
    group: &str,
    devices: &[String],
) -> Result<()> {
    let transport = session.transport();
    let mut remaining = devices.to_vec();
    for vsr in list_virtual_storage_resources(transport, group_uri).await? {
        if extract::optional_str(&vsr, "partition-uri").as_deref() != Some(partition_uri) {
            continue;
        }
        let Some(device) = remaining.pop() else {
            warn!(group = %group, "more virtual storage resources than saved device numbers");
            break;
        };
        let vsr_uri = extract::str_at(&vsr, "element-uri").within("set_device_numbers")?;
        update_virtual_storage_resource(transport, &vsr_uri, &json!({ "device-number": device }))
            .await?;
        debug!(group = %group, device = %device, "device number set");
    }
    Ok(())
}

async fn restore_accelerator(
    session: &HmcSession,
    partition_uri: &str,
    accelerator: &AcceleratorSpec,
) -> Result<String> {
    let transport = session.transport();
    let adapter = select_adapter(transport, session.cpc_id(), &accelerator.adapter_name).await?;
    let template = accelerator.to_template(&adapter.uri);
    Ok(create_virtual_function(transport, partition_uri, &template).await?)
}

async fn restore_crypto(session: &HmcSession, partition_uri: &str, crypto: &CryptoSpec) -> Result<()> {
    let transport = session.transport();
    let mut adapter_uris = Vec::with_capacity(crypto.adapter_names.len());
    for adapter_name in &crypto.adapter_names {
        adapter_uris.push(select_adapter(transport, session.cpc_id(), adapter_name).await?.uri);
    }
    increase_crypto_configuration(transport, partition_uri, &crypto.to_request(&adapter_uris)).await?;
    Ok(())
}

/// Point the partition at its saved boot volume.
async fn set_boot_option(session: &HmcSession, partition_uri: &str, boot: &BootOption) -> Result<()> {
    const OPERATION: &str = "set_boot_option";
    let transport = session.transport();
    let group = boot
        .storage_group
        .as_deref()
        .ok_or_else(|| DpmError::restore(partition_uri, "boot option names no storage group"))?;
    let group_uri = select_storage_group(transport, group)
        .await?
        .ok_or_else(|| DpmError::restore(group, "boot storage group does not exist"))?;

    let properties = storage_group_properties(transport, &group_uri).await?;
    let state = extract::optional_str(&properties, "fulfillment-state").unwrap_or_default();
    if state != "complete" {
        return Err(DpmError::restore(
            group,
            format!("boot storage group is in '{state}' state"),
        ));
    }
    let group_type = extract::str_at(&properties, "type").within(OPERATION)?;

    let mut update = Map::new();
    if let Some(timeout) = boot.timeout {
        update.insert("boot-timeout".into(), json!(timeout));
    }
    for volume_uri in extract::array_at(&properties, "storage-volume-uris").within(OPERATION)? {
        let Some(volume_uri) = volume_uri.as_str() else { continue };
        let volume = storage_volume_properties(transport, volume_uri).await?;
        let matched = match group_type.as_str() {
            "fcp" => is_fcp_boot_volume(&volume, boot),
            "fc" => is_fc_boot_volume(session, &volume, boot).await?,
            _ => false,
        };
        if matched {
            update.insert("boot-storage-volume".into(), json!(volume_uri));
            if group_type == "fcp" {
                if let Some(selector) = boot.fcp_selector {
                    update.insert("boot-configuration-selector".into(), json!(selector));
                }
            }
            break;
        }
    }
    if !update.contains_key("boot-storage-volume") {
        return Err(DpmError::restore(group, "saved boot volume not found in storage group"));
    }

    update_partition(transport, partition_uri, &Value::Object(update)).await?;
    update_partition(transport, partition_uri, &json!({ "boot-device": "storage-volume" })).await?;
    info!(partition = %partition_uri, group = %group, "boot option set");
    Ok(())
}

fn is_fcp_boot_volume(volume: &Value, boot: &BootOption) -> bool {
    extract::optional_str(volume, "usage").as_deref() == Some("boot")
        && extract::optional_str(volume, "uuid") == boot.fcp_volume_uuid
}

async fn is_fc_boot_volume(session: &HmcSession, volume: &Value, boot: &BootOption) -> Result<bool> {
    if extract::optional_str(volume, "usage").as_deref() != Some("boot")
        || extract::optional_str(volume, "eckd-type").as_deref() != Some("base")
        || extract::optional_str(volume, "unit-address") != boot.fc_unit_address
    {
        return Ok(false);
    }
    let control_unit_uri = extract::str_at(volume, "control-unit-uri").within("set_boot_option")?;
    let control_unit = control_unit_properties(session.transport(), &control_unit_uri).await?;
    Ok(extract::optional_str(&control_unit, "logical-address") == boot.fc_logical_address)
}

/// Recreate every partition in `document`, one worker per section.
pub async fn restore_partitions(
    session: &HmcSession,
    document: &ConfigDocument,
    config: &ProvisionConfig,
) -> ProvisioningReport<PartitionOutcome> {
    let (names, sections) = split_sections(document);
    let session = session.clone();
    provision(names, config, move |name, tracker| {
        let session = session.clone();
        let sections = sections.clone();
        async move {
            let flat = sections.get(&name).cloned().unwrap_or_default();
            restore_partition(&session, &name, &flat, &tracker).await
        }
    })
    .await
}
