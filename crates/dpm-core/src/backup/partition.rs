//! Partition backup.
//!
//! Besides each partition's own properties, the backup records which FCP
//! storage groups it is attached to and with which device numbers. Those
//! come from the storage groups' virtual storage resources, so they are
//! gathered once up front.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use dpm_config::{ConfigValue, EntityConfig, Schema, PARTITION_SCHEMA};
use hmc_rest::{extract, ResultExt};
use serde_json::Value;
use tracing::{info, warn};

use super::{property, single_line, BackupCollector, BackupKind};
use crate::error::Result;
use crate::resources::adapter::{adapter_properties, storage_port_properties, virtual_switch_properties};
use crate::resources::partition::{
    hba_properties, list_partitions, nic_properties, partition_properties,
    virtual_function_properties,
};
use crate::resources::storage::{
    control_unit_properties, list_storage_groups, list_virtual_storage_resources,
    storage_group_properties, storage_volume_properties,
};
use crate::session::HmcSession;

const OPERATION: &str = "collect_partitions";

/// Collects every partition on the session's CPC.
#[derive(Debug, Default, Clone, Copy)]
pub struct PartitionCollector;

#[async_trait]
impl BackupCollector for PartitionCollector {
    fn kind(&self) -> BackupKind {
        BackupKind::Partitions
    }

    fn schema(&self) -> &'static Schema {
        &PARTITION_SCHEMA
    }

    async fn collect(&self, session: &HmcSession) -> Result<BTreeMap<String, EntityConfig>> {
        let transport = session.transport();
        let mut partitions = Vec::new();
        for partition in list_partitions(transport, session.cpc_id()).await? {
            let name = extract::str_at(&partition, "name").within(OPERATION)?;
            let uri = extract::str_at(&partition, "object-uri").within(OPERATION)?;
            partitions.push((name, uri));
        }
        let names_by_uri: HashMap<String, String> = partitions
            .iter()
            .map(|(name, uri)| (uri.clone(), name.clone()))
            .collect();

        let fcp_devices = if session.storage_groups_available() {
            fcp_devices_by_partition(session, &names_by_uri).await?
        } else {
            HashMap::new()
        };

        let mut configs = BTreeMap::new();
        for (name, uri) in partitions {
            let devices = fcp_devices.get(&name).cloned().unwrap_or_default();
            let config = collect_partition(session, &name, &uri, devices).await?;
            info!(partition = %name, "partition backed up");
            configs.insert(name, config);
        }
        Ok(configs)
    }
}

/// Partition name -> `"<group>:<device number>"` for every FCP group on the CPC.
async fn fcp_devices_by_partition(
    session: &HmcSession,
    names_by_uri: &HashMap<String, String>,
) -> Result<HashMap<String, Vec<ConfigValue>>> {
    let transport = session.transport();
    let mut devices: HashMap<String, Vec<ConfigValue>> = HashMap::new();
    for group in list_storage_groups(transport).await? {
        if extract::optional_str(&group, "cpc-uri").as_deref() != Some(session.cpc().uri.as_str()) {
            continue;
        }
        let group_name = extract::str_at(&group, "name").within(OPERATION)?;
        let group_uri = extract::str_at(&group, "object-uri").within(OPERATION)?;
        let properties = storage_group_properties(transport, &group_uri).await?;
        // FICON groups do not expose attachments here; they are read per partition.
        if extract::optional_str(&properties, "type").as_deref() != Some("fcp") {
            continue;
        }
        for vsr in list_virtual_storage_resources(transport, &group_uri).await? {
            let partition_uri = extract::str_at(&vsr, "partition-uri").within(OPERATION)?;
            let device = extract::str_at(&vsr, "device-number").within(OPERATION)?;
            let partition_name = match names_by_uri.get(&partition_uri) {
                Some(name) => name.clone(),
                None => {
                    let properties = partition_properties(transport, &partition_uri).await?;
                    extract::str_at(&properties, "name").within(OPERATION)?
                }
            };
            devices
                .entry(partition_name)
                .or_default()
                .push(ConfigValue::Text(format!("{group_name}:{device}")));
        }
    }
    Ok(devices)
}

async fn collect_partition(
    session: &HmcSession,
    name: &str,
    uri: &str,
    fcp_devices: Vec<ConfigValue>,
) -> Result<EntityConfig> {
    let transport = session.transport();
    let properties = partition_properties(transport, uri).await?;
    let is_ssc = extract::optional_str(&properties, "type").as_deref() == Some("ssc");

    let mut config = EntityConfig::new();
    config.insert("par_desc".into(), single_line(&properties, "description"));
    config.insert("par_type".into(), property(&properties, "type"));
    config.insert("par_status".into(), property(&properties, "status"));
    config.insert("par_reserveResources".into(), property(&properties, "reserve-resources"));

    if is_ssc {
        config.insert("par_sscHostName".into(), property(&properties, "ssc-host-name"));
        config.insert("par_sscMasterUserid".into(), property(&properties, "ssc-master-userid"));
        // The console never returns the real password.
        config.insert("par_sscMasterPW".into(), ConfigValue::from(""));
        if let Some(gateway) = extract::optional_str(&properties, "ssc-ipv4-gateway").filter(|g| !g.is_empty()) {
            config.insert("par_sscIPv4GW".into(), ConfigValue::Text(gateway));
        }
        let dns: Vec<String> = extract::optional_value(&properties, "ssc-dns-servers")
            .and_then(Value::as_array)
            .map(|servers| servers.iter().filter_map(|s| s.as_str().map(str::to_string)).collect())
            .unwrap_or_default();
        if !dns.is_empty() {
            config.insert("par_sscDNS".into(), ConfigValue::Text(dns.join(",")));
        }
    }

    let ifl = extract::optional_value(&properties, "ifl-processors").and_then(Value::as_i64).unwrap_or(0);
    let cp = extract::optional_value(&properties, "cp-processors").and_then(Value::as_i64).unwrap_or(0);
    if ifl > 0 {
        config.insert("proc_type".into(), ConfigValue::from("ifl"));
        config.insert("proc_num".into(), ConfigValue::Int(ifl));
    } else if cp > 0 {
        config.insert("proc_type".into(), ConfigValue::from("cp"));
        config.insert("proc_num".into(), ConfigValue::Int(cp));
    } else {
        warn!(partition = %name, "partition has no processors assigned");
    }
    config.insert("proc_mode".into(), property(&properties, "processor-mode"));
    config.insert("init_mem".into(), property(&properties, "initial-memory"));
    config.insert("max_mem".into(), property(&properties, "maximum-memory"));

    config.insert("vNICs".into(), collect_nics(session, &properties, is_ssc).await?);

    if session.storage_groups_available() {
        config.insert("sgDevNum".into(), ConfigValue::List(fcp_devices));
        let mut ficon = Vec::new();
        for group_uri in uri_list(&properties, "storage-group-uris")? {
            let group = storage_group_properties(transport, &group_uri).await?;
            if extract::optional_str(&group, "type").as_deref() == Some("fc") {
                ficon.push(property(&group, "name"));
            }
        }
        config.insert("sgFICON".into(), ConfigValue::List(ficon));
    } else {
        config.insert("vHBAs".into(), collect_hbas(session, &properties).await?);
    }

    config.insert("zAccelerators".into(), collect_accelerators(session, &properties).await?);
    config.insert("zCryptos".into(), collect_crypto(session, &properties).await?);
    config.insert("zzBootOpt".into(), collect_boot_option(session, &properties).await?);
    Ok(config)
}

fn uri_list(object: &Value, key: &str) -> Result<Vec<String>> {
    Ok(extract::array_at(object, key)
        .within(OPERATION)?
        .iter()
        .filter_map(|u| u.as_str().map(str::to_string))
        .collect())
}

async fn adapter_name(session: &HmcSession, adapter_uri: &str) -> Result<ConfigValue> {
    let adapter = adapter_properties(session.transport(), adapter_uri).await?;
    Ok(property(&adapter, "name"))
}

async fn collect_nics(session: &HmcSession, partition: &Value, is_ssc: bool) -> Result<ConfigValue> {
    let transport = session.transport();
    let mut nics = BTreeMap::new();
    for (index, nic_uri) in uri_list(partition, "nic-uris")?.iter().enumerate() {
        let nic = nic_properties(transport, nic_uri).await?;
        let mut fields = BTreeMap::new();
        fields.insert("name".to_string(), property(&nic, "name"));
        fields.insert("desc".to_string(), single_line(&nic, "description"));
        fields.insert("devNum".to_string(), property(&nic, "device-number"));

        let is_management = extract::optional_value(&nic, "ssc-management-nic")
            .and_then(Value::as_bool)
            .unwrap_or(false);
        if is_ssc && is_management {
            fields.insert("sscIPAddrType".to_string(), property(&nic, "ssc-ip-address-type"));
            fields.insert("sscIPAddr".to_string(), property(&nic, "ssc-ip-address"));
            fields.insert("sscMaskPrefix".to_string(), property(&nic, "ssc-mask-prefix"));
            let vlan = property(&nic, "vlan-id");
            if !vlan.is_none() {
                fields.insert("vlanID".to_string(), vlan);
            }
        }

        if extract::optional_str(&nic, "type").as_deref() == Some("osd") {
            let vswitch_uri = extract::str_at(&nic, "virtual-switch-uri").within(OPERATION)?;
            let vswitch = virtual_switch_properties(transport, &vswitch_uri).await?;
            let adapter_uri = extract::str_at(&vswitch, "backing-adapter-uri").within(OPERATION)?;
            fields.insert("adapPort".to_string(), property(&vswitch, "port"));
            fields.insert("adapName".to_string(), adapter_name(session, &adapter_uri).await?);
        }
        nics.insert(format!("vNIC{}", index + 1), ConfigValue::Map(fields));
    }
    Ok(ConfigValue::Map(nics))
}

async fn collect_hbas(session: &HmcSession, partition: &Value) -> Result<ConfigValue> {
    let transport = session.transport();
    let mut hbas = BTreeMap::new();
    for (index, hba_uri) in uri_list(partition, "hba-uris")?.iter().enumerate() {
        let hba = hba_properties(transport, hba_uri).await?;
        let mut fields = BTreeMap::new();
        fields.insert("name".to_string(), property(&hba, "name"));
        fields.insert("desc".to_string(), single_line(&hba, "description"));
        fields.insert("devNum".to_string(), property(&hba, "device-number"));

        let port_uri = extract::str_at(&hba, "adapter-port-uri").within(OPERATION)?;
        let port = storage_port_properties(transport, &port_uri).await?;
        let adapter_uri = extract::str_at(&port, "parent").within(OPERATION)?;
        fields.insert("adapName".to_string(), adapter_name(session, &adapter_uri).await?);
        hbas.insert(format!("vHBA{}", index + 1), ConfigValue::Map(fields));
    }
    Ok(ConfigValue::Map(hbas))
}

async fn collect_accelerators(session: &HmcSession, partition: &Value) -> Result<ConfigValue> {
    let mut accelerators = Vec::new();
    for vf_uri in uri_list(partition, "virtual-function-uris")? {
        let vf = virtual_function_properties(session.transport(), &vf_uri).await?;
        let mut fields = BTreeMap::new();
        fields.insert("name".to_string(), property(&vf, "name"));
        fields.insert("description".to_string(), property(&vf, "description"));
        fields.insert("device-number".to_string(), property(&vf, "device-number"));
        let adapter_uri = extract::str_at(&vf, "adapter-uri").within(OPERATION)?;
        fields.insert("adapter-name".to_string(), adapter_name(session, &adapter_uri).await?);
        accelerators.push(ConfigValue::Map(fields));
    }
    Ok(ConfigValue::List(accelerators))
}

/// Crypto configuration with adapter URIs swapped for adapter names.
async fn collect_crypto(session: &HmcSession, partition: &Value) -> Result<ConfigValue> {
    let Some(Value::Object(crypto)) = extract::optional_value(partition, "crypto-configuration") else {
        return Ok(ConfigValue::List(Vec::new()));
    };
    let mut config: BTreeMap<String, ConfigValue> = crypto
        .iter()
        .filter(|(key, _)| key.as_str() != "crypto-adapter-uris")
        .map(|(key, value)| (key.clone(), ConfigValue::from_json(value)))
        .collect();
    let mut names = Vec::new();
    let adapter_uris = crypto
        .get("crypto-adapter-uris")
        .and_then(Value::as_array)
        .map(|uris| uris.iter().filter_map(Value::as_str).collect::<Vec<_>>())
        .unwrap_or_default();
    for adapter_uri in adapter_uris {
        names.push(adapter_name(session, adapter_uri).await?);
    }
    config.insert("crypto-adapter-names".to_string(), ConfigValue::List(names));
    Ok(ConfigValue::Map(config))
}

async fn collect_boot_option(session: &HmcSession, partition: &Value) -> Result<ConfigValue> {
    let transport = session.transport();
    let mut boot = BTreeMap::new();
    let device = property(partition, "boot-device");
    let from_volume = device.as_str() == Some("storage-volume");
    boot.insert("boot_device".to_string(), device);
    if !from_volume {
        return Ok(ConfigValue::Map(boot));
    }

    boot.insert("boot-timeout".to_string(), property(partition, "boot-timeout"));
    let volume_uri = extract::str_at(partition, "boot-storage-volume").within(OPERATION)?;
    let volume = storage_volume_properties(transport, &volume_uri).await?;
    boot.insert("volume_description".to_string(), property(&volume, "description"));
    boot.insert("volume_size".to_string(), property(&volume, "size"));

    let group_uri = volume_uri
        .split("/storage-volumes/")
        .next()
        .unwrap_or(volume_uri.as_str())
        .to_string();
    let group = storage_group_properties(transport, &group_uri).await?;
    let group_type = extract::optional_str(&group, "type").unwrap_or_default();
    boot.insert("storage_group_name".to_string(), property(&group, "name"));
    boot.insert("storage_group_type".to_string(), property(&group, "type"));

    match group_type.as_str() {
        "fcp" => {
            boot.insert(
                "fcp-boot-configuration-selector".to_string(),
                property(partition, "boot-configuration-selector"),
            );
            boot.insert("fcp-volume-uuid".to_string(), property(&volume, "uuid"));
        }
        "fc" => {
            let control_unit_uri = extract::str_at(&volume, "control-unit-uri").within(OPERATION)?;
            let control_unit = control_unit_properties(transport, &control_unit_uri).await?;
            boot.insert("fc-logical-address".to_string(), property(&control_unit, "logical-address"));
            boot.insert("fc-unit-address".to_string(), property(&volume, "unit-address"));
        }
        other => warn!(group_type = %other, "boot storage group of unexpected type"),
    }
    Ok(ConfigValue::Map(boot))
}
