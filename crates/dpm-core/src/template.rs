//! Translation of backup sections into console creation templates.
//!
//! A partition section becomes a [`PartitionPlan`]: the JSON body for
//! "Create Partition" plus the sub-resources (NICs, storage groups,
//! accelerators, cryptos, boot option) that can only be set up once the
//! partition exists. A storage group section becomes a single JSON body.

use std::collections::BTreeMap;

use dpm_config::{ConfigValue, DecodedSection, PARTITION_SCHEMA, STORAGE_GROUP_SCHEMA};
use serde_json::{json, Map, Value};
use tracing::debug;

use crate::error::{DpmError, Result};

/// Master password used for SSC partitions when the backup has none.
pub const SSC_DEFAULT_MASTER_PASSWORD: &str = "passw0rd";

/// Memory values below this are taken as GB and scaled to MB.
const MEMORY_GB_THRESHOLD: i64 = 1024;

/// One `vNIC<n>_*` group from a partition section.
#[derive(Debug, Clone, PartialEq)]
pub struct NicSpec {
    pub item: String,
    /// Lower-cased field name -> raw text
    pub fields: BTreeMap<String, String>,
}

impl NicSpec {
    pub fn name(&self) -> &str {
        self.fields
            .get("name")
            .map(String::as_str)
            .unwrap_or(self.item.as_str())
    }

    /// Backing OSA adapter name; NICs without one cannot be restored.
    pub fn adapter_name(&self) -> Option<&str> {
        self.fields.get("adapname").map(String::as_str)
    }

    pub fn adapter_port(&self) -> Result<i64> {
        let raw = self.fields.get("adapport").map(String::as_str).unwrap_or("0");
        raw.trim()
            .parse()
            .map_err(|_| DpmError::template(self.name(), format!("adapter port '{raw}' is not a number")))
    }

    /// "Create NIC" body attached to `vswitch_uri`.
    pub fn to_template(&self, vswitch_uri: &str) -> Result<Value> {
        let mut template = Map::new();
        template.insert("name".into(), json!(self.name()));
        template.insert("virtual-switch-uri".into(), json!(vswitch_uri));
        if let Some(devnum) = self.fields.get("devnum") {
            template.insert("device-number".into(), json!(devnum));
        }
        if let Some(desc) = self.fields.get("desc") {
            template.insert("description".into(), json!(desc));
        }
        if let Some(address) = self.fields.get("sscipaddr") {
            template.insert("ssc-management-nic".into(), json!(true));
            template.insert("ssc-ip-address".into(), json!(address));
            template.insert(
                "ssc-ip-address-type".into(),
                json!(self.required("sscipaddrtype")?),
            );
            template.insert(
                "ssc-mask-prefix".into(),
                json!(self.required("sscmaskprefix")?),
            );
            if let Some(vlan) = self.fields.get("vlanid") {
                let vlan: i64 = vlan.trim().parse().map_err(|_| {
                    DpmError::template(self.name(), format!("VLAN id '{vlan}' is not a number"))
                })?;
                template.insert("vlan-id".into(), json!(vlan));
                template.insert("vlan-type".into(), Value::Null);
            }
        }
        Ok(Value::Object(template))
    }

    fn required(&self, field: &str) -> Result<&str> {
        self.fields
            .get(field)
            .map(String::as_str)
            .ok_or_else(|| DpmError::template(self.name(), format!("NIC field '{field}' is missing")))
    }
}

/// One accelerator virtual function to recreate.
#[derive(Debug, Clone, PartialEq)]
pub struct AcceleratorSpec {
    pub adapter_name: String,
    /// Properties sent as-is (name, description, device-number)
    pub properties: Map<String, Value>,
}

impl AcceleratorSpec {
    pub fn name(&self) -> &str {
        self.properties
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or(self.adapter_name.as_str())
    }

    pub fn to_template(&self, adapter_uri: &str) -> Value {
        let mut template = self.properties.clone();
        template.insert("adapter-uri".into(), json!(adapter_uri));
        Value::Object(template)
    }
}

/// Crypto adapters and domains to add to the partition.
#[derive(Debug, Clone, PartialEq)]
pub struct CryptoSpec {
    pub adapter_names: Vec<String>,
    /// Remaining configuration, e.g. `crypto-domain-configurations`
    pub properties: Map<String, Value>,
}

impl CryptoSpec {
    pub fn to_request(&self, adapter_uris: &[String]) -> Value {
        let mut request = self.properties.clone();
        request.insert("crypto-adapter-uris".into(), json!(adapter_uris));
        Value::Object(request)
    }
}

/// Saved boot settings.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BootOption {
    pub device: String,
    pub timeout: Option<i64>,
    pub storage_group: Option<String>,
    pub storage_group_type: Option<String>,
    pub fcp_selector: Option<i64>,
    pub fcp_volume_uuid: Option<String>,
    pub fc_logical_address: Option<String>,
    pub fc_unit_address: Option<String>,
}

impl BootOption {
    /// Only boot from a storage volume can be restored.
    pub fn is_storage_volume(&self) -> bool {
        self.device == "storage-volume"
    }

    fn from_map(entity: &str, map: &BTreeMap<String, ConfigValue>) -> Result<Self> {
        let device = map
            .get("boot_device")
            .and_then(text_of)
            .ok_or_else(|| DpmError::template(entity, "boot option has no boot_device"))?;
        Ok(BootOption {
            device,
            timeout: map.get("boot-timeout").and_then(int_of),
            storage_group: map.get("storage_group_name").and_then(text_of),
            storage_group_type: map.get("storage_group_type").and_then(text_of),
            fcp_selector: map.get("fcp-boot-configuration-selector").and_then(int_of),
            fcp_volume_uuid: map.get("fcp-volume-uuid").and_then(text_of),
            fc_logical_address: map.get("fc-logical-address").and_then(text_of),
            fc_unit_address: map.get("fc-unit-address").and_then(text_of),
        })
    }
}

/// Everything needed to recreate one partition.
#[derive(Debug, Clone, PartialEq)]
pub struct PartitionPlan {
    pub name: String,
    /// Body of "Create Partition"
    pub template: Value,
    pub nics: Vec<NicSpec>,
    /// FCP storage group name -> device numbers for its VSRs
    pub storage_group_devices: BTreeMap<String, Vec<String>>,
    pub ficon_groups: Vec<String>,
    pub accelerators: Vec<AcceleratorSpec>,
    pub crypto: Option<CryptoSpec>,
    pub boot: Option<BootOption>,
}

fn text_of(value: &ConfigValue) -> Option<String> {
    match value {
        ConfigValue::Text(text) => Some(text.clone()),
        ConfigValue::Int(n) => Some(n.to_string()),
        _ => None,
    }
}

fn int_of(value: &ConfigValue) -> Option<i64> {
    match value {
        ConfigValue::Int(n) => Some(*n),
        ConfigValue::Text(text) => text.trim().parse().ok(),
        _ => None,
    }
}

fn float_of(value: &ConfigValue) -> Option<f64> {
    match value {
        ConfigValue::Float(f) => Some(*f),
        ConfigValue::Int(n) => Some(*n as f64),
        ConfigValue::Text(text) => text.trim().parse().ok(),
        _ => None,
    }
}

fn scale_memory(megabytes_or_gigabytes: i64) -> i64 {
    if megabytes_or_gigabytes < MEMORY_GB_THRESHOLD {
        megabytes_or_gigabytes * 1024
    } else {
        megabytes_or_gigabytes
    }
}

fn processor_field(entity: &str, proc_type: &str) -> Result<&'static str> {
    match proc_type.to_ascii_lowercase().as_str() {
        "cp" => Ok("cp-processors"),
        "ifl" => Ok("ifl-processors"),
        other => Err(DpmError::template(
            entity,
            format!("processor type should be 'cp' or 'ifl', found '{other}'"),
        )),
    }
}

/// Translate a partition section into its creation plan.
pub fn build_partition_plan(name: &str, flat: &BTreeMap<String, String>) -> Result<PartitionPlan> {
    let decoded = PARTITION_SCHEMA.decode(flat)?;
    let is_ssc = decoded.text("par_type") == Some("ssc");

    let mut template = Map::new();
    template.insert("name".into(), json!(name));

    for spec in PARTITION_SCHEMA.fields() {
        let Some(api) = spec.api else { continue };
        let is_ssc_field = spec.key.starts_with("par_ssc");
        if is_ssc_field && !is_ssc {
            continue;
        }
        let value = decoded.get(spec.key);
        let json_value = match (spec.key, value) {
            ("par_sscMasterPW", None) => json!(SSC_DEFAULT_MASTER_PASSWORD),
            ("par_sscMasterPW", Some(pw)) if pw.is_empty() => json!(SSC_DEFAULT_MASTER_PASSWORD),
            (_, None) => continue,
            ("par_sscDNS", Some(dns)) => {
                let servers: Vec<&str> = dns
                    .as_str()
                    .unwrap_or_default()
                    .split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .collect();
                json!(servers)
            }
            ("init_mem" | "max_mem", Some(ConfigValue::Int(mem))) => json!(scale_memory(*mem)),
            (_, Some(value)) => value.to_json(),
        };
        template.insert(api.to_string(), json_value);
    }

    let proc_type = decoded.get("proc_type").and_then(text_of);
    let proc_field = proc_type
        .as_deref()
        .map(|t| processor_field(name, t))
        .transpose()?;
    match (proc_field, decoded.get("proc_num").and_then(int_of)) {
        (Some(field), Some(count)) => {
            template.insert(field.to_string(), json!(count));
        }
        (None, Some(_)) => debug!(partition = %name, "proc_num without proc_type, no processors set"),
        _ => {}
    }

    let plan = PartitionPlan {
        name: name.to_string(),
        template: Value::Object(template),
        nics: nic_specs(&decoded),
        storage_group_devices: storage_group_devices(name, &decoded)?,
        ficon_groups: ficon_groups(name, &decoded)?,
        accelerators: accelerators(name, &decoded)?,
        crypto: crypto(name, &decoded)?,
        boot: boot_option(name, &decoded)?,
    };
    if decoded.items("vHBAs").is_some() {
        debug!(partition = %name, "vHBA entries are not restored");
    }
    Ok(plan)
}

fn nic_specs(decoded: &DecodedSection) -> Vec<NicSpec> {
    decoded
        .items("vNICs")
        .map(|items| {
            items
                .iter()
                .map(|(item, fields)| NicSpec {
                    item: item.clone(),
                    fields: fields.clone(),
                })
                .collect()
        })
        .unwrap_or_default()
}

fn list_of<'a>(entity: &str, decoded: &'a DecodedSection, key: &str) -> Result<&'a [ConfigValue]> {
    match decoded.get(key) {
        None => Ok(&[]),
        Some(value) => value
            .as_list()
            .ok_or_else(|| DpmError::template(entity, format!("{key} should be a list"))),
    }
}

fn storage_group_devices(
    entity: &str,
    decoded: &DecodedSection,
) -> Result<BTreeMap<String, Vec<String>>> {
    let mut devices: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for entry in list_of(entity, decoded, "sgDevNum")? {
        let text = entry.as_str().unwrap_or_default();
        let Some((group, devnum)) = text.split_once(':') else {
            return Err(DpmError::template(
                entity,
                format!("sgDevNum entry '{entry}' should read <group>:<device number>"),
            ));
        };
        devices
            .entry(group.to_string())
            .or_default()
            .push(devnum.to_string());
    }
    Ok(devices)
}

fn ficon_groups(entity: &str, decoded: &DecodedSection) -> Result<Vec<String>> {
    list_of(entity, decoded, "sgFICON")?
        .iter()
        .map(|g| {
            text_of(g).ok_or_else(|| DpmError::template(entity, format!("sgFICON entry '{g}' is not a name")))
        })
        .collect()
}

fn accelerators(entity: &str, decoded: &DecodedSection) -> Result<Vec<AcceleratorSpec>> {
    list_of(entity, decoded, "zAccelerators")?
        .iter()
        .map(|item| {
            let ConfigValue::Map(map) = item else {
                return Err(DpmError::template(entity, "zAccelerators entries should be maps"));
            };
            let adapter_name = map
                .get("adapter-name")
                .and_then(text_of)
                .ok_or_else(|| DpmError::template(entity, "accelerator has no adapter-name"))?;
            let properties = map
                .iter()
                .filter(|(k, _)| k.as_str() != "adapter-name")
                .map(|(k, v)| (k.clone(), v.to_json()))
                .collect();
            Ok(AcceleratorSpec {
                adapter_name,
                properties,
            })
        })
        .collect()
}

fn crypto(entity: &str, decoded: &DecodedSection) -> Result<Option<CryptoSpec>> {
    let map = match decoded.get("zCryptos") {
        None => return Ok(None),
        Some(value) if value.is_empty() => return Ok(None),
        Some(ConfigValue::Map(map)) => map,
        Some(_) => return Err(DpmError::template(entity, "zCryptos should be a map")),
    };
    let adapter_names = match map.get("crypto-adapter-names") {
        Some(ConfigValue::List(names)) => names.iter().filter_map(text_of).collect(),
        _ => {
            return Err(DpmError::template(
                entity,
                "zCryptos has no crypto-adapter-names list",
            ))
        }
    };
    let properties = map
        .iter()
        .filter(|(k, _)| k.as_str() != "crypto-adapter-names")
        .map(|(k, v)| (k.clone(), v.to_json()))
        .collect();
    Ok(Some(CryptoSpec {
        adapter_names,
        properties,
    }))
}

fn boot_option(entity: &str, decoded: &DecodedSection) -> Result<Option<BootOption>> {
    match decoded.get("zzBootOpt") {
        None => Ok(None),
        Some(value) if value.is_empty() => Ok(None),
        Some(ConfigValue::Map(map)) => BootOption::from_map(entity, map).map(Some),
        Some(_) => Err(DpmError::template(entity, "zzBootOpt should be a map")),
    }
}

/// Translate a storage group section into a "Create Storage Group" body.
pub fn build_storage_group_template(
    name: &str,
    flat: &BTreeMap<String, String>,
    cpc_uri: &str,
    emails: &[String],
) -> Result<Value> {
    let decoded = STORAGE_GROUP_SCHEMA.decode(flat)?;
    let required = |key: &str| {
        decoded
            .get(key)
            .ok_or_else(|| DpmError::template(name, format!("{key} is missing")))
    };

    let mut template = Map::new();
    template.insert("name".into(), json!(name));
    template.insert("cpc-uri".into(), json!(cpc_uri));
    if let Some(desc) = decoded.text("sgDesc").filter(|d| !d.is_empty()) {
        template.insert("description".into(), json!(desc));
    }

    let storage_type = text_of(required("storType")?)
        .ok_or_else(|| DpmError::template(name, "storType should be text"))?;
    template.insert("type".into(), json!(storage_type));

    let shared = required("sgShared")?.as_bool().unwrap_or(false);
    template.insert("shared".into(), json!(shared));

    if storage_type == "fcp" {
        let max = int_of(required("maxNumOfPars")?)
            .ok_or_else(|| DpmError::template(name, "maxNumOfPars should be a number"))?;
        template.insert("max-partitions".into(), json!(max));
    }

    let paths = int_of(required("numOfPaths")?)
        .ok_or_else(|| DpmError::template(name, "numOfPaths should be a number"))?;
    template.insert("connectivity".into(), json!(paths));

    let volumes = match decoded.get("sgStorVolsCfg") {
        None => Vec::new(),
        Some(value) => value
            .as_list()
            .ok_or_else(|| DpmError::template(name, "sgStorVolsCfg should be a list"))?
            .iter()
            .map(|volume| volume_template(name, volume))
            .collect::<Result<Vec<_>>>()?,
    };
    template.insert("storage-volumes".into(), Value::Array(volumes));
    template.insert("email-to-addresses".into(), json!(emails));
    Ok(Value::Object(template))
}

fn volume_template(entity: &str, volume: &ConfigValue) -> Result<Value> {
    let ConfigValue::Map(volume) = volume else {
        return Err(DpmError::template(entity, "storage volume entries should be maps"));
    };
    let mut template = Map::new();
    template.insert("operation".into(), json!("create"));
    if let Some(desc) = volume.get("storVolDesc").and_then(text_of).filter(|d| !d.is_empty()) {
        template.insert("description".into(), json!(desc));
    }
    if let Some(size) = volume.get("storVolSize") {
        let size = float_of(size)
            .ok_or_else(|| DpmError::template(entity, format!("volume size '{size}' is not a number")))?;
        template.insert("size".into(), json!(size));
    }
    let usage = volume
        .get("storVolUse")
        .and_then(text_of)
        .ok_or_else(|| DpmError::template(entity, "storage volume has no storVolUse"))?;
    template.insert("usage".into(), json!(usage));
    if let Some(model) = volume.get("storVolModel").and_then(text_of) {
        template.insert("model".into(), json!(model));
    }
    if let Some(devnum) = volume.get("storVolDevNum").and_then(text_of) {
        template.insert("device-number".into(), json!(devnum));
    }
    Ok(Value::Object(template))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flat(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_ssc_partition_with_ifl_processors() {
        let plan = build_partition_plan(
            "PAR1",
            &flat(&[("par_type", "ssc"), ("proc_num", "4"), ("proc_type", "ifl")]),
        )
        .unwrap();

        assert_eq!(plan.template["name"], "PAR1");
        assert_eq!(plan.template["type"], "ssc");
        assert_eq!(plan.template["ifl-processors"], 4);
        assert!(plan.template.get("cp-processors").is_none());
        assert_eq!(plan.template["ssc-master-pw"], SSC_DEFAULT_MASTER_PASSWORD);
    }

    #[test]
    fn test_linux_partition_drops_ssc_fields_and_scales_memory() {
        let plan = build_partition_plan(
            "PAR2",
            &flat(&[
                ("par_type", "linux"),
                ("par_sscHostName", "ignored"),
                ("par_reserveResources", "True"),
                ("proc_type", "CP"),
                ("proc_num", "2"),
                ("init_mem", "4"),
                ("max_mem", "8192"),
            ]),
        )
        .unwrap();

        assert!(plan.template.get("ssc-host-name").is_none());
        assert!(plan.template.get("ssc-master-pw").is_none());
        assert_eq!(plan.template["reserve-resources"], true);
        assert_eq!(plan.template["cp-processors"], 2);
        assert_eq!(plan.template["initial-memory"], 4096);
        assert_eq!(plan.template["maximum-memory"], 8192);
    }

    #[test]
    fn test_ssc_dns_is_split() {
        let plan = build_partition_plan(
            "SSC1",
            &flat(&[
                ("par_type", "ssc"),
                ("par_sscDNS", "9.0.0.1,9.0.0.2"),
                ("par_sscMasterPW", "secret"),
                ("par_sscIPv4GW", "9.0.0.254"),
            ]),
        )
        .unwrap();
        assert_eq!(plan.template["ssc-dns-servers"], json!(["9.0.0.1", "9.0.0.2"]));
        assert_eq!(plan.template["ssc-master-pw"], "secret");
        assert_eq!(plan.template["ssc-ipv4-gateway"], "9.0.0.254");
    }

    #[test]
    fn test_invalid_processor_type_is_rejected() {
        let err = build_partition_plan("BAD", &flat(&[("proc_type", "zIIP"), ("proc_num", "1")]))
            .unwrap_err();
        assert!(matches!(err, DpmError::Template { ref entity, .. } if entity == "BAD"));
    }

    #[test]
    fn test_proc_num_alone_sets_nothing() {
        let plan = build_partition_plan("P", &flat(&[("proc_num", "3")])).unwrap();
        assert!(plan.template.get("cp-processors").is_none());
        assert!(plan.template.get("ifl-processors").is_none());
    }

    #[test]
    fn test_sub_resources_are_collected() {
        let plan = build_partition_plan(
            "PAR3",
            &flat(&[
                ("sgDevNum", "['SG_A:0100', 'SG_A:0101', 'SG_B:0200']"),
                ("sgFICON", "['FICON_1']"),
                ("vNIC1_name", "eth0"),
                ("vNIC1_adapName", "OSD 0140"),
                ("vNIC1_adapPort", "1"),
                ("vNIC1_devNum", "1000"),
                ("zAccelerators", "[{'name': 'z1', 'adapter-name': 'ZEDC 01', 'device-number': '0900'}]"),
                ("zCryptos", "{'crypto-adapter-names': ['CRYPTO 01'], 'crypto-domain-configurations': [{'domain-index': 3, 'access-mode': 'control-usage'}]}"),
                ("zzBootOpt", "{'boot_device': 'storage-volume', 'boot-timeout': 60, 'storage_group_name': 'SG_A', 'fcp-volume-uuid': 'ABC', 'fcp-boot-configuration-selector': 0}"),
            ]),
        )
        .unwrap();

        assert_eq!(plan.storage_group_devices["SG_A"], vec!["0100", "0101"]);
        assert_eq!(plan.storage_group_devices["SG_B"], vec!["0200"]);
        assert_eq!(plan.ficon_groups, vec!["FICON_1"]);

        let nic = &plan.nics[0];
        assert_eq!(nic.adapter_name(), Some("OSD 0140"));
        assert_eq!(nic.adapter_port().unwrap(), 1);
        let nic_template = nic.to_template("/api/virtual-switches/v1").unwrap();
        assert_eq!(nic_template["device-number"], "1000");
        assert!(nic_template.get("ssc-management-nic").is_none());

        let accelerator = &plan.accelerators[0];
        assert_eq!(accelerator.adapter_name, "ZEDC 01");
        let vf = accelerator.to_template("/api/adapters/z");
        assert_eq!(vf["adapter-uri"], "/api/adapters/z");
        assert!(vf.get("adapter-name").is_none());

        let crypto = plan.crypto.unwrap();
        let request = crypto.to_request(&["/api/adapters/c".to_string()]);
        assert_eq!(request["crypto-adapter-uris"], json!(["/api/adapters/c"]));
        assert_eq!(request["crypto-domain-configurations"][0]["domain-index"], 3);

        let boot = plan.boot.unwrap();
        assert!(boot.is_storage_volume());
        assert_eq!(boot.timeout, Some(60));
        assert_eq!(boot.fcp_selector, Some(0));
        assert_eq!(boot.fcp_volume_uuid.as_deref(), Some("ABC"));
    }

    #[test]
    fn test_empty_crypto_list_means_none() {
        let plan = build_partition_plan("P", &flat(&[("zCryptos", "[]"), ("zzBootOpt", "{}")])).unwrap();
        assert!(plan.crypto.is_none());
        assert!(plan.boot.is_none());
    }

    #[test]
    fn test_ssc_management_nic_template() {
        let nic = NicSpec {
            item: "vNIC2".into(),
            fields: flat(&[
                ("name", "mgmt"),
                ("sscipaddr", "10.0.0.5"),
                ("sscipaddrtype", "ipv4"),
                ("sscmaskprefix", "24"),
                ("vlanid", "12"),
            ]),
        };
        let template = nic.to_template("/api/virtual-switches/v0").unwrap();
        assert_eq!(template["ssc-management-nic"], true);
        assert_eq!(template["vlan-id"], 12);
        assert!(template["vlan-type"].is_null());
    }

    #[test]
    fn test_storage_group_template() {
        let template = build_storage_group_template(
            "SG_DATA",
            &flat(&[
                ("sgDesc", ""),
                ("storType", "fcp"),
                ("sgShared", "True"),
                ("numOfPaths", "2"),
                ("maxNumOfPars", "4"),
                ("sgStorVolsCfg", "[{'storVolUse': 'data', 'storVolSize': 16, 'storVolDesc': 'db'}]"),
            ]),
            "/api/cpcs/c1",
            &["ops@example.com".to_string()],
        )
        .unwrap();

        assert!(template.get("description").is_none());
        assert_eq!(template["shared"], true);
        assert_eq!(template["max-partitions"], 4);
        assert_eq!(template["connectivity"], 2);
        let volume = &template["storage-volumes"][0];
        assert_eq!(volume["operation"], "create");
        assert_eq!(volume["size"], 16.0);
        assert_eq!(volume["description"], "db");
        assert_eq!(template["email-to-addresses"], json!(["ops@example.com"]));
    }

    #[test]
    fn test_ficon_group_skips_max_partitions() {
        let template = build_storage_group_template(
            "SG_FC",
            &flat(&[
                ("storType", "fc"),
                ("sgShared", "False"),
                ("numOfPaths", "4"),
                ("sgStorVolsCfg", "[{'storVolUse': 'boot', 'storVolModel': '27', 'storVolDevNum': '9000'}]"),
            ]),
            "/api/cpcs/c1",
            &[],
        )
        .unwrap();
        assert!(template.get("max-partitions").is_none());
        let volume = &template["storage-volumes"][0];
        assert_eq!(volume["model"], "27");
        assert_eq!(volume["device-number"], "9000");
        assert!(volume.get("size").is_none());
    }

    #[test]
    fn test_storage_group_without_type_fails() {
        let err = build_storage_group_template("SG", &flat(&[]), "/api/cpcs/c1", &[]).unwrap_err();
        assert_eq!(err.to_string(), "template for 'SG': storType is missing");
    }
}
