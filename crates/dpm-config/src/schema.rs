//! Field schemas for partition and storage group backups.
//!
//! One table per entity kind tells the writer which category comment a key
//! belongs under, tells the reader how to coerce the raw text, and tells the
//! template builder which API property the key maps to (`None` means the
//! key needs special handling).

use std::collections::BTreeMap;
use std::sync::OnceLock;

use regex::Regex;
use tracing::debug;

use crate::error::{ConfigError, Result};
use crate::literal::parse_literal;
use crate::value::ConfigValue;

/// Category comment a key is grouped under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Category {
    Partition,
    Processor,
    Memory,
    FcpStorageGroups,
    FiconStorageGroups,
    VirtualNics,
    VirtualHbas,
    Accelerators,
    Cryptos,
    BootOption,
    GroupDescription,
    GroupType,
    GroupShared,
    GroupPaths,
    GroupMaxPartitions,
    GroupVolumes,
}

impl Category {
    /// Comment text written above the category's keys.
    pub fn label(&self) -> &'static str {
        match self {
            Category::Partition => "partition",
            Category::Processor => "processor",
            Category::Memory => "memory",
            Category::FcpStorageGroups => "FCP Storage-Groups",
            Category::FiconStorageGroups => "FICON Storage-Groups",
            Category::VirtualNics => "virtual NICs",
            Category::VirtualHbas => "virtual HBAs",
            Category::Accelerators => "accelerator virtual functions",
            Category::Cryptos => "cryptos",
            Category::BootOption => "boot option",
            Category::GroupDescription => "Storage Group Description",
            Category::GroupType => "Storage Group Type",
            Category::GroupShared => "Storage Group shared or not",
            Category::GroupPaths => "Number of paths or adapters",
            Category::GroupMaxPartitions => "Maximum number of partitions",
            Category::GroupVolumes => "Storage volume configs",
        }
    }
}

/// How a raw value is read back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Int,
    Float,
    Bool,
    /// List or map in literal notation
    Literal,
    /// Per-item maps written as `<prefix><n>_<field>` keys
    Flatten(&'static str),
}

impl FieldKind {
    fn expected(&self) -> &'static str {
        match self {
            FieldKind::Text => "text",
            FieldKind::Int => "an integer",
            FieldKind::Float => "a number",
            FieldKind::Bool => "True or False",
            FieldKind::Literal => "a literal",
            FieldKind::Flatten(_) => "per-item keys",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub key: &'static str,
    pub category: Category,
    pub kind: FieldKind,
    pub api: Option<&'static str>,
}

const fn field(
    key: &'static str,
    category: Category,
    kind: FieldKind,
    api: Option<&'static str>,
) -> FieldSpec {
    FieldSpec {
        key,
        category,
        kind,
        api,
    }
}

/// Field table for one entity kind.
#[derive(Debug)]
pub struct Schema {
    pub name: &'static str,
    fields: &'static [FieldSpec],
    /// Substring markers for keys missing from `fields`, checked in order
    markers: &'static [(&'static str, Category)],
}

use Category::*;
use FieldKind::{Bool, Flatten, Int, Literal, Text};

const PARTITION_FIELDS: &[FieldSpec] = &[
    field("par_desc", Partition, Text, Some("description")),
    field("par_type", Partition, Text, Some("type")),
    field("par_status", Partition, Text, None),
    field("par_reserveResources", Partition, Bool, Some("reserve-resources")),
    field("par_sscHostName", Partition, Text, Some("ssc-host-name")),
    field("par_sscMasterUserid", Partition, Text, Some("ssc-master-userid")),
    field("par_sscMasterPW", Partition, Text, Some("ssc-master-pw")),
    field("par_sscDNS", Partition, Text, Some("ssc-dns-servers")),
    field("par_sscIPv4GW", Partition, Text, Some("ssc-ipv4-gateway")),
    field("proc_mode", Processor, Text, Some("processor-mode")),
    field("proc_type", Processor, Text, None),
    field("proc_num", Processor, Int, None),
    field("init_mem", Memory, Int, Some("initial-memory")),
    field("max_mem", Memory, Int, Some("maximum-memory")),
    field("sgDevNum", FcpStorageGroups, Literal, None),
    field("sgFICON", FiconStorageGroups, Literal, None),
    field("vNICs", VirtualNics, Flatten("vNIC"), None),
    field("vHBAs", VirtualHbas, Flatten("vHBA"), None),
    field("zAccelerators", Accelerators, Literal, None),
    field("zCryptos", Cryptos, Literal, None),
    field("zzBootOpt", BootOption, Literal, None),
];

const PARTITION_MARKERS: &[(&str, Category)] = &[
    ("par", Partition),
    ("proc", Processor),
    ("mem", Memory),
    ("sgDevNum", FcpStorageGroups),
    ("sgFICON", FiconStorageGroups),
    ("vNICs", VirtualNics),
    ("vHBAs", VirtualHbas),
    ("zAccelerators", Accelerators),
    ("zCryptos", Cryptos),
    ("zzBootOpt", BootOption),
];

const STORAGE_GROUP_FIELDS: &[FieldSpec] = &[
    field("sgDesc", GroupDescription, Text, Some("description")),
    field("storType", GroupType, Text, Some("type")),
    field("sgShared", GroupShared, Bool, Some("shared")),
    field("numOfPaths", GroupPaths, Int, Some("connectivity")),
    field("maxNumOfPars", GroupMaxPartitions, Int, Some("max-partitions")),
    field("sgStorVolsCfg", GroupVolumes, Literal, Some("storage-volumes")),
];

const STORAGE_GROUP_MARKERS: &[(&str, Category)] = &[
    ("sgDesc", GroupDescription),
    ("storType", GroupType),
    ("sgShared", GroupShared),
    ("numOfPaths", GroupPaths),
    ("maxNumOfPars", GroupMaxPartitions),
    ("sgStorVolsCfg", GroupVolumes),
];

pub static PARTITION_SCHEMA: Schema = Schema {
    name: "partition",
    fields: PARTITION_FIELDS,
    markers: PARTITION_MARKERS,
};

pub static STORAGE_GROUP_SCHEMA: Schema = Schema {
    name: "storage group",
    fields: STORAGE_GROUP_FIELDS,
    markers: STORAGE_GROUP_MARKERS,
};

/// Per-item fields of one flattened group: item name -> field -> raw text.
pub type ItemGroup = BTreeMap<String, BTreeMap<String, String>>;

/// A section read through a schema.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DecodedSection {
    /// Typed values under their canonical key; unknown keys stay as text
    pub fields: BTreeMap<String, ConfigValue>,
    /// Flattened items by owning field key (e.g. `vNICs`). Field names are
    /// lower-cased so legacy and current files read the same.
    pub items: BTreeMap<String, ItemGroup>,
}

impl DecodedSection {
    pub fn get(&self, key: &str) -> Option<&ConfigValue> {
        self.fields.get(key)
    }

    pub fn text(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(ConfigValue::as_str)
    }

    pub fn items(&self, key: &str) -> Option<&ItemGroup> {
        self.items.get(key)
    }
}

fn item_key_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"^([A-Za-z]+)(\d+)_(.+)$").ok())
        .as_ref()
}

impl Schema {
    pub fn fields(&self) -> &'static [FieldSpec] {
        self.fields
    }

    /// Field spec for `key`, ignoring ASCII case.
    pub fn field(&self, key: &str) -> Option<&'static FieldSpec> {
        self.fields.iter().find(|f| f.key.eq_ignore_ascii_case(key))
    }

    /// Category of a top-level key: the table entry, else the first
    /// substring marker the key contains.
    pub fn category_of(&self, key: &str) -> Option<Category> {
        if let Some(spec) = self.field(key) {
            return Some(spec.category);
        }
        let lowered = key.to_ascii_lowercase();
        self.markers
            .iter()
            .find(|(marker, _)| lowered.contains(&marker.to_ascii_lowercase()))
            .map(|(_, category)| *category)
    }

    /// Split `<prefix><n>_<field>` into the owning spec, item and field.
    fn item_of(&self, key: &str) -> Option<(&'static FieldSpec, String, String)> {
        let caps = item_key_pattern()?.captures(key)?;
        let prefix = caps.get(1)?.as_str();
        let spec = self.fields.iter().find(|f| match f.kind {
            FieldKind::Flatten(p) => p.eq_ignore_ascii_case(prefix),
            _ => false,
        })?;
        let FieldKind::Flatten(canonical) = spec.kind else {
            return None;
        };
        let item = format!("{canonical}{}", caps.get(2)?.as_str());
        let field = caps.get(3)?.as_str().to_ascii_lowercase();
        Some((spec, item, field))
    }

    /// Coerce a raw value according to the key's kind.
    pub fn coerce(&self, key: &str, raw: &str) -> Result<ConfigValue> {
        let Some(spec) = self.field(key) else {
            return Ok(ConfigValue::Text(raw.to_string()));
        };
        coerce_kind(spec.key, spec.kind, raw)
    }

    /// Read a section's raw key/values into typed fields and item groups.
    pub fn decode(&self, flat: &BTreeMap<String, String>) -> Result<DecodedSection> {
        let mut decoded = DecodedSection::default();
        for (key, raw) in flat {
            if let Some(spec) = self.field(key) {
                if !matches!(spec.kind, FieldKind::Flatten(_)) {
                    let value = coerce_kind(spec.key, spec.kind, raw)?;
                    decoded.fields.insert(spec.key.to_string(), value);
                    continue;
                }
            }
            if let Some((spec, item, field)) = self.item_of(key) {
                decoded
                    .items
                    .entry(spec.key.to_string())
                    .or_default()
                    .entry(item)
                    .or_default()
                    .insert(field, raw.clone());
                continue;
            }
            debug!(schema = self.name, key = %key, "key not in schema, kept as text");
            decoded
                .fields
                .insert(key.clone(), ConfigValue::Text(raw.clone()));
        }
        Ok(decoded)
    }
}

fn coerce_kind(key: &str, kind: FieldKind, raw: &str) -> Result<ConfigValue> {
    let trimmed = raw.trim();
    let mismatch = || ConfigError::field_type(key, kind.expected(), raw);
    match kind {
        FieldKind::Text | FieldKind::Flatten(_) => Ok(ConfigValue::Text(raw.to_string())),
        FieldKind::Int => trimmed
            .trim_end_matches(['L', 'l'])
            .parse::<i64>()
            .map(ConfigValue::Int)
            .map_err(|_| mismatch()),
        FieldKind::Float => trimmed
            .parse::<f64>()
            .map(ConfigValue::Float)
            .map_err(|_| mismatch()),
        FieldKind::Bool => {
            if trimmed.eq_ignore_ascii_case("true") {
                Ok(ConfigValue::Bool(true))
            } else if trimmed.eq_ignore_ascii_case("false") {
                Ok(ConfigValue::Bool(false))
            } else {
                Err(mismatch())
            }
        }
        FieldKind::Literal => parse_literal(trimmed).map_err(|e| match e {
            ConfigError::Literal { message, offset } => ConfigError::Literal {
                message: format!("{key}: {message}"),
                offset,
            },
            other => other,
        }),
    }
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
    fn test_lookups_ignore_case() {
        let spec = PARTITION_SCHEMA.field("par_reserveresources").unwrap();
        assert_eq!(spec.key, "par_reserveResources");
        assert_eq!(spec.api, Some("reserve-resources"));
        assert_eq!(spec.kind, FieldKind::Bool);
    }

    #[test]
    fn test_unknown_keys_use_markers() {
        assert_eq!(PARTITION_SCHEMA.category_of("par_extra"), Some(Category::Partition));
        assert_eq!(PARTITION_SCHEMA.category_of("proc_weight"), Some(Category::Processor));
        assert_eq!(PARTITION_SCHEMA.category_of("unrelated"), None);
    }

    #[test]
    fn test_decode_partition_section() {
        let decoded = PARTITION_SCHEMA
            .decode(&flat(&[
                ("par_type", "ssc"),
                ("proc_num", "4"),
                ("par_reserveresources", "False"),
                ("sgdevnum", "[u'SG1:0100']"),
                ("vnic1_name", "mgmt"),
                ("vNIC1_adapName", "OSD01"),
                ("vnic2_name", "data"),
                ("custom", "x"),
            ]))
            .unwrap();

        assert_eq!(decoded.text("par_type"), Some("ssc"));
        assert_eq!(decoded.get("proc_num"), Some(&ConfigValue::Int(4)));
        assert_eq!(decoded.get("par_reserveResources"), Some(&ConfigValue::Bool(false)));
        assert_eq!(
            decoded.get("sgDevNum"),
            Some(&ConfigValue::List(vec!["SG1:0100".into()]))
        );
        assert_eq!(decoded.text("custom"), Some("x"));

        let nics = decoded.items("vNICs").unwrap();
        assert_eq!(nics.len(), 2);
        assert_eq!(nics["vNIC1"]["name"], "mgmt");
        assert_eq!(nics["vNIC1"]["adapname"], "OSD01");
        assert_eq!(nics["vNIC2"]["name"], "data");
    }

    #[test]
    fn test_type_mismatch_names_the_key() {
        let err = STORAGE_GROUP_SCHEMA
            .decode(&flat(&[("numOfPaths", "two")]))
            .unwrap_err();
        match err {
            ConfigError::FieldType { key, value, .. } => {
                assert_eq!(key, "numOfPaths");
                assert_eq!(value, "two");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_legacy_long_integers() {
        assert_eq!(
            PARTITION_SCHEMA.coerce("init_mem", "4096L").unwrap(),
            ConfigValue::Int(4096)
        );
    }
}
