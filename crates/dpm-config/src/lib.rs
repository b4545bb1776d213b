//! dpm-config: backup file format for DPM partitions and storage groups
//!
//! ## Layer 1 - Config codec
//!
//! - [`value`]: typed values ([`ConfigValue`]) with JSON conversion
//! - [`literal`]: safe reader/writer for list and map literals
//! - [`codec`]: sectioned `key = value` documents with category comments
//! - [`schema`]: per-entity field tables driving comments, coercion and
//!   API property names

pub mod codec;
pub mod error;
pub mod literal;
pub mod schema;
pub mod value;

pub use codec::{serialize, ConfigDocument, EntityConfig, Line, Section};
pub use error::{ConfigError, Result};
pub use literal::{format_literal, parse_literal};
pub use schema::{
    Category, DecodedSection, FieldKind, FieldSpec, ItemGroup, Schema, PARTITION_SCHEMA,
    STORAGE_GROUP_SCHEMA,
};
pub use value::ConfigValue;
