//! dpm-core: backup and restore of DPM partitions and storage groups
//!
//! Builds on [`hmc_rest`] for console access and [`dpm_config`] for the
//! backup file format.
//!
//! ## Layer 2 - Backup and restore
//!
//! - [`session`]: logged-on console plus the selected CPC
//! - [`resources`]: thin wrappers over the console objects DPM uses
//! - [`template`]: backup sections -> API creation templates
//! - [`provision`]: one task per entity, aggregated into a report
//! - [`restore`]: partition and storage group restore workers
//! - [`backup`]: collectors that read entities back into config maps
//! - [`profile`]: operator defaults and console aliases
//! - [`obs`] / [`telemetry`]: lifecycle events and tracing setup

pub mod backup;
pub mod error;
pub mod obs;
pub mod profile;
pub mod provision;
pub mod resources;
pub mod restore;
pub mod session;
pub mod telemetry;
pub mod template;

pub use backup::{
    write_backup, BackupCollector, BackupKind, BackupSummary, PartitionCollector,
    StorageGroupCollector,
};
pub use error::{DpmError, Result};
pub use profile::OperatorProfile;
pub use provision::{
    provision, EntityFailure, ProvisionConfig, ProvisioningReport, Stage, StageTracker,
};
pub use restore::{
    restore_partition, restore_partitions, restore_storage_group, restore_storage_groups,
    PartitionOutcome, RestoreIssue,
};
pub use session::HmcSession;
pub use telemetry::init_tracing;
pub use template::{build_partition_plan, build_storage_group_template, PartitionPlan};
