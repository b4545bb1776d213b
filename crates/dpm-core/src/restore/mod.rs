//! Restore workers driven by the provisioner.

pub mod partition;
pub mod storage_group;

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use dpm_config::ConfigDocument;

pub use partition::{restore_partition, restore_partitions, PartitionOutcome};
pub use storage_group::{restore_storage_group, restore_storage_groups};

/// A sub-resource step that failed on an otherwise created entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestoreIssue {
    pub step: &'static str,
    /// NIC, storage group or adapter the step was about
    pub subject: String,
    pub message: String,
}

impl fmt::Display for RestoreIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} '{}': {}", self.step, self.subject, self.message)
    }
}

/// Section name -> raw key/values, shared read-only by all workers.
pub(crate) type SharedSections = Arc<HashMap<String, BTreeMap<String, String>>>;

/// Section names in file order plus their flat key/values.
pub(crate) fn split_sections(document: &ConfigDocument) -> (Vec<String>, SharedSections) {
    let names = document
        .section_names()
        .into_iter()
        .map(str::to_string)
        .collect();
    let sections = document
        .sections
        .iter()
        .map(|s| (s.name.clone(), s.flat()))
        .collect();
    (names, Arc::new(sections))
}
