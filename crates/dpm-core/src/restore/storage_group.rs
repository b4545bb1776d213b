//! Recreate storage groups from a storage group backup.

use std::collections::BTreeMap;

use dpm_config::ConfigDocument;
use hmc_rest::ResultExt;
use tracing::{info, instrument};

use super::split_sections;
use crate::error::Result;
use crate::provision::{provision, ProvisionConfig, ProvisioningReport, Stage, StageTracker};
use crate::resources::storage::create_storage_group;
use crate::session::HmcSession;
use crate::template::build_storage_group_template;

/// Create one storage group, returning its URI.
#[instrument(skip(session, flat, emails, tracker))]
pub async fn restore_storage_group(
    session: &HmcSession,
    name: &str,
    flat: &BTreeMap<String, String>,
    emails: &[String],
    tracker: &StageTracker,
) -> Result<String> {
    let template = build_storage_group_template(name, flat, &session.cpc().uri, emails)?;
    tracker.advance(Stage::TemplateBuilt);

    let uri = create_storage_group(session.transport(), &template)
        .await
        .within("restore_storage_group")?;
    tracker.advance(Stage::Created);
    info!(group = %name, uri = %uri, "storage group created");
    Ok(uri)
}

/// Create every storage group in `document`, one worker per section.
pub async fn restore_storage_groups(
    session: &HmcSession,
    document: &ConfigDocument,
    emails: &[String],
    config: &ProvisionConfig,
) -> ProvisioningReport<String> {
    let (names, sections) = split_sections(document);
    let session = session.clone();
    let emails = emails.to_vec();
    provision(names, config, move |name, tracker| {
        let session = session.clone();
        let sections = sections.clone();
        let emails = emails.clone();
        async move {
            let flat = sections.get(&name).cloned().unwrap_or_default();
            restore_storage_group(&session, &name, &flat, &emails, &tracker).await
        }
    })
    .await
}
