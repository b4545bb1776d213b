//! Storage groups, their volumes and virtual storage resources.

use hmc_rest::{
    extract, fetch_object_list, ObjectRequest, Result, ResultExt, StatusExpectation, Transport,
};
use serde_json::Value;
use tracing::warn;

use super::{create_object, get_object, id_from_uri, post_no_content};

pub const STORAGE_GROUPS_PATH: &str = "/api/storage-groups";

/// The `{id}` in `/api/storage-groups/{id}`.
pub fn storage_group_id(storage_group_uri: &str) -> &str {
    id_from_uri(storage_group_uri, "/api/storage-groups/")
}

/// Every storage group the console knows, across all CPCs.
pub async fn list_storage_groups(transport: &dyn Transport) -> Result<Vec<Value>> {
    fetch_object_list(
        transport,
        ObjectRequest::get(STORAGE_GROUPS_PATH, "List Storage Groups")
            .expect(StatusExpectation::ok_with(&[400])),
        "storage-groups",
    )
    .await
    .within("list_storage_groups")
}

pub async fn storage_group_properties(
    transport: &dyn Transport,
    storage_group_uri: &str,
) -> Result<Value> {
    get_object(
        transport,
        storage_group_uri,
        "Get Storage Group Properties",
        "storage_group_properties",
    )
    .await
}

/// URI of the storage group called `name`, if it exists.
pub async fn select_storage_group(transport: &dyn Transport, name: &str) -> Result<Option<String>> {
    const OPERATION: &str = "select_storage_group";
    let groups = list_storage_groups(transport).await.within(OPERATION)?;
    if groups.is_empty() {
        warn!("console lists no storage groups");
    }
    for group in &groups {
        if extract::optional_str(group, "name").as_deref() == Some(name) {
            return extract::str_at(group, "object-uri").within(OPERATION).map(Some);
        }
    }
    Ok(None)
}

pub async fn create_storage_group(transport: &dyn Transport, template: &Value) -> Result<String> {
    create_object(
        transport,
        STORAGE_GROUPS_PATH,
        "Create Storage Group",
        template,
        StatusExpectation::created(),
        "object-uri",
        "create_storage_group",
    )
    .await
}

pub async fn list_virtual_storage_resources(
    transport: &dyn Transport,
    storage_group_uri: &str,
) -> Result<Vec<Value>> {
    fetch_object_list(
        transport,
        ObjectRequest::get(
            format!("{storage_group_uri}/virtual-storage-resources"),
            "List Virtual Storage Resources of a Storage Group",
        )
        .expect(StatusExpectation::ok_with(&[400, 404])),
        "virtual-storage-resources",
    )
    .await
    .within("list_virtual_storage_resources")
}

pub async fn update_virtual_storage_resource(
    transport: &dyn Transport,
    vsr_uri: &str,
    properties: &Value,
) -> Result<()> {
    post_no_content(
        transport,
        vsr_uri,
        "Update Virtual Storage Resource Properties",
        properties,
        "update_virtual_storage_resource",
    )
    .await
}

/// Volume entries (each with an `element-uri`) of a storage group.
pub async fn storage_volumes_of(transport: &dyn Transport, storage_group_uri: &str) -> Result<Vec<Value>> {
    fetch_object_list(
        transport,
        ObjectRequest::get(
            format!("{storage_group_uri}/storage-volumes"),
            "Get storage volume list of one storage group",
        ),
        "storage-volumes",
    )
    .await
    .within("storage_volumes_of")
}

pub async fn storage_volume_properties(transport: &dyn Transport, volume_uri: &str) -> Result<Value> {
    get_object(
        transport,
        volume_uri,
        "Get Storage-Volume Properties",
        "storage_volume_properties",
    )
    .await
}

pub async fn control_unit_properties(transport: &dyn Transport, control_unit_uri: &str) -> Result<Value> {
    get_object(
        transport,
        control_unit_uri,
        "Get Storage Control Unit Properties",
        "control_unit_properties",
    )
    .await
}
