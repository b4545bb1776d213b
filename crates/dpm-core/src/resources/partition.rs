//! Partitions and the resources hanging off them.

use hmc_rest::{
    fetch_object_list, ObjectRequest, Result, ResultExt, StatusExpectation, Transport,
};
use serde_json::{json, Value};

use super::{create_object, get_object, id_from_uri, post_no_content};

/// The `{id}` in `/api/partitions/{id}`.
pub fn partition_id(partition_uri: &str) -> &str {
    id_from_uri(partition_uri, "/api/partitions/")
}

pub async fn list_partitions(transport: &dyn Transport, cpc_id: &str) -> Result<Vec<Value>> {
    fetch_object_list(
        transport,
        ObjectRequest::get(format!("/api/cpcs/{cpc_id}/partitions"), "List Partitions of a CPC")
            .expect(StatusExpectation::ok_with(&[400])),
        "partitions",
    )
    .await
    .within("list_partitions")
}

pub async fn partition_properties(transport: &dyn Transport, partition_uri: &str) -> Result<Value> {
    get_object(
        transport,
        partition_uri,
        "Get Partition Properties",
        "partition_properties",
    )
    .await
}

/// Create a partition from `template`, returning its object URI.
pub async fn create_partition(
    transport: &dyn Transport,
    cpc_id: &str,
    template: &Value,
) -> Result<String> {
    create_object(
        transport,
        &format!("/api/cpcs/{cpc_id}/partitions"),
        "Create Partition",
        template,
        StatusExpectation::created(),
        "object-uri",
        "create_partition",
    )
    .await
}

pub async fn update_partition(
    transport: &dyn Transport,
    partition_uri: &str,
    properties: &Value,
) -> Result<()> {
    post_no_content(
        transport,
        partition_uri,
        "Update Partition Properties",
        properties,
        "update_partition",
    )
    .await
}

/// Create a NIC on the partition, returning its element URI.
pub async fn create_nic(
    transport: &dyn Transport,
    partition_uri: &str,
    template: &Value,
) -> Result<String> {
    create_object(
        transport,
        &format!("{partition_uri}/nics"),
        "Create NIC",
        template,
        StatusExpectation::created(),
        "element-uri",
        "create_nic",
    )
    .await
}

pub async fn nic_properties(transport: &dyn Transport, nic_uri: &str) -> Result<Value> {
    get_object(transport, nic_uri, "Get NIC Properties", "nic_properties").await
}

pub async fn hba_properties(transport: &dyn Transport, hba_uri: &str) -> Result<Value> {
    get_object(transport, hba_uri, "Get HBA Properties", "hba_properties").await
}

/// Create an accelerator virtual function, returning its element URI.
pub async fn create_virtual_function(
    transport: &dyn Transport,
    partition_uri: &str,
    template: &Value,
) -> Result<String> {
    create_object(
        transport,
        &format!("{partition_uri}/virtual-functions"),
        "Create Virtual Function",
        template,
        StatusExpectation::new(201, &[400, 403, 404]),
        "element-uri",
        "create_virtual_function",
    )
    .await
}

pub async fn virtual_function_properties(transport: &dyn Transport, vf_uri: &str) -> Result<Value> {
    get_object(
        transport,
        vf_uri,
        "Get Virtual Function Properties",
        "virtual_function_properties",
    )
    .await
}

pub async fn increase_crypto_configuration(
    transport: &dyn Transport,
    partition_uri: &str,
    configuration: &Value,
) -> Result<()> {
    post_no_content(
        transport,
        &format!("{partition_uri}/operations/increase-crypto-configuration"),
        "Increase Crypto Configuration",
        configuration,
        "increase_crypto_configuration",
    )
    .await
}

pub async fn attach_storage_group(
    transport: &dyn Transport,
    partition_uri: &str,
    storage_group_uri: &str,
) -> Result<()> {
    post_no_content(
        transport,
        &format!("{partition_uri}/operations/attach-storage-group"),
        "Attach Storage Group to Partition",
        &json!({ "storage-group-uri": storage_group_uri }),
        "attach_storage_group",
    )
    .await
}
