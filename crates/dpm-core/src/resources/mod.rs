//! Thin wrappers over the console's partition, adapter and storage URIs.
//!
//! Every wrapper adds its own frame to the error chain, so a failure
//! reports e.g. `attach_storage_group: fetch_object: HTTP Error[...]`.

pub mod adapter;
pub mod cpc;
pub mod partition;
pub mod storage;

use hmc_rest::{
    extract, fetch_object, HmcError, ObjectRequest, Result, ResultExt, StatusExpectation,
    Transport,
};
use serde_json::Value;

/// Path segment after `prefix`, e.g. the id in `/api/cpcs/<id>`.
pub fn id_from_uri<'a>(uri: &'a str, prefix: &str) -> &'a str {
    uri.strip_prefix(prefix).unwrap_or(uri)
}

/// GET an object that must be present.
pub(crate) async fn get_object(
    transport: &dyn Transport,
    path: &str,
    action: &str,
    operation: &str,
) -> Result<Value> {
    fetch_object(transport, ObjectRequest::get(path, action))
        .await
        .within(operation)?
        .ok_or_else(|| {
            HmcError::extraction("extract", format!("{action} returned an empty body")).within(operation)
        })
}

/// POST a creation template and return the URI the console assigned.
pub(crate) async fn create_object(
    transport: &dyn Transport,
    path: &str,
    action: &str,
    template: &Value,
    expect: StatusExpectation,
    uri_key: &str,
    operation: &str,
) -> Result<String> {
    let created = fetch_object(transport, ObjectRequest::post(path, action, template).expect(expect))
        .await
        .within(operation)?
        .ok_or_else(|| {
            HmcError::extraction("extract", format!("{action} returned an empty body")).within(operation)
        })?;
    extract::str_at(&created, uri_key).within(operation)
}

/// POST an update or operation answered with `204 No Content`.
pub(crate) async fn post_no_content(
    transport: &dyn Transport,
    path: &str,
    action: &str,
    body: &Value,
    operation: &str,
) -> Result<()> {
    fetch_object(
        transport,
        ObjectRequest::post(path, action, body).expect(StatusExpectation::no_content()),
    )
    .await
    .within(operation)?;
    Ok(())
}
