//! Adapters, virtual switches and storage ports.

use hmc_rest::{extract, HmcError, Result, ResultExt, Transport};
use serde_json::Value;
use tracing::{debug, warn};

use super::cpc::{list_adapters, list_virtual_switches};
use super::get_object;

/// An adapter picked by name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdapterRef {
    pub name: String,
    pub uri: String,
    pub status: String,
    pub kind: String,
}

pub async fn adapter_properties(transport: &dyn Transport, adapter_uri: &str) -> Result<Value> {
    get_object(
        transport,
        adapter_uri,
        "Get Adapter Properties",
        "adapter_properties",
    )
    .await
}

/// Find the adapter called `name` on the CPC.
pub async fn select_adapter(
    transport: &dyn Transport,
    cpc_id: &str,
    name: &str,
) -> Result<AdapterRef> {
    const OPERATION: &str = "select_adapter";
    let adapters = list_adapters(transport, cpc_id).await.within(OPERATION)?;
    if adapters.is_empty() {
        warn!(adapter = %name, "CPC lists no adapters");
    }
    for adapter in &adapters {
        if extract::str_at(adapter, "name").within(OPERATION)? == name {
            return Ok(AdapterRef {
                name: name.to_string(),
                uri: extract::str_at(adapter, "object-uri").within(OPERATION)?,
                status: extract::str_at(adapter, "status").within(OPERATION)?,
                kind: extract::str_at(adapter, "type").within(OPERATION)?,
            });
        }
    }
    Err(HmcError::NotFound {
        kind: "adapter",
        name: name.to_string(),
    }
    .within(OPERATION))
}

pub async fn virtual_switch_properties(transport: &dyn Transport, vswitch_uri: &str) -> Result<Value> {
    get_object(
        transport,
        vswitch_uri,
        "Get Virtual Switch Properties",
        "virtual_switch_properties",
    )
    .await
}

/// Virtual switch backed by `adapter_uri` on `port`, if there is one.
pub async fn select_virtual_switch(
    transport: &dyn Transport,
    cpc_id: &str,
    adapter_uri: &str,
    port: i64,
) -> Result<Option<String>> {
    const OPERATION: &str = "select_virtual_switch";
    let switches = list_virtual_switches(transport, cpc_id)
        .await
        .within(OPERATION)?;
    if switches.is_empty() {
        warn!(adapter = %adapter_uri, "CPC lists no virtual switches");
    }
    for switch in &switches {
        let uri = extract::str_at(switch, "object-uri").within(OPERATION)?;
        let properties = virtual_switch_properties(transport, &uri)
            .await
            .within(OPERATION)?;
        let backing = extract::optional_str(&properties, "backing-adapter-uri");
        let switch_port = extract::optional_value(&properties, "port").and_then(Value::as_i64);
        if backing.as_deref() == Some(adapter_uri) && switch_port == Some(port) {
            debug!(vswitch = %uri, port, "virtual switch matched");
            return Ok(Some(uri));
        }
    }
    Ok(None)
}

pub async fn storage_port_properties(transport: &dyn Transport, port_uri: &str) -> Result<Value> {
    get_object(
        transport,
        port_uri,
        "Get Storage Port Properties",
        "storage_port_properties",
    )
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use hmc_rest::fakes::{Reply, ScriptedTransport};
    use hmc_rest::Method;
    use serde_json::json;

    #[tokio::test]
    async fn test_select_virtual_switch_matches_adapter_and_port() {
        let transport = ScriptedTransport::new();
        transport
            .on(
                Method::Get,
                "/api/cpcs/c1/virtual-switches",
                Reply::ok(json!({"virtual-switches": [
                    {"object-uri": "/api/virtual-switches/v0"},
                    {"object-uri": "/api/virtual-switches/v1"}
                ]})),
            )
            .await
            .on(
                Method::Get,
                "/api/virtual-switches/v0",
                Reply::ok(json!({"backing-adapter-uri": "/api/adapters/a1", "port": 0})),
            )
            .await
            .on(
                Method::Get,
                "/api/virtual-switches/v1",
                Reply::ok(json!({"backing-adapter-uri": "/api/adapters/a1", "port": 1})),
            )
            .await;

        let found = select_virtual_switch(&transport, "c1", "/api/adapters/a1", 1)
            .await
            .unwrap();
        assert_eq!(found.as_deref(), Some("/api/virtual-switches/v1"));

        let missing = select_virtual_switch(&transport, "c1", "/api/adapters/a2", 0)
            .await
            .unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn test_select_adapter_reads_type() {
        let transport = ScriptedTransport::new();
        transport
            .on(
                Method::Get,
                "/api/cpcs/c1/adapters",
                Reply::ok(json!({"adapters": [{
                    "name": "OSD 0140",
                    "object-uri": "/api/adapters/a1",
                    "status": "active",
                    "type": "osd"
                }]})),
            )
            .await;

        let adapter = select_adapter(&transport, "c1", "OSD 0140").await.unwrap();
        assert_eq!(adapter.uri, "/api/adapters/a1");
        assert_eq!(adapter.kind, "osd");

        let err = select_adapter(&transport, "c1", "OSD 9999").await.unwrap_err();
        assert_eq!(err.to_string(), "select_adapter: adapter 'OSD 9999' not found");
    }
}
