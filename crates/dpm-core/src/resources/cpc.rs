//! CPC lookup and CPC-scoped lists.

use hmc_rest::{
    extract, fetch_object_list, HmcError, ObjectRequest, Result, ResultExt, StatusExpectation,
    Transport,
};
use serde_json::Value;
use tracing::warn;

use super::id_from_uri;

pub const CPCS_PATH: &str = "/api/cpcs";

/// A CPC picked by name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CpcRef {
    pub name: String,
    pub uri: String,
    pub status: String,
}

impl CpcRef {
    /// The `{id}` in `/api/cpcs/{id}`.
    pub fn id(&self) -> &str {
        id_from_uri(&self.uri, "/api/cpcs/")
    }
}

pub async fn list_cpcs(transport: &dyn Transport) -> Result<Vec<Value>> {
    fetch_object_list(
        transport,
        ObjectRequest::get(CPCS_PATH, "List CPCs").expect(StatusExpectation::ok_with(&[400])),
        "cpcs",
    )
    .await
    .within("list_cpcs")
}

/// Find the CPC called `name`.
pub async fn select_cpc(transport: &dyn Transport, name: &str) -> Result<CpcRef> {
    const OPERATION: &str = "select_cpc";
    let cpcs = list_cpcs(transport).await.within(OPERATION)?;
    if cpcs.is_empty() {
        warn!(cpc = %name, "no CPC found");
    }
    for cpc in &cpcs {
        if extract::str_at(cpc, "name").within(OPERATION)? == name {
            return Ok(CpcRef {
                name: name.to_string(),
                uri: extract::str_at(cpc, "object-uri").within(OPERATION)?,
                status: extract::str_at(cpc, "status").within(OPERATION)?,
            });
        }
    }
    Err(HmcError::NotFound {
        kind: "CPC",
        name: name.to_string(),
    }
    .within(OPERATION))
}

pub async fn list_adapters(transport: &dyn Transport, cpc_id: &str) -> Result<Vec<Value>> {
    fetch_object_list(
        transport,
        ObjectRequest::get(format!("/api/cpcs/{cpc_id}/adapters"), "List Adapters of a CPC")
            .expect(StatusExpectation::ok_with(&[400])),
        "adapters",
    )
    .await
    .within("list_adapters")
}

pub async fn list_virtual_switches(transport: &dyn Transport, cpc_id: &str) -> Result<Vec<Value>> {
    fetch_object_list(
        transport,
        ObjectRequest::get(
            format!("/api/cpcs/{cpc_id}/virtual-switches"),
            "List Virtual Switches of a CPC",
        )
        .expect(StatusExpectation::ok_with(&[400])),
        "virtual-switches",
    )
    .await
    .within("list_virtual_switches")
}

#[cfg(test)]
mod tests {
    use super::*;
    use hmc_rest::fakes::{Reply, ScriptedTransport};
    use hmc_rest::Method;
    use serde_json::json;

    async fn console() -> ScriptedTransport {
        let transport = ScriptedTransport::new();
        transport
            .on(
                Method::Get,
                CPCS_PATH,
                Reply::ok(json!({"cpcs": [
                    {"name": "CPCA", "object-uri": "/api/cpcs/a1", "status": "operating"},
                    {"name": "CPCB", "object-uri": "/api/cpcs/b2", "status": "active"}
                ]})),
            )
            .await;
        transport
    }

    #[tokio::test]
    async fn test_select_cpc_by_name() {
        let transport = console().await;
        let cpc = select_cpc(&transport, "CPCB").await.unwrap();
        assert_eq!(cpc.uri, "/api/cpcs/b2");
        assert_eq!(cpc.id(), "b2");
        assert_eq!(cpc.status, "active");
    }

    #[tokio::test]
    async fn test_select_cpc_missing_is_not_found() {
        let transport = console().await;
        let err = select_cpc(&transport, "NOPE").await.unwrap_err();
        assert!(matches!(err.root(), HmcError::NotFound { kind: "CPC", .. }));
        assert_eq!(err.operation_trail(), vec!["select_cpc"]);
    }
}
