//! Accessor behaviour against a scripted console.

use hmc_rest::fakes::{Reply, ScriptedTransport, UnreachableTransport};
use hmc_rest::{
    fetch_object, fetch_object_list, fetch_text, HmcError, Method, ObjectRequest,
    ResultExt, StatusExpectation,
};
use serde_json::json;

#[tokio::test]
async fn fetch_object_decodes_body() {
    let transport = ScriptedTransport::new();
    transport
        .on(
            Method::Get,
            "/api/partitions/p1",
            Reply::ok(json!({"name": "PAR1", "type": "linux"})),
        )
        .await;

    let object = fetch_object(
        &transport,
        ObjectRequest::get("/api/partitions/p1", "Get Partition Properties"),
    )
    .await
    .unwrap()
    .unwrap();

    assert_eq!(object["name"], "PAR1");
}

#[tokio::test]
async fn fetch_object_posts_json_body_and_expects_created() {
    let transport = ScriptedTransport::new();
    transport
        .on(
            Method::Post,
            "/api/cpcs/c1/partitions",
            Reply::created(json!({"object-uri": "/api/partitions/new"})),
        )
        .await;

    let template = json!({"name": "PAR1", "ifl-processors": 2});
    let created = fetch_object(
        &transport,
        ObjectRequest::post("/api/cpcs/c1/partitions", "Create Partition", &template)
            .expect(StatusExpectation::created()),
    )
    .await
    .unwrap()
    .unwrap();

    assert_eq!(created["object-uri"], "/api/partitions/new");
    assert_eq!(
        transport.posted_bodies("/api/cpcs/c1/partitions").await,
        vec![template]
    );
}

#[tokio::test]
async fn no_content_answer_decodes_to_none() {
    let transport = ScriptedTransport::new();
    transport
        .on(Method::Post, "/api/partitions/p1", Reply::no_content())
        .await;

    let result = fetch_object(
        &transport,
        ObjectRequest::post("/api/partitions/p1", "Update Partition Properties", &json!({}))
            .expect(StatusExpectation::no_content()),
    )
    .await
    .unwrap();

    assert!(result.is_none());
}

#[tokio::test]
async fn fetch_object_list_unwraps_named_array() {
    let transport = ScriptedTransport::new();
    transport
        .on(
            Method::Get,
            "/api/cpcs",
            Reply::ok(json!({"cpcs": [
                {"name": "CPC1", "object-uri": "/api/cpcs/1", "status": "active"},
                {"name": "CPC2", "object-uri": "/api/cpcs/2", "status": "operating"}
            ]})),
        )
        .await;

    let cpcs = fetch_object_list(&transport, ObjectRequest::get("/api/cpcs", "List CPCs"), "cpcs")
        .await
        .unwrap();

    assert_eq!(cpcs.len(), 2);
    assert_eq!(cpcs[1]["name"], "CPC2");
}

#[tokio::test]
async fn missing_response_key_fails_with_trail() {
    let transport = ScriptedTransport::new();
    transport
        .on(Method::Get, "/api/cpcs", Reply::ok(json!({"other": []})))
        .await;

    let err = fetch_object_list(&transport, ObjectRequest::get("/api/cpcs", "List CPCs"), "cpcs")
        .await
        .within("list_cpcs")
        .unwrap_err();

    assert_eq!(
        err.operation_trail(),
        vec!["list_cpcs", "fetch_object_list", "extract"]
    );
}

#[tokio::test]
async fn status_failure_keeps_every_frame() {
    let transport = ScriptedTransport::new();
    transport
        .on(
            Method::Post,
            "/api/cpcs/c1/partitions",
            Reply::error(409, "name already in use"),
        )
        .await;

    let err = fetch_object(
        &transport,
        ObjectRequest::post("/api/cpcs/c1/partitions", "Create Partition", &json!({}))
            .expect(StatusExpectation::created()),
    )
    .await
    .within("create_partition")
    .unwrap_err();

    assert_eq!(err.operation_trail(), vec!["create_partition", "fetch_object"]);
    assert_eq!(err.status(), Some(409));
    assert!(err.response_body().unwrap().contains("name already in use"));
    assert!(err.to_string().contains("while doing Create Partition"));
    assert!(!err.root().to_string().starts_with("Unknown"));
}

#[tokio::test]
async fn malformed_body_is_an_extraction_failure() {
    let transport = ScriptedTransport::new();
    transport
        .on(Method::Get, "/api/cpcs/c1", Reply::new(200, "<html>"))
        .await;

    let err = fetch_object(&transport, ObjectRequest::get("/api/cpcs/c1", "Get CPC"))
        .await
        .unwrap_err();

    assert!(matches!(err.root(), HmcError::Extraction { .. }));
}

#[tokio::test]
async fn fetch_text_returns_raw_body() {
    let transport = ScriptedTransport::new();
    transport
        .on(Method::Get, "/api/console", Reply::new(200, "{\"name\":\"HMC1\"}"))
        .await;

    let text = fetch_text(&transport, ObjectRequest::get("/api/console", "Get Console"), true)
        .await
        .unwrap();
    assert_eq!(text, "{\"name\":\"HMC1\"}");
}

#[tokio::test]
async fn transport_failure_is_not_retried() {
    let err = fetch_object(&UnreachableTransport, ObjectRequest::get("/api/cpcs", "List CPCs"))
        .await
        .unwrap_err();

    assert!(err.is_transport());
    assert_eq!(err.operation_trail(), vec!["fetch_object"]);
}
