//! "Fetch remote object": one request, status validation, body decoding.

use serde_json::Value;
use tracing::debug;

use crate::error::{HmcError, Result, ResultExt};
use crate::extract::{self, Extraction};
use crate::transport::{ApiRequest, Method, Transport};
use crate::validate::{validate, StatusExpectation};

/// Description of a single console call.
#[derive(Debug, Clone)]
pub struct ObjectRequest {
    pub method: Method,
    pub path: String,
    /// Human readable action, used in failure messages
    pub action: String,
    pub body: Option<Value>,
    pub expect: StatusExpectation,
}

impl ObjectRequest {
    pub fn get(path: impl Into<String>, action: impl Into<String>) -> Self {
        ObjectRequest {
            method: Method::Get,
            path: path.into(),
            action: action.into(),
            body: None,
            expect: StatusExpectation::default(),
        }
    }

    pub fn post(path: impl Into<String>, action: impl Into<String>, body: &Value) -> Self {
        ObjectRequest {
            method: Method::Post,
            path: path.into(),
            action: action.into(),
            body: Some(body.clone()),
            expect: StatusExpectation::default(),
        }
    }

    pub fn delete(path: impl Into<String>, action: impl Into<String>) -> Self {
        ObjectRequest {
            method: Method::Delete,
            path: path.into(),
            action: action.into(),
            body: None,
            expect: StatusExpectation::default(),
        }
    }

    pub fn expect(mut self, expect: StatusExpectation) -> Self {
        self.expect = expect;
        self
    }

    fn to_api_request(&self) -> ApiRequest {
        let request = ApiRequest::new(self.method, self.path.clone());
        match &self.body {
            Some(body) => request.with_body(body.to_string()),
            None => request,
        }
    }
}

async fn send_validated(
    transport: &dyn Transport,
    request: &ObjectRequest,
    operation: &str,
) -> Result<String> {
    debug!(
        method = %request.method,
        path = %request.path,
        action = %request.action,
        "{operation}"
    );
    let response = transport.send(request.to_api_request()).await?;
    let response = validate(response, operation, Some(&request.action), &request.expect).await?;
    response.text().await
}

/// Issue the request and decode the JSON body. Empty bodies decode to `None`.
pub async fn fetch_object(transport: &dyn Transport, request: ObjectRequest) -> Result<Option<Value>> {
    const OPERATION: &str = "fetch_object";
    let body = send_validated(transport, &request, OPERATION)
        .await
        .within(OPERATION)?;
    extract::decode_json(&body).within(OPERATION)
}

/// Issue the request and return the validated body as text.
///
/// With `check_json` the body must decode as JSON but is still returned raw.
pub async fn fetch_text(
    transport: &dyn Transport,
    request: ObjectRequest,
    check_json: bool,
) -> Result<String> {
    const OPERATION: &str = "fetch_text";
    let body = send_validated(transport, &request, OPERATION)
        .await
        .within(OPERATION)?;
    if check_json {
        extract::decode_json(&body).within(OPERATION)?;
    }
    Ok(body)
}

/// Issue the request and unwrap the array stored under `response_key`.
pub async fn fetch_object_list(
    transport: &dyn Transport,
    request: ObjectRequest,
    response_key: &str,
) -> Result<Vec<Value>> {
    const OPERATION: &str = "fetch_object_list";
    let body = send_validated(transport, &request, OPERATION)
        .await
        .within(OPERATION)?;
    let Some(decoded) = extract::decode_json(&body).within(OPERATION)? else {
        return Ok(Vec::new());
    };
    let items = Extraction::from_object(&decoded)
        .key(response_key)
        .run()
        .within(OPERATION)?;
    match items {
        Some(Value::Array(items)) => Ok(items),
        Some(Value::Null) | None => Ok(Vec::new()),
        Some(other) => Err(HmcError::extraction(
            "extract",
            format!("Key '{response_key}' should hold an array, found '{other}'"),
        )
        .within(OPERATION)),
    }
}
