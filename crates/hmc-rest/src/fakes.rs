//! In-memory transport (testing only)
//!
//! [`ScriptedTransport`] answers requests from canned replies keyed by
//! method and path, and records every request it sees.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Mutex;

use crate::error::{HmcError, Result};
use crate::transport::{ApiRequest, ApiResponse, Method, Transport};

type Handler = Arc<dyn Fn(&ApiRequest) -> Reply + Send + Sync>;

/// A canned console answer.
#[derive(Debug, Clone)]
pub struct Reply {
    pub status: u16,
    pub body: String,
}

impl Reply {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Reply {
            status,
            body: body.into(),
        }
    }

    pub fn ok(body: Value) -> Self {
        Self::new(200, body.to_string())
    }

    pub fn created(body: Value) -> Self {
        Self::new(201, body.to_string())
    }

    pub fn no_content() -> Self {
        Self::new(204, "")
    }

    pub fn error(status: u16, message: &str) -> Self {
        Self::new(
            status,
            serde_json::json!({ "http-status": status, "message": message }).to_string(),
        )
    }

    fn into_response(self) -> ApiResponse {
        ApiResponse::buffered(self.status, reason_for(self.status), self.body)
    }
}

fn reason_for(status: u16) -> &'static str {
    match status {
        200 => "OK",
        201 => "Created",
        204 => "No Content",
        400 => "Bad Request",
        403 => "Forbidden",
        404 => "Not Found",
        409 => "Conflict",
        500 => "Internal Server Error",
        503 => "Service Unavailable",
        _ => "",
    }
}

enum Route {
    /// Replies served in order; the last one repeats.
    Queue(VecDeque<Reply>),
    Dynamic(Handler),
}

/// Transport serving scripted replies.
///
/// Unscripted requests answer `404`.
#[derive(Default)]
pub struct ScriptedTransport {
    routes: Mutex<HashMap<(Method, String), Route>>,
    requests: Mutex<Vec<ApiRequest>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a reply for `method path`.
    pub async fn on(&self, method: Method, path: &str, reply: Reply) -> &Self {
        let mut routes = self.routes.lock().await;
        let key = (method, path.to_string());
        match routes.get_mut(&key) {
            Some(Route::Queue(queue)) => queue.push_back(reply),
            _ => {
                routes.insert(key, Route::Queue(VecDeque::from([reply])));
            }
        }
        self
    }

    /// Answer `method path` by calling `handler` for each request.
    pub async fn on_request<F>(&self, method: Method, path: &str, handler: F) -> &Self
    where
        F: Fn(&ApiRequest) -> Reply + Send + Sync + 'static,
    {
        self.routes
            .lock()
            .await
            .insert((method, path.to_string()), Route::Dynamic(Arc::new(handler)));
        self
    }

    /// Every request received so far, in arrival order.
    pub async fn requests(&self) -> Vec<ApiRequest> {
        self.requests.lock().await.clone()
    }

    /// Requests matching `method path`.
    pub async fn requests_to(&self, method: Method, path: &str) -> Vec<ApiRequest> {
        self.requests
            .lock()
            .await
            .iter()
            .filter(|r| r.method == method && r.path == path)
            .cloned()
            .collect()
    }

    /// Decoded JSON bodies posted to `path`.
    pub async fn posted_bodies(&self, path: &str) -> Vec<Value> {
        self.requests_to(Method::Post, path)
            .await
            .iter()
            .filter_map(|r| r.body.as_deref())
            .filter_map(|b| serde_json::from_str(b).ok())
            .collect()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse> {
        self.requests.lock().await.push(request.clone());

        let mut routes = self.routes.lock().await;
        let reply = match routes.get_mut(&(request.method, request.path.clone())) {
            Some(Route::Queue(queue)) => {
                if queue.len() > 1 {
                    queue.pop_front()
                } else {
                    queue.front().cloned()
                }
            }
            Some(Route::Dynamic(handler)) => Some(handler(&request)),
            None => None,
        };
        drop(routes);

        match reply {
            Some(reply) => Ok(reply.into_response()),
            None => Ok(Reply::error(404, &format!("no route for {} {}", request.method, request.path))
                .into_response()),
        }
    }
}

/// Transport whose every call fails at the connection level.
#[derive(Debug, Default)]
pub struct UnreachableTransport;

#[async_trait]
impl Transport for UnreachableTransport {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse> {
        Err(HmcError::Transport {
            path: request.path,
            detail: "connection refused".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_queued_replies_repeat_last() {
        let transport = ScriptedTransport::new();
        transport
            .on(Method::Get, "/api/cpcs", Reply::ok(json!({"cpcs": []})))
            .await
            .on(Method::Get, "/api/cpcs", Reply::error(503, "busy"))
            .await;

        let first = transport
            .send(ApiRequest::new(Method::Get, "/api/cpcs"))
            .await
            .unwrap();
        assert_eq!(first.status(), 200);
        for _ in 0..2 {
            let next = transport
                .send(ApiRequest::new(Method::Get, "/api/cpcs"))
                .await
                .unwrap();
            assert_eq!(next.status(), 503);
        }
        assert_eq!(transport.requests().await.len(), 3);
    }

    #[tokio::test]
    async fn test_unscripted_route_is_not_found() {
        let transport = ScriptedTransport::new();
        let response = transport
            .send(ApiRequest::new(Method::Get, "/api/nothing"))
            .await
            .unwrap();
        assert_eq!(response.status(), 404);
        assert_eq!(response.reason(), "Not Found");
    }

    #[tokio::test]
    async fn test_dynamic_route_sees_request_body() {
        let transport = ScriptedTransport::new();
        transport
            .on_request(Method::Post, "/api/echo", |request| {
                Reply::new(200, request.body.clone().unwrap_or_default())
            })
            .await;

        let response = transport
            .send(ApiRequest::new(Method::Post, "/api/echo").with_body("{\"a\":1}"))
            .await
            .unwrap();
        assert_eq!(response.text().await.unwrap(), "{\"a\":1}");
        assert_eq!(transport.posted_bodies("/api/echo").await, vec![json!({"a": 1})]);
    }
}
