//! reqwest-backed console client.
//!
//! Holds the `X-API-Session` token obtained by [`HmcClient::logon`] and
//! attaches it to every request sent through the [`Transport`] impl.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::accessor::{fetch_object, ObjectRequest};
use crate::error::{HmcError, Result, ResultExt};
use crate::extract;
use crate::transport::{ApiRequest, ApiResponse, Transport};
use crate::validate::StatusExpectation;

/// Default HTTPS port of the console Web Services API.
pub const DEFAULT_PORT: u16 = 6794;

const SESSION_HEADER: &str = "X-API-Session";
const SESSIONS_PATH: &str = "/api/sessions";
const THIS_SESSION_PATH: &str = "/api/sessions/this-session";

/// Connection settings for one console.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Host name or IP address
    pub host: String,
    /// API port
    pub port: u16,
    /// Accept self-signed console certificates
    pub accept_invalid_certs: bool,
}

impl ClientConfig {
    pub fn new(host: &str) -> Self {
        ClientConfig {
            host: host.to_string(),
            port: DEFAULT_PORT,
            accept_invalid_certs: false,
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn accept_invalid_certs(mut self, accept: bool) -> Self {
        self.accept_invalid_certs = accept;
        self
    }

    pub fn base_url(&self) -> String {
        format!("https://{}:{}", self.host, self.port)
    }
}

/// API version reported at logon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ApiVersion {
    pub major: u32,
    pub minor: u32,
}

impl ApiVersion {
    pub fn new(major: u32, minor: u32) -> Self {
        ApiVersion { major, minor }
    }
}

impl std::fmt::Display for ApiVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// Client for one console.
pub struct HmcClient {
    config: ClientConfig,
    http_client: reqwest::Client,
    session: RwLock<Option<String>>,
}

impl HmcClient {
    pub fn new(config: ClientConfig) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .user_agent(concat!("dpm-tools/", env!("CARGO_PKG_VERSION")))
            .danger_accept_invalid_certs(config.accept_invalid_certs)
            .build()?;

        Ok(HmcClient {
            config,
            http_client,
            session: RwLock::new(None),
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn url_for(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url(), path)
    }

    pub async fn is_logged_on(&self) -> bool {
        self.session.read().await.is_some()
    }

    /// Open an API session.
    pub async fn logon(&self, user: &str, password: &str) -> Result<ApiVersion> {
        const OPERATION: &str = "logon";
        info!("Logging on to HMC {} as {}", self.config.host, user);

        let body = json!({ "userid": user, "password": password });
        let request = ObjectRequest::post(SESSIONS_PATH, "Logon", &body)
            .expect(StatusExpectation::ok_with(&[400, 403]));
        let response = fetch_object(self, request)
            .await
            .within(OPERATION)?
            .ok_or_else(|| {
                HmcError::extraction(OPERATION, "Logon returned an empty response").within(OPERATION)
            })?;

        let token = extract::str_at(&response, "api-session").within(OPERATION)?;
        let version = logon_version(&response).within(OPERATION)?;
        *self.session.write().await = Some(token);

        debug!(%version, "HMC session opened");
        Ok(version)
    }

    /// Close the API session. A client that never logged on is left as is.
    pub async fn logoff(&self) -> Result<()> {
        if !self.is_logged_on().await {
            return Ok(());
        }
        let request = ObjectRequest::delete(THIS_SESSION_PATH, "Logoff")
            .expect(StatusExpectation::new(204, &[400, 403]));
        let result = fetch_object(self, request).await.within("logoff");
        *self.session.write().await = None;
        if let Err(e) = &result {
            warn!(error = %e, "logoff failed");
        }
        result.map(|_| ())
    }
}

#[async_trait]
impl Transport for HmcClient {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse> {
        let mut builder = self
            .http_client
            .request(request.method.into(), self.url_for(&request.path))
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .header(reqwest::header::ACCEPT, "*/*");

        if let Some(token) = self.session.read().await.as_deref() {
            builder = builder.header(SESSION_HEADER, token);
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await.map_err(|e| HmcError::Transport {
            path: request.path.clone(),
            detail: e.to_string(),
        })?;
        Ok(ApiResponse::streaming(response))
    }
}

/// API version fields of a logon response.
fn logon_version(response: &Value) -> Result<ApiVersion> {
    let number = |key: &str| -> Result<u32> {
        let raw = extract::i64_at(response, key)?;
        u32::try_from(raw).map_err(|_| {
            HmcError::extraction("logon", format!("'{key}' is out of range: {raw}"))
        })
    };
    Ok(ApiVersion::new(
        number("api-major-version")?,
        number("api-minor-version")?,
    ))
}
