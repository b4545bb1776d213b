//! Explicit console context handed to every backup and restore operation.

use std::sync::Arc;

use hmc_rest::{ApiVersion, Transport};
use tracing::info;

use crate::resources::cpc::{select_cpc, CpcRef};

/// API minor version from which storage groups replace per-partition HBAs.
pub const STORAGE_GROUPS_MIN_MINOR: u32 = 22;

/// A logged-on console plus the CPC being worked on.
///
/// Cloning is cheap; restore workers each hold their own clone.
#[derive(Clone)]
pub struct HmcSession {
    transport: Arc<dyn Transport>,
    api_version: ApiVersion,
    cpc: CpcRef,
}

impl HmcSession {
    pub fn new(transport: Arc<dyn Transport>, api_version: ApiVersion, cpc: CpcRef) -> Self {
        HmcSession {
            transport,
            api_version,
            cpc,
        }
    }

    /// Look up `cpc_name` on the console and bind the session to it.
    pub async fn open(
        transport: Arc<dyn Transport>,
        api_version: ApiVersion,
        cpc_name: &str,
    ) -> hmc_rest::Result<Self> {
        let cpc = select_cpc(transport.as_ref(), cpc_name).await?;
        info!(cpc = %cpc.name, status = %cpc.status, api = %api_version, "CPC selected");
        Ok(Self::new(transport, api_version, cpc))
    }

    pub fn transport(&self) -> &dyn Transport {
        self.transport.as_ref()
    }

    pub fn api_version(&self) -> ApiVersion {
        self.api_version
    }

    pub fn cpc(&self) -> &CpcRef {
        &self.cpc
    }

    pub fn cpc_id(&self) -> &str {
        self.cpc.id()
    }

    /// Whether the console manages storage through storage groups.
    pub fn storage_groups_available(&self) -> bool {
        self.api_version.minor >= STORAGE_GROUPS_MIN_MINOR
    }
}

impl std::fmt::Debug for HmcSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HmcSession")
            .field("api_version", &self.api_version)
            .field("cpc", &self.cpc)
            .finish_non_exhaustive()
    }
}
