//! Operator profile.
//!
//! An optional TOML file holding defaults for the console connection and a
//! table of console aliases:
//!
//! ```toml
//! port = 6794
//! user = "sysprog"
//! accept_invalid_certs = true
//!
//! [hosts]
//! hmc01 = "9.12.34.56"
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{DpmError, Result};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OperatorProfile {
    /// Console alias -> host name or address
    pub hosts: BTreeMap<String, String>,
    pub port: Option<u16>,
    pub user: Option<String>,
    pub accept_invalid_certs: bool,
}

impl OperatorProfile {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let profile = Self::from_toml_str(&text).map_err(|e| match e {
            DpmError::Profile { message, .. } => DpmError::Profile {
                path: path.display().to_string(),
                message,
            },
            other => other,
        })?;
        debug!(path = %path.display(), aliases = profile.hosts.len(), "operator profile loaded");
        Ok(profile)
    }

    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| DpmError::Profile {
            path: "<inline>".to_string(),
            message: e.to_string(),
        })
    }

    /// Address for `name`: the aliased host if there is one, else `name` itself.
    pub fn resolve_host<'a>(&'a self, name: &'a str) -> &'a str {
        self.hosts.get(name).map(String::as_str).unwrap_or(name)
    }
}
