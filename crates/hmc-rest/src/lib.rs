//! hmc-rest: the request/response layer for the HMC Web Services API
//!
//! This crate is the layer every DPM backup and restore operation goes
//! through. It does not know about partitions or storage groups; it only
//! knows how to send a request, decide whether the answer is good, and pull
//! values out of the JSON that came back.
//!
//! ## Layer 0 - Console access
//!
//! - [`validate`]: classify a response status, raise a structured failure
//! - [`extract`]: decode JSON bodies, look up (optional) keys
//! - [`accessor`]: one call = request + validation + decoding
//! - [`client`]: reqwest-backed [`Transport`] with session logon/logoff

pub mod accessor;
pub mod client;
pub mod error;
pub mod extract;
pub mod fakes;
pub mod transport;
pub mod validate;

pub use accessor::{fetch_object, fetch_object_list, fetch_text, ObjectRequest};
pub use client::{ApiVersion, ClientConfig, HmcClient, DEFAULT_PORT};
pub use error::{HmcError, Result, ResultExt};
pub use extract::Extraction;
pub use transport::{ApiRequest, ApiResponse, Method, Transport};
pub use validate::{validate, StatusExpectation, KNOWN_BAD_STATUSES};
