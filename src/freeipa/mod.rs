//! FreeIPA JSON-RPC access.
//!
//! [`CaApi`] is the set of directory and certificate operations the engine
//! needs; [`FreeIpaClient`] implements it over an authenticated HTTP session.

pub mod api;
pub mod client;
pub mod protocol;

pub use api::{ApiError, CaApi, CertRequest, Connector};
pub use client::{FreeIpaClient, FreeIpaConnector};
pub use protocol::{CertRequestEntry, CertShowEntry};
