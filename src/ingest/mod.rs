//! Clients for the remote government APIs.
//!
//! - `tnm`  — USGS The National Map product search and DEM tile download.
//! - `usgs` — USGS NWIS site service (stream gauges).

pub mod tnm;
pub mod usgs;

/// Shared blocking HTTP client. Per-request timeouts are set by each call.
pub fn build_client() -> Result<reqwest::blocking::Client, crate::model::FloodDataError> {
    let client = reqwest::blocking::Client::builder()
        .user_agent(concat!("phoenix_flood/", env!("CARGO_PKG_VERSION")))
        .build()?;
    Ok(client)
}
