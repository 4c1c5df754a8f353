mod basic;
mod client;
pub mod auth;

pub use basic::BasicClient;
pub use client::HttpClient;

use anyhow::Result;
use bytes::Bytes;

/// Fetches `url` with a GET request and returns the body.
///
/// # Errors
///
/// Fails on an unparsable URL, a transport error or a non-success status.
pub async fn fetch_bytes<C: HttpClient + ?Sized>(client: &C, url: &str) -> Result<Bytes> {
    let req = reqwest::Request::new(reqwest::Method::GET, url.parse()?);

    let resp = client.execute(req).await?.error_for_status()?;
    Ok(resp.bytes().await?)
}
