//! The HTTP fetcher.
//!
//! Issues exactly one GET against the target, follows redirects, and turns the
//! response into a [`FetchResult`]. Certificates are not verified by the
//! client (see `initialization::init_client`) so broken TLS still yields a
//! response that the analyzers can inspect.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use futures::future::BoxFuture;
use log::debug;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, SET_COOKIE};

use super::types::FetchResult;
use super::Fetcher;
use crate::config::MAX_BODY_BYTES;
use crate::error_handling::{categorize_fetch_error, ScanError};

/// Fetcher backed by a shared `reqwest::Client`.
#[derive(Clone)]
pub struct HttpFetcher {
    client: Arc<reqwest::Client>,
}

impl HttpFetcher {
    pub fn new(client: Arc<reqwest::Client>) -> Self {
        Self { client }
    }

    async fn fetch_site(&self, url: &str) -> Result<FetchResult, ScanError> {
        let start = Instant::now();
        let mut response = self
            .client
            .get(url)
            .header(
                ACCEPT,
                "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
            )
            .header(ACCEPT_LANGUAGE, "en-US,en;q=0.9")
            .send()
            .await
            .map_err(|e| categorize_fetch_error(url, e))?;

        let final_url = response.url().to_string();
        let status = response.status().as_u16();
        debug!("Fetched {url} -> {final_url} ({status})");

        let (headers, cookies) = extract_headers(response.headers());

        let mut buf: Vec<u8> = Vec::new();
        let mut body_truncated = false;
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| categorize_fetch_error(url, e))?
        {
            let room = MAX_BODY_BYTES - buf.len();
            if chunk.len() > room {
                buf.extend_from_slice(&chunk[..room]);
                body_truncated = true;
                break;
            }
            buf.extend_from_slice(&chunk);
        }
        if body_truncated {
            debug!("Body of {final_url} truncated at {MAX_BODY_BYTES} bytes");
        }

        Ok(FetchResult {
            url: url.to_string(),
            final_url,
            status,
            headers,
            cookies,
            body: String::from_utf8_lossy(&buf).into_owned(),
            body_truncated,
            elapsed: start.elapsed(),
        })
    }
}

impl Fetcher for HttpFetcher {
    fn fetch<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<FetchResult, ScanError>> {
        Box::pin(self.fetch_site(url))
    }
}

/// Splits response headers into a lower-cased map (last value wins) and the
/// ordered list of raw `Set-Cookie` values.
pub(crate) fn extract_headers(
    headers: &reqwest::header::HeaderMap,
) -> (HashMap<String, String>, Vec<String>) {
    let mut map = HashMap::with_capacity(headers.len());
    for (name, value) in headers.iter() {
        // HeaderName is already lower-case
        map.insert(
            name.as_str().to_string(),
            String::from_utf8_lossy(value.as_bytes()).into_owned(),
        );
    }

    let cookies = headers
        .get_all(SET_COOKIE)
        .iter()
        .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned())
        .collect();

    (map, cookies)
}
