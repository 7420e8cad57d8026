//! Preload request resolution.
//!
//! A preload target is either an absolute URL (dispatched over the network)
//! or a site-relative path (read from the local public assets directory).
//! Either way the body is fully read before the caller's transform runs, so
//! transforms stay synchronous.

use anyhow::{Context, Result};
use regex::Regex;
use reqwest::Method;
use serde::de::DeserializeOwned;
use std::{fs, path::PathBuf, str, sync::LazyLock};

/// Scheme-relative or scheme-qualified URLs, e.g. `https://...` or `//cdn...`.
static ABSOLUTE_URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(?:[a-z+]+:)?//").unwrap());

/// Check whether a preload target must be fetched over the network.
pub fn is_absolute_url(url: &str) -> bool {
    ABSOLUTE_URL.is_match(url)
}

/// Options attached to a preload request.
#[derive(Debug, Clone)]
pub struct FetchInit {
    /// HTTP method, only meaningful for absolute targets.
    pub method: String,
    /// Request headers, only meaningful for absolute targets.
    pub headers: Vec<(String, String)>,
    /// Request body, only meaningful for absolute targets.
    pub body: Option<Vec<u8>>,
}

impl Default for FetchInit {
    fn default() -> Self {
        Self {
            method: "GET".into(),
            headers: Vec::new(),
            body: None,
        }
    }
}

/// A fully-read response, from the network or the local assets directory.
#[derive(Debug, Clone)]
pub struct FetchResponse {
    status: u16,
    body: Vec<u8>,
}

impl FetchResponse {
    pub fn new(status: u16, body: Vec<u8>) -> Self {
        Self { status, body }
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Body as UTF-8 text.
    pub fn text(&self) -> Result<&str> {
        str::from_utf8(&self.body).context("response body is not valid UTF-8")
    }

    /// Body deserialized from JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_slice(&self.body).context("response body is not valid JSON")
    }
}

/// Resolves preload targets to responses.
pub struct Fetcher {
    client: reqwest::Client,
    public_dir: PathBuf,
}

impl Fetcher {
    pub fn new(public_dir: PathBuf) -> Self {
        Self {
            client: reqwest::Client::new(),
            public_dir,
        }
    }

    /// Resolve a single preload target.
    ///
    /// Absolute URLs go over the network honoring `init`; anything else is
    /// read from the public assets directory and wrapped in a 200 response.
    pub async fn fetch(&self, target: &str, init: &FetchInit) -> Result<FetchResponse> {
        if is_absolute_url(target) {
            let method = Method::from_bytes(init.method.as_bytes())
                .with_context(|| format!("invalid request method `{}`", init.method))?;

            let mut request = self.client.request(method, target);
            for (name, value) in &init.headers {
                request = request.header(name, value);
            }
            if let Some(body) = &init.body {
                request = request.body(body.clone());
            }

            let response = request
                .send()
                .await
                .with_context(|| format!("fetching {target}"))?;
            let status = response.status().as_u16();
            let body = response
                .bytes()
                .await
                .with_context(|| format!("reading response body of {target}"))?;

            Ok(FetchResponse::new(status, body.to_vec()))
        } else {
            let path = self.public_dir.join(target.trim_start_matches('/'));
            let body = fs::read(&path)
                .with_context(|| format!("reading public asset {}", path.display()))?;
            Ok(FetchResponse::new(200, body))
        }
    }
}
