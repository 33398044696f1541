//! Feed icon resolution.
//!
//! The normalizer asks an [`IconResolver`] for a feed's icon and treats any
//! failure as "no icon". [`FaviconResolver`] fetches `/favicon.ico` from the
//! feed's site through a [`Fetcher`] and hands the bytes to an
//! [`IconStore`], which issues the URL clients should load.

mod fetcher;

pub use fetcher::{FetchError, FetchResponse, Fetcher, HttpFetcher};

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use thiserror::Error;
use url::Url;

/// Finds an icon URL for a page.
#[async_trait]
pub trait IconResolver: Send + Sync {
    /// Returns the icon URL, or `None` when there is none or lookup failed.
    async fn resolve(&self, page_url: &str) -> Option<String>;
}

/// Never finds an icon.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoIcons;

#[async_trait]
impl IconResolver for NoIcons {
    async fn resolve(&self, _page_url: &str) -> Option<String> {
        None
    }
}

#[derive(Debug, Error)]
#[error("icon store failed: {0}")]
pub struct IconStoreError(pub String);

/// Stores icon bytes and issues public URLs for them.
#[async_trait]
pub trait IconStore: Send + Sync {
    /// Public URL previously issued for `favicon_url`, if any.
    async fn cached(&self, favicon_url: &str) -> Option<String>;

    /// Stores an icon and returns its public URL.
    async fn put(
        &self,
        favicon_url: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<String, IconStoreError>;
}

/// Remembers which favicons exist and serves them from their origin.
///
/// Stands in for a blob store when icons are not rehosted.
#[derive(Debug, Default)]
pub struct PassthroughIconStore {
    issued: Mutex<HashMap<String, String>>,
}

impl PassthroughIconStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl IconStore for PassthroughIconStore {
    async fn cached(&self, favicon_url: &str) -> Option<String> {
        let issued = self.issued.lock().unwrap_or_else(|p| p.into_inner());
        issued.get(favicon_url).cloned()
    }

    async fn put(
        &self,
        favicon_url: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<String, IconStoreError> {
        tracing::debug!(
            url = %favicon_url,
            content_type = %content_type,
            size = bytes.len(),
            "Issuing icon URL"
        );
        let mut issued = self.issued.lock().unwrap_or_else(|p| p.into_inner());
        issued.insert(favicon_url.to_owned(), favicon_url.to_owned());
        Ok(favicon_url.to_owned())
    }
}

/// Resolves `/favicon.ico` on the page's host.
#[derive(Debug)]
pub struct FaviconResolver<F, S> {
    fetcher: F,
    store: S,
}

impl<F: Fetcher, S: IconStore> FaviconResolver<F, S> {
    pub fn new(fetcher: F, store: S) -> Self {
        Self { fetcher, store }
    }
}

#[async_trait]
impl<F: Fetcher, S: IconStore> IconResolver for FaviconResolver<F, S> {
    async fn resolve(&self, page_url: &str) -> Option<String> {
        let favicon = favicon_url(page_url)?;

        if let Some(url) = self.store.cached(&favicon).await {
            return Some(url);
        }

        let response = match self.fetcher.get(&favicon).await {
            Ok(response) => response,
            Err(e) => {
                tracing::debug!(url = %favicon, error = %e, "Favicon fetch failed");
                return None;
            }
        };
        if response.status != 200 || response.body.is_empty() {
            tracing::debug!(url = %favicon, status = response.status, "No favicon");
            return None;
        }

        let content_type = sniff_image_type(&response.body);
        match self.store.put(&favicon, content_type, response.body).await {
            Ok(url) => Some(url),
            Err(e) => {
                tracing::warn!(url = %favicon, error = %e, "Could not store favicon");
                None
            }
        }
    }
}

/// `page_url` with its path replaced by `/favicon.ico` and no query or
/// fragment.
pub fn favicon_url(page_url: &str) -> Option<String> {
    let mut url = Url::parse(page_url.trim()).ok()?;
    if url.cannot_be_a_base() {
        return None;
    }
    url.set_path("/favicon.ico");
    url.set_query(None);
    url.set_fragment(None);
    Some(url.into())
}

/// MIME type from the image's magic bytes.
pub fn sniff_image_type(bytes: &[u8]) -> &'static str {
    if bytes.starts_with(b"\x89PNG\r\n\x1a\n") {
        "image/png"
    } else if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
        "image/gif"
    } else if bytes.starts_with(b"\xFF\xD8\xFF") {
        "image/jpeg"
    } else if bytes.starts_with(b"\x00\x00\x01\x00") {
        "image/x-icon"
    } else {
        "application/octet-stream"
    }
}
