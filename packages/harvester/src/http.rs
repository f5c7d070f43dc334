//! HTTP client wrapper for downloading from remote sources.
//!
//! There is no retry: a failed request surfaces as `TransientFetch` and the
//! caller decides whether to run again.

use std::collections::BTreeMap;
use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::StatusCode;

use crate::config::{DEFAULT_MAX_RESPONSE_SIZE, HTTP_TIMEOUT_SECS};
use crate::error::{HarvesterError, Result};

/// User agent string identifying this harvester.
const USER_AGENT: &str = concat!("gesetze-harvester/", env!("CARGO_PKG_VERSION"));

/// A fetched response body together with its headers.
#[derive(Debug, Clone, Default)]
pub struct Page {
    /// Raw response body.
    pub body: Vec<u8>,

    /// Response headers, names lowercased.
    pub headers: BTreeMap<String, String>,
}

impl Page {
    /// Create a page from a body without headers.
    #[must_use]
    pub fn from_body(body: impl Into<Vec<u8>>) -> Self {
        Self {
            body: body.into(),
            headers: BTreeMap::new(),
        }
    }

    /// Look up a header (case-insensitive).
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// Body decoded as UTF-8, replacing invalid sequences.
    #[must_use]
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Body decoded as ISO-8859-1.
    #[must_use]
    pub fn latin1_text(&self) -> String {
        decode_latin1(&self.body)
    }
}

/// Something that can GET a URL.
///
/// Implemented by [`HttpFetcher`]; tests substitute in-memory fakes.
pub trait Fetch {
    /// Fetch a URL, returning body and headers.
    fn fetch_page(&self, url: &str) -> Result<Page>;

    /// Fetch a URL, returning only the body.
    fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        Ok(self.fetch_page(url)?.body)
    }
}

/// Blocking reqwest-backed fetcher.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    max_size: u64,
}

impl HttpFetcher {
    /// Create a fetcher with the default response size limit.
    pub fn new() -> Result<Self> {
        Ok(Self {
            client: create_client()?,
            max_size: DEFAULT_MAX_RESPONSE_SIZE,
        })
    }

    /// Override the response size limit (in bytes).
    #[must_use]
    pub fn with_max_size(mut self, max_size: u64) -> Self {
        self.max_size = max_size;
        self
    }
}

impl Fetch for HttpFetcher {
    fn fetch_page(&self, url: &str) -> Result<Page> {
        download_page(&self.client, url, self.max_size)
    }
}

/// Create a configured HTTP client.
pub fn create_client() -> Result<Client> {
    let client = Client::builder()
        .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
        .user_agent(USER_AGENT)
        .build()?;
    Ok(client)
}

/// Download a URL.
///
/// 404 and 410 map to `NotFound`; connection errors, timeouts and any other
/// non-success status map to `TransientFetch`.
pub fn download_page(client: &Client, url: &str, max_size: u64) -> Result<Page> {
    tracing::debug!(url, "GET");

    let response = client
        .get(url)
        .send()
        .map_err(|e| transient(url, &e))?;

    let status = response.status();
    if status == StatusCode::NOT_FOUND || status == StatusCode::GONE {
        return Err(HarvesterError::NotFound(url.to_string()));
    }
    if !status.is_success() {
        tracing::warn!(url, status = %status, "unexpected HTTP status");
        return Err(HarvesterError::TransientFetch {
            url: url.to_string(),
            message: format!("HTTP status {status}"),
        });
    }

    if let Some(size) = response.content_length() {
        if size > max_size {
            return Err(HarvesterError::ResponseTooLarge {
                url: url.to_string(),
                size,
                max: max_size,
            });
        }
    }

    let headers = response
        .headers()
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_ascii_lowercase(), v.to_string()))
        })
        .collect();

    let body = response.bytes().map_err(|e| transient(url, &e))?;
    if body.len() as u64 > max_size {
        return Err(HarvesterError::ResponseTooLarge {
            url: url.to_string(),
            size: body.len() as u64,
            max: max_size,
        });
    }

    Ok(Page {
        body: body.to_vec(),
        headers,
    })
}

fn transient(url: &str, error: &reqwest::Error) -> HarvesterError {
    HarvesterError::TransientFetch {
        url: url.to_string(),
        message: error.to_string(),
    }
}

/// Decode ISO-8859-1 bytes.
///
/// # Examples
/// ```
/// use gesetze_harvester::http::decode_latin1;
///
/// assert_eq!(decode_latin1(&[0x47, 0xfc, 0x74, 0x65]), "Güte");
/// ```
pub fn decode_latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| char::from(b)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_client() {
        let client = create_client();
        assert!(client.is_ok());
    }

    #[test]
    fn test_page_header_case_insensitive() {
        let mut page = Page::from_body("x");
        page.headers
            .insert("xaversid".to_string(), "abc123".to_string());
        assert_eq!(page.header("XaverSID"), Some("abc123"));
        assert_eq!(page.header("missing"), None);
    }

    #[test]
    fn test_page_latin1_text() {
        let page = Page::from_body(vec![0x53, 0x74, 0x72, 0xe4, 0xdf, 0x65]);
        assert_eq!(page.latin1_text(), "Sträße");
    }
}
