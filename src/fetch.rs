//! Remote source: fetch the centrally maintained hosts text.

use std::error::Error as _;
use std::time::Duration;

use tracing::{debug, info};

use crate::config::Settings;
use crate::error::SyncError;

/// Where the remote block comes from.
pub trait RemoteSource: Send + Sync {
    /// Location shown in logs and errors.
    fn url(&self) -> &str;
    /// Fetch the whole remote text.
    fn fetch(&self) -> Result<String, SyncError>;
}

/// HTTP(S) source with explicit connect and total timeouts.
#[derive(Debug, Clone)]
pub struct HttpSource {
    url: String,
    connect_timeout: Duration,
    timeout: Duration,
}

impl HttpSource {
    pub fn new(url: impl Into<String>, connect_timeout: Duration, timeout: Duration) -> Self {
        Self {
            url: url.into(),
            connect_timeout,
            timeout,
        }
    }

    pub fn from_settings(settings: &Settings) -> Result<Self, SyncError> {
        Ok(Self::new(
            settings.require_url()?,
            settings.connect_timeout,
            settings.timeout,
        ))
    }

    fn client(&self) -> Result<reqwest::Client, SyncError> {
        reqwest::Client::builder()
            .connect_timeout(self.connect_timeout)
            .timeout(self.timeout)
            .user_agent(format!("hostsync/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| self.error(describe(&e)))
    }

    fn error(&self, reason: String) -> SyncError {
        SyncError::Fetch {
            url: self.url.clone(),
            reason,
        }
    }
}

impl RemoteSource for HttpSource {
    fn url(&self) -> &str {
        &self.url
    }

    /// Blocking: runs the request on a private current-thread runtime.
    /// Must not be called from inside another tokio runtime.
    fn fetch(&self) -> Result<String, SyncError> {
        let client = self.client()?;
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| self.error(format!("start runtime: {e}")))?;
        rt.block_on(fetch_text(&client, &self.url))
    }
}

/// GET `url` and return the body as text. Any non-2xx status is an error,
/// and so is a body that is not UTF-8 (see [`decode_body`]).
pub async fn fetch_text(client: &reqwest::Client, url: &str) -> Result<String, SyncError> {
    let fail = |reason: String| SyncError::Fetch {
        url: url.to_string(),
        reason,
    };
    debug!(url, "fetching remote hosts");
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| fail(describe(&e)))?;
    let status = response.status();
    if !status.is_success() {
        return Err(fail(format!("HTTP {status}")));
    }
    let bytes = response.bytes().await.map_err(|e| fail(describe(&e)))?;
    info!(url, bytes = bytes.len(), status = status.as_u16(), "fetched remote hosts");
    decode_body(&bytes)
}

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Remote bytes to text: a leading UTF-8 BOM is dropped, anything that is
/// not valid UTF-8 is rejected rather than replaced.
pub fn decode_body(bytes: &[u8]) -> Result<String, SyncError> {
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    match std::str::from_utf8(bytes) {
        Ok(text) => Ok(text.to_string()),
        Err(e) => Err(SyncError::MalformedSource(format!(
            "not valid UTF-8 text (invalid byte at offset {})",
            e.valid_up_to()
        ))),
    }
}

/// One-line description of a request failure, including its cause chain.
fn describe(e: &reqwest::Error) -> String {
    let mut msg = if e.is_timeout() {
        "timed out".to_string()
    } else if e.is_connect() {
        "connection failed".to_string()
    } else if e.is_builder() {
        "invalid request".to_string()
    } else {
        e.to_string()
    };
    let mut source = e.source();
    while let Some(cause) = source {
        msg.push_str(": ");
        msg.push_str(&cause.to_string());
        source = cause.source();
    }
    msg
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bom_is_dropped() {
        assert_eq!(decode_body(b"\xEF\xBB\xBF# hosts\n").unwrap(), "# hosts\n");
        assert_eq!(decode_body(b"# hosts\n").unwrap(), "# hosts\n");
    }

    #[test]
    fn only_leading_bom_is_dropped() {
        let text = decode_body("a\u{FEFF}b".as_bytes()).unwrap();
        assert_eq!(text, "a\u{FEFF}b");
    }

    #[test]
    fn invalid_utf8_is_malformed_source() {
        let err = decode_body(b"127.0.0.1 x\n# \xd6\xd0\n").unwrap_err();
        match err {
            SyncError::MalformedSource(msg) => assert!(msg.contains("offset 14"), "{msg}"),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
