//! HTTP retrieval of IVAC exports.

use crate::error::{IvacError, Result};
#[cfg(feature = "remote")]
use reqwest::blocking::Client;
#[cfg(feature = "remote")]
use std::time::Duration;
#[cfg(feature = "remote")]
use tracing::debug;

/// Timeout applied to remote reads.
pub const FETCH_TIMEOUT_SECS: u64 = 60;

/// Fetch the body of `url` as text.
///
/// Timeouts, connection failures and non-success statuses all map to
/// [`IvacError::SourceUnavailable`]. A client that cannot be built surfaces as
/// [`IvacError::Http`].
#[cfg(feature = "remote")]
pub fn fetch_text(url: &str) -> Result<String> {
    let client = Client::builder()
        .timeout(Duration::from_secs(FETCH_TIMEOUT_SECS))
        .build()?;

    debug!("Fetching {}", url);
    let response = client.get(url).send().map_err(|e| {
        let reason = if e.is_timeout() {
            "timeout".to_string()
        } else if e.is_connect() {
            "could not connect".to_string()
        } else {
            e.to_string()
        };
        unavailable(url, reason)
    })?;

    let status = response.status();
    if !status.is_success() {
        return Err(unavailable(url, format!("HTTP error {}", status.as_u16())));
    }

    response
        .text()
        .map_err(|e| unavailable(url, format!("failed to read body: {e}")))
}

/// Remote sources need the `remote` feature.
#[cfg(not(feature = "remote"))]
pub fn fetch_text(url: &str) -> Result<String> {
    Err(unavailable(url, "built without the remote feature"))
}

fn unavailable(url: &str, reason: impl Into<String>) -> IvacError {
    IvacError::SourceUnavailable {
        location: url.to_string(),
        reason: reason.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unreachable_host_is_source_error() {
        // Port 9 on localhost is not expected to serve HTTP
        let err = fetch_text("http://127.0.0.1:9/ivac.csv").unwrap_err();
        assert!(err.is_source_error());
        assert_eq!(err.location(), Some("http://127.0.0.1:9/ivac.csv"));
    }
}
