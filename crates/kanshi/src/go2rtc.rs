//! Client for the go2rtc media server REST API
//!
//! Endpoints used:
//! - `GET /api/streams`: stream registry
//! - `PUT|PATCH|DELETE /api/streams?name=&src=`: register, update, remove
//! - `POST /api/whep?src=`: WHEP SDP offer/answer
//! - `GET /api/stream.mp4?src=`: progressive playback (URL only)

use std::collections::BTreeMap;
use std::time::Duration;

use anyhow::Context;
use bytes::Bytes;
use reqwest::{Method, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Errors talking to go2rtc, split by how callers need to report them
#[derive(Debug, Error)]
pub enum Go2rtcError {
    #[error("go2rtc at {url} did not respond within {} seconds", timeout.as_secs())]
    Timeout { url: String, timeout: Duration },
    #[error("cannot connect to go2rtc at {url}: {source}")]
    Unreachable {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("go2rtc API error: {} - {body}", status.as_u16())]
    Status { status: StatusCode, body: String },
    #[error("invalid response from go2rtc: {0}")]
    Decode(#[source] reqwest::Error),
}

impl Go2rtcError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Status { status, .. } if *status == StatusCode::NOT_FOUND)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Producer {
    #[serde(default)]
    pub url: String,
}

/// One entry of the go2rtc stream registry
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StreamInfo {
    #[serde(default)]
    pub producers: Option<Vec<Producer>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub consumers: Option<serde_json::Value>,
}

impl StreamInfo {
    /// URL of the first producer, the stream's source
    pub fn source_url(&self) -> Option<&str> {
        self.producers
            .as_deref()
            .and_then(|p| p.first())
            .map(|p| p.url.as_str())
    }
}

pub type StreamRegistry = BTreeMap<String, StreamInfo>;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// go2rtc REST client
#[derive(Debug, Clone)]
pub struct Go2rtcClient {
    client: reqwest::Client,
    base_url: String,
    /// Connect timeout the client was built with, if known
    connect_timeout: Option<Duration>,
}

impl Go2rtcClient {
    pub fn new(base_url: &str) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            connect_timeout: Some(CONNECT_TIMEOUT),
            ..Self::with_client(client, base_url)
        })
    }

    pub fn with_client(client: reqwest::Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            connect_timeout: None,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Progressive MP4 playback URL for a stream
    pub fn stream_mp4_url(&self, name: &str) -> anyhow::Result<reqwest::Url> {
        let base = self.url("/api/stream.mp4");
        reqwest::Url::parse_with_params(&base, &[("src", name)])
            .with_context(|| format!("Invalid go2rtc URL {:?}", base))
    }

    /// The deadline a timed-out request ran into: the connect timeout for
    /// connection failures, otherwise the per-request one. `None` when the
    /// limit is unknown, which is reported as unreachable.
    fn timeout_limit(&self, connecting: bool, request: Option<Duration>) -> Option<Duration> {
        if connecting {
            self.connect_timeout
        } else {
            request
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send(
        &self,
        request: reqwest::RequestBuilder,
        timeout: Option<Duration>,
    ) -> Result<reqwest::Response, Go2rtcError> {
        let request = match timeout {
            Some(t) => request.timeout(t),
            None => request,
        };
        let resp = request
            .send()
            .await
            .map_err(|e| match self.timeout_limit(e.is_connect(), timeout) {
                Some(timeout) if e.is_timeout() => Go2rtcError::Timeout {
                    url: self.base_url.clone(),
                    timeout,
                },
                _ => Go2rtcError::Unreachable {
                    url: self.base_url.clone(),
                    source: e,
                },
            })?;

        if resp.status().is_success() {
            return Ok(resp);
        }
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        Err(Go2rtcError::Status { status, body })
    }

    async fn streams_request(
        &self,
        method: Method,
        name: &str,
        src: Option<&str>,
    ) -> Result<(), Go2rtcError> {
        let mut query = vec![("name", name)];
        if let Some(src) = src {
            query.push(("src", src));
        }
        let request = self
            .client
            .request(method.clone(), self.url("/api/streams"))
            .query(&query);
        self.send(request, None).await?;
        debug!(%method, stream = %name, "go2rtc stream request ok");
        Ok(())
    }

    /// Fetch the stream registry
    pub async fn list_streams(&self) -> Result<StreamRegistry, Go2rtcError> {
        self.list_streams_within(None).await
    }

    /// Fetch the stream registry, giving up after `timeout`
    pub async fn list_streams_within(
        &self,
        timeout: Option<Duration>,
    ) -> Result<StreamRegistry, Go2rtcError> {
        let request = self.client.get(self.url("/api/streams"));
        let resp = self.send(request, timeout).await?;
        // go2rtc answers `null` when no streams exist
        let registry: Option<StreamRegistry> = resp.json().await.map_err(Go2rtcError::Decode)?;
        Ok(registry.unwrap_or_default())
    }

    /// Register a new stream
    pub async fn add_stream(&self, name: &str, src: &str) -> Result<(), Go2rtcError> {
        self.streams_request(Method::PUT, name, Some(src)).await
    }

    /// Point an existing stream at a new source
    pub async fn update_stream(&self, name: &str, src: &str) -> Result<(), Go2rtcError> {
        self.streams_request(Method::PATCH, name, Some(src)).await
    }

    pub async fn delete_stream(&self, name: &str) -> Result<(), Go2rtcError> {
        self.streams_request(Method::DELETE, name, None).await
    }

    /// Exchange a WHEP SDP offer for an answer
    pub async fn whep(
        &self,
        name: &str,
        offer: Bytes,
        timeout: Duration,
    ) -> Result<Bytes, Go2rtcError> {
        let request = self
            .client
            .post(self.url("/api/whep"))
            .query(&[("src", name)])
            .header(reqwest::header::CONTENT_TYPE, "application/sdp")
            .body(offer);
        let resp = self.send(request, Some(timeout)).await?;
        resp.bytes().await.map_err(|e| {
            if e.is_timeout() {
                Go2rtcError::Timeout {
                    url: self.base_url.clone(),
                    timeout,
                }
            } else {
                Go2rtcError::Decode(e)
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_parses_producers() {
        let registry: StreamRegistry = serde_json::from_value(serde_json::json!({
            "cam1": {"producers": [{"url": "rtsp://10.0.0.5/live"}], "consumers": null},
            "cam2": {"producers": null},
            "cam3": {},
        }))
        .unwrap();

        assert_eq!(registry["cam1"].source_url(), Some("rtsp://10.0.0.5/live"));
        assert_eq!(registry["cam2"].source_url(), None);
        assert_eq!(registry["cam3"].source_url(), None);
    }

    #[test]
    fn stream_mp4_url_encodes_name() {
        let client = Go2rtcClient::with_client(reqwest::Client::new(), "http://nvr:1984/");
        assert_eq!(client.base_url(), "http://nvr:1984");
        assert_eq!(
            client.stream_mp4_url("front door&x").unwrap().as_str(),
            "http://nvr:1984/api/stream.mp4?src=front+door%26x"
        );
    }

    #[test]
    fn timeouts_report_the_deadline_that_fired() {
        let client = Go2rtcClient::new("http://nvr:1984").unwrap();
        let whep = Some(Duration::from_secs(10));
        assert_eq!(client.timeout_limit(true, whep), Some(CONNECT_TIMEOUT));
        assert_eq!(client.timeout_limit(true, None), Some(CONNECT_TIMEOUT));
        assert_eq!(client.timeout_limit(false, whep), whep);
        assert_eq!(client.timeout_limit(false, None), None);

        let custom = Go2rtcClient::with_client(reqwest::Client::new(), "http://nvr:1984");
        assert_eq!(custom.timeout_limit(true, whep), None);
    }

    #[test]
    fn status_error_message_embeds_upstream() {
        let err = Go2rtcError::Status {
            status: StatusCode::BAD_REQUEST,
            body: "bad src".into(),
        };
        assert_eq!(err.to_string(), "go2rtc API error: 400 - bad src");
        assert!(!err.is_not_found());
        assert!(Go2rtcError::Status {
            status: StatusCode::NOT_FOUND,
            body: String::new()
        }
        .is_not_found());
    }
}
