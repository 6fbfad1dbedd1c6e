//! HTTP transport backed by ureq
//!
//! ureq is blocking, so every fetch runs on tokio's blocking pool.

use super::{FetchOptions, Request, Transport};
use crate::config::schema::NetworkConfig;
use crate::error::FetchError;
use crate::store::Response;
use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

/// Fetches resources over HTTP(S)
#[derive(Clone)]
pub struct HttpTransport {
    agent: ureq::Agent,
    max_body_bytes: u64,
}

impl HttpTransport {
    /// Create a transport from network settings
    pub fn new(config: &NetworkConfig) -> Self {
        let agent_config = ureq::Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(config.timeout_secs)))
            .http_status_as_error(false)
            .build();

        Self {
            agent: ureq::Agent::new_with_config(agent_config),
            max_body_bytes: config.max_body_bytes,
        }
    }

    fn fetch_blocking(
        agent: &ureq::Agent,
        request: &Request,
        options: FetchOptions,
        limit: u64,
    ) -> Result<Response, FetchError> {
        let url = request.url.as_str();
        let builder = match request.method.as_str() {
            "GET" => agent.get(url),
            "HEAD" => agent.head(url),
            other => {
                return Err(FetchError::network(
                    url,
                    format!("unsupported method {}", other),
                ))
            }
        };

        let builder = if options.reload {
            builder
                .header("Cache-Control", "no-cache")
                .header("Pragma", "no-cache")
        } else {
            builder
        };

        let mut response = builder
            .call()
            .map_err(|e| FetchError::network(url, e.to_string()))?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();

        let body = response
            .body_mut()
            .with_config()
            .limit(limit)
            .read_to_vec()
            .map_err(|e| match e {
                ureq::Error::BodyExceedsLimit(_) => FetchError::BodyTooLarge {
                    url: url.to_string(),
                    limit,
                },
                other => FetchError::network(url, other.to_string()),
            })?;

        Ok(Response {
            status,
            headers,
            body,
        })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn fetch(&self, request: &Request, options: FetchOptions) -> Result<Response, FetchError> {
        let agent = self.agent.clone();
        let request = request.clone();
        let limit = self.max_body_bytes;
        let url = request.url.clone();

        debug!("Fetching {} {} (reload: {})", request.method, url, options.reload);
        tokio::task::spawn_blocking(move || Self::fetch_blocking(&agent, &request, options, limit))
            .await
            .map_err(|e| FetchError::network(url, format!("fetch task failed: {}", e)))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unsupported_method_is_rejected() {
        let transport = HttpTransport::new(&NetworkConfig::default());
        let request = Request::new("POST", "http://127.0.0.1:9/submit");

        let err = transport
            .fetch(&request, FetchOptions::default())
            .await
            .unwrap_err();

        assert!(err.to_string().contains("unsupported method POST"));
    }

    #[tokio::test]
    async fn connection_refused_is_network_error() {
        let transport = HttpTransport::new(&NetworkConfig {
            timeout_secs: 2,
            ..NetworkConfig::default()
        });
        // Port 9 (discard) is closed on test machines
        let request = Request::get("http://127.0.0.1:9/main.js");

        let err = transport
            .fetch(&request, FetchOptions::reload())
            .await
            .unwrap_err();

        assert!(matches!(err, FetchError::Network { .. }));
        assert_eq!(err.url(), "http://127.0.0.1:9/main.js");
    }
}
