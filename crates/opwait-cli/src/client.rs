// HTTP status probe
//
// Performs `GET <url>` and hands the JSON body to the waiter. Transport
// failures and non-2xx responses end the wait as call failures.

use std::time::Duration;

use async_trait::async_trait;
use opwait_core::{ProbeError, StatusProbe};
use reqwest::StatusCode;
use serde_json::{json, Value};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Not found")]
    NotFound,
}

impl From<ClientError> for ProbeError {
    fn from(err: ClientError) -> Self {
        match &err {
            ClientError::Http(source) => {
                let error_type = if source.is_timeout() {
                    "timeout"
                } else if source.is_decode() {
                    "decode"
                } else {
                    "transport"
                };
                ProbeError::new(err.to_string()).with_type(error_type)
            }
            ClientError::Api { status, message } => ProbeError::new(err.to_string())
                .with_type(status.to_string())
                .with_details(json!({ "body": message })),
            ClientError::NotFound => ProbeError::new(err.to_string())
                .with_type(StatusCode::NOT_FOUND.as_u16().to_string()),
        }
    }
}

/// Status probe backed by an HTTP endpoint returning JSON
#[derive(Debug, Clone)]
pub struct HttpStatusProbe {
    url: String,
    http: reqwest::Client,
}

impl HttpStatusProbe {
    pub fn new(url: &str, request_timeout: Duration) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()?;
        Ok(Self::with_client(http, url))
    }

    /// Share one connection pool across many probes
    pub fn with_client(http: reqwest::Client, url: &str) -> Self {
        Self {
            url: url.to_string(),
            http,
        }
    }

    async fn get(&self) -> Result<Value, ClientError> {
        let response = self.http.get(&self.url).send().await?;
        let status = response.status();

        if status == StatusCode::NOT_FOUND {
            return Err(ClientError::NotFound);
        }

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ClientError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body = response.json().await?;
        Ok(body)
    }
}

#[async_trait]
impl StatusProbe for HttpStatusProbe {
    async fn probe(&self) -> Result<Value, ProbeError> {
        tracing::trace!(url = %self.url, "Probing status endpoint");
        self.get().await.map_err(ProbeError::from)
    }
}
