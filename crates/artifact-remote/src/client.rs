//! Bearer-token HTTP implementation of the remote traits

use std::future::Future;

use artifact_fs::Fingerprint;
use async_trait::async_trait;
use reqwest::{Client, StatusCode, header::AUTHORIZATION};

use crate::{
    ArtifactFetcher, Error, FingerprintPayload, FingerprintResolver, RemoteEndpoints,
    RemoteOptions, Result,
};

/// HTTP client for the "latest" and "download" endpoints.
#[derive(Debug, Clone)]
pub struct HttpRemote {
    client: Client,
    options: RemoteOptions,
}

impl HttpRemote {
    pub fn new(options: RemoteOptions) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = options.timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(Error::Client)?;
        Ok(Self { client, options })
    }

    pub fn options(&self) -> &RemoteOptions {
        &self.options
    }

    /// GET `url` with the bearer token and return the body of a 2xx response.
    async fn get(&self, url: &str, endpoints: &RemoteEndpoints) -> Result<Vec<u8>> {
        tracing::debug!(url, "GET");
        let response = self
            .client
            .get(url)
            .header(AUTHORIZATION, endpoints.authorization())
            .send()
            .await
            .map_err(|e| Error::transport(url, e))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(Error::Auth {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        if !status.is_success() {
            return Err(Error::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| Error::transport(url, e))?;
        Ok(body.to_vec())
    }

    /// Run `operation`, repeating transient failures per the retry policy.
    async fn with_retry<T, F, Fut>(&self, url: &str, mut operation: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let max_attempts = self.options.retry.max_attempts.max(1);
        let mut attempt = 0u32;

        backoff::future::retry_notify(
            self.options.retry.backoff(),
            || {
                attempt += 1;
                let last = attempt >= max_attempts;
                let fut = operation();
                async move {
                    fut.await.map_err(|err| {
                        if err.is_transient() && !last {
                            backoff::Error::transient(err)
                        } else {
                            backoff::Error::permanent(err)
                        }
                    })
                }
            },
            |err: Error, wait| {
                tracing::warn!(url, retry_in = ?wait, "Transient network failure: {err}");
            },
        )
        .await
    }
}

#[async_trait]
impl FingerprintResolver for HttpRemote {
    async fn fetch_latest_fingerprint(&self, endpoints: &RemoteEndpoints) -> Result<Fingerprint> {
        let url = endpoints.latest();
        let body = self.with_retry(url, || self.get(url, endpoints)).await?;

        let payload = FingerprintPayload::parse(&body).map_err(|e| Error::Decode {
            url: url.to_string(),
            message: e.to_string(),
        })?;
        tracing::debug!(url, fingerprint = %payload.md5, status = %payload.status, "Remote fingerprint");
        Ok(Fingerprint::new(payload.md5))
    }
}

#[async_trait]
impl ArtifactFetcher for HttpRemote {
    async fn download(&self, endpoints: &RemoteEndpoints) -> Result<Vec<u8>> {
        let url = endpoints.download();
        let body = self.with_retry(url, || self.get(url, endpoints)).await?;

        if body.is_empty() {
            return Err(Error::EmptyPayload {
                url: url.to_string(),
            });
        }
        tracing::info!(url, bytes = body.len(), "Downloaded artifact");
        Ok(body)
    }
}
