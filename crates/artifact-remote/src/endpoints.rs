//! Remote endpoint configuration

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// The two bearer-authenticated endpoints serving one artifact.
///
/// Deserialized values are validated like [`RemoteEndpoints::new`].
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "EndpointFields")]
pub struct RemoteEndpoints {
    latest: String,
    download: String,
    token: String,
}

impl RemoteEndpoints {
    /// Create endpoints from explicit URLs.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidUrl`] if either URL does not parse as an
    /// absolute http(s) URL.
    pub fn new(
        latest: impl Into<String>,
        download: impl Into<String>,
        token: impl Into<String>,
    ) -> Result<Self> {
        let latest = latest.into();
        let download = download.into();
        validate_url(&latest)?;
        validate_url(&download)?;
        Ok(Self {
            latest,
            download,
            token: token.into(),
        })
    }

    /// Derive both endpoints from a single base: `<base>/latest` and
    /// `<base>/download`.
    pub fn from_base(base: &str, token: impl Into<String>) -> Result<Self> {
        let base = base.trim_end_matches('/');
        Self::new(format!("{base}/latest"), format!("{base}/download"), token)
    }

    pub fn latest(&self) -> &str {
        &self.latest
    }

    pub fn download(&self) -> &str {
        &self.download
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    /// Value of the `Authorization` header sent with every request.
    pub fn authorization(&self) -> String {
        format!("Bearer {}", self.token)
    }
}

impl fmt::Debug for RemoteEndpoints {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteEndpoints")
            .field("latest", &self.latest)
            .field("download", &self.download)
            .field("token", &"<redacted>")
            .finish()
    }
}

#[derive(Deserialize)]
struct EndpointFields {
    latest: String,
    download: String,
    token: String,
}

impl TryFrom<EndpointFields> for RemoteEndpoints {
    type Error = Error;

    fn try_from(fields: EndpointFields) -> Result<Self> {
        RemoteEndpoints::new(fields.latest, fields.download, fields.token)
    }
}

fn validate_url(url: &str) -> Result<()> {
    let parsed = reqwest::Url::parse(url).map_err(|e| Error::InvalidUrl {
        url: url.to_string(),
        message: e.to_string(),
    })?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => Err(Error::InvalidUrl {
            url: url.to_string(),
            message: format!("unsupported scheme {other:?}"),
        }),
    }
}
