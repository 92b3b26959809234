//! Body of the "latest" endpoint

use serde::Deserialize;

/// `{"md5": "<fingerprint>", "status": "<string>"}`
///
/// Both fields are required. `status` is not used for decisions but a
/// payload without it is rejected as malformed.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FingerprintPayload {
    pub md5: String,
    pub status: String,
}

impl FingerprintPayload {
    pub fn parse(body: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(body)
    }
}
