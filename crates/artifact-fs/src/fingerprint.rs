//! Content fingerprints
//!
//! A fingerprint is the lowercase hex digest of an artifact's bytes. The
//! remote endpoint reports the same digest for the same bytes, so string
//! equality of the two is the staleness signal.

use std::fmt;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use md5::Md5;
use serde::{Deserialize, Serialize};
use sha2::digest::Output;
use sha2::{Digest, Sha256};

use crate::{Error, Result};

const BUFFER_SIZE: usize = 8192;

/// Opaque digest string identifying an artifact's content version.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Fingerprint {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for Fingerprint {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Digest used for local fingerprints.
///
/// Must match whatever the remote endpoint computes; the default mirrors the
/// `md5` field of the "latest" payload.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FingerprintAlgorithm {
    #[default]
    Md5,
    Sha256,
}

impl FingerprintAlgorithm {
    /// Fingerprint an in-memory payload.
    pub fn digest_bytes(&self, bytes: &[u8]) -> Fingerprint {
        let hex = match self {
            Self::Md5 => format!("{:x}", Md5::digest(bytes)),
            Self::Sha256 => format!("{:x}", Sha256::digest(bytes)),
        };
        Fingerprint(hex)
    }

    /// Fingerprint a file without loading it into memory.
    pub fn digest_file(&self, path: &Path) -> Result<Fingerprint> {
        let file = File::open(path).map_err(|e| Error::read(path, e))?;
        let reader = BufReader::new(file);
        let hex = match self {
            Self::Md5 => digest_reader::<Md5, _>(reader),
            Self::Sha256 => digest_reader::<Sha256, _>(reader),
        }
        .map_err(|e| Error::io(path, e))?;
        Ok(Fingerprint(hex))
    }
}

fn digest_reader<D, R>(mut reader: R) -> std::io::Result<String>
where
    D: Digest,
    Output<D>: fmt::LowerHex,
    R: Read,
{
    let mut hasher = D::new();
    let mut buffer = [0u8; BUFFER_SIZE];
    loop {
        let read = reader.read(&mut buffer)?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }
    Ok(format!("{:x}", hasher.finalize()))
}
