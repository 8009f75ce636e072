//! Query fingerprints.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Content hash of a user-supplied filter expression.
///
/// Watermarks are stored per fingerprint so that runs with different filters
/// never advance each other's cursor. The value is the lowercase hex SHA-256
/// of the filter's UTF-8 bytes and never changes for a given filter.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Derive the fingerprint of a filter expression.
    pub fn of(filter: &str) -> Self {
        let digest = Sha256::digest(filter.as_bytes());
        Self(hex::encode(digest))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Fingerprint {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
