//! Content digests in registry form (`sha256:<64 lowercase hex>`).

use crate::error::{GatewayError, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest as _, Sha256};
use std::fmt;

const PREFIX: &str = "sha256:";
const HEX_LEN: usize = 64;

/// A validated SHA256 content digest.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Digest(String);

impl Digest {
    /// Compute the digest of `content`.
    pub fn of(content: impl AsRef<[u8]>) -> Self {
        let hash = Sha256::digest(content.as_ref());
        Digest(format!("{}{}", PREFIX, hex::encode(hash)))
    }

    /// Build a digest from a bare hex SHA256 declared by someone else.
    ///
    /// The value is lowercased but not verified against any content.
    pub fn from_hex(hex_sha256: &str) -> Result<Self> {
        let hex_sha256 = hex_sha256.trim().to_ascii_lowercase();
        if !is_sha256_hex(&hex_sha256) {
            return Err(GatewayError::InvalidDigest(hex_sha256));
        }
        Ok(Digest(format!("{}{}", PREFIX, hex_sha256)))
    }

    /// Parse a full `sha256:<hex>` string.
    pub fn parse(value: &str) -> Result<Self> {
        match value.strip_prefix(PREFIX) {
            Some(hex_part) if is_sha256_hex(hex_part) => Ok(Digest(value.to_string())),
            _ => Err(GatewayError::InvalidDigest(value.to_string())),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The hex part without the algorithm prefix.
    pub fn hex(&self) -> &str {
        &self.0[PREFIX.len()..]
    }
}

fn is_sha256_hex(value: &str) -> bool {
    value.len() == HEX_LEN
        && value
            .bytes()
            .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Digest {
    type Error = GatewayError;

    fn try_from(value: String) -> Result<Self> {
        Digest::parse(&value)
    }
}

impl From<Digest> for String {
    fn from(digest: Digest) -> Self {
        digest.0
    }
}

impl AsRef<str> for Digest {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
