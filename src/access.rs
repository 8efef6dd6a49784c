//! Upload access gate.
//!
//! When `[access] password_sha256` is configured, uploads must carry a
//! password whose SHA-256 hex digest matches it.

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};

use crate::config::AccessConfig;

/// Password check applied to `POST /upload`.
#[derive(Debug, Clone, Default)]
pub struct AccessGate {
    digest: Option<[u8; 32]>,
}

impl AccessGate {
    /// A gate that lets every upload through.
    pub fn open() -> Self {
        Self::default()
    }

    pub fn from_config(config: &AccessConfig) -> Result<Self> {
        let digest = match config.password_sha256.as_deref() {
            Some(hex_digest) => {
                let bytes = hex::decode(hex_digest.trim())
                    .context("access.password_sha256 is not valid hex")?;
                let digest: [u8; 32] = bytes
                    .try_into()
                    .map_err(|_| anyhow::anyhow!("access.password_sha256 must be 32 bytes"))?;
                Some(digest)
            }
            None => None,
        };
        Ok(Self { digest })
    }

    pub fn is_gated(&self) -> bool {
        self.digest.is_some()
    }

    /// Whether `password` unlocks uploads. Always true for an open gate.
    pub fn allows(&self, password: Option<&str>) -> bool {
        let Some(expected) = self.digest else {
            return true;
        };
        let Some(password) = password else {
            return false;
        };
        let actual: [u8; 32] = Sha256::digest(password.as_bytes()).into();
        ct_eq(&actual, &expected)
    }
}

/// Hex SHA-256 of a password, the form stored in configuration.
pub fn password_digest(password: &str) -> String {
    hex::encode(Sha256::digest(password.as_bytes()))
}

fn ct_eq(a: &[u8; 32], b: &[u8; 32]) -> bool {
    a.iter().zip(b.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gate(password: &str) -> AccessGate {
        AccessGate::from_config(&AccessConfig {
            password_sha256: Some(password_digest(password)),
        })
        .unwrap()
    }

    #[test]
    fn open_gate_allows_everything() {
        let gate = AccessGate::from_config(&AccessConfig::default()).unwrap();
        assert!(!gate.is_gated());
        assert!(gate.allows(None));
        assert!(gate.allows(Some("anything")));
    }

    #[test]
    fn gated_upload_needs_matching_password() {
        let gate = gate("meeple");
        assert!(gate.is_gated());
        assert!(gate.allows(Some("meeple")));
        assert!(!gate.allows(Some("Meeple")));
        assert!(!gate.allows(Some("")));
        assert!(!gate.allows(None));
    }

    #[test]
    fn digest_is_lowercase_hex() {
        assert_eq!(
            password_digest("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn uppercase_configured_digest_is_accepted() {
        let gate = AccessGate::from_config(&AccessConfig {
            password_sha256: Some(password_digest("abc").to_uppercase()),
        })
        .unwrap();
        assert!(gate.allows(Some("abc")));
    }
}
