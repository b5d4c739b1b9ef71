use std::fmt;

use rand::{rngs::OsRng, RngCore};

const CREDENTIAL_BYTES: usize = 32;

#[derive(Debug, thiserror::Error)]
#[error("OS randomness source unavailable: {0}")]
pub struct CredentialError(#[from] rand::Error);

/// Per-run shared secret between the shell, the backend and the dashboard.
///
/// Lives for the whole process and is never written anywhere except the
/// backend environment. Formatting it yields a redacted placeholder.
#[derive(Clone, PartialEq, Eq)]
pub struct RunCredential(String);

impl RunCredential {
    pub fn generate() -> Result<Self, CredentialError> {
        let mut bytes = [0_u8; CREDENTIAL_BYTES];
        OsRng.try_fill_bytes(&mut bytes)?;
        Ok(Self(hex::encode(bytes)))
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for RunCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("RunCredential(<redacted>)")
    }
}

impl fmt::Display for RunCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("<redacted>")
    }
}
