//! Display claims from a sign-in provider's JWT-shaped credential.
//!
//! The signature is NOT checked here. Decoded claims are hints for the UI;
//! anything privileged waits for the server-side verification round trip.

use std::fmt;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::Deserialize;
use thiserror::Error;

/// Opaque credential string. `Debug` never prints the token.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Credential(<redacted, {} bytes>)", self.0.len())
    }
}

/// Display claims; an absent or `null` claim reads as empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdentityClaims {
    pub name: String,
    pub email: String,
    pub picture: String,
}

#[derive(Deserialize)]
struct RawClaims {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    picture: Option<String>,
}

impl From<RawClaims> for IdentityClaims {
    fn from(raw: RawClaims) -> Self {
        Self {
            name: raw.name.unwrap_or_default(),
            email: raw.email.unwrap_or_default(),
            picture: raw.picture.unwrap_or_default(),
        }
    }
}

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("expected 3 dot-separated segments, found {0}")]
    Malformed(usize),
    #[error("payload is not base64url: {0}")]
    Encoding(#[from] base64::DecodeError),
    #[error("payload is not a claims object: {0}")]
    Claims(#[from] serde_json::Error),
}

/// Decodes the payload segment of `header.payload.signature`.
pub fn decode_credential(credential: &Credential) -> Result<IdentityClaims, CredentialError> {
    let segments: Vec<&str> = credential.expose().trim().split('.').collect();
    if segments.len() != 3 || segments[1].is_empty() {
        return Err(CredentialError::Malformed(segments.len()));
    }

    // Providers differ on whether they pad; accept both.
    let payload = URL_SAFE_NO_PAD.decode(segments[1].trim_end_matches('='))?;
    let claims: RawClaims = serde_json::from_slice(&payload)?;
    Ok(claims.into())
}
