//! Signed session cookies.
//!
//! # Signing Scheme
//!
//! The session identifier is bound to the server secret with HMAC-SHA256:
//!
//! ```text
//! value = "{session_id}.{hex(HMAC-SHA256(secret, session_id))}"
//! ```
//!
//! The same value is accepted from the `studyshala.sid` cookie and from an
//! `Authorization: Bearer` header. Values with a missing, malformed or wrong
//! signature are rejected before the session store is consulted.
//!
//! # Example
//!
//! ```rust
//! use studyshala::session::CookieSigner;
//!
//! let signer = CookieSigner::new("my-session-secret");
//! let value = signer.sign("3f2a9c");
//! assert_eq!(signer.verify(&value).unwrap(), "3f2a9c");
//! ```

use axum::http::{header, HeaderMap};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use thiserror::Error;

use super::{SESSION_COOKIE_NAME, SESSION_TTL_SECS};
use crate::config::Environment;

/// HMAC-SHA256 type alias
type HmacSha256 = Hmac<Sha256>;

/// Separator between the session id and its signature.
const SIGNATURE_SEPARATOR: char = '.';

/// Reasons a presented session value is refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CookieError {
    /// No `id.signature` structure
    #[error("malformed session value")]
    Malformed,

    /// Signature is not valid hex
    #[error("invalid signature format")]
    InvalidSignatureFormat,

    /// Signature does not match
    #[error("invalid signature")]
    InvalidSignature,
}

// =============================================================================
// Signer
// =============================================================================

/// Signs and verifies session identifiers.
#[derive(Clone)]
pub struct CookieSigner {
    /// Secret key for HMAC computation
    secret_key: Vec<u8>,
}

impl CookieSigner {
    /// Create a signer with the given secret key.
    pub fn new(secret_key: impl AsRef<[u8]>) -> Self {
        Self {
            secret_key: secret_key.as_ref().to_vec(),
        }
    }

    /// Produce the signed value for a session id.
    pub fn sign(&self, session_id: &str) -> String {
        format!(
            "{}{}{}",
            session_id,
            SIGNATURE_SEPARATOR,
            hex::encode(self.compute_signature(session_id))
        )
    }

    /// Verify a signed value and return the session id it carries.
    pub fn verify(&self, value: &str) -> Result<String, CookieError> {
        let (session_id, signature) = value
            .rsplit_once(SIGNATURE_SEPARATOR)
            .ok_or(CookieError::Malformed)?;
        if session_id.is_empty() || signature.is_empty() {
            return Err(CookieError::Malformed);
        }

        let provided = hex::decode(signature).map_err(|_| CookieError::InvalidSignatureFormat)?;
        let expected = self.compute_signature(session_id);

        // Constant-time comparison
        if provided.ct_eq(&expected).into() {
            Ok(session_id.to_string())
        } else {
            Err(CookieError::InvalidSignature)
        }
    }

    fn compute_signature(&self, session_id: &str) -> Vec<u8> {
        let mut mac =
            HmacSha256::new_from_slice(&self.secret_key).expect("HMAC can take key of any size");
        mac.update(session_id.as_bytes());
        mac.finalize().into_bytes().to_vec()
    }
}

impl std::fmt::Debug for CookieSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CookieSigner")
            .field("secret_key", &"<redacted>")
            .finish()
    }
}

// =============================================================================
// Cookie Attributes
// =============================================================================

/// `SameSite` cookie policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SameSite {
    Lax,
    /// Sent in all contexts; browsers require `Secure` alongside it
    None,
}

impl SameSite {
    fn as_str(&self) -> &'static str {
        match self {
            SameSite::Lax => "Lax",
            SameSite::None => "None",
        }
    }
}

/// Attributes of the session cookie.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookiePolicy {
    pub name: String,
    pub max_age_secs: i64,
    pub http_only: bool,
    pub secure: bool,
    pub same_site: SameSite,
    pub path: String,
}

impl CookiePolicy {
    /// Policy for a deployment environment.
    ///
    /// Production serves a frontend on another site over HTTPS, so the cookie
    /// is `Secure; SameSite=None`. Everywhere else it is `SameSite=Lax` without
    /// `Secure` so plain-HTTP localhost works.
    pub fn for_environment(environment: Environment) -> Self {
        let production = environment.is_production();
        Self {
            name: SESSION_COOKIE_NAME.to_string(),
            max_age_secs: SESSION_TTL_SECS,
            http_only: true,
            secure: production,
            same_site: if production {
                SameSite::None
            } else {
                SameSite::Lax
            },
            path: "/".to_string(),
        }
    }

    /// `Set-Cookie` value issuing `value`.
    pub fn set_cookie(&self, value: &str) -> String {
        self.build(value, self.max_age_secs)
    }

    /// `Set-Cookie` value that removes the cookie.
    pub fn clear_cookie(&self) -> String {
        self.build("", 0)
    }

    fn build(&self, value: &str, max_age_secs: i64) -> String {
        let mut cookie = format!(
            "{}={}; Max-Age={}; Path={}",
            self.name, value, max_age_secs, self.path
        );
        if self.http_only {
            cookie.push_str("; HttpOnly");
        }
        if self.secure {
            cookie.push_str("; Secure");
        }
        cookie.push_str("; SameSite=");
        cookie.push_str(self.same_site.as_str());
        cookie
    }
}

/// Extract a cookie value from request headers.
///
/// All `Cookie` headers are searched; the first match wins.
pub fn read_cookie(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .find_map(|pair| {
            let (name, value) = pair.trim().split_once('=')?;
            if name.trim() == cookie_name {
                Some(value.trim().to_string())
            } else {
                None
            }
        })
}

// =============================================================================
// Tests
// =============================================================================
