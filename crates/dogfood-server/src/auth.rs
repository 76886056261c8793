//! Static bearer-token authentication.
//!
//! Session management is an external collaborator in a full deployment; the
//! server only needs to resolve "which user is making this request". A
//! self-hosted instance configures a fixed token-to-user map via
//! `AUTH_TOKENS`.

use axum::http::HeaderMap;
use subtle::ConstantTimeEq;

use dogfood_shared::UserId;

use crate::error::ServerError;

/// Fixed mapping from bearer tokens to user ids.
pub struct TokenMap {
    entries: Vec<(String, UserId)>,
}

impl TokenMap {
    pub fn new(entries: Vec<(String, UserId)>) -> Self {
        Self { entries }
    }

    /// Resolve the request's bearer token to a user id.
    ///
    /// A missing header and an unknown token are both 401; 403 is reserved
    /// for authenticated users acting outside their link.
    pub fn resolve(&self, headers: &HeaderMap) -> Result<UserId, ServerError> {
        let auth = headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| ServerError::Unauthorized("missing bearer token".into()))?;

        let token = auth.strip_prefix("Bearer ").unwrap_or(auth);

        // Constant-time comparison to prevent timing attacks on tokens.
        for (expected, user) in &self.entries {
            let token_bytes = token.as_bytes();
            let expected_bytes = expected.as_bytes();
            if token_bytes.len() == expected_bytes.len()
                && token_bytes.ct_eq(expected_bytes).unwrap_u8() == 1
            {
                return Ok(*user);
            }
        }

        Err(ServerError::Unauthorized("unknown token".into()))
    }
}
