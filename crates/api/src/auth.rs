// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Authentication contract and its HTTP boundary.
//!
//! The fabric does not own identity: callers present an API key or a
//! signed bearer token, [`ApiKeyAuth::check`] resolves it to an explicit
//! [`AuthOutcome`], and the [`require_auth`] middleware turns
//! denied/unauthenticated into status codes before any handler runs.
//! Handlers that care who the caller is take [`Identity`] as an
//! extractor. No exceptions-as-control-flow, no ambient user state.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{FromRequestParts, Request, State};
use axum::http::request::Parts;
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use hmac::{Hmac, Mac};
use sf_core::Clock;
use sha2::Sha256;

use crate::error::ApiError;
use crate::state::AppState;

/// Header carrying the API key.
pub const API_KEY_HEADER: &str = "X-API-Key";

/// Header carrying a bearer token.
pub const AUTHORIZATION_HEADER: &str = "Authorization";

/// Version tag framing signed tokens.
const TOKEN_PREFIX: &str = "sf1";

/// Resolved caller identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub subject: String,
    pub role: String,
}

/// Explicit result of an authentication attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthOutcome {
    Authenticated(Identity),
    Denied(String),
    Unauthenticated,
}

/// What a signed token is good for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Access,
    Refresh,
}

impl TokenKind {
    fn as_str(&self) -> &'static str {
        match self {
            TokenKind::Access => "access",
            TokenKind::Refresh => "refresh",
        }
    }
}

impl std::fmt::Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

type HmacSha256 = Hmac<Sha256>;

/// Issues and verifies compact HMAC-SHA256 bearer tokens.
///
/// Token frame: `sf1.<kind>.<subject>.<role>.<exp>.<hex sig>` where the
/// signature covers everything before it. Access and refresh lifetimes
/// come from the configured TTLs.
#[derive(Clone)]
pub struct TokenSigner {
    secret: String,
    access_ttl: Duration,
    refresh_ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl TokenSigner {
    pub fn new(
        secret: impl Into<String>,
        access_ttl: Duration,
        refresh_ttl: Duration,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            secret: secret.into(),
            access_ttl,
            refresh_ttl,
            clock,
        }
    }

    fn sign(&self, message: &str) -> Option<String> {
        let mut mac = HmacSha256::new_from_slice(self.secret.as_bytes()).ok()?;
        mac.update(message.as_bytes());
        Some(hex::encode(mac.finalize().into_bytes()))
    }

    /// Mint a token. `None` if subject or role would corrupt the frame.
    pub fn issue(&self, kind: TokenKind, subject: &str, role: &str) -> Option<String> {
        if subject.contains('.') || role.contains('.') || subject.is_empty() {
            return None;
        }
        let ttl = match kind {
            TokenKind::Access => self.access_ttl,
            TokenKind::Refresh => self.refresh_ttl,
        };
        let expires = (self.clock.epoch_secs() + ttl.as_secs_f64()) as u64;
        let message = format!("{TOKEN_PREFIX}.{kind}.{subject}.{role}.{expires}");
        let signature = self.sign(&message)?;
        Some(format!("{message}.{signature}"))
    }

    /// Verify a token of the expected kind, returning its claims.
    pub fn verify(&self, token: &str, expected: TokenKind) -> Result<Identity, String> {
        let (message, signature) = token
            .rsplit_once('.')
            .ok_or_else(|| "malformed token".to_string())?;
        let computed = self
            .sign(message)
            .ok_or_else(|| "token verification unavailable".to_string())?;
        if signature != computed {
            return Err("invalid token signature".to_string());
        }

        let parts: Vec<&str> = message.split('.').collect();
        let &[prefix, kind, subject, role, expires] = parts.as_slice() else {
            return Err("malformed token".to_string());
        };
        if prefix != TOKEN_PREFIX {
            return Err("unknown token format".to_string());
        }
        if kind != expected.as_str() {
            return Err(format!("not an {expected} token"));
        }
        let expires: u64 = expires.parse().map_err(|_| "malformed token".to_string())?;
        if self.clock.epoch_secs() as u64 >= expires {
            return Err("token expired".to_string());
        }

        Ok(Identity {
            subject: subject.to_string(),
            role: role.to_string(),
        })
    }
}

/// Request authenticator: static API-key table plus optional signed
/// bearer tokens.
#[derive(Clone, Default)]
pub struct ApiKeyAuth {
    /// Key value → role name.
    keys: HashMap<String, String>,
    tokens: Option<TokenSigner>,
    /// When false, missing credentials resolve to the default role
    /// instead of `Unauthenticated`.
    enforce: bool,
    default_role: String,
}

impl ApiKeyAuth {
    pub fn new(enforce: bool, default_role: impl Into<String>) -> Self {
        Self {
            keys: HashMap::new(),
            tokens: None,
            enforce,
            default_role: default_role.into(),
        }
    }

    pub fn with_key(mut self, key: impl Into<String>, role: impl Into<String>) -> Self {
        self.keys.insert(key.into(), role.into());
        self
    }

    /// Accept bearer tokens signed by `signer`.
    pub fn with_token_signer(mut self, signer: TokenSigner) -> Self {
        self.tokens = Some(signer);
        self
    }

    /// Resolve the request's credentials to an outcome.
    ///
    /// Order: bearer token (when a signer is configured), then API key,
    /// then the anonymous/enforcement fallback.
    pub fn check(&self, headers: &HeaderMap) -> AuthOutcome {
        if let Some(signer) = &self.tokens {
            let bearer = headers
                .get(AUTHORIZATION_HEADER)
                .and_then(|value| value.to_str().ok())
                .and_then(|value| value.strip_prefix("Bearer "));
            if let Some(token) = bearer {
                return match signer.verify(token, TokenKind::Access) {
                    Ok(identity) => AuthOutcome::Authenticated(identity),
                    Err(reason) => AuthOutcome::Denied(reason),
                };
            }
        }

        let presented = headers
            .get(API_KEY_HEADER)
            .and_then(|value| value.to_str().ok());

        match presented {
            Some(key) => match self.keys.get(key) {
                Some(role) => {
                    let cut = key
                        .char_indices()
                        .nth(8)
                        .map(|(i, _)| i)
                        .unwrap_or(key.len());
                    AuthOutcome::Authenticated(Identity {
                        subject: format!("key:{}", &key[..cut]),
                        role: role.clone(),
                    })
                }
                None => AuthOutcome::Denied("unknown API key".to_string()),
            },
            None if self.enforce => AuthOutcome::Unauthenticated,
            None => AuthOutcome::Authenticated(Identity {
                subject: "anonymous".to_string(),
                role: self.default_role.clone(),
            }),
        }
    }
}

/// Router middleware: resolve credentials before any handler runs.
///
/// Authenticated requests carry their [`Identity`] as an extension;
/// denied and unauthenticated outcomes become 403/401 responses.
pub(crate) async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    match state.auth.check(request.headers()) {
        AuthOutcome::Authenticated(identity) => {
            request.extensions_mut().insert(identity);
            next.run(request).await
        }
        AuthOutcome::Denied(reason) => ApiError::Denied(reason).into_response(),
        AuthOutcome::Unauthenticated => ApiError::Unauthenticated.into_response(),
    }
}

/// Thin extractor: handlers take `Identity` to learn who the caller is.
#[axum::async_trait]
impl<S> FromRequestParts<S> for Identity
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Identity>()
            .cloned()
            .ok_or(ApiError::Unauthenticated)
    }
}

#[cfg(test)]
#[path = "auth_tests.rs"]
mod tests;
