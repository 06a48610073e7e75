// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! sf-api: HTTP adapter shells over the event fabric.
//!
//! Thin translators only: each handler maps a request to one core
//! operation and serializes the result. The request-tracing middleware
//! binds the correlation context for the scope of every request.

pub mod auth;
mod error;
mod routes;
mod state;
mod tracing_mw;

pub use auth::{ApiKeyAuth, AuthOutcome, Identity, TokenKind, TokenSigner};
pub use error::ApiError;
pub use routes::router;
pub use state::AppState;
pub use tracing_mw::TracingConfig;
