// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Request-correlation context.
//!
//! Three ambient values (`request_id`, `method`, `path`) scoped to a
//! request via task-local storage. The HTTP middleware binds a context for
//! the duration of a request; anything running inside that scope — log
//! statements, outbound webhook deliveries — can read it with
//! [`current`]. Background work spawned outside the scope captures the
//! context explicitly and re-enters it with [`scope`].

use std::future::Future;

/// Inbound/outbound correlation header.
pub const REQUEST_ID_HEADER: &str = "X-Request-ID";

/// Ambient values for one request scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    pub request_id: String,
    pub method: String,
    pub path: String,
}

impl RequestContext {
    pub fn new(
        request_id: impl Into<String>,
        method: impl Into<String>,
        path: impl Into<String>,
    ) -> Self {
        Self {
            request_id: request_id.into(),
            method: method.into(),
            path: path.into(),
        }
    }

    /// Mint a fresh correlation id.
    pub fn generate_request_id() -> String {
        uuid::Uuid::new_v4().to_string()
    }
}

tokio::task_local! {
    static CURRENT: RequestContext;
}

/// Run `fut` with `ctx` bound as the ambient request context.
pub async fn scope<F>(ctx: RequestContext, fut: F) -> F::Output
where
    F: Future,
{
    CURRENT.scope(ctx, fut).await
}

/// The ambient context, if the caller is inside a request scope.
pub fn current() -> Option<RequestContext> {
    CURRENT.try_with(|ctx| ctx.clone()).ok()
}

/// Shorthand for the ambient correlation id.
pub fn current_request_id() -> Option<String> {
    CURRENT.try_with(|ctx| ctx.request_id.clone()).ok()
}

#[cfg(test)]
#[path = "context_tests.rs"]
mod tests;
