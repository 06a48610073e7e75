// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[tokio::test]
async fn current_is_none_outside_scope() {
    assert_eq!(current(), None);
    assert_eq!(current_request_id(), None);
}

#[tokio::test]
async fn scope_binds_and_unbinds() {
    let ctx = RequestContext::new("req-1", "GET", "/api/tasks");
    let seen = scope(ctx.clone(), async { current() }).await;
    assert_eq!(seen, Some(ctx));
    assert_eq!(current(), None);
}

#[tokio::test]
async fn nested_scopes_shadow() {
    let outer = RequestContext::new("outer", "GET", "/a");
    let inner = RequestContext::new("inner", "POST", "/b");
    scope(outer.clone(), async {
        assert_eq!(current_request_id().as_deref(), Some("outer"));
        scope(inner, async {
            assert_eq!(current_request_id().as_deref(), Some("inner"));
        })
        .await;
        assert_eq!(current_request_id().as_deref(), Some("outer"));
    })
    .await;
}

#[tokio::test]
async fn spawned_tasks_do_not_inherit_implicitly() {
    let ctx = RequestContext::new("req-9", "GET", "/");
    let handle = scope(ctx, async {
        // A detached spawn leaves the scope; propagation is explicit.
        tokio::spawn(async { current() })
    })
    .await;
    assert_eq!(handle.await.unwrap(), None);
}

#[test]
fn generated_ids_are_unique() {
    assert_ne!(
        RequestContext::generate_request_id(),
        RequestContext::generate_request_id()
    );
}
