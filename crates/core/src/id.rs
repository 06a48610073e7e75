// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Identifier newtypes and minting.
//!
//! Every handle in the fabric — subscriptions, tasks, webhooks,
//! deliveries, alerts, reports — is an opaque string id wrapped in its
//! own type so one kind can never stand in for another. [`string_id!`]
//! stamps out the wrappers; [`IdMint`] is the seam through which fresh
//! ids enter, so tests can swap the random minter for a deterministic
//! sequence.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Define a typed wrapper around an identifier string.
///
/// The wrapped string is private: construction goes through `new`, reads
/// through `as_str`/`Display`, and `short(n)` gives the truncated form
/// used in log fields.
#[macro_export]
macro_rules! string_id {
    (
        $(#[$meta:meta])*
        pub struct $name:ident;
    ) => {
        $(#[$meta])*
        #[derive(Clone, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// At most the first `n` characters, for compact log fields.
            pub fn short(&self, n: usize) -> &str {
                match self.0.char_indices().nth(n) {
                    Some((cut, _)) => &self.0[..cut],
                    None => &self.0,
                }
            }

            pub fn into_string(self) -> String {
                self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_string())
            }
        }

        impl PartialEq<str> for $name {
            fn eq(&self, other: &str) -> bool {
                self.0 == other
            }
        }

        impl PartialEq<&str> for $name {
            fn eq(&self, other: &&str) -> bool {
                self.0 == *other
            }
        }
    };
}

/// Source of fresh identifier strings.
pub trait IdMint: Clone + Send + Sync {
    fn mint(&self) -> String;
}

/// Random v4 UUIDs; the production minter.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomIds;

impl IdMint for RandomIds {
    fn mint(&self) -> String {
        uuid::Uuid::new_v4().to_string()
    }
}

/// Deterministic `label-N` ids for tests; clones share the counter.
#[derive(Debug, Clone)]
pub struct LabeledSequence {
    label: String,
    counter: Arc<AtomicU64>,
}

impl LabeledSequence {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            counter: Arc::new(AtomicU64::new(0)),
        }
    }
}

impl IdMint for LabeledSequence {
    fn mint(&self) -> String {
        let n = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        format!("{}-{}", self.label, n)
    }
}

#[cfg(test)]
#[path = "id_tests.rs"]
mod tests;
