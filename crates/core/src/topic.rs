// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Topic grammar and pattern matching.
//!
//! Topics are dotted strings of the form `{prefix}.{scan_id}.{event_type}`.
//! Subscription patterns may use `*` to match exactly one segment and a
//! trailing `>` to match the remaining tail. Matching is case-sensitive.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Single-segment wildcard.
pub const SINGLE_WILDCARD: &str = "*";

/// Multi-segment tail wildcard (must be the last pattern segment).
pub const TAIL_WILDCARD: &str = ">";

/// Errors from parsing a subscription pattern.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TopicError {
    #[error("empty topic pattern")]
    Empty,
    #[error("'>' must be the last segment of the pattern: {0}")]
    TailNotLast(String),
}

/// Build a fully-qualified topic name.
pub fn make_topic(prefix: &str, scan_id: &str, event_type: &str) -> String {
    format!("{prefix}.{scan_id}.{event_type}")
}

/// A validated subscription pattern.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TopicPattern(String);

impl TopicPattern {
    /// Parse and validate a pattern string.
    pub fn parse(pattern: impl Into<String>) -> Result<Self, TopicError> {
        let pattern = pattern.into();
        if pattern.is_empty() {
            return Err(TopicError::Empty);
        }
        let segments: Vec<&str> = pattern.split('.').collect();
        if let Some(pos) = segments.iter().position(|s| *s == TAIL_WILDCARD) {
            if pos != segments.len() - 1 {
                return Err(TopicError::TailNotLast(pattern));
            }
        }
        Ok(Self(pattern))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Check whether a published topic matches this pattern.
    ///
    /// Segment-by-segment comparison: `*` consumes exactly one topic
    /// segment, `>` absorbs everything after it, and without a tail
    /// wildcard the segment counts must line up.
    pub fn matches(&self, topic: &str) -> bool {
        if self.0 == topic {
            return true;
        }

        let pattern_parts: Vec<&str> = self.0.split('.').collect();
        let topic_parts: Vec<&str> = topic.split('.').collect();

        for (i, part) in pattern_parts.iter().enumerate() {
            if *part == TAIL_WILDCARD {
                return true;
            }
            if *part == SINGLE_WILDCARD {
                if i >= topic_parts.len() {
                    return false;
                }
                continue;
            }
            if i >= topic_parts.len() || *part != topic_parts[i] {
                return false;
            }
        }

        pattern_parts.len() == topic_parts.len()
    }
}

impl std::fmt::Display for TopicPattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
#[path = "topic_tests.rs"]
mod tests;
