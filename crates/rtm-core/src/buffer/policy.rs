// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Edge-condition policies of a [`Buffer`](super::Buffer).
//!
//! Parsed from the `buffer.*` property node:
//!
//! | Key | Values |
//! |---|---|
//! | `length` | slot count |
//! | `write.full_policy` | `overwrite`, `do_nothing`, `block`, `timeout` |
//! | `write.timeout` | seconds |
//! | `read.empty_policy` | `do_nothing`, `readback`, `block`, `timeout` |
//! | `read.timeout` | seconds |

use crate::properties::{normalize, Properties};
use std::time::Duration;

/// Deadline applied by the `timeout` policies when none is configured.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(1);

/// Behaviour of `write` on a full buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FullPolicy {
    /// Discard the oldest unread sample.
    #[default]
    Overwrite,
    /// Fail with `Full`.
    DoNothing,
    /// Wait for a free slot (bounded when a deadline is given).
    Block(Option<Duration>),
}

/// Behaviour of `read` on an empty buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EmptyPolicy {
    /// Fail with `Empty`.
    #[default]
    DoNothing,
    /// Re-deliver the last consumed sample.
    Readback,
    /// Wait for data (bounded when a deadline is given).
    Block(Option<Duration>),
}

/// Complete policy set of one buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BufferPolicy {
    pub full: FullPolicy,
    pub empty: EmptyPolicy,
}

impl BufferPolicy {
    /// Parse from a `buffer` property node. Unknown words keep the default
    /// and are logged.
    pub fn from_properties(props: &Properties) -> Self {
        let full = match normalize(props.get_or("write.full_policy", "overwrite")).as_str() {
            "overwrite" => FullPolicy::Overwrite,
            "do_nothing" => FullPolicy::DoNothing,
            "block" => FullPolicy::Block(props.duration_secs("write.timeout")),
            "timeout" => FullPolicy::Block(Some(
                props.duration_secs("write.timeout").unwrap_or(DEFAULT_TIMEOUT),
            )),
            other => {
                log::warn!("[BufferPolicy] unknown write.full_policy '{}', using overwrite", other);
                FullPolicy::Overwrite
            }
        };
        let empty = match normalize(props.get_or("read.empty_policy", "do_nothing")).as_str() {
            "do_nothing" => EmptyPolicy::DoNothing,
            "readback" => EmptyPolicy::Readback,
            "block" => EmptyPolicy::Block(props.duration_secs("read.timeout")),
            "timeout" => EmptyPolicy::Block(Some(
                props.duration_secs("read.timeout").unwrap_or(DEFAULT_TIMEOUT),
            )),
            other => {
                log::warn!("[BufferPolicy] unknown read.empty_policy '{}', using do_nothing", other);
                EmptyPolicy::DoNothing
            }
        };
        Self { full, empty }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let policy = BufferPolicy::from_properties(&Properties::new());
        assert_eq!(policy.full, FullPolicy::Overwrite);
        assert_eq!(policy.empty, EmptyPolicy::DoNothing);
    }

    #[test]
    fn test_block_and_timeout() {
        let props = Properties::from_pairs([
            ("write.full_policy", "Block"),
            ("read.empty_policy", "timeout"),
            ("read.timeout", "0.05"),
        ]);
        let policy = BufferPolicy::from_properties(&props);
        assert_eq!(policy.full, FullPolicy::Block(None));
        assert_eq!(policy.empty, EmptyPolicy::Block(Some(Duration::from_millis(50))));
    }

    #[test]
    fn test_timeout_default_deadline() {
        let props = Properties::from_pairs([("write.full_policy", "timeout")]);
        assert_eq!(
            BufferPolicy::from_properties(&props).full,
            FullPolicy::Block(Some(DEFAULT_TIMEOUT))
        );
    }

    #[test]
    fn test_unknown_word_falls_back() {
        let props = Properties::from_pairs([("read.empty_policy", "guess")]);
        assert_eq!(BufferPolicy::from_properties(&props).empty, EmptyPolicy::DoNothing);
    }
}
