// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Thread-safe buffers with configurable full/empty behaviour.
//!
//! [`RingBuffer`] holds the slots and cursors; [`Buffer`] puts it behind a
//! `parking_lot` mutex and implements the policies of [`BufferPolicy`]
//! with two condition variables (`not_full`, `not_empty`).
//!
//! Connectors and publishers talk to buffers through the [`BufferBase`]
//! trait so a registry can hand out alternative implementations under
//! other `buffer_type` names.
//!
//! # Example
//!
//! ```rust
//! use rtm_core::buffer::{Buffer, BufferBase};
//! use rtm_core::{BufferStatus, Properties};
//!
//! let buffer: Buffer<u32> = Buffer::new(2);
//! buffer.init(&Properties::from_pairs([("write.full_policy", "do_nothing")]));
//!
//! assert_eq!(buffer.write(1, None), BufferStatus::Ok);
//! assert_eq!(buffer.write(2, None), BufferStatus::Ok);
//! assert_eq!(buffer.write(3, None), BufferStatus::Full);
//! assert_eq!(buffer.read(None), Ok(1));
//! ```

pub mod policy;
pub mod ring;

pub use policy::{BufferPolicy, EmptyPolicy, FullPolicy};
pub use ring::{RingBuffer, DEFAULT_LENGTH};

use crate::properties::Properties;
use crate::sample::Sample;
use crate::status::BufferStatus;
use parking_lot::{Condvar, Mutex, MutexGuard};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Buffer of timestamped samples as shared between a connector, its
/// publisher and its provider.
pub type SharedBuffer<T> = Arc<dyn BufferBase<Sample<T>>>;

/// Buffer abstraction used by connectors, publishers and providers.
///
/// `timeout = Some(d)` on `write`/`read` forces blocking mode with deadline
/// `d` for that call only; `None` applies the configured policy.
pub trait BufferBase<T>: Send + Sync {
    /// Apply a `buffer` property node (length and policies). Resets contents
    /// when the length changes.
    fn init(&self, props: &Properties);

    fn length(&self) -> usize;
    fn set_length(&self, n: usize) -> BufferStatus;
    fn reset(&self) -> BufferStatus;
    fn policy(&self) -> BufferPolicy;

    fn write(&self, value: T, timeout: Option<Duration>) -> BufferStatus {
        self.write_tracked(value, timeout).0
    }

    /// `write`, also reporting whether the oldest unread sample was
    /// discarded to make room.
    fn write_tracked(&self, value: T, timeout: Option<Duration>) -> (BufferStatus, bool);
    fn read(&self, timeout: Option<Duration>) -> Result<T, BufferStatus>;

    /// Store at the write cursor without advancing.
    fn put(&self, value: T) -> BufferStatus;
    /// Clone of the sample at the read cursor.
    fn get(&self) -> Option<T>;
    /// Clone of the sample `n` slots from the read cursor.
    fn peek(&self, n: isize) -> Option<T>;
    fn advance_wptr(&self, n: isize) -> BufferStatus;
    fn advance_rptr(&self, n: isize) -> BufferStatus;

    fn readable(&self) -> usize;
    fn writable(&self) -> usize;
    fn full(&self) -> bool;
    fn empty(&self) -> bool;
}

struct Inner<T> {
    ring: RingBuffer<T>,
    policy: BufferPolicy,
}

/// Ring buffer guarded by a mutex, with blocking policies.
pub struct Buffer<T> {
    inner: Mutex<Inner<T>>,
    not_full: Condvar,
    not_empty: Condvar,
}

impl<T: Clone + Send> Buffer<T> {
    /// Buffer of `length` slots with the default policies
    /// (`overwrite` / `do_nothing`).
    pub fn new(length: usize) -> Self {
        Self::with_policy(length, BufferPolicy::default())
    }

    pub fn with_policy(length: usize, policy: BufferPolicy) -> Self {
        Self {
            inner: Mutex::new(Inner {
                ring: RingBuffer::new(length),
                policy,
            }),
            not_full: Condvar::new(),
            not_empty: Condvar::new(),
        }
    }

    /// Build from a `buffer` property node.
    pub fn from_properties(props: &Properties) -> Self {
        let buffer = Self::new(DEFAULT_LENGTH);
        buffer.init(props);
        buffer
    }

    /// Wait on `cond` until `ready` holds. `false` on deadline expiry.
    fn wait_until(
        cond: &Condvar,
        guard: &mut MutexGuard<'_, Inner<T>>,
        deadline: Option<Instant>,
        ready: impl Fn(&RingBuffer<T>) -> bool,
    ) -> bool {
        while !ready(&guard.ring) {
            match deadline {
                Some(at) => {
                    if cond.wait_until(guard, at).timed_out() && !ready(&guard.ring) {
                        return false;
                    }
                }
                None => cond.wait(guard),
            }
        }
        true
    }
}

impl<T: Clone + Send> BufferBase<T> for Buffer<T> {
    fn init(&self, props: &Properties) {
        let mut inner = self.inner.lock();
        if let Some(n) = props.parse::<usize>("length") {
            if n > 0 && n != inner.ring.length() {
                inner.ring.set_length(n);
            }
        }
        inner.policy = BufferPolicy::from_properties(props);
        log::debug!(
            "[Buffer::init] length={} policy={:?}",
            inner.ring.length(),
            inner.policy
        );
    }

    fn length(&self) -> usize {
        self.inner.lock().ring.length()
    }

    fn set_length(&self, n: usize) -> BufferStatus {
        let status = self.inner.lock().ring.set_length(n);
        self.not_full.notify_all();
        status
    }

    fn reset(&self) -> BufferStatus {
        let status = self.inner.lock().ring.reset();
        self.not_full.notify_all();
        status
    }

    fn policy(&self) -> BufferPolicy {
        self.inner.lock().policy
    }

    fn write_tracked(&self, value: T, timeout: Option<Duration>) -> (BufferStatus, bool) {
        let mut inner = self.inner.lock();
        if inner.ring.full() {
            let policy = match timeout {
                Some(t) => FullPolicy::Block(Some(t)),
                None => inner.policy.full,
            };
            match policy {
                FullPolicy::Overwrite => {
                    let overwrote = inner.ring.write_overwrite(value);
                    self.not_empty.notify_one();
                    return (BufferStatus::Ok, overwrote);
                }
                FullPolicy::DoNothing => return (BufferStatus::Full, false),
                FullPolicy::Block(limit) => {
                    let deadline = limit.map(|d| Instant::now() + d);
                    if !Self::wait_until(&self.not_full, &mut inner, deadline, |r| !r.full()) {
                        return (BufferStatus::Timeout, false);
                    }
                }
            }
        }
        let status = inner.ring.write(value);
        if status.is_ok() {
            self.not_empty.notify_one();
        }
        (status, false)
    }

    fn read(&self, timeout: Option<Duration>) -> Result<T, BufferStatus> {
        let mut inner = self.inner.lock();
        if inner.ring.empty() {
            let policy = match timeout {
                Some(t) => EmptyPolicy::Block(Some(t)),
                None => inner.policy.empty,
            };
            match policy {
                EmptyPolicy::DoNothing => return Err(BufferStatus::Empty),
                EmptyPolicy::Readback => return inner.ring.read_back(),
                EmptyPolicy::Block(limit) => {
                    let deadline = limit.map(|d| Instant::now() + d);
                    if !Self::wait_until(&self.not_empty, &mut inner, deadline, |r| !r.empty()) {
                        return Err(BufferStatus::Timeout);
                    }
                }
            }
        }
        let value = inner.ring.read()?;
        self.not_full.notify_one();
        Ok(value)
    }

    fn put(&self, value: T) -> BufferStatus {
        self.inner.lock().ring.put(value)
    }

    fn get(&self) -> Option<T> {
        self.inner.lock().ring.get().cloned()
    }

    fn peek(&self, n: isize) -> Option<T> {
        self.inner.lock().ring.peek(n).cloned()
    }

    fn advance_wptr(&self, n: isize) -> BufferStatus {
        let status = self.inner.lock().ring.advance_wptr(n);
        if status.is_ok() && n > 0 {
            self.not_empty.notify_all();
        }
        status
    }

    fn advance_rptr(&self, n: isize) -> BufferStatus {
        let status = self.inner.lock().ring.advance_rptr(n);
        if status.is_ok() && n > 0 {
            self.not_full.notify_all();
        }
        status
    }

    fn readable(&self) -> usize {
        self.inner.lock().ring.readable()
    }

    fn writable(&self) -> usize {
        self.inner.lock().ring.writable()
    }

    fn full(&self) -> bool {
        self.inner.lock().ring.full()
    }

    fn empty(&self) -> bool {
        self.inner.lock().ring.empty()
    }
}

impl<T: Clone + Send> std::fmt::Debug for Buffer<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("Buffer")
            .field("length", &inner.ring.length())
            .field("readable", &inner.ring.readable())
            .field("policy", &inner.policy)
            .finish()
    }
}
