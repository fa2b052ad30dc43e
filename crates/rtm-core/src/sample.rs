// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Timestamped data samples.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Bounds every port payload type must satisfy.
pub trait PortData: Clone + Send + Sync + 'static {}

impl<T: Clone + Send + Sync + 'static> PortData for T {}

/// Wall-clock timestamp (seconds + nanoseconds since the Unix epoch).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Timestamp {
    pub sec: u64,
    pub nsec: u32,
}

impl Timestamp {
    pub fn new(sec: u64, nsec: u32) -> Self {
        Self { sec, nsec }
    }

    /// Current wall-clock time. Clocks set before 1970 read as zero.
    pub fn now() -> Self {
        let since = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or(Duration::ZERO);
        Self::from(since)
    }

    pub fn as_duration(self) -> Duration {
        Duration::new(self.sec, self.nsec)
    }
}

impl From<Duration> for Timestamp {
    fn from(d: Duration) -> Self {
        Self {
            sec: d.as_secs(),
            nsec: d.subsec_nanos(),
        }
    }
}

/// One unit of port data: payload plus the time it was produced.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample<T> {
    pub timestamp: Timestamp,
    pub payload: T,
}

impl<T> Sample<T> {
    /// Stamp `payload` with the current time.
    pub fn new(payload: T) -> Self {
        Self {
            timestamp: Timestamp::now(),
            payload,
        }
    }

    pub fn with_timestamp(payload: T, timestamp: Timestamp) -> Self {
        Self { timestamp, payload }
    }

    pub fn into_payload(self) -> T {
        self.payload
    }
}
