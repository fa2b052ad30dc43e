// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Copy-on-write execution-context profile.

use super::ExecutionKind;
use crate::component::SharedComponent;
use crate::properties::Properties;
use crate::status::ReturnCode;
use crate::task::period_from_rate;
use arc_swap::ArcSwap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Snapshot describing an execution context.
#[derive(Clone)]
pub struct ExecutionContextProfile {
    pub kind: ExecutionKind,
    /// Hz.
    pub rate: f64,
    pub participants: Vec<SharedComponent>,
    pub properties: Properties,
}

impl ExecutionContextProfile {
    /// Zero when `rate` has no representable period.
    pub fn period(&self) -> Duration {
        period_from_rate(self.rate).unwrap_or(Duration::ZERO)
    }
}

impl fmt::Debug for ExecutionContextProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutionContextProfile")
            .field("kind", &self.kind)
            .field("rate", &self.rate)
            .field("participants", &self.participants.len())
            .field("properties", &self.properties)
            .finish()
    }
}

/// Readers take lock-free snapshots; writers publish a modified copy.
pub(crate) struct ProfileHolder {
    current: ArcSwap<ExecutionContextProfile>,
}

impl ProfileHolder {
    pub(crate) fn new(kind: ExecutionKind, rate: f64, properties: Properties) -> Self {
        Self {
            current: ArcSwap::from_pointee(ExecutionContextProfile {
                kind,
                rate,
                participants: Vec::new(),
                properties,
            }),
        }
    }

    pub(crate) fn get(&self) -> Arc<ExecutionContextProfile> {
        self.current.load_full()
    }

    pub(crate) fn rate(&self) -> f64 {
        self.current.load().rate
    }

    pub(crate) fn period(&self) -> Duration {
        self.current.load().period()
    }

    /// Rejects rates without a representable period.
    pub(crate) fn set_rate(&self, rate: f64) -> ReturnCode {
        if period_from_rate(rate).is_none() {
            return ReturnCode::BadParameter;
        }
        self.current.rcu(|p| ExecutionContextProfile {
            rate,
            ..ExecutionContextProfile::clone(p)
        });
        ReturnCode::Ok
    }

    pub(crate) fn add_participant(&self, component: &SharedComponent) {
        self.current.rcu(|p| {
            let mut next = ExecutionContextProfile::clone(p);
            next.participants.push(Arc::clone(component));
            next
        });
    }

    pub(crate) fn remove_participant(&self, component: &SharedComponent) {
        self.current.rcu(|p| {
            let mut next = ExecutionContextProfile::clone(p);
            next.participants.retain(|c| !Arc::ptr_eq(c, component));
            next
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::testing::recorder;

    #[test]
    fn test_rate_validation() {
        let holder = ProfileHolder::new(ExecutionKind::Periodic, 100.0, Properties::new());
        assert_eq!(holder.period(), Duration::from_millis(10));
        assert_eq!(holder.set_rate(0.0), ReturnCode::BadParameter);
        assert_eq!(holder.set_rate(f64::NAN), ReturnCode::BadParameter);
        assert_eq!(holder.set_rate(1e-30), ReturnCode::BadParameter);
        assert_eq!(holder.rate(), 100.0);
        assert_eq!(holder.set_rate(50.0), ReturnCode::Ok);
        assert_eq!(holder.rate(), 50.0);
    }

    #[test]
    fn test_snapshots_are_stable() {
        let holder = ProfileHolder::new(ExecutionKind::Periodic, 10.0, Properties::new());
        let before = holder.get();
        let (comp, _) = recorder(&[]);
        holder.add_participant(&comp);
        assert!(before.participants.is_empty());
        assert_eq!(holder.get().participants.len(), 1);
        holder.remove_participant(&comp);
        assert!(holder.get().participants.is_empty());
    }
}
