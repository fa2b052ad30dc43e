// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Execution contexts: drivers that tick participating components.
//!
//! | Context                          | Driver                                  |
//! |----------------------------------|-----------------------------------------|
//! | [`PeriodicExecutionContext`]     | one named thread at `rate` Hz           |
//! | [`SimulatorExecutionContext`]    | caller-driven [`tick`](SimulatorExecutionContext::tick) |
//!
//! Both share the participant bookkeeping: lifecycle requests only stage a
//! transition on the component's [`RtObjectStateMachine`](crate::component::RtObjectStateMachine),
//! and the next tick applies it.
//!
//! # Properties
//!
//! | Key                    | Default | Meaning                                    |
//! |------------------------|---------|--------------------------------------------|
//! | `rate`                 | `1000`  | Hz                                         |
//! | `sync_transition`      | `YES`   | default for the three keys below           |
//! | `sync_activation`      |         | `activate_component` waits for `Active`    |
//! | `sync_deactivation`    |         | `deactivate_component` waits for `Inactive`|
//! | `sync_reset`           |         | `reset_component` waits for `Inactive`     |
//! | `transition_timeout`   | `0.5`   | seconds to wait before returning `Error`   |
//! | `measurement.exec_time`| `disable` | record tick execution time              |
//! | `measurement.period_time` | `disable` | record tick period                   |

pub mod periodic;
pub mod profile;
pub mod simulator;
mod worker;

pub use periodic::PeriodicExecutionContext;
pub use profile::ExecutionContextProfile;
pub use simulator::SimulatorExecutionContext;

use crate::component::{EcId, LifeCycleState, SharedComponent};
use crate::error::{Error, Result};
use crate::properties::Properties;
use crate::status::ReturnCode;
use crate::task::period_from_rate;
use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

/// Default tick rate in Hz.
pub const DEFAULT_RATE: f64 = 1000.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExecutionKind {
    Periodic,
    Event,
    Other,
}

impl ExecutionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ExecutionKind::Periodic => "PERIODIC",
            ExecutionKind::Event => "EVENT_DRIVEN",
            ExecutionKind::Other => "OTHER",
        }
    }
}

impl fmt::Display for ExecutionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Request surface common to every execution context.
pub trait ExecutionContext: Send + Sync {
    fn id(&self) -> EcId;

    /// Start ticking; calls `on_startup` on every participant.
    fn start(&self) -> ReturnCode;
    /// Stop ticking; calls `on_shutdown` on every participant.
    fn stop(&self) -> ReturnCode;
    fn is_running(&self) -> bool;

    fn get_rate(&self) -> f64;
    /// Calls `on_rate_changed` on every participant.
    fn set_rate(&self, rate: f64) -> ReturnCode;

    /// New participants rest in `Inactive`.
    fn add_component(&self, component: &SharedComponent) -> ReturnCode;
    fn remove_component(&self, component: &SharedComponent) -> ReturnCode;

    fn activate_component(&self, component: &SharedComponent) -> ReturnCode;
    fn deactivate_component(&self, component: &SharedComponent) -> ReturnCode;
    fn reset_component(&self, component: &SharedComponent) -> ReturnCode;

    /// `Created` for components that do not participate.
    fn get_component_state(&self, component: &SharedComponent) -> LifeCycleState;
    fn get_kind(&self) -> ExecutionKind;
    fn get_profile(&self) -> Arc<ExecutionContextProfile>;
}

static NEXT_EC_ID: AtomicU32 = AtomicU32::new(0);

pub(crate) fn next_ec_id() -> EcId {
    NEXT_EC_ID.fetch_add(1, Ordering::Relaxed)
}

/// `rate` property; a missing key yields [`DEFAULT_RATE`].
pub(crate) fn rate_from(props: &Properties) -> Result<f64> {
    let Some(raw) = props.get("rate") else {
        return Ok(DEFAULT_RATE);
    };
    match raw.trim().parse::<f64>() {
        Ok(rate) if period_from_rate(rate).is_some() => Ok(rate),
        _ => Err(Error::InvalidArgs(format!("rate = '{}'", raw))),
    }
}
