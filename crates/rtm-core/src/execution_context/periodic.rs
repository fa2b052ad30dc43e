// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Thread-driven execution context ticking at a fixed rate.
//!
//! # Example
//!
//! ```rust
//! use rtm_core::component::{share, EcId, LifeCycleState, RtComponent};
//! use rtm_core::execution_context::{ExecutionContext, PeriodicExecutionContext};
//! use rtm_core::{Properties, ReturnCode};
//!
//! struct Blink;
//! impl RtComponent for Blink {
//!     fn on_execute(&mut self, _ec: EcId) -> ReturnCode {
//!         ReturnCode::Ok
//!     }
//! }
//!
//! let ec = PeriodicExecutionContext::new(&Properties::from_pairs([("rate", "100")]))
//!     .expect("spawn ec thread");
//! let blink = share(Blink);
//! ec.add_component(&blink);
//! ec.start();
//! assert_eq!(ec.activate_component(&blink), ReturnCode::Ok);
//! assert_eq!(ec.get_component_state(&blink), LifeCycleState::Active);
//! ec.stop();
//! ```

use super::profile::ProfileHolder;
use super::worker::ExecutionContextWorker;
use super::{
    next_ec_id, rate_from, ExecutionContext, ExecutionContextProfile, ExecutionKind,
};
use crate::component::{EcId, LifeCycleState, RtObjectStateMachine, SharedComponent};
use crate::error::Result;
use crate::properties::Properties;
use crate::status::ReturnCode;
use crate::task::{PeriodicTask, Statistics};
use parking_lot::Mutex;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

const DEFAULT_TRANSITION_TIMEOUT: Duration = Duration::from_millis(500);

/// Which lifecycle requests block until the state is reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct SyncTransition {
    activation: bool,
    deactivation: bool,
    reset: bool,
    timeout: Duration,
}

impl SyncTransition {
    fn from_properties(props: &Properties) -> Self {
        let all = props.flag("sync_transition", "YES", "NO", true);
        Self {
            activation: props.flag("sync_activation", "YES", "NO", all),
            deactivation: props.flag("sync_deactivation", "YES", "NO", all),
            reset: props.flag("sync_reset", "YES", "NO", all),
            timeout: props
                .duration_secs("transition_timeout")
                .unwrap_or(DEFAULT_TRANSITION_TIMEOUT),
        }
    }
}

pub struct PeriodicExecutionContext {
    worker: Arc<ExecutionContextWorker>,
    profile: ProfileHolder,
    task: PeriodicTask,
    /// Held for the whole of every tick.
    tick: Arc<Mutex<()>>,
    sync: SyncTransition,
}

impl PeriodicExecutionContext {
    /// Spawn the (suspended) tick thread.
    pub fn new(props: &Properties) -> Result<Self> {
        let rate = rate_from(props)?;
        let id = next_ec_id();
        let worker = Arc::new(ExecutionContextWorker::new(id));
        let profile = ProfileHolder::new(ExecutionKind::Periodic, rate, props.clone());
        let tick = Arc::new(Mutex::new(()));

        let task = PeriodicTask::new(format!("rtm-periodic-ec-{}", id));
        task.set_period(profile.period());
        task.configure_measurement(props);
        let (w, t) = (Arc::clone(&worker), Arc::clone(&tick));
        task.set_task(move || {
            let _tick = t.lock();
            if w.is_running() {
                w.invoke_worker();
            }
        });
        task.suspend();
        task.activate()?;

        let sync = SyncTransition::from_properties(props);
        log::debug!(
            "[PeriodicExecutionContext::new] ec {} rate={}Hz sync={:?}",
            id,
            rate,
            sync
        );
        Ok(Self {
            worker,
            profile,
            task,
            tick,
            sync,
        })
    }

    pub fn execution_statistics(&self) -> Option<Statistics> {
        self.task.execution_statistics()
    }

    pub fn period_statistics(&self) -> Option<Statistics> {
        self.task.period_statistics()
    }

    /// Poll once per period until `comp` rests in `target`.
    fn wait_for(&self, comp: &RtObjectStateMachine, target: LifeCycleState) -> ReturnCode {
        if !self.is_running() {
            return ReturnCode::Ok;
        }
        let deadline = Instant::now() + self.sync.timeout;
        loop {
            let states = comp.states();
            if states.curr == target {
                return ReturnCode::Ok;
            }
            if states.curr == LifeCycleState::Error && states.next == LifeCycleState::Error {
                return ReturnCode::Error;
            }
            let now = Instant::now();
            if now >= deadline {
                log::warn!(
                    "[PeriodicExecutionContext] ec {} timed out waiting for {}",
                    self.worker.id(),
                    target
                );
                return ReturnCode::Error;
            }
            thread::sleep(self.profile.period().min(deadline - now));
        }
    }

    fn finish_request(
        &self,
        (rc, comp): (ReturnCode, Option<Arc<RtObjectStateMachine>>),
        wait: bool,
        target: LifeCycleState,
    ) -> ReturnCode {
        match comp {
            Some(comp) if rc.is_ok() && wait => self.wait_for(&comp, target),
            _ => rc,
        }
    }
}

impl ExecutionContext for PeriodicExecutionContext {
    fn id(&self) -> EcId {
        self.worker.id()
    }

    fn start(&self) -> ReturnCode {
        let rc = self.worker.start();
        if rc.is_ok() {
            self.task.resume();
        }
        rc
    }

    /// Returns after the in-flight tick, if any, has finished.
    fn stop(&self) -> ReturnCode {
        if !self.worker.is_running() {
            return ReturnCode::PreconditionNotMet;
        }
        self.task.suspend();
        let _tick = self.tick.lock();
        self.worker.stop()
    }

    fn is_running(&self) -> bool {
        self.worker.is_running()
    }

    fn get_rate(&self) -> f64 {
        self.profile.rate()
    }

    fn set_rate(&self, rate: f64) -> ReturnCode {
        let rc = self.profile.set_rate(rate);
        if !rc.is_ok() {
            return rc;
        }
        self.task.set_period(self.profile.period());
        self.worker.rate_changed()
    }

    fn add_component(&self, component: &SharedComponent) -> ReturnCode {
        let rc = self.worker.add_component(component);
        if rc.is_ok() {
            self.profile.add_participant(component);
        }
        rc
    }

    fn remove_component(&self, component: &SharedComponent) -> ReturnCode {
        let rc = self.worker.remove_component(component);
        if rc.is_ok() {
            self.profile.remove_participant(component);
        }
        rc
    }

    fn activate_component(&self, component: &SharedComponent) -> ReturnCode {
        let request = self.worker.activate_component(component);
        self.finish_request(request, self.sync.activation, LifeCycleState::Active)
    }

    fn deactivate_component(&self, component: &SharedComponent) -> ReturnCode {
        let request = self.worker.deactivate_component(component);
        self.finish_request(request, self.sync.deactivation, LifeCycleState::Inactive)
    }

    fn reset_component(&self, component: &SharedComponent) -> ReturnCode {
        let request = self.worker.reset_component(component);
        self.finish_request(request, self.sync.reset, LifeCycleState::Inactive)
    }

    fn get_component_state(&self, component: &SharedComponent) -> LifeCycleState {
        self.worker.get_component_state(component)
    }

    fn get_kind(&self) -> ExecutionKind {
        ExecutionKind::Periodic
    }

    fn get_profile(&self) -> Arc<ExecutionContextProfile> {
        self.profile.get()
    }
}

impl Drop for PeriodicExecutionContext {
    fn drop(&mut self) {
        if self.worker.is_running() {
            self.stop();
        }
        self.task.finalize();
    }
}
