// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Caller-driven execution context for simulators and tests.
//!
//! No thread: every [`tick`](SimulatorExecutionContext::tick) runs exactly
//! one pass over the participants. Lifecycle requests apply their
//! transition immediately (the component's `worker_pre` runs before the
//! request returns), so the new state is observable right away.

use super::profile::ProfileHolder;
use super::worker::ExecutionContextWorker;
use super::{
    next_ec_id, rate_from, ExecutionContext, ExecutionContextProfile, ExecutionKind,
};
use crate::component::{EcId, LifeCycleState, RtObjectStateMachine, SharedComponent};
use crate::error::Result;
use crate::properties::Properties;
use crate::status::ReturnCode;
use parking_lot::Mutex;
use std::sync::Arc;

pub struct SimulatorExecutionContext {
    worker: ExecutionContextWorker,
    profile: ProfileHolder,
    tick: Mutex<()>,
}

impl SimulatorExecutionContext {
    /// `rate` is only reported; ticking is up to the caller.
    pub fn new(props: &Properties) -> Result<Self> {
        let rate = rate_from(props)?;
        let id = next_ec_id();
        log::debug!("[SimulatorExecutionContext::new] ec {}", id);
        Ok(Self {
            worker: ExecutionContextWorker::new(id),
            profile: ProfileHolder::new(ExecutionKind::Periodic, rate, props.clone()),
            tick: Mutex::new(()),
        })
    }

    /// Run one pass. `PreconditionNotMet` while stopped.
    pub fn tick(&self) -> ReturnCode {
        let _tick = self.tick.lock();
        if !self.worker.is_running() {
            return ReturnCode::PreconditionNotMet;
        }
        self.worker.invoke_worker();
        ReturnCode::Ok
    }

    fn apply_now(
        &self,
        (rc, comp): (ReturnCode, Option<Arc<RtObjectStateMachine>>),
    ) -> ReturnCode {
        if let Some(comp) = comp.filter(|_| rc.is_ok()) {
            let _tick = self.tick.lock();
            comp.worker_pre();
        }
        rc
    }
}

impl ExecutionContext for SimulatorExecutionContext {
    fn id(&self) -> EcId {
        self.worker.id()
    }

    fn start(&self) -> ReturnCode {
        self.worker.start()
    }

    fn stop(&self) -> ReturnCode {
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
        self.apply_now(self.worker.activate_component(component))
    }

    fn deactivate_component(&self, component: &SharedComponent) -> ReturnCode {
        self.apply_now(self.worker.deactivate_component(component))
    }

    fn reset_component(&self, component: &SharedComponent) -> ReturnCode {
        self.apply_now(self.worker.reset_component(component))
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::testing::recorder;

    fn sim() -> SimulatorExecutionContext {
        SimulatorExecutionContext::new(&Properties::new()).unwrap()
    }

    #[test]
    fn test_tick_requires_running() {
        let ec = sim();
        assert_eq!(ec.tick(), ReturnCode::PreconditionNotMet);
        ec.start();
        assert_eq!(ec.tick(), ReturnCode::Ok);
    }

    #[test]
    fn test_transitions_are_immediate() {
        let ec = sim();
        let (comp, rec) = recorder(&[]);
        ec.add_component(&comp);
        ec.start();
        assert_eq!(ec.activate_component(&comp), ReturnCode::Ok);
        assert_eq!(ec.get_component_state(&comp), LifeCycleState::Active);
        ec.tick();
        ec.tick();
        assert_eq!(ec.deactivate_component(&comp), ReturnCode::Ok);
        assert_eq!(ec.get_component_state(&comp), LifeCycleState::Inactive);
        assert_eq!(
            rec.lock().calls,
            vec![
                "on_startup",
                "on_activated",
                "on_execute",
                "on_state_update",
                "on_execute",
                "on_state_update",
                "on_deactivated"
            ]
        );
    }

    #[test]
    fn test_error_then_reset() {
        let ec = sim();
        let (comp, rec) = recorder(&["on_execute"]);
        ec.add_component(&comp);
        ec.start();
        ec.activate_component(&comp);
        ec.tick();
        assert_eq!(ec.get_component_state(&comp), LifeCycleState::Active);
        ec.tick();
        assert_eq!(ec.get_component_state(&comp), LifeCycleState::Error);
        assert_eq!(ec.activate_component(&comp), ReturnCode::PreconditionNotMet);
        assert_eq!(ec.reset_component(&comp), ReturnCode::Ok);
        assert_eq!(ec.get_component_state(&comp), LifeCycleState::Inactive);
        assert_eq!(rec.lock().count("on_reset"), 1);
    }

    #[test]
    fn test_non_participant() {
        let ec = sim();
        let (comp, _) = recorder(&[]);
        assert_eq!(ec.get_component_state(&comp), LifeCycleState::Created);
        assert_eq!(ec.activate_component(&comp), ReturnCode::BadParameter);
        assert_eq!(ec.remove_component(&comp), ReturnCode::BadParameter);
    }
}
