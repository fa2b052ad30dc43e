// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Participant bookkeeping shared by every execution context.
//!
//! Additions and removals are queued and folded into the participant list
//! after a full tick (or immediately while the context is stopped), so a
//! tick always iterates a stable set.

use crate::component::{EcId, LifeCycleState, RtObjectStateMachine, SharedComponent};
use crate::status::ReturnCode;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

type Participant = Arc<RtObjectStateMachine>;

pub(crate) struct ExecutionContextWorker {
    id: EcId,
    running: AtomicBool,
    comps: Mutex<Vec<Participant>>,
    added: Mutex<Vec<Participant>>,
    removed: Mutex<Vec<Participant>>,
}

impl ExecutionContextWorker {
    pub(crate) fn new(id: EcId) -> Self {
        Self {
            id,
            running: AtomicBool::new(false),
            comps: Mutex::new(Vec::new()),
            added: Mutex::new(Vec::new()),
            removed: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn id(&self) -> EcId {
        self.id
    }

    // ========================================================================
    // Running state
    // ========================================================================

    pub(crate) fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Calls `on_startup` on every participant.
    pub(crate) fn start(&self) -> ReturnCode {
        if self.running.swap(true, Ordering::AcqRel) {
            log::warn!("[ExecutionContextWorker::start] ec {} already running", self.id);
            return ReturnCode::PreconditionNotMet;
        }
        self.update_component_list();
        for comp in self.snapshot() {
            comp.on_startup();
        }
        log::debug!("[ExecutionContextWorker::start] ec {} started", self.id);
        ReturnCode::Ok
    }

    /// Calls `on_shutdown` on every participant.
    pub(crate) fn stop(&self) -> ReturnCode {
        if !self.running.swap(false, Ordering::AcqRel) {
            log::warn!("[ExecutionContextWorker::stop] ec {} not running", self.id);
            return ReturnCode::PreconditionNotMet;
        }
        for comp in self.snapshot() {
            comp.on_shutdown();
        }
        log::debug!("[ExecutionContextWorker::stop] ec {} stopped", self.id);
        ReturnCode::Ok
    }

    /// `Error` if any participant rejected the new rate.
    pub(crate) fn rate_changed(&self) -> ReturnCode {
        let mut rc = ReturnCode::Ok;
        for comp in self.snapshot() {
            if !comp.on_rate_changed().is_ok() {
                rc = ReturnCode::Error;
            }
        }
        rc
    }

    // ========================================================================
    // Participants
    // ========================================================================

    pub(crate) fn add_component(&self, component: &SharedComponent) -> ReturnCode {
        if self.find(component).is_some() {
            return ReturnCode::BadParameter;
        }
        self.added.lock().push(Arc::new(RtObjectStateMachine::new(
            self.id,
            Arc::clone(component),
        )));
        if !self.is_running() {
            self.update_component_list();
        }
        ReturnCode::Ok
    }

    pub(crate) fn remove_component(&self, component: &SharedComponent) -> ReturnCode {
        let Some(comp) = self.find(component) else {
            return ReturnCode::BadParameter;
        };
        self.removed.lock().push(comp);
        if !self.is_running() {
            self.update_component_list();
        }
        ReturnCode::Ok
    }

    /// Participant (or pending participant) for `component`.
    pub(crate) fn find(&self, component: &SharedComponent) -> Option<Participant> {
        let lookup = |list: &Vec<Participant>| {
            list.iter().find(|c| c.is_equivalent(component)).cloned()
        };
        let found = lookup(&self.comps.lock()).or_else(|| lookup(&self.added.lock()))?;
        let removing = self.removed.lock().iter().any(|c| Arc::ptr_eq(c, &found));
        (!removing).then_some(found)
    }

    /// Fold queued additions and removals into the participant list.
    pub(crate) fn update_component_list(&self) {
        let added: Vec<_> = std::mem::take(&mut *self.added.lock());
        let removed: Vec<_> = std::mem::take(&mut *self.removed.lock());
        let mut comps = self.comps.lock();
        comps.extend(added);
        comps.retain(|c| !removed.iter().any(|r| Arc::ptr_eq(c, r)));
        if !removed.is_empty() {
            log::debug!(
                "[ExecutionContextWorker] ec {} removed {} participant(s)",
                self.id,
                removed.len()
            );
        }
    }

    pub(crate) fn snapshot(&self) -> Vec<Participant> {
        self.comps.lock().clone()
    }

    // ========================================================================
    // Lifecycle requests
    // ========================================================================

    pub(crate) fn activate_component(
        &self,
        component: &SharedComponent,
    ) -> (ReturnCode, Option<Participant>) {
        self.request(component, LifeCycleState::Inactive, LifeCycleState::Active)
    }

    pub(crate) fn deactivate_component(
        &self,
        component: &SharedComponent,
    ) -> (ReturnCode, Option<Participant>) {
        self.request(component, LifeCycleState::Active, LifeCycleState::Inactive)
    }

    pub(crate) fn reset_component(
        &self,
        component: &SharedComponent,
    ) -> (ReturnCode, Option<Participant>) {
        self.request(component, LifeCycleState::Error, LifeCycleState::Inactive)
    }

    fn request(
        &self,
        component: &SharedComponent,
        from: LifeCycleState,
        to: LifeCycleState,
    ) -> (ReturnCode, Option<Participant>) {
        let Some(comp) = self.find(component) else {
            return (ReturnCode::BadParameter, None);
        };
        if !comp.is_current_state(from) {
            log::debug!(
                "[ExecutionContextWorker] ec {} cannot go to {} from {}",
                self.id,
                to,
                comp.state()
            );
            return (ReturnCode::PreconditionNotMet, Some(comp));
        }
        comp.go_to(to);
        (ReturnCode::Ok, Some(comp))
    }

    pub(crate) fn get_component_state(&self, component: &SharedComponent) -> LifeCycleState {
        self.find(component)
            .map_or(LifeCycleState::Created, |c| c.state())
    }

    // ========================================================================
    // Tick
    // ========================================================================

    /// One pass: `worker_pre` for all, then `worker_do`, then `worker_post`.
    pub(crate) fn invoke_worker(&self) {
        let comps = self.snapshot();
        for comp in &comps {
            comp.worker_pre();
        }
        for comp in &comps {
            comp.worker_do();
        }
        for comp in &comps {
            comp.worker_post();
        }
        self.update_component_list();
    }
}
