// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! RT-Component callbacks and the per-participant lifecycle machine.
//!
//! An execution context drives each participant through
//! [`RtObjectStateMachine`], a [`StateMachine`] over [`LifeCycleState`]
//! whose actions forward to the component:
//!
//! | State    | entry          | do                | post_do           | exit             |
//! |----------|----------------|-------------------|-------------------|------------------|
//! | Active   | `on_activated` | `on_execute`      | `on_state_update` | `on_deactivated` |
//! | Error    | `on_aborting`  | `on_error`        |                   | `on_reset`       |
//!
//! A failing Active-side callback (or `on_reset`) stages a transition to
//! `Error`; the component enters it on the following tick.

use crate::state_machine::{StateHolder, StateMachine};
use crate::status::ReturnCode;
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;

/// Identifier of an execution context, passed to every callback.
pub type EcId = u32;

/// User logic run by an execution context. Every hook defaults to `Ok`.
pub trait RtComponent: Send {
    fn on_startup(&mut self, _ec_id: EcId) -> ReturnCode {
        ReturnCode::Ok
    }
    fn on_shutdown(&mut self, _ec_id: EcId) -> ReturnCode {
        ReturnCode::Ok
    }
    fn on_activated(&mut self, _ec_id: EcId) -> ReturnCode {
        ReturnCode::Ok
    }
    fn on_deactivated(&mut self, _ec_id: EcId) -> ReturnCode {
        ReturnCode::Ok
    }
    fn on_aborting(&mut self, _ec_id: EcId) -> ReturnCode {
        ReturnCode::Ok
    }
    fn on_error(&mut self, _ec_id: EcId) -> ReturnCode {
        ReturnCode::Ok
    }
    fn on_reset(&mut self, _ec_id: EcId) -> ReturnCode {
        ReturnCode::Ok
    }
    fn on_execute(&mut self, _ec_id: EcId) -> ReturnCode {
        ReturnCode::Ok
    }
    fn on_state_update(&mut self, _ec_id: EcId) -> ReturnCode {
        ReturnCode::Ok
    }
    fn on_rate_changed(&mut self, _ec_id: EcId) -> ReturnCode {
        ReturnCode::Ok
    }
}

/// Component handle shared between the application and its contexts.
pub type SharedComponent = Arc<Mutex<dyn RtComponent>>;

/// Wrap a component for registration with an execution context.
pub fn share<C: RtComponent + 'static>(component: C) -> SharedComponent {
    Arc::new(Mutex::new(component))
}

/// Lifecycle state of a component within one execution context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifeCycleState {
    /// Not a participant of the queried context.
    Created,
    Inactive,
    Active,
    Error,
}

impl LifeCycleState {
    pub fn as_str(self) -> &'static str {
        match self {
            LifeCycleState::Created => "CREATED_STATE",
            LifeCycleState::Inactive => "INACTIVE_STATE",
            LifeCycleState::Active => "ACTIVE_STATE",
            LifeCycleState::Error => "ERROR_STATE",
        }
    }
}

impl fmt::Display for LifeCycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Listener carried by the lifecycle machine.
struct ComponentSlot {
    ec_id: EcId,
    component: SharedComponent,
}

type Lifecycle = StateMachine<LifeCycleState, ReturnCode, ComponentSlot>;

/// One participant of an execution context.
pub struct RtObjectStateMachine {
    component: SharedComponent,
    sm: Lifecycle,
}

impl RtObjectStateMachine {
    /// Participant resting in `Inactive`.
    pub fn new(ec_id: EcId, component: SharedComponent) -> Self {
        let sm = StateMachine::new(
            LifeCycleState::Inactive,
            ComponentSlot {
                ec_id,
                component: Arc::clone(&component),
            },
        );
        sm.set_entry_action(LifeCycleState::Active, on_activated);
        sm.set_do_action(LifeCycleState::Active, on_execute);
        sm.set_post_do_action(LifeCycleState::Active, on_state_update);
        sm.set_exit_action(LifeCycleState::Active, on_deactivated);
        sm.set_entry_action(LifeCycleState::Error, on_aborting);
        sm.set_do_action(LifeCycleState::Error, on_error);
        sm.set_exit_action(LifeCycleState::Error, on_reset);
        Self { component, sm }
    }

    pub fn component(&self) -> &SharedComponent {
        &self.component
    }

    /// Same component instance (pointer identity).
    pub fn is_equivalent(&self, component: &SharedComponent) -> bool {
        Arc::ptr_eq(&self.component, component)
    }

    // ========================================================================
    // States
    // ========================================================================

    pub fn state(&self) -> LifeCycleState {
        self.sm.state()
    }

    pub fn states(&self) -> StateHolder<LifeCycleState> {
        self.sm.states()
    }

    pub fn is_current_state(&self, state: LifeCycleState) -> bool {
        self.sm.is_in(state)
    }

    pub fn is_next_state(&self, state: LifeCycleState) -> bool {
        self.sm.is_next(state)
    }

    /// Stage a lifecycle transition (applied by the next `worker_pre`).
    pub fn go_to(&self, state: LifeCycleState) {
        self.sm.go_to(state);
    }

    // ========================================================================
    // Direct callbacks
    // ========================================================================

    pub fn on_startup(&self) -> ReturnCode {
        self.invoke(|c, id| c.on_startup(id))
    }

    pub fn on_shutdown(&self) -> ReturnCode {
        self.invoke(|c, id| c.on_shutdown(id))
    }

    pub fn on_rate_changed(&self) -> ReturnCode {
        self.invoke(|c, id| c.on_rate_changed(id))
    }

    fn invoke(&self, hook: impl FnOnce(&mut dyn RtComponent, EcId) -> ReturnCode) -> ReturnCode {
        let slot = self.sm.listener();
        let mut component = slot.component.lock();
        hook(&mut *component, slot.ec_id)
    }

    // ========================================================================
    // Tick phases
    // ========================================================================

    pub fn worker_pre(&self) {
        self.sm.worker_pre();
    }

    pub fn worker_do(&self) {
        self.sm.worker_do();
    }

    pub fn worker_post(&self) {
        self.sm.worker_post();
    }

    pub fn worker(&self) {
        self.sm.worker();
    }
}

impl fmt::Debug for RtObjectStateMachine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RtObjectStateMachine")
            .field("states", &self.sm.states())
            .finish_non_exhaustive()
    }
}

fn fail_to_error(rc: ReturnCode, hook: &str, sm: &Lifecycle) -> ReturnCode {
    if !rc.is_ok() {
        log::warn!("[RtObjectStateMachine] {} returned {}, entering error state", hook, rc);
        sm.go_to(LifeCycleState::Error);
    }
    rc
}

fn on_activated(slot: &mut ComponentSlot, _: &StateHolder<LifeCycleState>, sm: &Lifecycle) -> ReturnCode {
    let rc = slot.component.lock().on_activated(slot.ec_id);
    fail_to_error(rc, "on_activated", sm)
}

fn on_execute(slot: &mut ComponentSlot, st: &StateHolder<LifeCycleState>, sm: &Lifecycle) -> ReturnCode {
    if st.next == LifeCycleState::Error {
        return ReturnCode::Ok;
    }
    let rc = slot.component.lock().on_execute(slot.ec_id);
    fail_to_error(rc, "on_execute", sm)
}

fn on_state_update(
    slot: &mut ComponentSlot,
    st: &StateHolder<LifeCycleState>,
    sm: &Lifecycle,
) -> ReturnCode {
    if st.next == LifeCycleState::Error {
        return ReturnCode::Ok;
    }
    let rc = slot.component.lock().on_state_update(slot.ec_id);
    fail_to_error(rc, "on_state_update", sm)
}

fn on_deactivated(slot: &mut ComponentSlot, _: &StateHolder<LifeCycleState>, sm: &Lifecycle) -> ReturnCode {
    let rc = slot.component.lock().on_deactivated(slot.ec_id);
    fail_to_error(rc, "on_deactivated", sm)
}

fn on_aborting(slot: &mut ComponentSlot, _: &StateHolder<LifeCycleState>, _: &Lifecycle) -> ReturnCode {
    slot.component.lock().on_aborting(slot.ec_id)
}

fn on_error(slot: &mut ComponentSlot, _: &StateHolder<LifeCycleState>, _: &Lifecycle) -> ReturnCode {
    slot.component.lock().on_error(slot.ec_id)
}

fn on_reset(slot: &mut ComponentSlot, _: &StateHolder<LifeCycleState>, sm: &Lifecycle) -> ReturnCode {
    let rc = slot.component.lock().on_reset(slot.ec_id);
    fail_to_error(rc, "on_reset", sm)
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    /// Component recording every callback; fails the hooks named in `fail`.
    #[derive(Default)]
    pub struct Recorder {
        pub calls: Vec<&'static str>,
        pub fail: Vec<&'static str>,
    }

    impl Recorder {
        fn hit(&mut self, name: &'static str) -> ReturnCode {
            self.calls.push(name);
            if self.fail.contains(&name) {
                ReturnCode::Error
            } else {
                ReturnCode::Ok
            }
        }

        pub fn count(&self, name: &str) -> usize {
            self.calls.iter().filter(|c| **c == name).count()
        }
    }

    impl RtComponent for Recorder {
        fn on_startup(&mut self, _: EcId) -> ReturnCode {
            self.hit("on_startup")
        }
        fn on_shutdown(&mut self, _: EcId) -> ReturnCode {
            self.hit("on_shutdown")
        }
        fn on_activated(&mut self, _: EcId) -> ReturnCode {
            self.hit("on_activated")
        }
        fn on_deactivated(&mut self, _: EcId) -> ReturnCode {
            self.hit("on_deactivated")
        }
        fn on_aborting(&mut self, _: EcId) -> ReturnCode {
            self.hit("on_aborting")
        }
        fn on_error(&mut self, _: EcId) -> ReturnCode {
            self.hit("on_error")
        }
        fn on_reset(&mut self, _: EcId) -> ReturnCode {
            self.hit("on_reset")
        }
        fn on_execute(&mut self, _: EcId) -> ReturnCode {
            self.hit("on_execute")
        }
        fn on_state_update(&mut self, _: EcId) -> ReturnCode {
            self.hit("on_state_update")
        }
        fn on_rate_changed(&mut self, _: EcId) -> ReturnCode {
            self.hit("on_rate_changed")
        }
    }

    /// Shared recorder plus a typed handle to inspect it.
    pub fn recorder(fail: &[&'static str]) -> (SharedComponent, Arc<Mutex<Recorder>>) {
        let rec = Arc::new(Mutex::new(Recorder {
            calls: Vec::new(),
            fail: fail.to_vec(),
        }));
        let shared: SharedComponent = rec.clone();
        (shared, rec)
    }
}
