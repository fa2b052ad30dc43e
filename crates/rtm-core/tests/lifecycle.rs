// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

#![allow(clippy::uninlined_format_args)] // Test/bench code readability over pedantic
#![allow(clippy::missing_panics_doc)] // Tests panic on failure
#![allow(clippy::float_cmp)] // Test assertions with constants

//! State machine and execution-context behavior seen from outside the crate.

use rtm_core::component::{share, EcId, LifeCycleState, RtComponent, SharedComponent};
use rtm_core::execution_context::{
    ExecutionContext, PeriodicExecutionContext, SimulatorExecutionContext,
};
use rtm_core::state_machine::{StateHolder, StateMachine};
use rtm_core::{Properties, ReturnCode};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Mode {
    Inactive,
    Active,
}

fn request_active_twice(_: &mut (), _: &StateHolder<Mode>, sm: &StateMachine<Mode, (), ()>) {
    sm.go_to(Mode::Active);
    sm.go_to(Mode::Active);
}

#[test]
fn goto_from_do_action_takes_effect_next_tick() {
    let sm = StateMachine::new(Mode::Inactive, ());
    sm.set_do_action(Mode::Inactive, request_active_twice);

    sm.worker();
    assert_eq!(sm.state(), Mode::Inactive);
    sm.worker();
    assert_eq!(sm.state(), Mode::Active);
    assert_eq!(sm.states().prev, Mode::Inactive);
}

struct Counter(Arc<AtomicUsize>);

impl RtComponent for Counter {
    fn on_execute(&mut self, _ec: EcId) -> ReturnCode {
        self.0.fetch_add(1, Ordering::SeqCst);
        ReturnCode::Ok
    }
}

fn counter() -> (SharedComponent, Arc<AtomicUsize>) {
    let count = Arc::new(AtomicUsize::new(0));
    (share(Counter(Arc::clone(&count))), count)
}

#[test]
fn periodic_ec_runs_at_rate() {
    let ec = PeriodicExecutionContext::new(&Properties::from_pairs([("rate", "10")])).unwrap();
    let (comp, count) = counter();
    assert_eq!(ec.add_component(&comp), ReturnCode::Ok);
    assert_eq!(ec.start(), ReturnCode::Ok);
    assert_eq!(ec.activate_component(&comp), ReturnCode::Ok);

    // Executions start on the tick after the activation tick.
    thread::sleep(Duration::from_secs(1));
    let n = count.load(Ordering::SeqCst);
    assert_eq!(ec.stop(), ReturnCode::Ok);
    assert!((9..=11).contains(&n), "executed {} times", n);
}

#[test]
fn removed_component_stops_executing() {
    let ec = PeriodicExecutionContext::new(&Properties::from_pairs([("rate", "100")])).unwrap();
    let (comp, count) = counter();
    ec.add_component(&comp);
    ec.start();
    ec.activate_component(&comp);
    thread::sleep(Duration::from_millis(50));
    assert_eq!(ec.remove_component(&comp), ReturnCode::Ok);
    thread::sleep(Duration::from_millis(30));
    let after = count.load(Ordering::SeqCst);
    thread::sleep(Duration::from_millis(50));
    assert_eq!(count.load(Ordering::SeqCst), after);
    assert_eq!(ec.get_component_state(&comp), LifeCycleState::Created);
}

#[test]
fn simulator_ec_ticks_on_demand() {
    let ec = SimulatorExecutionContext::new(&Properties::new()).unwrap();
    let (comp, count) = counter();
    ec.add_component(&comp);
    ec.start();
    assert_eq!(ec.activate_component(&comp), ReturnCode::Ok);
    assert_eq!(ec.get_component_state(&comp), LifeCycleState::Active);

    for _ in 0..5 {
        ec.tick();
    }
    assert_eq!(count.load(Ordering::SeqCst), 5);

    assert_eq!(ec.deactivate_component(&comp), ReturnCode::Ok);
    ec.tick();
    assert_eq!(count.load(Ordering::SeqCst), 5);
}

#[test]
fn one_component_in_two_contexts() {
    let a = SimulatorExecutionContext::new(&Properties::new()).unwrap();
    let b = SimulatorExecutionContext::new(&Properties::new()).unwrap();
    let (comp, count) = counter();
    a.add_component(&comp);
    b.add_component(&comp);
    a.start();
    b.start();
    a.activate_component(&comp);
    assert_eq!(a.get_component_state(&comp), LifeCycleState::Active);
    assert_eq!(b.get_component_state(&comp), LifeCycleState::Inactive);
    a.tick();
    b.tick();
    assert_eq!(count.load(Ordering::SeqCst), 1);
    assert_ne!(a.id(), b.id());
}
