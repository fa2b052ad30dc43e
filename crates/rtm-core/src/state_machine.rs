// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Table-driven state machine with one-tick deferred transitions.
//!
//! Every state may carry `entry`, `pre_do`, `do`, `post_do` and `exit`
//! actions. Actions are plain function pointers receiving the listener, a
//! snapshot of the [`StateHolder`] and the machine itself (to call
//! [`StateMachine::go_to`]).
//!
//! # Tick protocol
//!
//! [`StateMachine::worker`] runs `worker_pre`, `worker_do`, `worker_post`:
//!
//! 1. `worker_pre`: if a transition is staged (`next != curr`, or a
//!    self-transition was requested), run `exit(curr)`, the transition
//!    action, advance `prev = curr; curr = next`, run `entry(curr)`. No other
//!    action runs for the rest of the tick. Otherwise run `pre_do(curr)`.
//! 2. `worker_do`: `do(curr)`, unless the tick transitioned or a transition
//!    has been staged since.
//! 3. `worker_post`: `post_do(curr)`, same condition.
//!
//! `go_to` only stages `next`: a call made from inside any action is seen
//! at the start of the following tick, and the last call wins.
//!
//! # Example
//!
//! ```rust
//! use rtm_core::state_machine::{StateHolder, StateMachine};
//!
//! #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
//! enum Light { Off, On }
//!
//! #[derive(Default)]
//! struct Counter { ticks: u32 }
//!
//! fn count(l: &mut Counter, _: &StateHolder<Light>, sm: &StateMachine<Light, (), Counter>) {
//!     l.ticks += 1;
//!     if l.ticks == 2 {
//!         sm.go_to(Light::On);
//!     }
//! }
//!
//! let sm = StateMachine::new(Light::Off, Counter::default());
//! sm.set_do_action(Light::Off, count);
//! sm.worker();
//! sm.worker();
//! assert_eq!(sm.state(), Light::Off);
//! sm.worker();
//! assert_eq!(sm.state(), Light::On);
//! ```

use parking_lot::{Mutex, MutexGuard, RwLock};
use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;

/// `prev` / `curr` / `next` triple.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateHolder<S> {
    pub prev: S,
    pub curr: S,
    pub next: S,
}

impl<S: Copy> StateHolder<S> {
    /// Holder resting in `state`.
    pub fn at(state: S) -> Self {
        Self {
            prev: state,
            curr: state,
            next: state,
        }
    }
}

/// Action callback.
pub type Action<S, R, L> = fn(&mut L, &StateHolder<S>, &StateMachine<S, R, L>) -> R;

struct StateActions<S, R, L> {
    entry: Option<Action<S, R, L>>,
    pre_do: Option<Action<S, R, L>>,
    do_: Option<Action<S, R, L>>,
    post_do: Option<Action<S, R, L>>,
    exit: Option<Action<S, R, L>>,
}

impl<S, R, L> Default for StateActions<S, R, L> {
    fn default() -> Self {
        Self {
            entry: None,
            pre_do: None,
            do_: None,
            post_do: None,
            exit: None,
        }
    }
}

#[derive(Debug)]
struct Staging<S> {
    states: StateHolder<S>,
    selftrans: bool,
    /// The current tick passed `worker_pre` without transitioning.
    settled: bool,
}

pub struct StateMachine<S, R, L> {
    staging: Mutex<Staging<S>>,
    actions: RwLock<HashMap<S, StateActions<S, R, L>>>,
    transition: RwLock<Option<Action<S, R, L>>>,
    listener: Mutex<L>,
}

impl<S, R, L> StateMachine<S, R, L>
where
    S: Copy + Eq + Hash + Debug,
{
    /// Machine resting in `start` with no actions.
    pub fn new(start: S, listener: L) -> Self {
        Self {
            staging: Mutex::new(Staging {
                states: StateHolder::at(start),
                selftrans: false,
                settled: false,
            }),
            actions: RwLock::new(HashMap::new()),
            transition: RwLock::new(None),
            listener: Mutex::new(listener),
        }
    }

    // ========================================================================
    // Action tables
    // ========================================================================

    pub fn set_entry_action(&self, state: S, action: Action<S, R, L>) {
        self.actions.write().entry(state).or_default().entry = Some(action);
    }

    pub fn set_pre_do_action(&self, state: S, action: Action<S, R, L>) {
        self.actions.write().entry(state).or_default().pre_do = Some(action);
    }

    pub fn set_do_action(&self, state: S, action: Action<S, R, L>) {
        self.actions.write().entry(state).or_default().do_ = Some(action);
    }

    pub fn set_post_do_action(&self, state: S, action: Action<S, R, L>) {
        self.actions.write().entry(state).or_default().post_do = Some(action);
    }

    pub fn set_exit_action(&self, state: S, action: Action<S, R, L>) {
        self.actions.write().entry(state).or_default().exit = Some(action);
    }

    /// Action run between `exit(from)` and `entry(to)`; sees
    /// `curr = from, next = to`.
    pub fn set_transition_action(&self, action: Action<S, R, L>) {
        *self.transition.write() = Some(action);
    }

    // ========================================================================
    // State access
    // ========================================================================

    /// Replace the whole holder. Clears any staged self-transition.
    pub fn set_start_state(&self, states: StateHolder<S>) {
        let mut staging = self.staging.lock();
        staging.states = states;
        staging.selftrans = false;
        staging.settled = false;
    }

    pub fn state(&self) -> S {
        self.staging.lock().states.curr
    }

    pub fn states(&self) -> StateHolder<S> {
        self.staging.lock().states
    }

    pub fn is_in(&self, state: S) -> bool {
        self.staging.lock().states.curr == state
    }

    pub fn is_next(&self, state: S) -> bool {
        self.staging.lock().states.next == state
    }

    /// Stage a transition to `state`, applied at the start of the next tick.
    /// Requesting the current state stages a self-transition.
    pub fn go_to(&self, state: S) {
        let mut staging = self.staging.lock();
        staging.states.next = state;
        if staging.states.curr == state {
            staging.selftrans = true;
        }
    }

    /// True when a transition is staged.
    pub fn need_trans(&self) -> bool {
        let staging = self.staging.lock();
        staging.states.curr != staging.states.next || staging.selftrans
    }

    /// Exclusive access to the listener. Must not be called from inside an
    /// action.
    pub fn listener(&self) -> MutexGuard<'_, L> {
        self.listener.lock()
    }

    // ========================================================================
    // Worker
    // ========================================================================

    /// One full tick. Returns the result of the last action run, if any.
    pub fn worker(&self) -> Option<R> {
        let pre = self.worker_pre();
        let done = self.worker_do();
        let post = self.worker_post();
        post.or(done).or(pre)
    }

    pub fn worker_pre(&self) -> Option<R> {
        let (snapshot, transit) = {
            let mut staging = self.staging.lock();
            let transit =
                staging.states.curr != staging.states.next || staging.selftrans;
            staging.selftrans = false;
            staging.settled = !transit;
            (staging.states, transit)
        };

        if !transit {
            let action = self.lookup(snapshot.curr, |a| a.pre_do);
            return self.run(action, &snapshot);
        }

        log::trace!(
            "[StateMachine::worker_pre] {:?} -> {:?}",
            snapshot.curr,
            snapshot.next
        );
        let (from, to) = (snapshot.curr, snapshot.next);
        let mut result = self.run(self.lookup(from, |a| a.exit), &snapshot);
        let transition = *self.transition.read();
        result = self.run(transition, &snapshot).or(result);

        let entered = {
            let mut staging = self.staging.lock();
            staging.states.prev = from;
            staging.states.curr = to;
            StateHolder {
                prev: from,
                curr: to,
                next: staging.states.next,
            }
        };
        self.run(self.lookup(to, |a| a.entry), &entered).or(result)
    }

    pub fn worker_do(&self) -> Option<R> {
        let snapshot = self.settled_snapshot()?;
        let action = self.lookup(snapshot.curr, |a| a.do_);
        self.run(action, &snapshot)
    }

    pub fn worker_post(&self) -> Option<R> {
        let snapshot = self.settled_snapshot()?;
        let action = self.lookup(snapshot.curr, |a| a.post_do);
        self.run(action, &snapshot)
    }

    /// Holder snapshot when do-phase actions may run this tick.
    fn settled_snapshot(&self) -> Option<StateHolder<S>> {
        let staging = self.staging.lock();
        let staged = staging.states.curr != staging.states.next || staging.selftrans;
        (staging.settled && !staged).then_some(staging.states)
    }

    fn lookup(
        &self,
        state: S,
        pick: impl FnOnce(&StateActions<S, R, L>) -> Option<Action<S, R, L>>,
    ) -> Option<Action<S, R, L>> {
        self.actions.read().get(&state).and_then(pick)
    }

    fn run(&self, action: Option<Action<S, R, L>>, states: &StateHolder<S>) -> Option<R> {
        let action = action?;
        let mut listener = self.listener.lock();
        Some(action(&mut listener, states, self))
    }
}

impl<S: Debug, R, L> Debug for StateMachine<S, R, L> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateMachine")
            .field("staging", &*self.staging.lock())
            .finish_non_exhaustive()
    }
}
