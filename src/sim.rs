//! `SimScheduler`: a deterministic, test-only [`Scheduler`].
//!
//! The bus treats the coroutine runtime as an external collaborator it never
//! implements (§10) — the production side of that contract is a real
//! stackful coroutine library, entirely out of scope here. This module
//! exists only so the test suite and doctests have something to drive a
//! [`crate::Bus`] with. It is gated behind the `test-util` feature and must
//! never be relied on outside tests, the same way the host library this
//! crate is descended from gates its own `test` helpers behind a `test`
//! feature.
//!
//! Each spawned "coroutine" gets a real OS thread, but a single mutex-guarded
//! baton ensures only one of them ever runs at a time — from the bus's point
//! of view this is indistinguishable from genuine cooperative scheduling:
//! `suspend()` blocks the caller until some other coroutine calls
//! `wakeup()` on it, and nothing else executes concurrently in between.

use std::cell::{Cell, UnsafeCell};
use std::collections::{HashSet, VecDeque};
use std::rc::Rc;
use std::sync::{Arc, Condvar, Mutex};
use std::thread;

use crate::bus::Bus;
use crate::scheduler::{CoroutineId, Scheduler};

thread_local! {
    static CURRENT_ID: Cell<Option<CoroutineId>> = Cell::new(None);
}

#[derive(Default)]
struct Baton {
    /// Who currently holds the baton, if anyone is actively running.
    holder: Option<CoroutineId>,
    /// Ids marked runnable but not yet handed the baton, in wake order.
    runnable: VecDeque<CoroutineId>,
    /// Ids currently blocked in `suspend()`.
    parked: HashSet<CoroutineId>,
    next_id: u64,
    live: usize,
}

struct Shared {
    state: Mutex<Baton>,
    cvar: Condvar,
}

/// Lets a non-`Send` closure cross into a spawned thread. Sound only because
/// the turnstile in [`Shared`] guarantees at most one thread ever touches
/// whatever the closure captures at a time, and the mutex/condvar handoff in
/// [`wait_for_turn`] establishes happens-before between consecutive holders.
struct ForceSend<T>(T);
unsafe impl<T> Send for ForceSend<T> {}

/// A reference [`Scheduler`] for tests: spawns each coroutine on its own OS
/// thread but only ever lets one run at a time, reproducing exactly the
/// interleavings a single cooperative thread would produce.
pub struct SimScheduler {
    shared: Arc<Shared>,
}

impl SimScheduler {
    /// Builds a scheduler and marks the calling thread as coroutine 0,
    /// already holding the baton.
    pub fn new() -> Self {
        let shared = Arc::new(Shared {
            state: Mutex::new(Baton::default()),
            cvar: Condvar::new(),
        });
        {
            let mut state = shared.state.lock().unwrap();
            state.holder = Some(CoroutineId(0));
            state.next_id = 1;
        }
        CURRENT_ID.with(|c| c.set(Some(CoroutineId(0))));
        Self { shared }
    }

    /// Spawns a new coroutine running `body`. The new coroutine is enqueued
    /// runnable but does not start executing until it is scheduled the
    /// baton — spawning never preempts the caller.
    pub fn spawn<F>(&self, body: F) -> CoroutineId
    where
        F: FnOnce() + 'static,
    {
        let id = {
            let mut state = self.shared.state.lock().unwrap();
            let id = CoroutineId(state.next_id);
            state.next_id += 1;
            state.live += 1;
            state.runnable.push_back(id);
            id
        };
        self.shared.cvar.notify_all();

        let shared = Arc::clone(&self.shared);
        let body = ForceSend(body);
        thread::spawn(move || {
            let ForceSend(body) = body;
            CURRENT_ID.with(|c| c.set(Some(id)));
            wait_for_turn(&shared, id);
            body();
            let mut state = shared.state.lock().unwrap();
            state.holder = None;
            state.live -= 1;
            drop(state);
            shared.cvar.notify_all();
        });

        id
    }

    /// Blocks the calling thread until nobody holds the baton and nobody is
    /// runnable — every live coroutine is parked in `suspend()` or finished.
    pub fn run_until_blocked(&self) {
        let id = self.current();
        let mut state = self.shared.state.lock().unwrap();
        if state.holder == Some(id) {
            state.holder = None;
            self.shared.cvar.notify_all();
        }
        loop {
            if state.holder.is_none() && state.runnable.is_empty() {
                return;
            }
            state = self.shared.cvar.wait(state).unwrap();
        }
    }

    /// Blocks until every spawned coroutine has returned from its body.
    pub fn run_until_idle(&self) {
        let id = self.current();
        let mut state = self.shared.state.lock().unwrap();
        if state.holder == Some(id) {
            state.holder = None;
            self.shared.cvar.notify_all();
        }
        while state.live > 0 {
            state = self.shared.cvar.wait(state).unwrap();
        }
    }
}

impl Default for SimScheduler {
    fn default() -> Self {
        Self::new()
    }
}

fn wait_for_turn(shared: &Shared, id: CoroutineId) {
    let mut state = shared.state.lock().unwrap();
    loop {
        if state.holder.is_none() && state.runnable.front() == Some(&id) {
            state.runnable.pop_front();
            state.holder = Some(id);
            state.parked.remove(&id);
            return;
        }
        state = shared.cvar.wait(state).unwrap();
    }
}

impl Scheduler for SimScheduler {
    fn current(&self) -> CoroutineId {
        CURRENT_ID
            .with(|c| c.get())
            .expect("SimScheduler::current called from a thread it did not spawn")
    }

    fn suspend(&self) {
        let id = self.current();
        {
            let mut state = self.shared.state.lock().unwrap();
            state.holder = None;
            state.parked.insert(id);
            self.shared.cvar.notify_all();
        }
        wait_for_turn(&self.shared, id);
    }

    fn wakeup(&self, id: CoroutineId) {
        let mut state = self.shared.state.lock().unwrap();
        if state.holder == Some(id) || state.runnable.contains(&id) {
            return; // already runnable, per the trait's idempotency requirement
        }
        state.parked.remove(&id);
        state.runnable.push_back(id);
        drop(state);
        self.shared.cvar.notify_all();
    }
}

/// Shares a [`Bus`] across a [`SimScheduler`]'s coroutine threads.
///
/// A plain `Rc<RefCell<Bus>>` does not work here: a blocking `Bus` call
/// holds its `RefMut` guard across `suspend()`, and the next coroutine the
/// baton hands control to would hit `RefCell`'s runtime borrow check and
/// panic even though it is the only one actually touching the bus at that
/// moment. `SharedBus` skips that bookkeeping entirely — sound under the
/// same turnstile guarantee as [`ForceSend`]: only the coroutine currently
/// holding the baton ever dereferences it.
pub struct SharedBus {
    inner: Rc<UnsafeCell<Bus>>,
}

impl SharedBus {
    pub fn new(bus: Bus) -> Self {
        Self {
            inner: Rc::new(UnsafeCell::new(bus)),
        }
    }

    #[allow(clippy::mut_from_ref)]
    pub fn get(&self) -> &mut Bus {
        unsafe { &mut *self.inner.get() }
    }
}

impl Clone for SharedBus {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}
