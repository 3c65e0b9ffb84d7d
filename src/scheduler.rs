//! The coroutine runtime collaborator contract.
//!
//! The bus does not schedule anything itself — cooperative multitasking
//! (creating coroutines, deciding what runs next, context-switching stacks)
//! is the job of an external runtime, exactly as the host library this crate
//! descends from treats its fiber scheduler as living in the surrounding C
//! runtime and only *consumes* it through a handful of FFI calls
//! (`fiber_channel_put_msg_timeout`, `fiber_cond_wait`, …). Here that
//! consumption boundary is the [`Scheduler`] trait.
//!
//! A [`Bus`](crate::Bus) holds a single `Rc<dyn Scheduler>`: within one
//! cooperative thread there is exactly one runtime in play, so making every
//! public type generic over it would only spray a type parameter across the
//! whole crate for no benefit.

use std::fmt;

/// An opaque handle to a coroutine, as understood by the [`Scheduler`] that
/// owns it.
///
/// Wait queues only ever *borrow* these (they are never responsible for
/// freeing or otherwise owning coroutine state); see [`crate::waitqueue`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CoroutineId(pub u64);

impl fmt::Display for CoroutineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "coroutine#{}", self.0)
    }
}

/// The contract the bus requires from whatever cooperative coroutine runtime
/// hosts it.
///
/// Implementations must uphold:
/// - `current()` is stable for the entire lifetime of one coroutine's
///   execution and distinct from every other live coroutine's id.
/// - `suspend()` only returns once some other coroutine has called
///   `wakeup(current())` (or an equivalent handle obtained before
///   suspending); it must not return spuriously with no wakeup pending, and
///   it must not return to a *different* coroutine than the one that called
///   it.
/// - `wakeup(id)` is idempotent: calling it on a coroutine that is already
///   runnable (queued to run, or running) must not panic and must not queue
///   a second wakeup.
/// - No method may be called from any thread other than the one cooperative
///   thread all coroutines share — the bus itself never does so, but a
///   caller driving the bus from a callback must respect this too.
pub trait Scheduler {
    /// Returns the handle of the coroutine currently executing.
    fn current(&self) -> CoroutineId;

    /// Suspends the current coroutine until it is woken via [`Self::wakeup`].
    fn suspend(&self);

    /// Marks `id` runnable. Has no effect if `id` is already runnable or has
    /// already finished running.
    fn wakeup(&self, id: CoroutineId);
}
