//! The wait queue: an ordered list of coroutine handles blocked on one
//! condition (channel-not-full or channel-not-empty).
//!
//! Waiter records are stack-scoped: the caller that suspends owns the
//! record (via an `Rc` so the queue can hold a non-owning-in-spirit
//! reference without `unsafe` intrusive linkage), and is responsible for
//! detaching it on every resumption path. The queue itself never owns
//! coroutine state — it only ever holds handles borrowed from whatever
//! [`Scheduler`] is driving things.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;

use crate::scheduler::{CoroutineId, Scheduler};
use crate::Word;

/// A single waiter's record.
///
/// `payload` and `delivered` are only meaningful for the capacity-0
/// rendezvous protocol (§4.2 of the design): a parked sender stores its word
/// here for a receiver to take directly, and a parked receiver's slot starts
/// empty for a sender to fill, bypassing ring storage entirely. Buffered
/// channels never touch these fields.
pub(crate) struct WaitNode {
    id: CoroutineId,
    woken: Cell<bool>,
    payload: Cell<Option<Word>>,
    delivered: Cell<bool>,
}

impl WaitNode {
    /// A plain waiter with no rendezvous payload (the common case: buffered
    /// channels, and a parked capacity-0 receiver).
    pub(crate) fn new(id: CoroutineId) -> Rc<Self> {
        Rc::new(Self {
            id,
            woken: Cell::new(false),
            payload: Cell::new(None),
            delivered: Cell::new(false),
        })
    }

    /// A waiter carrying a word to hand off directly (a parked capacity-0
    /// sender).
    pub(crate) fn with_payload(id: CoroutineId, word: Word) -> Rc<Self> {
        Rc::new(Self {
            id,
            woken: Cell::new(false),
            payload: Cell::new(Some(word)),
            delivered: Cell::new(false),
        })
    }

    /// Whether a rendezvous hand-off against this node completed (either
    /// direction) before it resumed. `false` after resumption means the
    /// channel closed instead of a counterpart showing up.
    pub(crate) fn delivered(&self) -> bool {
        self.delivered.get()
    }

    /// Takes the word left in this node's slot by a counterpart. Panics if
    /// nothing was delivered; callers must check [`Self::delivered`] first.
    pub(crate) fn take_payload(&self) -> Word {
        self.payload
            .take()
            .expect("take_payload called on a node with no delivered payload")
    }
}

////////////////////////////////////////////////////////////////////////////////
// WaitQueue
////////////////////////////////////////////////////////////////////////////////

#[derive(Default)]
pub(crate) struct WaitQueue {
    waiters: RefCell<VecDeque<Rc<WaitNode>>>,
}

impl WaitQueue {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.waiters.borrow().is_empty()
    }

    pub(crate) fn len(&self) -> usize {
        self.waiters.borrow().len()
    }

    /// Whether any waiter is parked and not yet marked runnable. Used to
    /// peek a queue's state (e.g. for `try_broadcast`'s all-or-nothing
    /// precheck) without consuming or waking anything.
    pub(crate) fn has_unwoken(&self) -> bool {
        self.waiters.borrow().iter().any(|n| !n.woken.get())
    }

    fn enqueue(&self, node: Rc<WaitNode>) {
        self.waiters.borrow_mut().push_back(node);
    }

    /// Detaches `node` from the queue if it's still linked. A no-op if
    /// `close` already removed it via [`Self::wake_all_detach`] — detaching
    /// must be safe to call unconditionally on every resumption path.
    fn detach(&self, node: &Rc<WaitNode>) {
        let mut waiters = self.waiters.borrow_mut();
        if let Some(pos) = waiters.iter().position(|n| Rc::ptr_eq(n, node)) {
            waiters.remove(pos);
        }
    }

    /// Enqueues a fresh waiter for the current coroutine, suspends it, and
    /// detaches it on resumption. Returns the node so the caller can inspect
    /// rendezvous state (for capacity-0 channels) after resuming.
    pub(crate) fn suspend_self(&self, scheduler: &dyn Scheduler) -> Rc<WaitNode> {
        let node = WaitNode::new(scheduler.current());
        self.enqueue(node.clone());
        log::debug!(target: crate::log::LOG_TARGET, "{} suspending", node.id);
        scheduler.suspend();
        self.detach(&node);
        log::debug!(target: crate::log::LOG_TARGET, "{} resumed", node.id);
        node
    }

    /// Same as [`Self::suspend_self`] but the waiter carries `word` for a
    /// receiver to take directly (capacity-0 rendezvous send path).
    pub(crate) fn suspend_self_with_payload(
        &self,
        scheduler: &dyn Scheduler,
        word: Word,
    ) -> Rc<WaitNode> {
        let node = WaitNode::with_payload(scheduler.current(), word);
        self.enqueue(node.clone());
        log::debug!(target: crate::log::LOG_TARGET, "{} suspending (rendezvous)", node.id);
        scheduler.suspend();
        self.detach(&node);
        log::debug!(target: crate::log::LOG_TARGET, "{} resumed (rendezvous)", node.id);
        node
    }

    /// Marks the first not-yet-woken waiter runnable, leaving its record in
    /// the queue (it detaches itself on resumption). Idempotent per waiter:
    /// a waiter already marked stays marked, so repeated calls before that
    /// waiter has actually resumed reach the *next* waiter, preserving FIFO
    /// order. Returns whether anyone was woken.
    pub(crate) fn wake_first(&self, scheduler: &dyn Scheduler) -> bool {
        let waiters = self.waiters.borrow();
        for node in waiters.iter() {
            if !node.woken.get() {
                node.woken.set(true);
                scheduler.wakeup(node.id);
                return true;
            }
        }
        false
    }

    /// Finds the first not-yet-woken waiter and hands `word` to it directly
    /// (capacity-0 rendezvous recv path: a sender delivering into a parked
    /// receiver's empty slot). Returns whether a waiter was found.
    pub(crate) fn deliver_to_first_waiting(&self, scheduler: &dyn Scheduler, word: Word) -> bool {
        let target = self
            .waiters
            .borrow()
            .iter()
            .find(|n| !n.woken.get())
            .cloned();
        match target {
            Some(node) => {
                node.payload.set(Some(word));
                node.delivered.set(true);
                node.woken.set(true);
                scheduler.wakeup(node.id);
                true
            }
            None => false,
        }
    }

    /// Finds the first not-yet-woken waiter and takes its payload
    /// (capacity-0 rendezvous send path: a receiver taking a word straight
    /// out of a parked sender's slot).
    pub(crate) fn take_from_first_waiting(&self, scheduler: &dyn Scheduler) -> Option<Word> {
        let target = self
            .waiters
            .borrow()
            .iter()
            .find(|n| !n.woken.get())
            .cloned();
        target.map(|node| {
            let word = node
                .payload
                .take()
                .expect("send-waiter node queued without a rendezvous payload");
            node.delivered.set(true);
            node.woken.set(true);
            scheduler.wakeup(node.id);
            word
        })
    }

    /// Pops every waiter, detaching each from the queue and marking it
    /// runnable, until the queue is empty. Used only by channel close: it
    /// decouples every waiter from this queue's storage *before* that
    /// storage is freed, so a woken coroutine never touches freed memory on
    /// resumption.
    pub(crate) fn wake_all_detach(&self, scheduler: &dyn Scheduler) {
        let drained: Vec<_> = self.waiters.borrow_mut().drain(..).collect();
        for node in drained {
            node.woken.set(true);
            scheduler.wakeup(node.id);
        }
    }
}
