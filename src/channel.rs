//! A single bounded ring-buffer channel: the non-blocking primitives
//! (`try_send`/`try_recv`/`try_send_v`/`try_recv_v`) plus its two wait
//! queues. This is an internal building block; hosts interact with channels
//! only through a [`crate::Bus`] and a [`crate::Descriptor`] — the channel
//! never knows its own descriptor or which bus owns it, matching "ownership
//! is the bus's, not the channel's" (§3 of the design).

use crate::error::{ErrorKind, Result};
use crate::scheduler::Scheduler;
use crate::waitqueue::WaitQueue;
use crate::Word;

pub(crate) struct Channel {
    capacity: usize,
    /// Ring storage, length always equal to `capacity`. Empty for a
    /// capacity-0 (rendezvous) channel.
    buffer: Vec<Word>,
    head: usize,
    size: usize,
    send_waiters: WaitQueue,
    recv_waiters: WaitQueue,
    /// Parked broadcasters blocked on this channel being the bottleneck.
    ///
    /// Only ever populated for a capacity-0 channel: `send_waiters` on such a
    /// channel holds nothing but payload-carrying rendezvous senders, taken
    /// via `take_from_first_waiting`, which panics if it finds a bare node
    /// (§4.2). A blocked broadcaster is a bare node with nothing to hand off
    /// to a single channel, so it cannot share that queue — it parks here
    /// instead, woken whenever a receiver parks on `recv_waiters` and makes
    /// this channel stop blocking sends.
    broadcast_waiters: WaitQueue,
}

impl Channel {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            capacity,
            buffer: vec![0; capacity],
            head: 0,
            size: 0,
            send_waiters: WaitQueue::new(),
            recv_waiters: WaitQueue::new(),
            broadcast_waiters: WaitQueue::new(),
        }
    }

    pub(crate) fn capacity(&self) -> usize {
        self.capacity
    }

    pub(crate) fn len(&self) -> usize {
        self.size
    }

    pub(crate) fn send_waiters(&self) -> &WaitQueue {
        &self.send_waiters
    }

    pub(crate) fn recv_waiters(&self) -> &WaitQueue {
        &self.recv_waiters
    }

    pub(crate) fn broadcast_waiters(&self) -> &WaitQueue {
        &self.broadcast_waiters
    }

    /// Whether a send on this channel would block *right now*, without
    /// performing one. Used by `try_broadcast` to check every channel
    /// before committing to any of them (§4.4: broadcast is all-or-nothing).
    ///
    /// For a buffered channel this is simply "full". For a capacity-0
    /// channel there is no buffer to be full, so the equivalent condition is
    /// "no parked receiver is ready for a direct hand-off" (§4.2).
    pub(crate) fn would_block_on_send(&self) -> bool {
        if self.capacity == 0 {
            !self.recv_waiters.has_unwoken()
        } else {
            self.size == self.capacity
        }
    }

    pub(crate) fn try_send(&mut self, scheduler: &dyn Scheduler, word: Word) -> Result<()> {
        if self.capacity == 0 {
            return if self.recv_waiters.deliver_to_first_waiting(scheduler, word) {
                Ok(())
            } else {
                Err(ErrorKind::WouldBlock)
            };
        }
        if self.size == self.capacity {
            return Err(ErrorKind::WouldBlock);
        }
        let index = (self.head + self.size) % self.capacity;
        self.buffer[index] = word;
        self.size += 1;
        self.recv_waiters.wake_first(scheduler);
        Ok(())
    }

    pub(crate) fn try_recv(&mut self, scheduler: &dyn Scheduler) -> Result<Word> {
        if self.capacity == 0 {
            return match self.send_waiters.take_from_first_waiting(scheduler) {
                Some(word) => Ok(word),
                None => Err(ErrorKind::WouldBlock),
            };
        }
        if self.size == 0 {
            return Err(ErrorKind::WouldBlock);
        }
        let word = self.buffer[self.head];
        self.head = (self.head + 1) % self.capacity;
        self.size -= 1;
        self.send_waiters.wake_first(scheduler);
        Ok(word)
    }

    /// Copies `min(words.len(), capacity - size)` words into the ring and
    /// returns the count written (`>= 1` on success). On a capacity-0
    /// channel this degenerates to a single rendezvous hand-off of
    /// `words[0]` — there is no buffer to absorb more than one word without
    /// a parked counterpart for each.
    pub(crate) fn try_send_v(&mut self, scheduler: &dyn Scheduler, words: &[Word]) -> Result<usize> {
        if self.capacity == 0 {
            if words.is_empty() {
                return Err(ErrorKind::WouldBlock);
            }
            return self.try_send(scheduler, words[0]).map(|()| 1);
        }
        if self.size == self.capacity {
            return Err(ErrorKind::WouldBlock);
        }
        let n = words.len().min(self.capacity - self.size);
        for &word in &words[..n] {
            let index = (self.head + self.size) % self.capacity;
            self.buffer[index] = word;
            self.size += 1;
        }
        if n > 0 {
            self.recv_waiters.wake_first(scheduler);
        }
        Ok(n)
    }

    /// Symmetric to [`Self::try_send_v`]: drains up to `out.len()` words,
    /// returns the count read (`>= 1` on success).
    pub(crate) fn try_recv_v(&mut self, scheduler: &dyn Scheduler, out: &mut [Word]) -> Result<usize> {
        if self.capacity == 0 {
            if out.is_empty() {
                return Err(ErrorKind::WouldBlock);
            }
            return self.try_recv(scheduler).map(|word| {
                out[0] = word;
                1
            });
        }
        if self.size == 0 {
            return Err(ErrorKind::WouldBlock);
        }
        let n = out.len().min(self.size);
        for slot in out.iter_mut().take(n) {
            *slot = self.buffer[self.head];
            self.head = (self.head + 1) % self.capacity;
            self.size -= 1;
        }
        if n > 0 {
            self.send_waiters.wake_first(scheduler);
        }
        Ok(n)
    }

    /// Detaches every parked waiter from both queues (waking each so it can
    /// observe the channel is gone) and then drops, releasing the buffer.
    /// Must only be called after the owning bus slot has already been
    /// emptied — see [`crate::Bus::channel_close`] for the full
    /// detach-before-free sequence (§4.2/§5).
    pub(crate) fn close(self, scheduler: &dyn Scheduler) {
        let waiters = self.send_waiters.len() + self.recv_waiters.len() + self.broadcast_waiters.len();
        if waiters > 0 {
            log::warn!(
                target: crate::log::LOG_TARGET,
                "closing channel with {} parked waiter(s)",
                waiters
            );
        }
        self.send_waiters.wake_all_detach(scheduler);
        self.recv_waiters.wake_all_detach(scheduler);
        self.broadcast_waiters.wake_all_detach(scheduler);
        // `self` (and its `buffer`) is dropped here, after every queue has
        // been emptied — the detach-before-free invariant.
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::CoroutineId;
    use std::cell::Cell;

    #[derive(Default)]
    struct NullScheduler {
        current: Cell<u64>,
    }

    impl Scheduler for NullScheduler {
        fn current(&self) -> CoroutineId {
            CoroutineId(self.current.get())
        }
        fn suspend(&self) {
            panic!("not exercised at this layer");
        }
        fn wakeup(&self, _id: CoroutineId) {}
    }

    #[test]
    fn bounded_fifo_order() {
        let sched = NullScheduler::default();
        let mut chan = Channel::new(2);
        chan.try_send(&sched, 1).unwrap();
        chan.try_send(&sched, 2).unwrap();
        assert_eq!(chan.try_send(&sched, 3), Err(ErrorKind::WouldBlock));
        assert_eq!(chan.try_recv(&sched), Ok(1));
        assert_eq!(chan.try_recv(&sched), Ok(2));
        assert_eq!(chan.try_recv(&sched), Err(ErrorKind::WouldBlock));
    }

    #[test]
    fn capacity_zero_never_buffers() {
        let sched = NullScheduler::default();
        let mut chan = Channel::new(0);
        // Nobody parked yet: both directions would block immediately.
        assert_eq!(chan.try_send(&sched, 1), Err(ErrorKind::WouldBlock));
        assert_eq!(chan.try_recv(&sched), Err(ErrorKind::WouldBlock));
        assert_eq!(chan.len(), 0);
    }

    #[test]
    fn vectorised_send_partial_fill_and_wake() {
        let sched = NullScheduler::default();
        let mut chan = Channel::new(4);
        chan.try_send(&sched, 99).unwrap();
        let n = chan.try_send_v(&sched, &[1, 2, 3, 4, 5]).unwrap();
        assert_eq!(n, 3); // only 3 slots were free
        assert_eq!(chan.len(), 4);
        assert_eq!(chan.try_recv(&sched), Ok(99));
        assert_eq!(chan.try_recv(&sched), Ok(1));
        assert_eq!(chan.try_recv(&sched), Ok(2));
        assert_eq!(chan.try_recv(&sched), Ok(3));
    }

    #[test]
    fn vectorised_recv_drains_in_order() {
        let sched = NullScheduler::default();
        let mut chan = Channel::new(4);
        for w in [10, 20, 30] {
            chan.try_send(&sched, w).unwrap();
        }
        let mut out = [0u64; 4];
        let n = chan.try_recv_v(&sched, &mut out).unwrap();
        assert_eq!(n, 3);
        assert_eq!(&out[..3], &[10, 20, 30]);
        assert_eq!(chan.len(), 0);
    }

    #[test]
    fn would_block_on_send_matches_try_send_outcome() {
        let sched = NullScheduler::default();
        let mut chan = Channel::new(1);
        assert!(!chan.would_block_on_send());
        chan.try_send(&sched, 1).unwrap();
        assert!(chan.would_block_on_send());
        assert_eq!(chan.try_send(&sched, 2), Err(ErrorKind::WouldBlock));
    }
}
