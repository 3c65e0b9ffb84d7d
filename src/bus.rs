//! The [`Bus`]: a slot table of channels, reachable by [`crate::Descriptor`],
//! driven by a single [`Scheduler`].
//!
//! Every public method funnels its `Result` through [`with_errno`] so the
//! last-error cell in [`crate::error`] always reflects the most recent
//! operation, mirroring the host library's dual "return code plus
//! `box_error_last`" convention (§7).

use std::rc::Rc;

use crate::channel::Channel as ChannelImpl;
use crate::config::BusConfig;
use crate::error::{self, with_errno, ErrorKind, Result};
use crate::scheduler::Scheduler;
use crate::{Descriptor, Word};

/// A bus of independently-addressed bounded channels.
///
/// Slots are reused on the lowest-free-index policy: closing descriptor 1
/// while 0 and 2 remain open means the next `channel_open` hands out 1
/// again, not 3 (§3, §4.3).
pub struct Bus {
    scheduler: Rc<dyn Scheduler>,
    slots: Vec<Option<ChannelImpl>>,
    config: BusConfig,
}

impl Bus {
    /// A bus with no channel-count or capacity limits, matching the
    /// distilled spec's literal (unbounded) behavior.
    pub fn new(scheduler: Rc<dyn Scheduler>) -> Self {
        Self::with_config(scheduler, BusConfig::default())
    }

    pub(crate) fn with_config(scheduler: Rc<dyn Scheduler>, config: BusConfig) -> Self {
        Self {
            scheduler,
            slots: Vec::new(),
            config,
        }
    }

    fn channel(&self, desc: Descriptor) -> Result<&ChannelImpl> {
        self.slots
            .get(desc)
            .and_then(Option::as_ref)
            .ok_or(ErrorKind::NoChannel)
    }

    fn channel_mut(&mut self, desc: Descriptor) -> Result<&mut ChannelImpl> {
        self.slots
            .get_mut(desc)
            .and_then(Option::as_mut)
            .ok_or(ErrorKind::NoChannel)
    }

    fn live_count(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    ////////////////////////////////////////////////////////////////////////
    // lifecycle
    ////////////////////////////////////////////////////////////////////////

    /// Opens a new channel of the given ring capacity (`0` for a rendezvous
    /// channel, §4.2) and returns its descriptor.
    ///
    /// Returns `None` if a configured limit (§11) is exceeded. Unlike every
    /// other entry point, a failed `channel_open` does **not** update the
    /// last-error cell — there is no meaningful error kind for "no slot
    /// available" in this crate's three-member [`ErrorKind`], and the
    /// distilled spec treats allocation failure as orthogonal to the
    /// errno-style protocol (§4.3, §7).
    pub fn channel_open(&mut self, capacity: usize) -> Option<Descriptor> {
        if let Some(max_capacity) = self.config.max_channel_capacity() {
            if capacity > max_capacity {
                return None;
            }
        }
        if let Some(max_channels) = self.config.max_channels() {
            if self.live_count() >= max_channels {
                return None;
            }
        }

        let desc = match self.slots.iter().position(Option::is_none) {
            Some(i) => {
                self.slots[i] = Some(ChannelImpl::new(capacity));
                i
            }
            None => {
                self.slots.push(Some(ChannelImpl::new(capacity)));
                self.slots.len() - 1
            }
        };
        log::trace!(target: crate::log::LOG_TARGET, "opened channel {} (capacity {})", desc, capacity);
        error::errno_set(ErrorKind::None);
        Some(desc)
    }

    /// Closes a channel, waking every parked waiter on both of its queues so
    /// each observes the channel is gone rather than hanging forever. A
    /// descriptor that is out of range or already closed is a harmless no-op
    /// (§4.3).
    pub fn channel_close(&mut self, desc: Descriptor) {
        if let Some(slot) = self.slots.get_mut(desc) {
            if let Some(chan) = slot.take() {
                log::trace!(target: crate::log::LOG_TARGET, "closing channel {}", desc);
                chan.close(&*self.scheduler);
            }
        }
        error::errno_set(ErrorKind::None);
    }

    ////////////////////////////////////////////////////////////////////////
    // non-blocking
    ////////////////////////////////////////////////////////////////////////

    pub fn try_send(&mut self, desc: Descriptor, word: Word) -> Result<()> {
        with_errno(|| {
            let scheduler = Rc::clone(&self.scheduler);
            self.channel_mut(desc)?.try_send(&*scheduler, word)
        })
    }

    pub fn try_recv(&mut self, desc: Descriptor) -> Result<Word> {
        with_errno(|| {
            let scheduler = Rc::clone(&self.scheduler);
            self.channel_mut(desc)?.try_recv(&*scheduler)
        })
    }

    pub fn try_send_v(&mut self, desc: Descriptor, words: &[Word]) -> Result<usize> {
        with_errno(|| {
            let scheduler = Rc::clone(&self.scheduler);
            self.channel_mut(desc)?.try_send_v(&*scheduler, words)
        })
    }

    pub fn try_recv_v(&mut self, desc: Descriptor, out: &mut [Word]) -> Result<usize> {
        with_errno(|| {
            let scheduler = Rc::clone(&self.scheduler);
            self.channel_mut(desc)?.try_recv_v(&*scheduler, out)
        })
    }

    /// Sends `word` to every open channel, or to none of them: if any
    /// channel would block, no channel is touched (§4.4). `NO_CHANNEL` if
    /// the bus currently has no open channel at all.
    pub fn try_broadcast(&mut self, word: Word) -> Result<()> {
        with_errno(|| {
            let scheduler = Rc::clone(&self.scheduler);
            self.try_broadcast_raw(word, &*scheduler)
        })
    }

    fn try_broadcast_raw(&mut self, word: Word, scheduler: &dyn Scheduler) -> Result<()> {
        if self.live_count() == 0 {
            return Err(ErrorKind::NoChannel);
        }
        if self.slots.iter().flatten().any(|c| c.would_block_on_send()) {
            return Err(ErrorKind::WouldBlock);
        }
        log::trace!(target: crate::log::LOG_TARGET, "broadcasting to {} channel(s)", self.live_count());
        for slot in self.slots.iter_mut().flatten() {
            slot.try_send(scheduler, word)
                .expect("would_block_on_send precheck guarantees this send succeeds");
        }
        Ok(())
    }

    ////////////////////////////////////////////////////////////////////////
    // blocking
    ////////////////////////////////////////////////////////////////////////

    /// Sends `word`, suspending the calling coroutine until there is room
    /// (or a parked receiver to hand off to directly, for a capacity-0
    /// channel) rather than returning `WOULD_BLOCK` (§4.4).
    pub fn send(&mut self, desc: Descriptor, word: Word) -> Result<()> {
        with_errno(|| self.blocking_send(desc, word))
    }

    pub fn recv(&mut self, desc: Descriptor) -> Result<Word> {
        with_errno(|| self.blocking_recv(desc))
    }

    pub fn send_v(&mut self, desc: Descriptor, words: &[Word]) -> Result<usize> {
        with_errno(|| self.blocking_send_v(desc, words))
    }

    pub fn recv_v(&mut self, desc: Descriptor, out: &mut [Word]) -> Result<usize> {
        with_errno(|| self.blocking_recv_v(desc, out))
    }

    pub fn broadcast(&mut self, word: Word) -> Result<()> {
        with_errno(|| self.blocking_broadcast(word))
    }

    fn blocking_send(&mut self, desc: Descriptor, word: Word) -> Result<()> {
        let scheduler = Rc::clone(&self.scheduler);
        if self.channel(desc)?.capacity() == 0 {
            return self.blocking_send_rendezvous(desc, word, &*scheduler);
        }
        loop {
            match self.channel_mut(desc)?.try_send(&*scheduler, word) {
                Ok(()) => {
                    // Chained fairness: if the buffer still has room, a
                    // parked sender behind us can proceed too without
                    // waiting for a receiver to drain anything (§4.4).
                    let chan = self.channel(desc)?;
                    if chan.len() < chan.capacity() {
                        chan.send_waiters().wake_first(&*scheduler);
                    }
                    return Ok(());
                }
                Err(ErrorKind::WouldBlock) => {
                    self.channel(desc)?.send_waiters().suspend_self(&*scheduler);
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn blocking_recv(&mut self, desc: Descriptor) -> Result<Word> {
        let scheduler = Rc::clone(&self.scheduler);
        if self.channel(desc)?.capacity() == 0 {
            return self.blocking_recv_rendezvous(desc, &*scheduler);
        }
        loop {
            match self.channel_mut(desc)?.try_recv(&*scheduler) {
                Ok(word) => {
                    let chan = self.channel(desc)?;
                    if chan.len() > 0 {
                        chan.recv_waiters().wake_first(&*scheduler);
                    }
                    return Ok(word);
                }
                Err(ErrorKind::WouldBlock) => {
                    self.channel(desc)?.recv_waiters().suspend_self(&*scheduler);
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn blocking_send_v(&mut self, desc: Descriptor, words: &[Word]) -> Result<usize> {
        if words.is_empty() {
            return Err(ErrorKind::WouldBlock);
        }
        let scheduler = Rc::clone(&self.scheduler);
        if self.channel(desc)?.capacity() == 0 {
            self.blocking_send_rendezvous(desc, words[0], &*scheduler)?;
            return Ok(1);
        }
        loop {
            match self.channel_mut(desc)?.try_send_v(&*scheduler, words) {
                Ok(n) => {
                    let chan = self.channel(desc)?;
                    if chan.len() < chan.capacity() {
                        chan.send_waiters().wake_first(&*scheduler);
                    }
                    return Ok(n);
                }
                Err(ErrorKind::WouldBlock) => {
                    self.channel(desc)?.send_waiters().suspend_self(&*scheduler);
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn blocking_recv_v(&mut self, desc: Descriptor, out: &mut [Word]) -> Result<usize> {
        if out.is_empty() {
            return Err(ErrorKind::WouldBlock);
        }
        let scheduler = Rc::clone(&self.scheduler);
        if self.channel(desc)?.capacity() == 0 {
            let word = self.blocking_recv_rendezvous(desc, &*scheduler)?;
            out[0] = word;
            return Ok(1);
        }
        loop {
            match self.channel_mut(desc)?.try_recv_v(&*scheduler, out) {
                Ok(n) => {
                    let chan = self.channel(desc)?;
                    if chan.len() > 0 {
                        chan.recv_waiters().wake_first(&*scheduler);
                    }
                    return Ok(n);
                }
                Err(ErrorKind::WouldBlock) => {
                    self.channel(desc)?.recv_waiters().suspend_self(&*scheduler);
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// The capacity-0 send path: try a direct hand-off, and if nobody is
    /// parked to receive it, park on `send_waiters` carrying the word
    /// itself. A single suspend either resolves the hand-off or observes the
    /// channel close — there is no ring storage to retry against, so unlike
    /// the buffered path this never loops (§4.2).
    fn blocking_send_rendezvous(
        &mut self,
        desc: Descriptor,
        word: Word,
        scheduler: &dyn Scheduler,
    ) -> Result<()> {
        if self.channel_mut(desc)?.try_send(scheduler, word).is_ok() {
            return Ok(());
        }
        let node = self
            .channel(desc)?
            .send_waiters()
            .suspend_self_with_payload(scheduler, word);
        if node.delivered() {
            Ok(())
        } else {
            Err(ErrorKind::NoChannel)
        }
    }

    /// Symmetric to [`Self::blocking_send_rendezvous`]: a parked receiver's
    /// node starts with no payload, and either a sender fills it directly or
    /// the channel closes out from under it.
    ///
    /// Parking here is also the moment this channel stops blocking sends, so
    /// any broadcaster waiting on it (§4.4) is woken to retry before we
    /// suspend ourselves.
    fn blocking_recv_rendezvous(&mut self, desc: Descriptor, scheduler: &dyn Scheduler) -> Result<Word> {
        if let Ok(word) = self.channel_mut(desc)?.try_recv(scheduler) {
            return Ok(word);
        }
        let chan = self.channel(desc)?;
        chan.broadcast_waiters().wake_first(scheduler);
        let node = chan.recv_waiters().suspend_self(scheduler);
        if node.delivered() {
            Ok(node.take_payload())
        } else {
            Err(ErrorKind::NoChannel)
        }
    }

    fn blocking_broadcast(&mut self, word: Word) -> Result<()> {
        let scheduler = Rc::clone(&self.scheduler);
        loop {
            match self.try_broadcast_raw(word, &*scheduler) {
                Ok(()) => return Ok(()),
                Err(ErrorKind::NoChannel) => return Err(ErrorKind::NoChannel),
                Err(ErrorKind::WouldBlock) => {
                    // Once woken, loop back and re-run the whole precheck,
                    // since a different channel may now be the blocker
                    // (§4.4).
                    //
                    // A buffered blocker is preferred: its `send_waiters` is
                    // woken with plain `wake_first` the same way the scalar
                    // blocking path parks there. A capacity-0 blocker's
                    // `send_waiters` holds only payload-carrying rendezvous
                    // senders (§4.2) — parking a bare node there would make
                    // `try_recv`'s hand-off panic pulling a payload that
                    // isn't there, so such a blocker is waited on through its
                    // dedicated `broadcast_waiters` queue instead, which a
                    // parking receiver wakes directly (see
                    // `blocking_recv_rendezvous`).
                    let buffered_blocker = self.slots.iter().position(
                        |s| matches!(s, Some(c) if c.capacity() > 0 && c.would_block_on_send()),
                    );
                    match buffered_blocker {
                        Some(desc) => {
                            if let Some(chan) = self.slots[desc].as_ref() {
                                chan.send_waiters().suspend_self(&*scheduler);
                            }
                        }
                        None => {
                            let rendezvous_blocker = self
                                .slots
                                .iter()
                                .position(|s| matches!(s, Some(c) if c.would_block_on_send()));
                            if let Some(desc) = rendezvous_blocker {
                                if let Some(chan) = self.slots[desc].as_ref() {
                                    chan.broadcast_waiters().suspend_self(&*scheduler);
                                }
                            }
                        }
                    }
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// Closes every live channel, waking its parked waiters with `NO_CHANNEL`
/// rather than leaving them to hang forever under plain RAII drop (§4.3
/// `delete`, §8 close-liveness).
impl Drop for Bus {
    fn drop(&mut self) {
        for desc in 0..self.slots.len() {
            self.channel_close(desc);
        }
    }
}
