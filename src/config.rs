//! Bus configuration.
//!
//! The distilled core treats a bus as unbounded: `channel_open` grows the
//! slot table forever rather than ever refusing a request. A host embedding
//! this crate usually wants limits, so [`BusBuilder`] exposes the two knobs
//! worth having without inventing a whole config-file story for a library
//! this small — the same builder shape the host library uses for spawn-time
//! options (`fiber::Builder::new().name(..).stack_size(..)`), just aimed at
//! bus-wide limits instead of one coroutine's attributes.

use std::rc::Rc;

use crate::scheduler::Scheduler;
use crate::Bus;

/// Validated limits a [`Bus`] enforces at `channel_open` time.
///
/// Both limits default to `None` (unbounded), matching the distilled
/// spec's literal behavior: a bus with the default config behaves exactly
/// like one built with [`Bus::new`].
#[derive(Debug, Clone, Copy, Default)]
pub struct BusConfig {
    max_channels: Option<usize>,
    max_channel_capacity: Option<usize>,
}

impl BusConfig {
    pub fn max_channels(&self) -> Option<usize> {
        self.max_channels
    }

    pub fn max_channel_capacity(&self) -> Option<usize> {
        self.max_channel_capacity
    }
}

/// Builds a [`BusConfig`] (and, via [`Self::build`], a whole [`Bus`]).
#[derive(Debug, Clone, Copy, Default)]
pub struct BusBuilder {
    config: BusConfig,
}

impl BusBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Caps the number of simultaneously open channels. Once reached,
    /// `channel_open` fails the way an allocator-exhaustion would: it
    /// returns `None` without disturbing the last-error cell (§4.3, §7).
    pub fn max_channels(mut self, max: usize) -> Self {
        self.config.max_channels = Some(max);
        self
    }

    /// Rejects `channel_open(capacity)` calls asking for more than `max`.
    pub fn max_channel_capacity(mut self, max: usize) -> Self {
        self.config.max_channel_capacity = Some(max);
        self
    }

    pub fn config(&self) -> BusConfig {
        self.config
    }

    /// Builds the [`Bus`] this configuration describes, driven by
    /// `scheduler`.
    pub fn build(self, scheduler: Rc<dyn Scheduler>) -> Bus {
        Bus::with_config(scheduler, self.config)
    }
}
