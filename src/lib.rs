//! A cooperative in-process message bus multiplexing bounded FIFO channels
//! between single-threaded coroutines.
//!
//! A [`Bus`] owns a table of [`Descriptor`]-addressed channels, each a
//! bounded ring buffer of fixed-width [`Word`] messages with FIFO wait
//! queues on both the send and receive side. Everything here assumes exactly
//! one cooperative thread: no atomics, no locks, no `Send`/`Sync` — the
//! single-threaded non-goal is load-bearing, the same way the host library
//! this crate is descended from assumes one Tarantool event loop per
//! process. See [`scheduler`] for the boundary between this crate and
//! whatever coroutine runtime actually suspends and resumes execution.
//!
//! ```
//! use fiberbus::Bus;
//! # #[cfg(feature = "test-util")]
//! # fn run() {
//! use fiberbus::sim::SimScheduler;
//! use std::rc::Rc;
//!
//! let scheduler: Rc<dyn fiberbus::scheduler::Scheduler> = Rc::new(SimScheduler::new());
//! let mut bus = Bus::new(scheduler);
//! let d = bus.channel_open(4).expect("slot available");
//! bus.try_send(d, 42).unwrap();
//! assert_eq!(bus.try_recv(d), Ok(42));
//! # }
//! ```

pub mod bus;
pub mod config;
pub mod error;
pub mod log;
pub mod scheduler;

mod channel;
mod waitqueue;

#[cfg(feature = "test-util")]
pub mod sim;

pub use bus::Bus;
pub use config::{BusBuilder, BusConfig};
pub use error::{errno_get, ErrorKind, Result};

/// A single message. The bus moves fixed-width words, not arbitrary owned
/// values — any framing or serialization of richer payloads into words is a
/// concern for the layer above this crate (§3, Non-goals).
pub type Word = u64;

/// A bus-local handle identifying one open channel, returned by
/// [`Bus::channel_open`] and consumed by every other `Bus` method. Slots are
/// reused: a descriptor is only meaningful until the channel behind it is
/// closed, after which the same integer may be handed out again for an
/// unrelated channel (§3, §5).
pub type Descriptor = usize;
