//! Logging utils. See ["log" crate documentation](https://docs.rs/log/) for
//! details.
//!
//! The bus never picks a logging backend for you: it only emits records
//! through the [`log`] facade, the way the host library this crate is
//! descended from wires its own C-side `say()` sink into the very same
//! facade. A host process installs whatever [`log::Log`] implementation it
//! likes (`env_logger`, a structured JSON sink, …); this module just names
//! the target the bus logs under and documents which events are emitted.
//!
//! ```no_run
//! use log::LevelFilter;
//!
//! env_logger::Builder::new()
//!     .filter_level(LevelFilter::Debug)
//!     .init();
//!
//! // Now `fiberbus` trace/debug/warn records show up via env_logger.
//! ```
//!
//! See [`crate::bus`] and [`crate::channel`] for the emission points:
//! - `trace!` on every `channel_open` / `channel_close`.
//! - `debug!` when a coroutine suspends on a wait queue, and when it is
//!   woken.
//! - `warn!` when `channel_close` runs with one or more waiters still
//!   parked.
//! - `trace!` on each `try_broadcast` attempt.

/// The `target` every log record emitted by this crate is tagged with, so a
/// host can filter on it independently of the module path.
pub const LOG_TARGET: &str = "fiberbus";
