//! Error handling utils.
//!
//! The bus's error handling works much like libc's `errno`: every entry
//! point writes a [`ErrorKind`] into a thread-local "last error" cell before
//! returning, including on success (where it is cleared to
//! [`ErrorKind::None`]). This mirrors the flat C-shaped contract a cooperative
//! coroutine runtime expects (§6/§7 of the design), while every method on
//! [`crate::Bus`] *also* returns a [`Result`] so callers don't have to poll
//! global state to learn the outcome of their own call.
//!
//! You don't have to clear the last error before calling an entry point, and
//! a successful call may still touch it (it's reset to [`ErrorKind::None`]).
//! The value is only meaningful until the next entry point runs.

use std::cell::Cell;

/// A specialized [`Result`](std::result::Result) type for the crate.
pub type Result<T> = std::result::Result<T, ErrorKind>;

////////////////////////////////////////////////////////////////////////////////
// ErrorKind
////////////////////////////////////////////////////////////////////////////////

/// The exhaustive set of ways a bus operation can fail.
///
/// This enum is intentionally small and closed: the bus moves fixed-width
/// words between coroutines on one thread, so there is no I/O, encoding, or
/// allocator-failure surface worth modeling beyond these three kinds.
#[derive(Debug, thiserror::Error, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The last operation succeeded.
    #[error("no error")]
    None,

    /// The descriptor is out of range, its slot is empty, or the channel was
    /// closed while the caller was blocked on it.
    #[error("channel does not exist")]
    NoChannel,

    /// A non-blocking primitive found the channel in the wrong state: full
    /// for a send-family call, empty for a recv-family call, or (for
    /// broadcast) some channel was full. Blocking variants never surface
    /// this, except transiently before they retry or discover `NoChannel`.
    #[error("operation would block")]
    WouldBlock,
}

impl ErrorKind {
    /// `true` for every kind except [`ErrorKind::None`].
    #[inline]
    pub fn is_error(self) -> bool {
        !matches!(self, ErrorKind::None)
    }
}

////////////////////////////////////////////////////////////////////////////////
// Process-wide (thread-local) last error
////////////////////////////////////////////////////////////////////////////////

thread_local! {
    static LAST_ERROR: Cell<ErrorKind> = Cell::new(ErrorKind::None);
}

/// Returns the last error set by an entry point on this thread.
///
/// Every cooperative-scheduling thread running a [`crate::Bus`] has its own
/// independent last-error cell, consistent with "process-wide" meaning
/// "the one thread this single-threaded scheduler runs on" (§5 of the
/// design: there is no cross-thread concurrency in scope).
pub fn errno_get() -> ErrorKind {
    LAST_ERROR.with(Cell::get)
}

/// Sets the last error. Called by every entry point before it returns,
/// including on success (with [`ErrorKind::None`]).
pub(crate) fn errno_set(kind: ErrorKind) {
    LAST_ERROR.with(|cell| cell.set(kind));
}

/// Runs `f`, setting the thread-local last error to match the `ErrorKind`
/// carried by `f`'s result (`None` on `Ok`, the error itself on `Err`), and
/// returns `f`'s result unchanged.
///
/// Centralizes the "every entry point sets errno before returning" policy
/// so individual `Bus` methods don't each have to remember to call
/// [`errno_set`] on every return path.
pub(crate) fn with_errno<T>(f: impl FnOnce() -> Result<T>) -> Result<T> {
    let result = f();
    errno_set(result.as_ref().err().copied().unwrap_or(ErrorKind::None));
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errno_defaults_to_none() {
        assert_eq!(errno_get(), ErrorKind::None);
    }

    #[test]
    fn with_errno_tracks_success_and_failure() {
        let _: Result<()> = with_errno(|| Ok(()));
        assert_eq!(errno_get(), ErrorKind::None);

        let _: Result<()> = with_errno(|| Err(ErrorKind::WouldBlock));
        assert_eq!(errno_get(), ErrorKind::WouldBlock);

        let _: Result<()> = with_errno(|| Ok(()));
        assert_eq!(errno_get(), ErrorKind::None);
    }
}
