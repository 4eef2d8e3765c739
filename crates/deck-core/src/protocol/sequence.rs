//! Request id allocation for `Init` and `InvokeMethod` frames.
//!
//! # Why request ids? (for beginners)
//!
//! The host answers every `Init` and `InvokeMethod` frame with a `Response`
//! carrying the same `id`.  Keeping the ids unique per channel lets the
//! transport match a response to the request that caused it (in practice the
//! client only waits for the `Init` reply; method results are ignored).
//!
//! # Thread safety
//!
//! The counter is an `AtomicU64`, so the proxy handed to the session can hand
//! out ids from any task without a lock.

use std::sync::atomic::{AtomicU64, Ordering};

/// A monotonically increasing id source, starting at 0.
///
/// # Examples
///
/// ```rust
/// use deck_core::protocol::RequestIds;
///
/// let ids = RequestIds::new();
/// assert_eq!(ids.next(), 0);
/// assert_eq!(ids.next(), 1);
/// ```
#[derive(Debug, Default)]
pub struct RequestIds {
    inner: AtomicU64,
}

impl RequestIds {
    /// Creates a counter whose first id is 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the next id.  Wraps at `u64::MAX` without panicking.
    pub fn next(&self) -> u64 {
        // Ids only need to be distinct, not to order other memory.
        self.inner.fetch_add(1, Ordering::Relaxed)
    }
}
