//! Background Expiry Waiter
//!
//! This module implements autonomous deletion of entries whose TTL has
//! elapsed. A single background task serves every armed key; there is
//! never one task per key.
//!
//! ## Design
//!
//! Arming a TTL pushes a [`Deadline`] onto a shared min-heap and wakes
//! the waiter. The waiter sleeps until the earliest deadline, pops
//! everything due, and deletes the matching entries under the store's
//! write lock. Because firing takes the same lock as every other
//! operation, a delete-on-expiry can never race an in-flight read or
//! write of the same key.
//!
//! ## Arm Tokens
//!
//! Every arm draws a fresh token from a shared counter and records it in
//! both the heap record and the entry. Rearming therefore never touches
//! the old record: it simply pushes a new one and stores the new token
//! on the entry. When the old record fires, the token no longer matches
//! and the record is discarded as stale. This makes the two classic
//! timer-per-key hazards unrepresentable:
//!
//! - rearming a key whose timer already fired always takes effect (a new
//!   record is pushed; there is no dead waiter to resurrect), and
//! - a deadline armed for a value that has since been overwritten never
//!   deletes its replacement.
//!
//! Expiration is fire-and-forget: it never produces an error observable
//! by any caller, and a stale record is dropped silently.

use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tokio::sync::{watch, Notify};
use tracing::{debug, trace};

use super::engine::StoreInner;

/// Identity of a single arm of a single entry. Unique for the lifetime
/// of the store.
pub(crate) type ArmToken = u64;

/// One armed expiration: delete `key` at `at`, provided the entry still
/// carries `token`.
#[derive(Debug)]
pub(crate) struct Deadline {
    pub(crate) at: Instant,
    pub(crate) key: String,
    pub(crate) token: ArmToken,
}

impl PartialEq for Deadline {
    fn eq(&self, other: &Self) -> bool {
        self.at == other.at && self.token == other.token
    }
}

impl Eq for Deadline {}

impl PartialOrd for Deadline {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Deadline {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.at.cmp(&other.at).then(self.token.cmp(&other.token))
    }
}

/// Min-heap of armed deadlines, shared between the store handle (which
/// pushes) and the waiter (which pops).
pub(crate) struct ExpiryQueue {
    deadlines: Mutex<BinaryHeap<Reverse<Deadline>>>,
    /// Wakes the waiter whenever an arm may have moved the earliest
    /// deadline forward
    pub(crate) wakeup: Notify,
    next_token: AtomicU64,
}

impl ExpiryQueue {
    pub(crate) fn new() -> Self {
        Self {
            deadlines: Mutex::new(BinaryHeap::new()),
            wakeup: Notify::new(),
            next_token: AtomicU64::new(0),
        }
    }

    /// Pushes a deadline for `key` at `at` and wakes the waiter.
    ///
    /// # Returns
    ///
    /// Returns the token the caller must record on the entry for the
    /// deadline to be honored.
    pub(crate) fn arm(&self, key: &str, at: Instant) -> ArmToken {
        let token = self.next_token.fetch_add(1, Ordering::Relaxed);
        self.deadlines.lock().unwrap().push(Reverse(Deadline {
            at,
            key: key.to_string(),
            token,
        }));
        self.wakeup.notify_one();
        token
    }

    /// Returns the earliest armed deadline, if any.
    pub(crate) fn next_deadline(&self) -> Option<Instant> {
        self.deadlines
            .lock()
            .unwrap()
            .peek()
            .map(|Reverse(deadline)| deadline.at)
    }

    /// Pops every deadline due at `now`.
    pub(crate) fn pop_due(&self, now: Instant) -> Vec<Deadline> {
        let mut heap = self.deadlines.lock().unwrap();
        let mut due = Vec::new();
        while heap
            .peek()
            .is_some_and(|Reverse(deadline)| deadline.at <= now)
        {
            due.push(heap.pop().unwrap().0);
        }
        due
    }
}

/// The waiter task: sleeps until the earliest deadline, fires everything
/// due, repeats until shutdown.
pub(crate) async fn expiry_loop(inner: Arc<StoreInner>, mut shutdown_rx: watch::Receiver<bool>) {
    loop {
        let next = inner.queue.next_deadline();

        tokio::select! {
            _ = sleep_until_deadline(next) => {
                let now = Instant::now();
                for deadline in inner.queue.pop_due(now) {
                    if inner.remove_expired(&deadline) {
                        debug!(key = %deadline.key, "entry expired");
                    } else {
                        trace!(
                            key = %deadline.key,
                            token = deadline.token,
                            "stale deadline discarded"
                        );
                    }
                }
            }
            _ = inner.queue.wakeup.notified() => {
                // A new arm may have moved the earliest deadline; recompute.
            }
            result = shutdown_rx.changed() => {
                if result.is_err() || *shutdown_rx.borrow() {
                    debug!("expiry waiter received shutdown signal");
                    return;
                }
            }
        }
    }
}

/// Sleeps until the given deadline, or forever when nothing is armed.
async fn sleep_until_deadline(deadline: Option<Instant>) {
    match deadline {
        Some(at) => tokio::time::sleep_until(at.into()).await,
        None => std::future::pending().await,
    }
}
