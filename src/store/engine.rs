//! Thread-Safe Store Engine with Expiry Support
//!
//! This module implements the core store for emberkv: one mapping from
//! string keys to typed entries, guarded by a single reader/writer lock.
//!
//! ## Design Decisions
//!
//! 1. **One store-wide RwLock**: reads run concurrently, every mutation
//!    is exclusive, so no caller ever observes a partially-updated hash
//!    or list.
//! 2. **Typed entries**: each entry holds a tagged [`Value`] (scalar,
//!    hash, or list); a type mismatch is one discriminant check.
//! 3. **Event-driven expiry**: arming a TTL pushes a deadline onto a
//!    shared min-heap; one background task sleeps until the earliest
//!    deadline and deletes the entry (see the `expiry` module).
//! 4. **Arm tokens**: every arm carries a unique token matched against
//!    the live entry at fire time, so a deadline armed for a value that
//!    has since been overwritten or refreshed never deletes its
//!    replacement.
//!
//! ## Concurrency Model
//!
//! ```text
//! ┌───────────────────────────────────────────────────────┐
//! │                       Store                           │
//! │   ┌───────────────────────┐   ┌───────────────────┐   │
//! │   │ RwLock<HashMap<..>>   │   │   ExpiryQueue     │   │
//! │   │ key → Entry           │◀──│   (min-heap of    │   │
//! │   │ (Scalar|Hash|List)    │   │    deadlines)     │   │
//! │   └───────────────────────┘   └─────────▲─────────┘   │
//! │               ▲                         │             │
//! │               └───── expiry waiter ─────┘             │
//! │                    (background task)                  │
//! └───────────────────────────────────────────────────────┘
//! ```

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tracing::info;

use super::error::{StoreError, StoreResult};
use super::expiry::{expiry_loop, ArmToken, Deadline, ExpiryQueue};
use super::value::{Scalar, Value};

/// The unit stored per key: a tagged value plus optional expiration state.
#[derive(Debug, Clone)]
pub(crate) struct Entry {
    /// The stored value
    pub(crate) value: Value,
    /// When this entry expires (None = never expires)
    pub(crate) expires_at: Option<Instant>,
    /// Token of the most recent arm for this entry, if any.
    /// A firing deadline must present the same token to delete the entry.
    pub(crate) armed: Option<ArmToken>,
}

impl Entry {
    fn new(value: Value) -> Self {
        Self {
            value,
            expires_at: None,
            armed: None,
        }
    }
}

/// Shared state between the [`Store`] handle and the expiry waiter.
pub(crate) struct StoreInner {
    /// The key-to-entry mapping, behind the single store-wide lock
    entries: RwLock<HashMap<String, Entry>>,
    /// Armed deadlines, consumed by the expiry waiter
    pub(crate) queue: ExpiryQueue,
    /// Cumulative count of autonomously expired entries
    expired: AtomicU64,
}

impl StoreInner {
    fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            queue: ExpiryQueue::new(),
            expired: AtomicU64::new(0),
        }
    }

    /// Deletes the entry a fired deadline was armed for.
    ///
    /// The entry is removed only if it still carries the deadline's arm
    /// token; a key that was overwritten, refreshed, or re-set since the
    /// arm holds a different token and is left alone.
    ///
    /// # Returns
    ///
    /// Returns `true` if the entry was removed, `false` if the deadline
    /// was stale.
    pub(crate) fn remove_expired(&self, deadline: &Deadline) -> bool {
        let mut entries = self.entries.write().unwrap();
        match entries.get(&deadline.key) {
            Some(entry) if entry.armed == Some(deadline.token) => {
                entries.remove(&deadline.key);
                self.expired.fetch_add(1, Ordering::Relaxed);
                true
            }
            _ => false,
        }
    }
}

/// The main store for emberkv.
///
/// One mapping from string keys to typed entries, safe to share across
/// threads and tasks. Scalars are set and read whole; hashes merge
/// fields in place; lists grow by appending and are read by sub-range.
/// Any entry can carry a TTL, after which it is deleted autonomously by
/// a background waiter.
///
/// # Thread Safety
///
/// All operations take `&self` and are safe to call concurrently. Wrap
/// the store in an `Arc` to share it.
///
/// # Runtime
///
/// `Store::new` spawns the expiry waiter, so it must be called from
/// within a Tokio runtime. Dropping the store shuts the waiter down.
///
/// # Example
///
/// ```
/// use emberkv::store::{Scalar, Store};
/// use std::time::Duration;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let store = Store::new();
///
/// store.set("name", "ember").unwrap();
/// assert_eq!(store.get("name").unwrap(), Scalar::Str("ember".to_string()));
///
/// // Set with expiry
/// store.set_with_ttl("session", "abc123", Duration::from_secs(60)).unwrap();
/// # }
/// ```
pub struct Store {
    inner: Arc<StoreInner>,
    /// Sender to signal waiter shutdown
    shutdown_tx: watch::Sender<bool>,
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("keys", &self.key_count())
            .field("expired", &self.inner.expired.load(Ordering::Relaxed))
            .finish()
    }
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

impl Store {
    /// Creates a new store and starts its background expiry waiter.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn new() -> Self {
        let inner = Arc::new(StoreInner::new());
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        tokio::spawn(expiry_loop(Arc::clone(&inner), shutdown_rx));

        info!("store created, expiry waiter started");

        Self { inner, shutdown_tx }
    }

    /// Stores a scalar value under a key, with no expiration.
    ///
    /// Replaces any prior entry wholesale, whatever its kind, and
    /// defuses any pending expiration for the key.
    ///
    /// # Errors
    ///
    /// Returns `WrongDataType` if `value` is a hash or a list.
    pub fn set(&self, key: impl Into<String>, value: impl Into<Value>) -> StoreResult<()> {
        let value = value.into();
        if value.as_scalar().is_none() {
            return Err(StoreError::WrongDataType);
        }

        let mut entries = self.inner.entries.write().unwrap();
        entries.insert(key.into(), Entry::new(value));
        Ok(())
    }

    /// Stores a scalar value under a key with a time-to-live.
    ///
    /// As [`set`](Store::set), but when `ttl` is non-zero the entry is
    /// armed for autonomous deletion `ttl` after this call.
    /// `Duration::ZERO` means no expiration.
    ///
    /// # Errors
    ///
    /// Returns `WrongDataType` if `value` is a hash or a list.
    pub fn set_with_ttl(
        &self,
        key: impl Into<String>,
        value: impl Into<Value>,
        ttl: Duration,
    ) -> StoreResult<()> {
        let value = value.into();
        if value.as_scalar().is_none() {
            return Err(StoreError::WrongDataType);
        }

        let key = key.into();
        let mut entry = Entry::new(value);

        let mut entries = self.inner.entries.write().unwrap();
        if ttl > Duration::ZERO {
            let at = Instant::now() + ttl;
            entry.armed = Some(self.inner.queue.arm(&key, at));
            entry.expires_at = Some(at);
        }
        entries.insert(key, entry);
        Ok(())
    }

    /// Returns the scalar value stored under a key.
    ///
    /// # Errors
    ///
    /// Returns `KeyNotFound` if the key is absent, `WrongDataType` if
    /// the key holds a hash or a list.
    pub fn get(&self, key: &str) -> StoreResult<Scalar> {
        let entries = self.inner.entries.read().unwrap();
        let entry = entries.get(key).ok_or(StoreError::KeyNotFound)?;
        entry
            .value
            .as_scalar()
            .cloned()
            .ok_or(StoreError::WrongDataType)
    }

    /// Merges fields into the hash stored under a key.
    ///
    /// `args` is a flattened alternating sequence of (field name, field
    /// value) pairs; names must be string scalars. Creates the hash if
    /// the key does not exist; otherwise new fields are added and
    /// existing fields overwritten. Arguments are validated in full
    /// before anything is written, so a failed call merges nothing.
    ///
    /// # Errors
    ///
    /// Returns `WrongArgumentCount` if `args` has odd length,
    /// `WrongDataType` if a name position is not a string scalar or the
    /// key holds a non-hash value.
    pub fn hash_merge(&self, key: impl Into<String>, args: &[Value]) -> StoreResult<()> {
        if args.len() % 2 != 0 {
            return Err(StoreError::WrongArgumentCount);
        }

        // Validate every pair up front: no partial merge on failure.
        let mut fields = Vec::with_capacity(args.len() / 2);
        for pair in args.chunks_exact(2) {
            let name = pair[0]
                .as_field_name()
                .ok_or(StoreError::WrongDataType)?
                .to_string();
            fields.push((name, pair[1].clone()));
        }

        let key = key.into();
        let mut entries = self.inner.entries.write().unwrap();
        match entries.get_mut(&key) {
            Some(entry) => match &mut entry.value {
                Value::Hash(map) => {
                    for (name, value) in fields {
                        map.insert(name, value);
                    }
                    Ok(())
                }
                _ => Err(StoreError::WrongDataType),
            },
            None => {
                let map: HashMap<String, Value> = fields.into_iter().collect();
                entries.insert(key, Entry::new(Value::Hash(map)));
                Ok(())
            }
        }
    }

    /// Returns a copy of the full field mapping of the hash under a key.
    ///
    /// The returned map is a snapshot; mutating it does not affect the
    /// store.
    ///
    /// # Errors
    ///
    /// Returns `KeyNotFound` if the key is absent, `WrongDataType` if
    /// the key holds a non-hash value.
    pub fn hash_get_all(&self, key: &str) -> StoreResult<HashMap<String, Value>> {
        let entries = self.inner.entries.read().unwrap();
        let entry = entries.get(key).ok_or(StoreError::KeyNotFound)?;
        match &entry.value {
            Value::Hash(map) => Ok(map.clone()),
            _ => Err(StoreError::WrongDataType),
        }
    }

    /// Appends elements to the list stored under a key.
    ///
    /// Creates the list if the key does not exist; otherwise the
    /// elements are appended to the end in call order, preserving prior
    /// order.
    ///
    /// # Errors
    ///
    /// Returns `WrongDataType` if the key holds a non-list value.
    pub fn list_append(&self, key: impl Into<String>, elements: Vec<Value>) -> StoreResult<()> {
        let key = key.into();
        let mut entries = self.inner.entries.write().unwrap();
        match entries.get_mut(&key) {
            Some(entry) => match &mut entry.value {
                Value::List(items) => {
                    items.extend(elements);
                    Ok(())
                }
                _ => Err(StoreError::WrongDataType),
            },
            None => {
                entries.insert(key, Entry::new(Value::List(elements)));
                Ok(())
            }
        }
    }

    /// Returns the sub-sequence `[start, start + length)` of the list
    /// under a key, in original order.
    ///
    /// `length < 0` is a sentinel meaning "to the end of the list"; in
    /// that case no bounds are checked and a `start` at or past the end
    /// yields an empty vector.
    ///
    /// # Errors
    ///
    /// Returns `KeyNotFound` if the key is absent, `WrongDataType` if
    /// the key holds a non-list value, `IndexOutOfRange` if
    /// `length >= 0` and `start` or `start + length` exceeds the list's
    /// length.
    pub fn list_range(&self, key: &str, start: usize, length: i64) -> StoreResult<Vec<Value>> {
        let entries = self.inner.entries.read().unwrap();
        let entry = entries.get(key).ok_or(StoreError::KeyNotFound)?;
        let items = match &entry.value {
            Value::List(items) => items,
            _ => return Err(StoreError::WrongDataType),
        };

        if length < 0 {
            return Ok(items.iter().skip(start).cloned().collect());
        }

        let end = start
            .checked_add(length as usize)
            .ok_or(StoreError::IndexOutOfRange)?;
        if start > items.len() || end > items.len() {
            return Err(StoreError::IndexOutOfRange);
        }
        Ok(items[start..end].to_vec())
    }

    /// Returns the current number of live entries.
    ///
    /// Entries whose TTL has logically elapsed but whose deadline has
    /// not yet fired are still counted (best-effort consistency under
    /// concurrent expiration).
    pub fn key_count(&self) -> usize {
        self.inner.entries.read().unwrap().len()
    }

    /// Re-arms (or arms for the first time) the expiration of an
    /// existing key with a new duration.
    ///
    /// No-op if the key does not exist. `Duration::ZERO` disarms, making
    /// the entry persistent. A deadline already in flight for the key
    /// becomes stale and will not fire.
    pub fn refresh_ttl(&self, key: &str, ttl: Duration) {
        let mut entries = self.inner.entries.write().unwrap();
        if let Some(entry) = entries.get_mut(key) {
            if ttl > Duration::ZERO {
                let at = Instant::now() + ttl;
                entry.armed = Some(self.inner.queue.arm(key, at));
                entry.expires_at = Some(at);
            } else {
                entry.armed = None;
                entry.expires_at = None;
            }
        }
    }

    /// Checks if a key exists.
    pub fn exists(&self, key: &str) -> bool {
        self.inner.entries.read().unwrap().contains_key(key)
    }

    /// Returns the remaining time-to-live of a key.
    ///
    /// # Returns
    ///
    /// - `None` if the key does not exist
    /// - `Some(None)` if the key exists with no expiration
    /// - `Some(Some(remaining))` if the key is armed
    pub fn remaining_ttl(&self, key: &str) -> Option<Option<Duration>> {
        let entries = self.inner.entries.read().unwrap();
        entries.get(key).map(|entry| {
            entry
                .expires_at
                .map(|at| at.saturating_duration_since(Instant::now()))
        })
    }

    /// Returns store statistics.
    pub fn stats(&self) -> StoreStats {
        StoreStats {
            keys: self.key_count(),
            expired: self.inner.expired.load(Ordering::Relaxed),
        }
    }
}

impl Drop for Store {
    fn drop(&mut self) {
        // Tells the expiry waiter to exit.
        let _ = self.shutdown_tx.send(true);
    }
}

/// Store statistics.
#[derive(Debug, Clone, Copy)]
pub struct StoreStats {
    /// Number of live entries
    pub keys: usize,
    /// Cumulative count of autonomously expired entries
    pub expired: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_and_get() {
        let store = Store::new();

        store.set("int", 42i64).unwrap();
        store.set("float", 2.5f64).unwrap();
        store.set("str", "hello").unwrap();

        assert_eq!(store.get("int").unwrap(), Scalar::Int(42));
        assert_eq!(store.get("float").unwrap(), Scalar::Float(2.5));
        assert_eq!(store.get("str").unwrap(), Scalar::Str("hello".to_string()));
    }

    #[tokio::test]
    async fn test_get_nonexistent() {
        let store = Store::new();
        assert_eq!(store.get("nonexistent"), Err(StoreError::KeyNotFound));
    }

    #[tokio::test]
    async fn test_set_rejects_non_scalar() {
        let store = Store::new();

        assert_eq!(
            store.set("h", Value::Hash(HashMap::new())),
            Err(StoreError::WrongDataType)
        );
        assert_eq!(
            store.set("l", Value::List(vec![1i64.into()])),
            Err(StoreError::WrongDataType)
        );
        // Nothing was stored
        assert_eq!(store.key_count(), 0);
    }

    #[tokio::test]
    async fn test_get_wrong_kind() {
        let store = Store::new();

        store.hash_merge("h", &["a".into(), 1i64.into()]).unwrap();
        store.list_append("l", vec!["x".into()]).unwrap();

        assert_eq!(store.get("h"), Err(StoreError::WrongDataType));
        assert_eq!(store.get("l"), Err(StoreError::WrongDataType));
    }

    #[tokio::test]
    async fn test_set_retypes_key() {
        let store = Store::new();

        store.list_append("key", vec!["x".into()]).unwrap();
        assert_eq!(store.get("key"), Err(StoreError::WrongDataType));

        // A plain set replaces the prior entry wholesale
        store.set("key", "scalar now").unwrap();
        assert_eq!(
            store.get("key").unwrap(),
            Scalar::Str("scalar now".to_string())
        );
        assert_eq!(store.key_count(), 1);
    }

    #[tokio::test]
    async fn test_hash_merge_disjoint_fields() {
        let store = Store::new();

        store.hash_merge("h", &["a".into(), 1i64.into()]).unwrap();
        store.hash_merge("h", &["b".into(), 2i64.into()]).unwrap();

        let all = store.hash_get_all("h").unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all["a"], Value::from(1i64));
        assert_eq!(all["b"], Value::from(2i64));
    }

    #[tokio::test]
    async fn test_hash_merge_overwrites_field() {
        let store = Store::new();

        store.hash_merge("h", &["a".into(), 1i64.into()]).unwrap();
        store.hash_merge("h", &["a".into(), 2i64.into()]).unwrap();

        let all = store.hash_get_all("h").unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all["a"], Value::from(2i64));
    }

    #[tokio::test]
    async fn test_hash_merge_odd_arity() {
        let store = Store::new();

        assert_eq!(
            store.hash_merge("h", &["a".into()]),
            Err(StoreError::WrongArgumentCount)
        );
        // The failed call created nothing
        assert!(!store.exists("h"));
    }

    #[tokio::test]
    async fn test_hash_merge_no_partial_merge() {
        let store = Store::new();

        store.hash_merge("h", &["a".into(), 1i64.into()]).unwrap();

        // Second pair has a non-string name; the whole call must fail
        // without merging the valid first pair.
        let args: Vec<Value> = vec!["b".into(), 2i64.into(), 3i64.into(), 4i64.into()];
        assert_eq!(store.hash_merge("h", &args), Err(StoreError::WrongDataType));

        let all = store.hash_get_all("h").unwrap();
        assert_eq!(all.len(), 1);
        assert!(!all.contains_key("b"));
    }

    #[tokio::test]
    async fn test_hash_merge_wrong_kind() {
        let store = Store::new();

        store.set("s", 1i64).unwrap();
        assert_eq!(
            store.hash_merge("s", &["a".into(), 1i64.into()]),
            Err(StoreError::WrongDataType)
        );
    }

    #[tokio::test]
    async fn test_hash_get_all_errors() {
        let store = Store::new();

        assert_eq!(store.hash_get_all("missing"), Err(StoreError::KeyNotFound));

        store.set("s", 1i64).unwrap();
        assert_eq!(store.hash_get_all("s"), Err(StoreError::WrongDataType));
    }

    #[tokio::test]
    async fn test_hash_get_all_returns_copy() {
        let store = Store::new();

        store.hash_merge("h", &["a".into(), 1i64.into()]).unwrap();

        let mut copy = store.hash_get_all("h").unwrap();
        copy.insert("b".to_string(), Value::from(2i64));

        // Mutating the snapshot does not touch the store
        let all = store.hash_get_all("h").unwrap();
        assert_eq!(all.len(), 1);
    }

    #[tokio::test]
    async fn test_list_append_order() {
        let store = Store::new();

        store.list_append("l", vec!["x".into()]).unwrap();
        store.list_append("l", vec!["y".into()]).unwrap();

        assert_eq!(
            store.list_range("l", 0, -1).unwrap(),
            vec![Value::from("x"), Value::from("y")]
        );
    }

    #[tokio::test]
    async fn test_list_append_extends_existing() {
        let store = Store::new();

        store
            .list_append("l", vec!["a".into(), "b".into()])
            .unwrap();
        store
            .list_append("l", vec!["c".into(), "d".into()])
            .unwrap();

        // New elements land at the end; existing ones are untouched
        assert_eq!(
            store.list_range("l", 0, -1).unwrap(),
            vec![
                Value::from("a"),
                Value::from("b"),
                Value::from("c"),
                Value::from("d"),
            ]
        );
    }

    #[tokio::test]
    async fn test_list_append_wrong_kind() {
        let store = Store::new();

        store.set("s", 1i64).unwrap();
        assert_eq!(
            store.list_append("s", vec!["x".into()]),
            Err(StoreError::WrongDataType)
        );
    }

    #[tokio::test]
    async fn test_list_range_bounds() {
        let store = Store::new();

        store
            .list_append("l", vec!["x".into(), "y".into()])
            .unwrap();

        // Sub-range
        assert_eq!(store.list_range("l", 1, 1).unwrap(), vec![Value::from("y")]);

        // Length past the end
        assert_eq!(
            store.list_range("l", 0, 100),
            Err(StoreError::IndexOutOfRange)
        );

        // Start past the end
        assert_eq!(store.list_range("l", 3, 0), Err(StoreError::IndexOutOfRange));

        // Start at the end with zero length is an empty slice
        assert_eq!(store.list_range("l", 2, 0).unwrap(), Vec::<Value>::new());

        // Negative length never bounds-checks
        assert_eq!(store.list_range("l", 5, -1).unwrap(), Vec::<Value>::new());
        assert_eq!(store.list_range("l", 1, -1).unwrap(), vec![Value::from("y")]);
    }

    #[tokio::test]
    async fn test_list_range_errors() {
        let store = Store::new();

        assert_eq!(
            store.list_range("missing", 0, -1),
            Err(StoreError::KeyNotFound)
        );

        store.set("s", 1i64).unwrap();
        assert_eq!(store.list_range("s", 0, -1), Err(StoreError::WrongDataType));
    }

    #[tokio::test]
    async fn test_key_count() {
        let store = Store::new();

        assert_eq!(store.key_count(), 0);

        store.set("a", 1i64).unwrap();
        store.hash_merge("b", &["f".into(), 1i64.into()]).unwrap();
        store.list_append("c", vec!["x".into()]).unwrap();
        store.set("a", 2i64).unwrap(); // Overwrite, not a new key

        assert_eq!(store.key_count(), 3);
    }

    #[tokio::test]
    async fn test_exists() {
        let store = Store::new();

        assert!(!store.exists("key"));
        store.set("key", 1i64).unwrap();
        assert!(store.exists("key"));
    }

    #[tokio::test]
    async fn test_remaining_ttl() {
        let store = Store::new();

        assert_eq!(store.remaining_ttl("missing"), None);

        store.set("persistent", 1i64).unwrap();
        assert_eq!(store.remaining_ttl("persistent"), Some(None));

        store
            .set_with_ttl("armed", 1i64, Duration::from_secs(100))
            .unwrap();
        let remaining = store.remaining_ttl("armed").unwrap().unwrap();
        assert!(remaining > Duration::ZERO && remaining <= Duration::from_secs(100));
    }

    #[tokio::test]
    async fn test_nested_values() {
        let store = Store::new();

        // Hash fields and list elements carry full values
        store
            .hash_merge("h", &["inner".into(), Value::List(vec![1i64.into()])])
            .unwrap();
        let all = store.hash_get_all("h").unwrap();
        assert_eq!(all["inner"], Value::List(vec![Value::from(1i64)]));

        store
            .list_append("l", vec![Value::Hash(HashMap::new())])
            .unwrap();
        assert_eq!(
            store.list_range("l", 0, -1).unwrap(),
            vec![Value::Hash(HashMap::new())]
        );
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_concurrent_access() {
        use std::thread;

        let store = Arc::new(Store::new());
        let mut handles = vec![];

        // Spawn multiple writers mixing the three kinds
        for i in 0..10 {
            let store = Arc::clone(&store);
            handles.push(thread::spawn(move || {
                for j in 0..100 {
                    let key = format!("key-{}-{}", i, j);
                    store.set(key.clone(), j as i64).unwrap();
                    store.get(&key).unwrap();
                    store
                        .hash_merge(
                            format!("hash-{}", i),
                            &[key.as_str().into(), (j as i64).into()],
                        )
                        .unwrap();
                    store
                        .list_append(format!("list-{}", i), vec![(j as i64).into()])
                        .unwrap();
                }
            }));
        }

        for handle in handles {
            handle.join().unwrap();
        }

        // 1000 scalar keys + 10 hashes + 10 lists
        assert_eq!(store.key_count(), 1020);
        for i in 0..10 {
            assert_eq!(
                store.hash_get_all(&format!("hash-{}", i)).unwrap().len(),
                100
            );
            assert_eq!(
                store
                    .list_range(&format!("list-{}", i), 0, -1)
                    .unwrap()
                    .len(),
                100
            );
        }
    }
}
