//! # emberkv - A Typed In-Memory Key-Value Store
//!
//! emberkv is an in-process, concurrency-safe key-value store with
//! typed values and per-key time-based expiration. It is a library, not
//! a service: there is no network layer, no persistence, and no cluster
//! awareness. All state is process-local and lost on process exit.
//!
//! ## Features
//!
//! - **Three value kinds**: scalars (integer, float, string), hashes
//!   (field-to-value mappings), and lists (ordered, append-only)
//! - **Per-key TTL**: any entry can be armed to expire, and is then
//!   deleted autonomously by a background waiter
//! - **Concurrency-safe**: one reader/writer lock serializes writes
//!   while letting reads run concurrently
//! - **Typed errors**: every failure is one of four non-fatal error
//!   kinds, always returned to the caller
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │                          emberkv                           │
//! │                                                            │
//! │   callers ──────────▶ ┌──────────────────────────────┐     │
//! │   (any thread/task)   │            Store             │     │
//! │                       │  RwLock<HashMap<key, Entry>> │     │
//! │                       │  Entry = Scalar|Hash|List    │     │
//! │                       │          + optional deadline │     │
//! │                       └──────────────▲───────────────┘     │
//! │                                      │                     │
//! │                       ┌──────────────┴───────────────┐     │
//! │                       │        Expiry Waiter         │     │
//! │                       │   (background Tokio task,    │     │
//! │                       │   min-heap of deadlines)     │     │
//! │                       └──────────────────────────────┘     │
//! └────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```
//! use emberkv::{Scalar, Store, StoreError};
//! use std::time::Duration;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() {
//!     let store = Store::new();
//!
//!     // Scalars
//!     store.set("visits", 10i64).unwrap();
//!     assert_eq!(store.get("visits").unwrap(), Scalar::Int(10));
//!
//!     // Hashes
//!     store
//!         .hash_merge("user:1", &["name".into(), "ada".into(), "age".into(), 36i64.into()])
//!         .unwrap();
//!     let user = store.hash_get_all("user:1").unwrap();
//!     assert_eq!(user.len(), 2);
//!
//!     // Lists
//!     store.list_append("events", vec!["login".into(), "click".into()]).unwrap();
//!     assert_eq!(store.list_range("events", 0, -1).unwrap().len(), 2);
//!
//!     // TTL
//!     store.set_with_ttl("session", "token", Duration::from_secs(60)).unwrap();
//!
//!     // Typed errors
//!     assert_eq!(store.get("user:1"), Err(StoreError::WrongDataType));
//! }
//! ```
//!
//! ## Design Highlights
//!
//! ### One Lock, Two Modes
//!
//! Every operation takes the store-wide `RwLock` for its full duration:
//! reads share it, mutations hold it exclusively. No caller ever
//! observes a partially-merged hash or a half-appended list.
//!
//! ### Event-Driven Expiry
//!
//! Arming a TTL pushes a deadline onto a shared min-heap and wakes one
//! background task, which sleeps until the earliest deadline and then
//! deletes the entry. There is never one timer task per key, and every
//! arm carries a unique token so a stale deadline can never delete a
//! value that has since replaced the one it was armed for.
//!
//! ## Module Overview
//!
//! - [`store`]: the store engine, value model, error taxonomy, and
//!   expiry waiter

pub mod store;

// Re-export commonly used types for convenience
pub use store::{Scalar, Store, StoreError, StoreResult, StoreStats, Value};

/// Version of emberkv
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
