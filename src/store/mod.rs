//! Store Module
//!
//! This module provides the core store functionality for emberkv: a
//! concurrency-safe, typed key-value mapping with per-key TTL and a
//! background expiry waiter.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────┐
//! │                      Store                       │
//! │        RwLock<HashMap<String, Entry>>            │
//! │      Entry = Scalar | Hash | List (+ TTL)        │
//! └──────────────────────────────────────────────────┘
//!                          ▲
//!                          │
//!            ┌─────────────┴─────────────┐
//!            │       Expiry Waiter       │
//!            │ (one background task over │
//!            │  a min-heap of deadlines) │
//!            └───────────────────────────┘
//! ```
//!
//! ## Features
//!
//! - **Typed values**: scalar, hash, and list kinds are a tagged union,
//!   so type mismatches are a single discriminant check
//! - **Single RwLock**: concurrent readers, exclusive writers; hash and
//!   list mutation is atomic relative to readers
//! - **Per-key TTL**: armed entries are deleted autonomously by one
//!   background task, promptly after their deadline
//! - **Safe rearming**: refreshing or overwriting a key always defuses
//!   the old deadline
//!
//! ## Example
//!
//! ```
//! use emberkv::store::{Scalar, Store};
//! use std::time::Duration;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let store = Store::new();
//!
//! store.set("name", "ember").unwrap();
//! assert_eq!(store.get("name").unwrap(), Scalar::Str("ember".to_string()));
//!
//! store.hash_merge("user:1", &["name".into(), "ada".into()]).unwrap();
//! store.list_append("events", vec!["login".into()]).unwrap();
//!
//! store.set_with_ttl("session", "token123", Duration::from_secs(3600)).unwrap();
//! # }
//! ```

pub mod engine;
pub mod error;
mod expiry;
pub mod value;

// Re-export commonly used types
pub use engine::{Store, StoreStats};
pub use error::{StoreError, StoreResult};
pub use value::{Scalar, Value};
