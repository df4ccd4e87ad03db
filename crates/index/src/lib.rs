//! # Food Index
//!
//! Nutrition records, search tiers and the adapter seam between the
//! matching engine and the databases it federates over.
//!
//! ## Core Pieces
//!
//! - [`FoodRecord`]: an immutable record owned by one database, tagged with
//!   its [`SourceId`].
//! - [`SearchTier`]: one query variant of a broadening cascade, with its
//!   category filter, score boost and [`SourceHint`].
//! - [`BackendAdapter`]: the async trait every database implements. Errors
//!   are typed ([`BackendError`]) and never abort a search.
//! - [`InMemoryBackend`]: an in-process store, loadable from JSON, with a
//!   lexical relevance score in full-text-engine units.
//! - [`RetryingBackend`]: decorator adding exponential backoff for
//!   transient failures, bounded by the call deadline.
//!
//! ## Example Usage
//!
//! ```
//! use canonical::Category;
//! use index::{BackendAdapter, FoodRecord, InMemoryBackend, RetryConfig, RetryingBackend};
//!
//! let store = InMemoryBackend::from_records(
//!     "usda",
//!     vec![FoodRecord::new("171477", "Chicken, breast, cooked", Category::Ingredient)],
//! )
//! .unwrap();
//! assert_eq!(store.len(), 1);
//!
//! let backend = RetryingBackend::new(store, RetryConfig::default());
//! assert_eq!(backend.source().as_str(), "usda");
//! ```

mod backend;
mod error;
mod memory;
mod record;
mod retry;
pub mod serde_millis;
mod tier;

pub use backend::{BackendAdapter, RawCandidate};
pub use error::{BackendError, StoreError};
pub use memory::InMemoryBackend;
pub use record::{FoodRecord, SourceId};
pub use retry::{RetryConfig, RetryingBackend};
pub use tier::{SearchTier, SourceHint, TierKind};

/// Re-exported so adapters and callers agree on the deadline clock.
pub use tokio::time::Instant;
