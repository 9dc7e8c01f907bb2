//! Product records kept in memory and mirrored to a single JSON file.
//!
//! The store loads the whole file once at startup, serves reads from memory,
//! and rewrites the file in full after every create, update, or remove.
//!
//! ```rust,no_run
//! use product_store::{ProductInput, ProductPatch, ProductStore};
//!
//! let store = ProductStore::open_at("products.json");
//! let lamp = store.create(ProductInput {
//!     name: "Lamp".into(),
//!     description: "Desk lamp".into(),
//!     price: 19.5,
//!     quantity: 4,
//! });
//! store.update(&lamp.id, ProductPatch::price(17.0));
//! assert_eq!(store.find_one(&lamp.id).map(|p| p.price), Some(17.0));
//! store.remove(&lamp.id);
//! ```
//!
//! Load and save failures never reach callers: they are logged through
//! `tracing` and the in-memory state stays authoritative.
//!
//! **Single-process only.** If multiple processes open the same file they will
//! clobber each other.

#![deny(missing_docs)]
#![warn(clippy::all)]

pub mod backend;
pub mod error;
pub mod model;
pub mod persist;
pub mod serializer;
pub mod store;

pub use error::{Error, Result};
pub use model::{Product, ProductInput, ProductPatch};
pub use persist::{FileBacking, MemoryBacking, Persistence};
pub use store::{ProductStore, ProductStoreBuilder, StoreHandle};

/// Default backend: insertion-ordered map.
pub type DefaultBackend = backend::OrderedMap<String, Product>;
