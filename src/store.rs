//! Core store type, handle, and builder.

use crate::backend::{MapBackend, OrderedMap};
use crate::error::Result;
use crate::model::{Product, ProductInput, ProductPatch};
use crate::persist::{default_path, FileBacking, Persistence};
use crate::serializer::{Document, JsonSerializer, Serializer};
use parking_lot::Mutex;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

type IdSource = Box<dyn Fn() -> String + Send + Sync>;

/// Default id source: random 128-bit UUID v4, hyphenated.
fn random_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Product records held in memory and mirrored to a single JSON file.
///
/// Reads are served from memory. Every successful mutation rewrites the whole
/// backing target before returning. None of the CRUD operations return an
/// error: a failed load degrades to an empty store, a failed save is logged
/// and the in-memory state stays authoritative. Use [`flush`](Self::flush)
/// when you need to see the save result.
///
/// Generic over the map backend `M`; the default keeps insertion order.
pub struct ProductStore<M = OrderedMap<String, Product>> {
    map: M,
    backing: Box<dyn Persistence>,
    serializer: JsonSerializer,
    next_id: IdSource,
    synced: AtomicBool,
    writer: Mutex<()>,
}

impl ProductStore {
    /// Open the store at its fixed default location,
    /// [`default_path()`](crate::persist::default_path).
    pub fn open() -> Self {
        Self::builder().build()
    }

    /// Open a store backed by the file at `path`.
    pub fn open_at(path: impl AsRef<Path>) -> Self {
        Self::builder().path(path).build()
    }

    /// Start configuring a store with the default backend.
    pub fn builder() -> ProductStoreBuilder {
        ProductStoreBuilder::new()
    }
}

impl<M> ProductStore<M>
where
    M: MapBackend<String, Product>,
{
    // ---- reads ----

    /// Every record, in the backend's iteration order (insertion order for
    /// the default backend).
    #[must_use]
    pub fn find_all(&self) -> Vec<Product> {
        self.map.iter_snapshot().into_iter().map(|(_, v)| v).collect()
    }

    /// The record with `id`, or `None`.
    #[must_use]
    pub fn find_one(&self, id: &str) -> Option<Product> {
        self.map.get(&id.to_owned())
    }

    /// `true` if a record with `id` exists.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.map.contains_key(&id.to_owned())
    }

    /// Number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.map.map_len()
    }

    /// `true` when the store holds no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Path of the backing file, when file-backed.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.backing.path()
    }

    /// `false` after a save failed, until the next successful save.
    #[must_use]
    pub fn is_synced(&self) -> bool {
        self.synced.load(Ordering::Relaxed)
    }

    // ---- writes ----

    /// Create a record from `input` under a fresh, unused identifier and
    /// persist. Returns the stored record.
    pub fn create(&self, input: ProductInput) -> Product {
        let _guard = self.writer.lock();

        let mut id = (self.next_id)();
        while self.find_one(&id).is_some() {
            debug!(%id, "generated id already in use, regenerating");
            id = (self.next_id)();
        }

        let product = Product::from_input(id, input);
        self.map.insert(product.id.clone(), product.clone());
        info!(id = %product.id, name = %product.name, "created product");
        self.save_products();
        product
    }

    /// Shallow-merge `patch` over the record at `id` and persist. Returns the
    /// updated record, or `None` (without persisting) when `id` is unknown.
    pub fn update(&self, id: &str, patch: impl Into<ProductPatch>) -> Option<Product> {
        let _guard = self.writer.lock();

        let mut product = self.find_one(id)?;
        patch.into().apply(&mut product);
        self.map.insert(product.id.clone(), product.clone());
        info!(%id, "updated product");
        self.save_products();
        Some(product)
    }

    /// Delete the record at `id` and persist. Returns the removed record, or
    /// `None` (without persisting) when `id` is unknown.
    pub fn remove(&self, id: &str) -> Option<Product> {
        let _guard = self.writer.lock();

        let removed = self.map.remove(&id.to_owned())?;
        info!(%id, "removed product");
        self.save_products();
        Some(removed)
    }

    // ---- persistence ----

    /// Write every record to the backing target and report the outcome.
    pub fn flush(&self) -> Result<()> {
        let _guard = self.writer.lock();
        self.write_snapshot()
    }

    // ---- internal ----

    /// Save after a mutation. Failures are logged, never returned.
    fn save_products(&self) {
        if let Err(err) = self.write_snapshot() {
            error!(target_file = %self.backing.describe(), error = %err, "failed to save products");
        }
    }

    fn write_snapshot(&self) -> Result<()> {
        let entries = self.map.iter_snapshot();
        let outcome = self
            .serializer
            .serialize(&entries)
            .and_then(|bytes| self.backing.write(&bytes));
        self.synced.store(outcome.is_ok(), Ordering::Relaxed);
        if outcome.is_ok() {
            debug!(target_file = %self.backing.describe(), records = entries.len(), "saved products");
        }
        outcome
    }

    /// Populate the map from the backing target. Never fails: an unreadable
    /// or unparseable target leaves the store empty, and a single record that
    /// doesn't fit [`Product`] is skipped while the rest load.
    fn load_products(&self) {
        let target = self.backing.describe();
        let bytes = match self.backing.read() {
            Ok(Some(bytes)) => bytes,
            Ok(None) => {
                info!(target_file = %target, "no backing file yet, creating an empty one");
                self.save_products();
                return;
            }
            Err(err) => {
                error!(target_file = %target, error = %err, "failed to read products");
                return;
            }
        };
        if bytes.is_empty() {
            return;
        }

        let entries = match self.serializer.deserialize::<serde_json::Value>(&bytes) {
            Ok(Document::Records(entries)) => entries,
            Ok(Document::List) => {
                warn!(target_file = %target, "backing file holds a list, starting empty");
                return;
            }
            Err(err) => {
                error!(target_file = %target, error = %err, "failed to parse products");
                return;
            }
        };

        let mut skipped = 0usize;
        for (key, value) in entries {
            let mut product = match serde_json::from_value::<Product>(value) {
                Ok(product) => product,
                Err(err) => {
                    warn!(%key, error = %err, "skipping malformed record");
                    skipped += 1;
                    continue;
                }
            };
            if product.id != key {
                warn!(%key, id = %product.id, "record id differs from its key, using key");
                product.id.clone_from(&key);
            }
            self.map.insert(key, product);
        }
        info!(target_file = %target, records = self.map.map_len(), skipped, "loaded products");
    }
}

impl<M> std::fmt::Debug for ProductStore<M>
where
    M: MapBackend<String, Product>,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProductStore")
            .field("backing", &self.backing.describe())
            .field("records", &self.map.map_len())
            .field("synced", &self.is_synced())
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Configures and opens a [`ProductStore`].
///
/// ```rust,no_run
/// use product_store::ProductStore;
///
/// let store = ProductStore::builder()
///     .path("data/products.json")
///     .pretty(true)
///     .build();
/// ```
pub struct ProductStoreBuilder<M = OrderedMap<String, Product>> {
    path: Option<PathBuf>,
    backing: Option<Box<dyn Persistence>>,
    atomic: bool,
    pretty: bool,
    next_id: Option<IdSource>,
    _marker: PhantomData<M>,
}

impl ProductStoreBuilder {
    fn new() -> Self {
        Self {
            path: None,
            backing: None,
            atomic: true,
            pretty: true,
            next_id: None,
            _marker: PhantomData,
        }
    }
}

impl<M> ProductStoreBuilder<M>
where
    M: MapBackend<String, Product> + Default,
{
    /// Back the store with the file at `path` (default:
    /// [`default_path()`](crate::persist::default_path)).
    pub fn path(mut self, path: impl AsRef<Path>) -> Self {
        self.path = Some(path.as_ref().to_path_buf());
        self
    }

    /// Back the store with any [`Persistence`] target. Takes precedence over
    /// [`path`](Self::path).
    pub fn backing(mut self, backing: impl Persistence + 'static) -> Self {
        self.backing = Some(Box::new(backing));
        self
    }

    /// Write indented JSON (default: on).
    pub fn pretty(mut self, yes: bool) -> Self {
        self.pretty = yes;
        self
    }

    /// Temp-file + rename writes for the file backing (default: on). Has no
    /// effect on a custom [`backing`](Self::backing).
    pub fn atomic(mut self, yes: bool) -> Self {
        self.atomic = yes;
        self
    }

    /// Replace the identifier generator (default: random UUID v4).
    pub fn id_source<F>(mut self, f: F) -> Self
    where
        F: Fn() -> String + Send + Sync + 'static,
    {
        self.next_id = Some(Box::new(f));
        self
    }

    /// Hold records in a different map backend.
    pub fn backend<N>(self) -> ProductStoreBuilder<N>
    where
        N: MapBackend<String, Product> + Default,
    {
        ProductStoreBuilder {
            path: self.path,
            backing: self.backing,
            atomic: self.atomic,
            pretty: self.pretty,
            next_id: self.next_id,
            _marker: PhantomData,
        }
    }

    /// Load (or bootstrap) the backing target and return the store.
    pub fn build(self) -> ProductStore<M> {
        let (path, atomic) = (self.path, self.atomic);
        let backing = self.backing.unwrap_or_else(|| {
            let path = path.unwrap_or_else(default_path);
            Box::new(FileBacking::new(path).atomic(atomic))
        });
        let serializer = if self.pretty {
            JsonSerializer::pretty()
        } else {
            JsonSerializer::new()
        };

        let store = ProductStore {
            map: M::default(),
            backing,
            serializer,
            next_id: self.next_id.unwrap_or_else(|| Box::new(random_id)),
            synced: AtomicBool::new(true),
            writer: Mutex::new(()),
        };
        store.load_products();
        store
    }

    /// Like [`build`](Self::build), wrapped in a shareable [`StoreHandle`].
    pub fn build_handle(self) -> StoreHandle<M> {
        StoreHandle::new(self.build())
    }
}

impl<M> std::fmt::Debug for ProductStoreBuilder<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProductStoreBuilder")
            .field("path", &self.path)
            .field("backing", &self.backing.as_ref().map(|b| b.describe()))
            .field("atomic", &self.atomic)
            .field("pretty", &self.pretty)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Handle
// ---------------------------------------------------------------------------

/// Cheap-to-clone handle to the one store instance of a process.
///
/// Derefs to [`ProductStore`] so you can call store methods directly on it.
pub struct StoreHandle<M = OrderedMap<String, Product>> {
    inner: Arc<ProductStore<M>>,
}

impl<M> StoreHandle<M> {
    /// Wrap an opened store.
    pub fn new(store: ProductStore<M>) -> Self {
        Self {
            inner: Arc::new(store),
        }
    }
}

impl<M> Clone for StoreHandle<M> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<M> std::ops::Deref for StoreHandle<M> {
    type Target = ProductStore<M>;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl<M> std::fmt::Debug for StoreHandle<M>
where
    M: MapBackend<String, Product>,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Debug::fmt(&*self.inner, f)
    }
}
