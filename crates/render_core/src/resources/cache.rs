//! Path-keyed resource cache
//!
//! The cache is the only owner of loaded GPU resources. Callers receive generation-checked
//! keys, never owning references, so a resource can be shared by any number of scene
//! objects and is still released exactly once by [`ResourceCache::release_all`].
//!
//! A failed load is a normal outcome: it is logged, nothing is inserted, and the caller
//! receives `None`. Failures are not remembered, so asking again retries the load.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use slotmap::{Key, SlotMap};

use crate::assets::AssetError;
use crate::render::device::GraphicsDevice;

/// A GPU-backed asset that can be loaded from a file
pub trait Resource: Sized {
    /// Human readable kind, used in log messages
    const KIND: &'static str;

    /// Whatever the loader needs besides the path (device, collaborators, other caches)
    type Context<'a>;

    /// Load the resource completely, or fail without leaving GPU objects behind
    fn load(path: &Path, ctx: &mut Self::Context<'_>) -> Result<Self, AssetError>;

    /// Release the GPU objects this resource owns
    fn unload(self, device: &mut dyn GraphicsDevice);
}

/// Deduplicating owner of resources of one kind
pub struct ResourceCache<K: Key, R: Resource> {
    resources: SlotMap<K, R>,
    by_path: HashMap<PathBuf, K>,
}

impl<K: Key, R: Resource> Default for ResourceCache<K, R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Key, R: Resource> ResourceCache<K, R> {
    /// Create an empty cache
    pub fn new() -> Self {
        Self {
            resources: SlotMap::with_key(),
            by_path: HashMap::new(),
        }
    }

    /// Return the cached resource for `path`, loading it on first request
    ///
    /// Returns `None` when the load fails; the failure has already been logged.
    pub fn get_or_load(&mut self, path: impl AsRef<Path>, ctx: &mut R::Context<'_>) -> Option<K> {
        let path = path.as_ref();
        if let Some(&key) = self.by_path.get(path) {
            return Some(key);
        }

        match R::load(path, ctx) {
            Ok(resource) => {
                let key = self.resources.insert(resource);
                self.by_path.insert(path.to_path_buf(), key);
                log::info!("Loaded {} {:?} ({} cached)", R::KIND, path, self.resources.len());
                Some(key)
            }
            Err(e) => {
                log::warn!("Failed to load {} {:?}: {}", R::KIND, path, e);
                None
            }
        }
    }

    /// Look up a resource by key; `None` for keys from before a release
    pub fn get(&self, key: K) -> Option<&R> {
        self.resources.get(key)
    }

    /// Key of an already cached path, without loading
    pub fn key_for(&self, path: impl AsRef<Path>) -> Option<K> {
        self.by_path.get(path.as_ref()).copied()
    }

    /// Whether `path` is currently cached
    pub fn contains_path(&self, path: impl AsRef<Path>) -> bool {
        self.by_path.contains_key(path.as_ref())
    }

    /// Number of cached resources
    pub fn len(&self) -> usize {
        self.resources.len()
    }

    /// True when nothing is cached
    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// Unload every cached resource and forget all paths
    ///
    /// Keys handed out earlier stop resolving. Returns the number of released resources.
    pub fn release_all(&mut self, device: &mut dyn GraphicsDevice) -> usize {
        let count = self.resources.len();
        for (_, resource) in self.resources.drain() {
            resource.unload(device);
        }
        self.by_path.clear();
        log::info!("Released {} cached {} resource(s)", count, R::KIND);
        count
    }
}

impl<K: Key, R: Resource> Drop for ResourceCache<K, R> {
    fn drop(&mut self) {
        if !self.resources.is_empty() {
            log::warn!(
                "ResourceCache dropped with {} {} resource(s) still loaded; their GPU objects leak",
                self.resources.len(),
                R::KIND
            );
        }
    }
}
