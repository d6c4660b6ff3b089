//! Release backend registry.
//!
//! Backends are registered by name and looked up by the source type of a
//! catalog entry.

use std::collections::HashMap;
use std::sync::Arc;

use super::provider::{ReleaseBackend, ToolSource};

/// Registry of release backends.
#[derive(Default)]
pub struct BackendRegistry {
    /// Backends indexed by name.
    backends: HashMap<&'static str, Arc<dyn ReleaseBackend>>,
}

impl BackendRegistry {
    /// Create a new empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a backend.
    ///
    /// If a backend with the same name already exists, it will be replaced.
    pub fn register<B: ReleaseBackend + 'static>(&mut self, backend: B) {
        let name = backend.name();
        self.backends.insert(name, Arc::new(backend));
    }

    /// Find the backend that owns the given source.
    #[must_use]
    pub fn find_for_source(&self, source: &ToolSource) -> Option<&Arc<dyn ReleaseBackend>> {
        self.backends.values().find(|b| b.can_handle(source))
    }

    /// Get all backend names, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.backends.keys().copied().collect();
        names.sort_unstable();
        names
    }
}

impl std::fmt::Debug for BackendRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendRegistry")
            .field("backends", &self.names())
            .finish()
    }
}
