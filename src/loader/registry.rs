//! Build-time registry of importable modules and their exported entry points.

use anyhow::Result;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

/// Zero-argument entry point exported by a module.
pub type EntryPoint = Arc<dyn Fn() -> Result<()> + Send + Sync>;

/// Symbols a module makes callable once imported.
#[derive(Clone, Default)]
pub struct ModuleExports {
    symbols: HashMap<String, EntryPoint>,
}

impl ModuleExports {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn export<F>(mut self, name: impl Into<String>, entry: F) -> Self
    where
        F: Fn() -> Result<()> + Send + Sync + 'static,
    {
        self.symbols.insert(name.into(), Arc::new(entry));
        self
    }

    pub fn symbol(&self, name: &str) -> Option<EntryPoint> {
        self.symbols.get(name).cloned()
    }

    pub fn symbols(&self) -> impl Iterator<Item = &str> {
        self.symbols.keys().map(String::as_str)
    }
}

impl fmt::Debug for ModuleExports {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&str> = self.symbols().collect();
        names.sort_unstable();
        f.debug_struct("ModuleExports")
            .field("symbols", &names)
            .finish()
    }
}

/// Shared map from module path to exports. Cloning shares the underlying map. Paths are
/// matched exactly.
#[derive(Clone, Default)]
pub struct ModuleRegistry {
    modules: Arc<RwLock<HashMap<String, ModuleExports>>>,
    lookups: Arc<AtomicUsize>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `exports` under `path`, returning the exports it replaced.
    pub fn register(&self, path: impl Into<String>, exports: ModuleExports) -> Option<ModuleExports> {
        let path = path.into();
        tracing::debug!(path = %path, "module registered");
        self.modules
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(path, exports)
    }

    pub fn unregister(&self, path: &str) -> Option<ModuleExports> {
        self.modules
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .remove(path)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.modules
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .contains_key(path)
    }

    /// Number of import lookups served so far.
    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::Relaxed)
    }

    pub(crate) fn resolve(&self, path: &str) -> Option<ModuleExports> {
        self.lookups.fetch_add(1, Ordering::Relaxed);
        self.modules
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(path)
            .cloned()
    }
}
