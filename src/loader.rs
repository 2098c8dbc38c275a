//! Loads a registered module by path and invokes its `StartApp` entry point.
//!
//! Modules are declared up front in a [`ModuleRegistry`]; a load resolves the path
//! against it inside a fresh evaluation context, so concurrent loads never observe each
//! other's imports and a failing module cannot take the host down.

mod context;
mod error;
mod path;
mod registry;

pub use error::LoadError;
pub use path::ModulePath;
pub use registry::{EntryPoint, ModuleExports, ModuleRegistry};

use context::EvalContext;
use tokio::task::JoinHandle;

#[derive(Clone, Default)]
pub struct ModuleLoader {
    registry: ModuleRegistry,
}

impl ModuleLoader {
    pub fn new(registry: ModuleRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &ModuleRegistry {
        &self.registry
    }

    /// Validates `path`, imports it into a fresh context and calls `<binding>.StartApp`.
    /// Returns once the entry point returns. The context is cleared after every attempt.
    #[tracing::instrument(name = "module_load", skip(self))]
    pub fn load(&self, path: &str) -> Result<(), LoadError> {
        let result = self.try_load(path);
        match &result {
            Ok(()) => tracing::info!("module started"),
            Err(err) => tracing::error!(error = %err, "module load failed"),
        }
        result
    }

    /// Runs [`ModuleLoader::load`] on the blocking pool so UI callers are not stalled by a
    /// long-running entry point.
    pub fn spawn_load(&self, path: impl Into<String>) -> JoinHandle<Result<(), LoadError>> {
        let loader = self.clone();
        let path = path.into();
        tokio::task::spawn_blocking(move || loader.load(&path))
    }

    fn try_load(&self, path: &str) -> Result<(), LoadError> {
        let module = ModulePath::parse(path)?;
        tracing::info!(module = %module, "importing module");

        let mut context = EvalContext::new();
        let result = context
            .import(&self.registry, &module)
            .and_then(|()| context.invoke(&module.entry_point()));
        context.clear();
        result
    }
}
