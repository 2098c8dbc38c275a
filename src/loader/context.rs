use super::error::LoadError;
use super::path::ModulePath;
use super::registry::{ModuleExports, ModuleRegistry};
use crate::worker::panic_message;
use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};

/// Per-attempt evaluation scope. Imported modules are visible only through this context
/// and disappear when it is cleared.
#[derive(Debug, Default)]
pub(crate) struct EvalContext {
    bindings: HashMap<String, ModuleExports>,
}

impl EvalContext {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn import(
        &mut self,
        registry: &ModuleRegistry,
        path: &ModulePath,
    ) -> Result<(), LoadError> {
        let exports = registry
            .resolve(path.as_str())
            .ok_or_else(|| LoadError::import(path.as_str(), "module is not registered"))?;

        self.bindings.insert(path.binding().to_string(), exports);
        Ok(())
    }

    /// Calls `<binding>.<symbol>` with no arguments.
    pub(crate) fn invoke(&self, identifier: &str) -> Result<(), LoadError> {
        let (binding, symbol) = identifier
            .split_once('.')
            .ok_or_else(|| LoadError::invoke(identifier, "expected <binding>.<symbol>"))?;

        let exports = self
            .bindings
            .get(binding)
            .ok_or_else(|| LoadError::invoke(identifier, format!("undefined: {binding}")))?;
        let entry = exports.symbol(symbol).ok_or_else(|| {
            LoadError::invoke(identifier, format!("{binding} has no symbol {symbol}"))
        })?;

        match catch_unwind(AssertUnwindSafe(|| entry())) {
            Ok(Ok(())) => Ok(()),
            Ok(Err(err)) => Err(LoadError::invoke(identifier, format!("{err:#}"))),
            Err(payload) => Err(LoadError::invoke(
                identifier,
                format!("panicked: {}", panic_message(payload.as_ref())),
            )),
        }
    }

    pub(crate) fn clear(&mut self) {
        self.bindings.clear();
    }

    #[cfg(test)]
    pub(crate) fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}
