//! Registry of generators that are already resolved.
//!
//! Single source of truth for bundled or previously loaded generators.
//! Registration performs no validation beyond what the caller already
//! guarantees; the loader is the validation boundary for dynamically
//! discovered plugins.

use std::collections::HashMap;
use std::sync::Arc;

use crate::plugin::descriptor::PluginDescriptor;
use crate::plugin::errors::PluginError;

/// Named table of available generator descriptors.
#[derive(Debug, Default)]
pub struct PluginRegistry {
    entries: HashMap<String, Arc<PluginDescriptor>>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a descriptor, overwriting any previous entry with the same
    /// name. The last registration wins.
    pub fn register(&mut self, descriptor: Arc<PluginDescriptor>) {
        let name = descriptor.name().to_string();
        if self.entries.insert(name.clone(), descriptor).is_some() {
            tracing::warn!(plugin = %name, "Replacing previously registered generator");
        }
    }

    pub fn has(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Get a registered descriptor by name.
    pub fn get(&self, name: &str) -> Result<Arc<PluginDescriptor>, PluginError> {
        self.lookup(name).ok_or_else(|| PluginError::NotFound {
            name: name.to_string(),
            attempted: vec![],
        })
    }

    pub fn lookup(&self, name: &str) -> Option<Arc<PluginDescriptor>> {
        self.entries.get(name).cloned()
    }

    /// Names of all registered generators.
    pub fn list(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
