//! Generator plugin loader.
//!
//! Turns a bare generator name into a validated descriptor by trying
//! resolution strategies in a fixed priority order, short-circuiting on the
//! first success:
//!
//! 1. registry hit
//! 2. load-cache hit
//! 3. map the name through the builtin table
//! 4. import the backing package
//! 5. auto-install escalation, then retry the import exactly once
//! 6. developer-mode fallback paths (builtins only)
//! 7. terminal typed failure
//!
//! The loader is an explicit context object constructed once at the host's
//! entry point and passed down; registry and cache are behind mutexes whose
//! locks are never held across an await. There is no in-flight-request
//! deduplication: two callers racing on the same cold name may both attempt
//! installation.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use crate::plugin::builtins;
use crate::plugin::descriptor::PluginDescriptor;
use crate::plugin::environment::RuntimeEnvironment;
use crate::plugin::errors::PluginError;
use crate::plugin::importer::{Discovered, ImportFailure, ModuleImporter};
use crate::plugin::installer::{AutoInstaller, InstallOptions};
use crate::plugin::registry::PluginRegistry;
use crate::plugin::resolve;

/// Where a resolved generator came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PluginSource {
    /// Registered in-process before loading started.
    Bundled,
    /// Imported from an installed package.
    Npm,
    /// Imported from a local-development fallback path.
    Local,
}

impl fmt::Display for PluginSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PluginSource::Bundled => write!(f, "bundled"),
            PluginSource::Npm => write!(f, "npm"),
            PluginSource::Local => write!(f, "local"),
        }
    }
}

/// A validated descriptor together with provenance details.
#[derive(Debug, Clone)]
pub struct DiscoveryResult {
    pub descriptor: Arc<PluginDescriptor>,
    pub source: PluginSource,
    pub version: Option<String>,
    pub path: Option<PathBuf>,
}

/// Resolves generator names to validated descriptors.
pub struct PluginLoader {
    root: PathBuf,
    env: Arc<dyn RuntimeEnvironment>,
    importer: Box<dyn ModuleImporter>,
    installer: AutoInstaller,
    registry: Mutex<PluginRegistry>,
    /// Keyed by the originally requested name, not the resolved package
    /// identifier. Never invalidated.
    cache: Mutex<HashMap<String, DiscoveryResult>>,
    install_options: InstallOptions,
}

impl PluginLoader {
    pub fn new(
        root: PathBuf,
        env: Arc<dyn RuntimeEnvironment>,
        importer: Box<dyn ModuleImporter>,
        installer: AutoInstaller,
    ) -> Self {
        Self {
            root,
            env,
            importer,
            installer,
            registry: Mutex::new(PluginRegistry::new()),
            cache: Mutex::new(HashMap::new()),
            install_options: InstallOptions::default(),
        }
    }

    pub fn with_install_options(mut self, options: InstallOptions) -> Self {
        self.install_options = options;
        self
    }

    /// Register an already-resolved generator (bundled or previously
    /// loaded).
    pub fn register(&self, descriptor: Arc<PluginDescriptor>) {
        self.registry.lock().unwrap().register(descriptor);
    }

    /// Names of registered generators.
    pub fn registered(&self) -> Vec<String> {
        self.registry.lock().unwrap().list()
    }

    /// Resolve a generator by name.
    pub async fn load(&self, name: &str) -> Result<Arc<PluginDescriptor>, PluginError> {
        Ok(self.discover(name).await?.descriptor)
    }

    /// Resolve a generator by name, with provenance details.
    pub async fn discover(&self, name: &str) -> Result<DiscoveryResult, PluginError> {
        // Strategy 1: registry hit.
        if let Some(descriptor) = self.registry.lock().unwrap().lookup(name) {
            let version = Some(descriptor.version().to_string());
            return Ok(DiscoveryResult {
                descriptor,
                source: PluginSource::Bundled,
                version,
                path: None,
            });
        }

        // Strategy 2: cache hit.
        if let Some(entry) = self.cache.lock().unwrap().get(name) {
            return Ok(entry.clone());
        }

        // Strategy 3: resolve the package identifier.
        let identifier = builtins::resolve_identifier(name).to_string();
        tracing::debug!(name, identifier = %identifier, "Resolving generator plugin");

        let mut attempted: Vec<String> = vec![identifier.clone()];

        // Strategy 4: primary import.
        let mut failure = match self.importer.import_package(&self.root, &identifier) {
            Ok(discovered) => return Ok(self.remember(name, discovered, PluginSource::Npm)),
            Err(err) => err,
        };
        attempted.extend(failure.locations());

        // Strategy 5: auto-install escalation. Only not-found failures on
        // packages in our namespace escalate, and never in CI.
        if failure.is_not_found()
            && builtins::is_plugin_package(&identifier)
            && !self.env.is_ci()
        {
            match self.installer.install(&identifier, &self.install_options).await {
                Ok(outcome) => {
                    tracing::debug!(package = %identifier, ?outcome, "Install step finished, retrying import");
                    match self.importer.import_package(&self.root, &identifier) {
                        Ok(discovered) => {
                            return Ok(self.remember(name, discovered, PluginSource::Npm));
                        }
                        Err(err) => {
                            attempted.extend(err.locations());
                            failure = err;
                        }
                    }
                }
                Err(err) => {
                    tracing::warn!(package = %identifier, "Auto-install failed: {}", err);
                }
            }
        }

        // Strategy 6: developer-mode fallback paths, builtins only.
        if builtins::is_builtin(name) && self.env.local_dev() {
            for candidate in resolve::dev_fallback_candidates(&self.root, name) {
                attempted.push(candidate.display().to_string());
                if !candidate.is_file() {
                    continue;
                }
                match self.importer.import_path(&candidate) {
                    Ok(discovered) => {
                        return Ok(self.remember(name, discovered, PluginSource::Local));
                    }
                    Err(err) => {
                        tracing::warn!(
                            path = %candidate.display(),
                            "Fallback import failed: {}",
                            err
                        );
                        failure = err;
                    }
                }
            }
        }

        // Strategy 7: terminal typed failure.
        Err(terminal_failure(name, attempted, failure))
    }

    /// Cache a successful discovery under the originally requested name.
    ///
    /// The first completed load wins; a racing second load reuses it from
    /// then on.
    fn remember(
        &self,
        name: &str,
        discovered: Discovered,
        source: PluginSource,
    ) -> DiscoveryResult {
        let result = DiscoveryResult {
            descriptor: discovered.descriptor,
            source,
            version: discovered.version,
            path: Some(discovered.path),
        };
        let mut cache = self.cache.lock().unwrap();
        cache
            .entry(name.to_string())
            .or_insert_with(|| result.clone());
        result
    }
}

/// Classify the last failure once every strategy is exhausted.
fn terminal_failure(name: &str, attempted: Vec<String>, failure: ImportFailure) -> PluginError {
    if failure.is_not_found() {
        PluginError::NotFound {
            name: name.to_string(),
            attempted: dedup_preserving_order(attempted),
        }
    } else {
        PluginError::Load {
            name: name.to_string(),
            reason: failure.to_string(),
            available_exports: failure.export_keys(),
        }
    }
}

fn dedup_preserving_order(locations: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    locations
        .into_iter()
        .filter(|location| seen.insert(location.clone()))
        .collect()
}
