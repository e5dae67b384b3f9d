//! Dynamic import of generator plugin libraries.
//!
//! Turns a resolved package (or a bare file path) into a validated
//! descriptor by loading the platform library with abi_stable and probing
//! the module's entry points in a fixed priority order. Loaded libraries
//! are intentionally leaked (abi_stable proxy pattern) so plugin objects
//! never outlive their code; together with the host's load cache this makes
//! the import cache process-wide state.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use abi_stable::library::{LibraryError, LibraryPath, RootModule};
use abi_stable::std_types::{RBox, ROption};
use apigen_plugin_interface::{GeneratorModule_Ref, GeneratorPlugin_TO, PluginFactory};

use crate::plugin::descriptor::PluginDescriptor;
use crate::plugin::resolve::{find_plugin_library, PackageResolver};

/// One way a module may expose its plugin: a key for diagnostics and a pure
/// extraction function over the module's exports.
pub struct ExportStrategy {
    pub key: &'static str,
    extract: fn(GeneratorModule_Ref) -> ROption<PluginFactory>,
}

fn take_default(module: GeneratorModule_Ref) -> ROption<PluginFactory> {
    module.default_export()
}

fn take_create_plugin(module: GeneratorModule_Ref) -> ROption<PluginFactory> {
    module.create_plugin()
}

fn take_plugin(module: GeneratorModule_Ref) -> ROption<PluginFactory> {
    module.plugin()
}

fn take_legacy_plugin(module: GeneratorModule_Ref) -> ROption<PluginFactory> {
    module.legacy_plugin()
}

/// Entry points in probe order. The first candidate that passes descriptor
/// validation wins.
pub const EXPORT_STRATEGIES: [ExportStrategy; 4] = [
    ExportStrategy {
        key: "default_export",
        extract: take_default,
    },
    ExportStrategy {
        key: "create_plugin",
        extract: take_create_plugin,
    },
    ExportStrategy {
        key: "plugin",
        extract: take_plugin,
    },
    ExportStrategy {
        key: "legacy_plugin",
        extract: take_legacy_plugin,
    },
];

/// Entry points a module actually provides, in strategy order.
pub fn available_export_keys(module: GeneratorModule_Ref) -> Vec<&'static str> {
    EXPORT_STRATEGIES
        .iter()
        .filter(|strategy| matches!((strategy.extract)(module), ROption::RSome(_)))
        .map(|strategy| strategy.key)
        .collect()
}

/// Why an import attempt failed.
///
/// Only `PackageNotFound` is "not-found-shaped"; it is the sole variant
/// that makes the loader escalate to installation and classify the terminal
/// failure as not-found.
#[derive(Debug, Clone)]
pub enum ImportFailure {
    /// The package directory was not found on the module search path.
    PackageNotFound {
        identifier: String,
        searched: Vec<PathBuf>,
    },
    /// The package resolved but contains no platform library.
    MissingLibrary { identifier: String, dir: PathBuf },
    /// The library file exists but could not be opened.
    LibraryOpen { path: PathBuf, detail: String },
    /// The library is missing a required symbol.
    SymbolMissing { path: PathBuf, detail: String },
    /// The library was built against an incompatible interface.
    InterfaceMismatch {
        path: PathBuf,
        expected: String,
        actual: String,
    },
    /// No entry point yielded a valid plugin.
    NoValidExport {
        path: PathBuf,
        available: Vec<&'static str>,
        reason: Option<String>,
    },
}

impl ImportFailure {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ImportFailure::PackageNotFound { .. })
    }

    /// Locations this failure covers, for not-found diagnostics.
    pub fn locations(&self) -> Vec<String> {
        match self {
            ImportFailure::PackageNotFound { searched, .. } => {
                searched.iter().map(|p| p.display().to_string()).collect()
            }
            ImportFailure::MissingLibrary { dir, .. } => vec![dir.display().to_string()],
            ImportFailure::LibraryOpen { path, .. }
            | ImportFailure::SymbolMissing { path, .. }
            | ImportFailure::InterfaceMismatch { path, .. }
            | ImportFailure::NoValidExport { path, .. } => vec![path.display().to_string()],
        }
    }

    /// Export keys to surface in the load error, when relevant.
    pub fn export_keys(&self) -> Vec<String> {
        match self {
            ImportFailure::NoValidExport { available, .. } => {
                available.iter().map(|k| k.to_string()).collect()
            }
            _ => vec![],
        }
    }
}

impl fmt::Display for ImportFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImportFailure::PackageNotFound { identifier, searched } => write!(
                f,
                "package '{}' not found ({} locations searched)",
                identifier,
                searched.len()
            ),
            ImportFailure::MissingLibrary { identifier, dir } => write!(
                f,
                "package '{}' has no plugin library in {}",
                identifier,
                dir.display()
            ),
            ImportFailure::LibraryOpen { path, detail } => {
                write!(f, "failed to open library {}: {}", path.display(), detail)
            }
            ImportFailure::SymbolMissing { path, detail } => {
                write!(f, "library {} is missing a required symbol: {}", path.display(), detail)
            }
            ImportFailure::InterfaceMismatch {
                path,
                expected,
                actual,
            } => write!(
                f,
                "library {} requires interface version {}, host provides {}",
                path.display(),
                expected,
                actual
            ),
            ImportFailure::NoValidExport { path, reason, .. } => {
                write!(
                    f,
                    "module {} does not export a valid plugin",
                    path.display()
                )?;
                if let Some(reason) = reason {
                    write!(f, ": {}", reason)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ImportFailure {}

/// A validated plugin together with where it came from.
#[derive(Debug, Clone)]
pub struct Discovered {
    pub descriptor: Arc<PluginDescriptor>,
    pub version: Option<String>,
    pub path: PathBuf,
}

/// The loader's import seam.
pub trait ModuleImporter: Send + Sync {
    /// Import the plugin backing a package identifier, honoring the
    /// workspace's module search path.
    fn import_package(&self, root: &Path, identifier: &str) -> Result<Discovered, ImportFailure>;

    /// Import a library file directly. Only the `default_export` entry
    /// point is accepted (fallback-path contract).
    fn import_path(&self, path: &Path) -> Result<Discovered, ImportFailure>;
}

/// Map an abi_stable library error to an import failure.
fn map_library_error(path: &Path, err: &LibraryError) -> ImportFailure {
    // Include full error details in the message for debugging
    let detail = format!("{:?}", err);

    match err {
        LibraryError::OpenError { .. } => ImportFailure::LibraryOpen {
            path: path.to_path_buf(),
            detail,
        },
        LibraryError::GetSymbolError { .. } => ImportFailure::SymbolMissing {
            path: path.to_path_buf(),
            detail,
        },
        LibraryError::IncompatibleVersionNumber {
            expected_version,
            actual_version,
            ..
        } => ImportFailure::InterfaceMismatch {
            path: path.to_path_buf(),
            expected: expected_version.to_string(),
            actual: actual_version.to_string(),
        },
        _ => ImportFailure::LibraryOpen {
            path: path.to_path_buf(),
            detail,
        },
    }
}

/// Probe the given strategies and return the first candidate that passes
/// descriptor validation.
fn extract_descriptor(
    module: GeneratorModule_Ref,
    strategies: &[ExportStrategy],
    path: &Path,
) -> Result<PluginDescriptor, ImportFailure> {
    let mut last_rejection = None;

    for strategy in strategies {
        let ROption::RSome(factory) = (strategy.extract)(module) else {
            continue;
        };
        let candidate: GeneratorPlugin_TO<'static, RBox<()>> = factory();
        match PluginDescriptor::from_ffi(candidate) {
            Ok(descriptor) => {
                tracing::debug!(
                    export = strategy.key,
                    plugin = descriptor.name(),
                    "Extracted plugin from module export"
                );
                return Ok(descriptor);
            }
            Err(reason) => {
                tracing::debug!(export = strategy.key, %reason, "Export rejected");
                last_rejection = Some(reason);
            }
        }
    }

    Err(ImportFailure::NoValidExport {
        path: path.to_path_buf(),
        available: available_export_keys(module),
        reason: last_rejection,
    })
}

/// Imports plugins from abi_stable dynamic libraries.
pub struct DylibImporter {
    resolver: Arc<dyn PackageResolver>,
}

impl DylibImporter {
    pub fn new(resolver: Arc<dyn PackageResolver>) -> Self {
        Self { resolver }
    }

    fn load_module(path: &Path) -> Result<GeneratorModule_Ref, ImportFailure> {
        GeneratorModule_Ref::load_from(LibraryPath::FullPath(path))
            .map_err(|err| map_library_error(path, &err))
    }
}

impl ModuleImporter for DylibImporter {
    fn import_package(&self, root: &Path, identifier: &str) -> Result<Discovered, ImportFailure> {
        let package = self.resolver.resolve(root, identifier).map_err(|failure| {
            ImportFailure::PackageNotFound {
                identifier: failure.identifier,
                searched: failure.searched,
            }
        })?;

        let library = find_plugin_library(&package.dir).ok_or_else(|| {
            ImportFailure::MissingLibrary {
                identifier: identifier.to_string(),
                dir: package.dir.clone(),
            }
        })?;

        let module = Self::load_module(&library)?;
        let descriptor = extract_descriptor(module, &EXPORT_STRATEGIES, &library)?;
        let version = package
            .version
            .or_else(|| Some(descriptor.version().to_string()));

        Ok(Discovered {
            descriptor: Arc::new(descriptor),
            version,
            path: library,
        })
    }

    fn import_path(&self, path: &Path) -> Result<Discovered, ImportFailure> {
        let module = Self::load_module(path)?;
        let descriptor = extract_descriptor(module, &EXPORT_STRATEGIES[..1], path)?;
        let version = Some(descriptor.version().to_string());

        Ok(Discovered {
            descriptor: Arc::new(descriptor),
            version,
            path: path.to_path_buf(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugin::descriptor::testing::TestGenerator;
    use abi_stable::prefix_type::PrefixTypeTrait;
    use abi_stable::sabi_trait::prelude::TD_Opaque;
    use apigen_plugin_interface::GeneratorModule;

    extern "C" fn make_valid() -> GeneratorPlugin_TO<'static, RBox<()>> {
        GeneratorPlugin_TO::from_value(TestGenerator::named("valid"), TD_Opaque)
    }

    extern "C" fn make_factory_built() -> GeneratorPlugin_TO<'static, RBox<()>> {
        GeneratorPlugin_TO::from_value(TestGenerator::named("factory-built"), TD_Opaque)
    }

    extern "C" fn make_nameless() -> GeneratorPlugin_TO<'static, RBox<()>> {
        GeneratorPlugin_TO::from_value(TestGenerator::named(""), TD_Opaque)
    }

    fn module(
        default_export: ROption<PluginFactory>,
        create_plugin: ROption<PluginFactory>,
        plugin: ROption<PluginFactory>,
        legacy_plugin: ROption<PluginFactory>,
    ) -> GeneratorModule_Ref {
        GeneratorModule {
            default_export,
            create_plugin,
            plugin,
            legacy_plugin,
        }
        .leak_into_prefix()
    }

    #[test]
    fn test_each_export_slot_resolves() {
        let slots: [fn(ROption<PluginFactory>) -> GeneratorModule_Ref; 4] = [
            |f| module(f, ROption::RNone, ROption::RNone, ROption::RNone),
            |f| module(ROption::RNone, f, ROption::RNone, ROption::RNone),
            |f| module(ROption::RNone, ROption::RNone, f, ROption::RNone),
            |f| module(ROption::RNone, ROption::RNone, ROption::RNone, f),
        ];
        for slot in slots {
            let m = slot(ROption::RSome(make_valid));
            let descriptor =
                extract_descriptor(m, &EXPORT_STRATEGIES, Path::new("/lib/p.so")).unwrap();
            assert_eq!(descriptor.name(), "valid");
        }
    }

    #[test]
    fn test_default_export_wins_over_factory() {
        let m = module(
            ROption::RSome(make_valid),
            ROption::RSome(make_factory_built),
            ROption::RNone,
            ROption::RNone,
        );
        let descriptor = extract_descriptor(m, &EXPORT_STRATEGIES, Path::new("/lib/p.so")).unwrap();
        assert_eq!(descriptor.name(), "valid");
    }

    #[test]
    fn test_invalid_default_falls_through_to_next_export() {
        let m = module(
            ROption::RSome(make_nameless),
            ROption::RSome(make_factory_built),
            ROption::RNone,
            ROption::RNone,
        );
        let descriptor = extract_descriptor(m, &EXPORT_STRATEGIES, Path::new("/lib/p.so")).unwrap();
        assert_eq!(descriptor.name(), "factory-built");
    }

    #[test]
    fn test_no_valid_export_lists_available_keys() {
        let m = module(
            ROption::RNone,
            ROption::RSome(make_nameless),
            ROption::RNone,
            ROption::RNone,
        );
        let err = extract_descriptor(m, &EXPORT_STRATEGIES, Path::new("/lib/p.so")).unwrap_err();
        match &err {
            ImportFailure::NoValidExport {
                available, reason, ..
            } => {
                assert_eq!(available, &vec!["create_plugin"]);
                assert!(reason.as_deref().unwrap().contains("empty name"));
            }
            other => panic!("expected NoValidExport, got {:?}", other),
        }
        assert!(!err.is_not_found());
        assert_eq!(err.export_keys(), vec!["create_plugin"]);
    }

    #[test]
    fn test_path_import_only_accepts_default_export() {
        // Fallback-path probing ignores non-default entry points.
        let m = module(
            ROption::RNone,
            ROption::RSome(make_valid),
            ROption::RNone,
            ROption::RNone,
        );
        let err = extract_descriptor(m, &EXPORT_STRATEGIES[..1], Path::new("/lib/p.so")).unwrap_err();
        assert!(matches!(err, ImportFailure::NoValidExport { .. }));
    }

    #[test]
    fn test_available_export_keys_in_strategy_order() {
        let m = module(
            ROption::RNone,
            ROption::RSome(make_valid),
            ROption::RNone,
            ROption::RSome(make_valid),
        );
        assert_eq!(available_export_keys(m), vec!["create_plugin", "legacy_plugin"]);
    }

    #[test]
    fn test_package_not_found_is_the_only_not_found_shape() {
        let not_found = ImportFailure::PackageNotFound {
            identifier: "x".to_string(),
            searched: vec![PathBuf::from("/ws/node_modules/x")],
        };
        assert!(not_found.is_not_found());
        assert_eq!(not_found.locations(), vec!["/ws/node_modules/x"]);

        let missing_lib = ImportFailure::MissingLibrary {
            identifier: "x".to_string(),
            dir: PathBuf::from("/ws/node_modules/x"),
        };
        assert!(!missing_lib.is_not_found());
    }

    #[test]
    fn test_import_package_not_found_maps_resolver_failure() {
        let ws = tempfile::TempDir::new().unwrap();
        let importer = DylibImporter::new(Arc::new(crate::plugin::resolve::NodeModulesResolver));
        let err = importer
            .import_package(ws.path(), "@apigen/plugin-hey-api")
            .unwrap_err();
        assert!(err.is_not_found());
        assert!(!err.locations().is_empty());
    }

    #[test]
    fn test_import_package_without_library_is_not_not_found() {
        let ws = tempfile::TempDir::new().unwrap();
        let dir = ws.path().join("node_modules").join("no-lib");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("package.json"), r#"{"version": "1.0.0"}"#).unwrap();

        let importer = DylibImporter::new(Arc::new(crate::plugin::resolve::NodeModulesResolver));
        let err = importer.import_package(ws.path(), "no-lib").unwrap_err();
        assert!(matches!(err, ImportFailure::MissingLibrary { .. }));
        assert!(!err.is_not_found());
    }
}
