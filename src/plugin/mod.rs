//! Generator plugin resolution subsystem.
//!
//! A registry of named generator implementations, a loader that turns a
//! bare name into a validated descriptor, and an auto-installer that can
//! fetch a missing implementation package with the workspace's package
//! manager.

pub mod builtins;
pub mod descriptor;
pub mod environment;
pub mod errors;
pub mod importer;
pub mod installer;
pub mod loader;
pub mod package_manager;
pub mod registry;
pub mod resolve;

pub use descriptor::{GenerateOutput, GenerateRequest, PluginDescriptor};
pub use environment::{RuntimeEnvironment, SystemEnvironment};
pub use errors::PluginError;
pub use importer::{Discovered, DylibImporter, ImportFailure, ModuleImporter};
pub use installer::{
    AutoInstaller, CommandRunner, InstallError, InstallErrorKind, InstallOptions, InstallOutcome,
    TokioCommandRunner, DEFAULT_INSTALL_TIMEOUT,
};
pub use loader::{DiscoveryResult, PluginLoader, PluginSource};
pub use package_manager::{detect, PackageManager};
pub use registry::PluginRegistry;
pub use resolve::{NodeModulesResolver, PackageResolver, ResolveFailure, ResolvedPackage};
