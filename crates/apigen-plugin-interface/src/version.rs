//! Version protocol and generator module definition.
//!
//! This module provides the RootModule-based entry point for generator
//! plugin libraries and version compatibility checking between plugins and
//! the host.

// abi_stable uses underscore naming convention for generated types
#![allow(non_camel_case_types)]

use abi_stable::{
    library::RootModule, package_version_strings, sabi_types::VersionStrings,
    std_types::{RBox, ROption},
    StableAbi,
};
use semver::Version;

use crate::plugin::GeneratorPlugin_TO;

/// Current interface crate version.
///
/// Plugins declare their minimum required interface version, and the host
/// uses this constant to check compatibility at load time.
pub const INTERFACE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Factory function that instantiates a generator plugin.
pub type PluginFactory = extern "C" fn() -> GeneratorPlugin_TO<'static, RBox<()>>;

/// Generator plugin library module - loaded from .so/.dylib/.dll.
///
/// This struct is the entry point for dynamically loaded generator packages.
/// A module may expose its plugin through any of four entry points; the host
/// probes them in declaration order and uses the first that yields a valid
/// plugin. Absent entry points are `RNone`.
///
/// `default_export` is the preferred form for new plugins; `create_plugin`
/// suits plugins that need construction logic; `plugin` and `legacy_plugin`
/// exist for packages published against earlier interface revisions.
///
/// # Example (for plugin implementors)
///
/// ```ignore
/// use apigen_plugin_interface::{GeneratorModule, GeneratorModule_Ref, GeneratorPlugin_TO};
/// use abi_stable::{export_root_module, prefix_type::PrefixTypeTrait, std_types::{RBox, ROption}};
///
/// #[export_root_module]
/// fn get_library() -> GeneratorModule_Ref {
///     GeneratorModule {
///         default_export: ROption::RSome(create),
///         create_plugin: ROption::RNone,
///         plugin: ROption::RNone,
///         legacy_plugin: ROption::RNone,
///     }
///     .leak_into_prefix()
/// }
///
/// extern "C" fn create() -> GeneratorPlugin_TO<'static, RBox<()>> {
///     GeneratorPlugin_TO::from_value(MyGenerator::new(), abi_stable::sabi_trait::prelude::TD_Opaque)
/// }
/// ```
#[repr(C)]
#[derive(StableAbi)]
#[sabi(kind(Prefix(prefix_ref = GeneratorModule_Ref)))]
pub struct GeneratorModule {
    /// Preferred entry point.
    #[sabi(unsafe_opaque_field)]
    pub default_export: ROption<PluginFactory>,

    /// Factory-style entry point.
    #[sabi(unsafe_opaque_field)]
    pub create_plugin: ROption<PluginFactory>,

    /// Named entry point.
    #[sabi(unsafe_opaque_field)]
    pub plugin: ROption<PluginFactory>,

    /// Entry point kept for packages published against earlier interface
    /// revisions.
    #[sabi(last_prefix_field)]
    #[sabi(unsafe_opaque_field)]
    pub legacy_plugin: ROption<PluginFactory>,
}

impl RootModule for GeneratorModule_Ref {
    abi_stable::declare_root_module_statics! {GeneratorModule_Ref}

    const BASE_NAME: &'static str = "apigen_generator";
    const NAME: &'static str = "apigen generator interface";
    const VERSION_STRINGS: VersionStrings = package_version_strings!();
}

/// Check if a plugin's minimum interface version is compatible with the host.
///
/// # Compatibility rules
///
/// - Same major version required (breaking changes only in major versions)
/// - Host version must be >= plugin's minimum version
///
/// This follows standard semver compatibility: a plugin compiled against
/// interface 0.1.0 will work with host 0.1.5 (same major, host newer),
/// but not with host 0.0.9 (host older) or host 1.0.0 (different major).
///
/// # Returns
///
/// * `Ok(true)` - Versions are compatible
/// * `Ok(false)` - Versions are incompatible
/// * `Err(msg)` - Version string parsing failed
///
/// # Example
///
/// ```
/// use apigen_plugin_interface::is_version_compatible;
///
/// // Same version - compatible
/// assert!(is_version_compatible("0.1.0", "0.1.0").unwrap());
///
/// // Host newer, same major - compatible
/// assert!(is_version_compatible("0.1.0", "0.2.0").unwrap());
///
/// // Host older - incompatible
/// assert!(!is_version_compatible("0.2.0", "0.1.0").unwrap());
///
/// // Different major - incompatible
/// assert!(!is_version_compatible("1.0.0", "0.9.0").unwrap());
/// ```
pub fn is_version_compatible(plugin_min_version: &str, host_version: &str) -> Result<bool, String> {
    let plugin_min = Version::parse(plugin_min_version)
        .map_err(|e| format!("Invalid plugin version '{}': {}", plugin_min_version, e))?;
    let host = Version::parse(host_version)
        .map_err(|e| format!("Invalid host version '{}': {}", host_version, e))?;

    // Compatible if same major and host >= plugin_min
    Ok(host.major == plugin_min.major && host >= plugin_min)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compatible_same_major_same_version() {
        assert!(is_version_compatible("0.1.0", "0.1.0").unwrap());
    }

    #[test]
    fn test_compatible_same_major_host_newer() {
        assert!(is_version_compatible("0.1.0", "0.2.0").unwrap());
        assert!(is_version_compatible("0.1.0", "0.1.5").unwrap());
    }

    #[test]
    fn test_incompatible_different_major() {
        assert!(!is_version_compatible("1.0.0", "0.9.0").unwrap());
        assert!(!is_version_compatible("0.1.0", "1.0.0").unwrap());
    }

    #[test]
    fn test_incompatible_host_older() {
        assert!(!is_version_compatible("0.2.0", "0.1.0").unwrap());
    }

    #[test]
    fn test_invalid_version_string() {
        assert!(is_version_compatible("invalid", "0.1.0").is_err());
        assert!(is_version_compatible("0.1.0", "invalid").is_err());
    }

    #[test]
    fn test_interface_version_constant() {
        // Just verify it parses as valid semver
        Version::parse(INTERFACE_VERSION).expect("INTERFACE_VERSION should be valid semver");
    }
}
