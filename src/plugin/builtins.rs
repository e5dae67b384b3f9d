//! Builtin generator name table.
//!
//! Maps short friendly names to the installable package identifiers that
//! back them. The same table drives both resolution (name -> package) and
//! the auto-installer's install target.

/// Package-identifier prefix reserved for apigen generator packages.
///
/// Only identifiers inside this namespace are ever auto-installed;
/// arbitrary third-party identifiers are imported but never fetched.
pub const PLUGIN_NAMESPACE: &str = "@apigen/";

/// Short name -> installable package identifier.
const BUILTIN_PACKAGES: &[(&str, &str)] = &[
    ("openapi-tools", "@apigen/plugin-openapi-tools"),
    ("hey-api", "@apigen/plugin-hey-api"),
    ("orval", "@apigen/plugin-orval"),
];

/// Look up the package identifier backing a builtin short name.
pub fn builtin_package(name: &str) -> Option<&'static str> {
    BUILTIN_PACKAGES
        .iter()
        .find(|(short, _)| *short == name)
        .map(|(_, package)| *package)
}

/// Whether `name` is one of the builtin short names.
pub fn is_builtin(name: &str) -> bool {
    builtin_package(name).is_some()
}

/// Whether `identifier` lives inside the apigen plugin namespace.
pub fn is_plugin_package(identifier: &str) -> bool {
    identifier.starts_with(PLUGIN_NAMESPACE)
}

/// Map a requested name to the package identifier to import.
///
/// Names absent from the builtin table are used verbatim.
pub fn resolve_identifier(name: &str) -> &str {
    builtin_package(name).unwrap_or(name)
}

/// All builtin short names, in table order.
pub fn builtin_names() -> impl Iterator<Item = &'static str> {
    BUILTIN_PACKAGES.iter().map(|(short, _)| *short)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_lookup() {
        assert_eq!(
            builtin_package("openapi-tools"),
            Some("@apigen/plugin-openapi-tools")
        );
        assert_eq!(builtin_package("hey-api"), Some("@apigen/plugin-hey-api"));
        assert_eq!(builtin_package("unknown-thing"), None);
    }

    #[test]
    fn test_resolve_identifier_maps_builtins() {
        assert_eq!(resolve_identifier("hey-api"), "@apigen/plugin-hey-api");
    }

    #[test]
    fn test_resolve_identifier_passes_through_unknown_names() {
        assert_eq!(resolve_identifier("some-third-party"), "some-third-party");
        assert_eq!(resolve_identifier("@other/scope"), "@other/scope");
    }

    #[test]
    fn test_namespace_check() {
        assert!(is_plugin_package("@apigen/plugin-hey-api"));
        assert!(!is_plugin_package("@other/plugin-hey-api"));
        assert!(!is_plugin_package("lodash"));
    }

    #[test]
    fn test_builtin_names_are_all_in_namespace() {
        for name in builtin_names() {
            let package = builtin_package(name).unwrap();
            assert!(is_plugin_package(package), "{} -> {}", name, package);
        }
    }
}
