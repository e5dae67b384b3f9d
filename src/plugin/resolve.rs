//! Package resolution against the workspace's module search path.
//!
//! Generator packages are installed into `node_modules` by the workspace's
//! package manager; each package carries a prebuilt platform library as its
//! payload. Resolution walks the directory chain upward from the workspace
//! root, the same search order the runtime's own resolver uses. The
//! resolver is a trait so the loader and installer can be tested without a
//! real installation on disk.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// A package identifier resolved to an on-disk installation.
#[derive(Debug, Clone)]
pub struct ResolvedPackage {
    pub identifier: String,
    /// The package directory (contains `package.json`).
    pub dir: PathBuf,
    /// Version from the package manifest, when parseable.
    pub version: Option<String>,
}

/// Resolution failed: the package directory was not found anywhere on the
/// search path. `searched` records every location probed, in order.
#[derive(Debug, Clone)]
pub struct ResolveFailure {
    pub identifier: String,
    pub searched: Vec<PathBuf>,
}

impl fmt::Display for ResolveFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "package '{}' not found in {} search location(s)",
            self.identifier,
            self.searched.len()
        )
    }
}

impl std::error::Error for ResolveFailure {}

/// Resolves package identifiers to installed package directories.
pub trait PackageResolver: Send + Sync {
    fn resolve(&self, root: &Path, identifier: &str) -> Result<ResolvedPackage, ResolveFailure>;

    /// Whether `identifier` resolves at all. Used by the installer for its
    /// idempotence check and post-install verification.
    fn can_resolve(&self, root: &Path, identifier: &str) -> bool {
        self.resolve(root, identifier).is_ok()
    }
}

/// Standard `node_modules` walk-up resolution.
#[derive(Debug, Clone, Copy, Default)]
pub struct NodeModulesResolver;

impl PackageResolver for NodeModulesResolver {
    fn resolve(&self, root: &Path, identifier: &str) -> Result<ResolvedPackage, ResolveFailure> {
        let mut searched = Vec::new();

        for dir in root.ancestors() {
            let candidate = dir.join("node_modules").join(identifier);
            if candidate.join("package.json").is_file() {
                return Ok(ResolvedPackage {
                    identifier: identifier.to_string(),
                    version: read_manifest_version(&candidate),
                    dir: candidate,
                });
            }
            searched.push(candidate);
        }

        Err(ResolveFailure {
            identifier: identifier.to_string(),
            searched,
        })
    }
}

/// Read the `version` field out of a package manifest. Unparseable
/// manifests resolve with no version rather than failing.
fn read_manifest_version(package_dir: &Path) -> Option<String> {
    let content = fs::read_to_string(package_dir.join("package.json")).ok()?;
    let manifest: serde_json::Value = serde_json::from_str(&content).ok()?;
    manifest
        .get("version")
        .and_then(|v| v.as_str())
        .map(str::to_string)
}

/// Find the platform dynamic library inside a package directory.
///
/// Looks in the package root first, then in a `native/` subdirectory.
pub fn find_plugin_library(dir: &Path) -> Option<PathBuf> {
    for dir in [dir.to_path_buf(), dir.join("native")] {
        let Ok(entries) = fs::read_dir(&dir) else {
            continue;
        };
        for entry in entries.filter_map(|e| e.ok()) {
            let path = entry.path();
            if path
                .extension()
                .is_some_and(|ext| ext == std::env::consts::DLL_EXTENSION)
            {
                return Some(path);
            }
        }
    }
    None
}

/// The library filename a builtin generator compiles to.
pub fn plugin_library_filename(short_name: &str) -> String {
    format!(
        "{}apigen_plugin_{}{}",
        std::env::consts::DLL_PREFIX,
        short_name.replace('-', "_"),
        std::env::consts::DLL_SUFFIX
    )
}

/// Candidate file locations for a builtin generator in local-development
/// mode, in probe order: compiled release output first, then the debug
/// output.
pub fn dev_fallback_candidates(root: &Path, short_name: &str) -> Vec<PathBuf> {
    let filename = plugin_library_filename(short_name);
    vec![
        root.join("target").join("release").join(&filename),
        root.join("target").join("debug").join(&filename),
    ]
}
