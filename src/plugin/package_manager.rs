//! Package manager detection for the auto-installer.
//!
//! Decides which package manager CLI governs the workspace, without the
//! caller having to specify one. Lockfiles are the most reliable signal of
//! workspace intent, the wrapper-set user-agent variable is second, and
//! live probing of each manager's version command is the last resort (a
//! globally installed manager does not imply the workspace uses it).

use std::fmt;
use std::path::Path;
use std::process::{Command, Stdio};

use crate::plugin::environment::RuntimeEnvironment;

/// Environment variable set by a running package-manager wrapper.
const USER_AGENT_VAR: &str = "npm_config_user_agent";

/// Package managers the installer knows how to drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageManager {
    Npm,
    Yarn,
    Pnpm,
    Bun,
}

/// Probe preference order: richer-feature managers before the universal
/// fallback. Npm is never probed; it is the fallback.
const PROBE_ORDER: [PackageManager; 3] =
    [PackageManager::Pnpm, PackageManager::Yarn, PackageManager::Bun];

/// Lockfile check order; first manager whose lockfile is present wins.
const LOCKFILE_ORDER: [PackageManager; 4] = [
    PackageManager::Pnpm,
    PackageManager::Yarn,
    PackageManager::Bun,
    PackageManager::Npm,
];

impl PackageManager {
    /// The CLI program to invoke.
    pub fn program(&self) -> &'static str {
        match self {
            PackageManager::Npm => "npm",
            PackageManager::Yarn => "yarn",
            PackageManager::Pnpm => "pnpm",
            PackageManager::Bun => "bun",
        }
    }

    /// Lockfile names this manager writes into the workspace root.
    pub fn lockfiles(&self) -> &'static [&'static str] {
        match self {
            PackageManager::Npm => &["package-lock.json", "npm-shrinkwrap.json"],
            PackageManager::Yarn => &["yarn.lock"],
            PackageManager::Pnpm => &["pnpm-lock.yaml"],
            PackageManager::Bun => &["bun.lockb", "bun.lock"],
        }
    }

    /// Build the argument list for installing `package`.
    pub fn install_args(&self, package: &str, dev: bool, global: bool) -> Vec<String> {
        let mut args: Vec<String> = match self {
            PackageManager::Npm => vec!["install".to_string()],
            PackageManager::Yarn => {
                if global {
                    vec!["global".to_string(), "add".to_string()]
                } else {
                    vec!["add".to_string()]
                }
            }
            PackageManager::Pnpm | PackageManager::Bun => vec!["add".to_string()],
        };

        if global && !matches!(self, PackageManager::Yarn) {
            args.push("--global".to_string());
        }
        if dev {
            let flag = match self {
                PackageManager::Npm | PackageManager::Pnpm => "--save-dev",
                PackageManager::Yarn | PackageManager::Bun => "--dev",
            };
            args.push(flag.to_string());
        }

        args.push(package.to_string());
        args
    }

    /// Parse a manager hint out of the wrapper user-agent string.
    ///
    /// The agent string always carries an npm token, so npm is matched last.
    pub fn from_user_agent(agent: &str) -> Option<Self> {
        if agent.contains("pnpm/") {
            Some(PackageManager::Pnpm)
        } else if agent.contains("yarn/") {
            Some(PackageManager::Yarn)
        } else if agent.contains("bun/") {
            Some(PackageManager::Bun)
        } else if agent.contains("npm/") {
            Some(PackageManager::Npm)
        } else {
            None
        }
    }

    /// Parse a configured manager name.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "npm" => Some(PackageManager::Npm),
            "yarn" => Some(PackageManager::Yarn),
            "pnpm" => Some(PackageManager::Pnpm),
            "bun" => Some(PackageManager::Bun),
            _ => None,
        }
    }
}

impl fmt::Display for PackageManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program())
    }
}

/// Detect the package manager governing the workspace at `root`.
///
/// Algorithm, first match wins:
/// 1. a manager-specific lockfile in the workspace root;
/// 2. a manager hint in `npm_config_user_agent`;
/// 3. probing each candidate's version command for a zero exit;
/// 4. npm as the universal fallback.
pub fn detect(root: &Path, env: &dyn RuntimeEnvironment) -> PackageManager {
    detect_with_prober(root, env, probe)
}

/// [`detect`] with the probe step injected, for tests.
pub fn detect_with_prober(
    root: &Path,
    env: &dyn RuntimeEnvironment,
    prober: impl Fn(PackageManager) -> bool,
) -> PackageManager {
    for manager in LOCKFILE_ORDER {
        if manager
            .lockfiles()
            .iter()
            .any(|lockfile| root.join(lockfile).is_file())
        {
            tracing::debug!(%manager, "Package manager detected from lockfile");
            return manager;
        }
    }

    if let Some(agent) = env.var(USER_AGENT_VAR)
        && let Some(manager) = PackageManager::from_user_agent(&agent)
    {
        tracing::debug!(%manager, "Package manager detected from user agent");
        return manager;
    }

    for manager in PROBE_ORDER {
        if prober(manager) {
            tracing::debug!(%manager, "Package manager detected by probing");
            return manager;
        }
    }

    PackageManager::Npm
}

/// Whether `manager`'s version command exits zero.
fn probe(manager: PackageManager) -> bool {
    Command::new(manager.program())
        .arg("--version")
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|status| status.success())
        .unwrap_or(false)
}
