//! Auto-installer for missing generator plugin packages.
//!
//! Installs a package non-interactively when safe, or defers to an
//! interactive confirmation when a human is present. CI always declines.
//! The child-process seam (`CommandRunner`) and the environment are
//! injected so the gating and invocation logic are testable.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::plugin::environment::RuntimeEnvironment;
use crate::plugin::package_manager::{detect, PackageManager};
use crate::plugin::resolve::PackageResolver;

/// Overall wall-clock budget for one install command.
pub const DEFAULT_INSTALL_TIMEOUT: Duration = Duration::from_secs(300);

/// Options for a single install attempt.
#[derive(Debug, Clone)]
pub struct InstallOptions {
    /// Install as a dev dependency.
    pub dev: bool,
    /// Use this manager instead of detecting one.
    pub package_manager: Option<PackageManager>,
    pub timeout: Duration,
    /// Run the install even if the package already resolves.
    pub force: bool,
}

impl Default for InstallOptions {
    fn default() -> Self {
        Self {
            dev: true,
            package_manager: None,
            timeout: DEFAULT_INSTALL_TIMEOUT,
            force: false,
        }
    }
}

/// What happened on a successful `install` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallOutcome {
    Installed,
    /// The package already resolved; nothing was run.
    AlreadyInstalled,
}

/// Category of an install failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallErrorKind {
    /// Gating declined the install (CI, user said no, or non-interactive
    /// with no explicit flag).
    Declined,
    /// The install command could not be spawned.
    Spawn,
    /// The install command exited non-zero.
    CommandFailed { status: Option<i32> },
    /// The install command exceeded its wall-clock budget and was killed.
    TimedOut { after: Duration },
    /// The command succeeded but the package still cannot be resolved.
    Unresolvable,
}

/// Error when installing a generator plugin package.
#[derive(Debug, Clone)]
pub struct InstallError {
    /// Package identifier the install targeted.
    pub package: String,
    /// Category of the error.
    pub kind: InstallErrorKind,
    /// Human-readable error message.
    pub message: String,
}

impl InstallError {
    fn new(package: &str, kind: InstallErrorKind, message: String) -> Self {
        Self {
            package: package.to_string(),
            kind,
            message,
        }
    }
}

impl fmt::Display for InstallError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for InstallError {}

/// Terminal state of a spawned install command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandStatus {
    Exited { success: bool, code: Option<i32> },
    /// Killed after exceeding the timeout.
    TimedOut,
}

/// Child-process boundary for the installer.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(
        &self,
        program: &str,
        args: &[String],
        cwd: &Path,
        timeout: Duration,
    ) -> io::Result<CommandStatus>;
}

/// Runs install commands as real child processes with inherited stdio.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioCommandRunner;

#[async_trait]
impl CommandRunner for TokioCommandRunner {
    async fn run(
        &self,
        program: &str,
        args: &[String],
        cwd: &Path,
        timeout: Duration,
    ) -> io::Result<CommandStatus> {
        let mut child = tokio::process::Command::new(program)
            .args(args)
            .current_dir(cwd)
            .spawn()?;

        match tokio::time::timeout(timeout, child.wait()).await {
            Ok(status) => {
                let status = status?;
                Ok(CommandStatus::Exited {
                    success: status.success(),
                    code: status.code(),
                })
            }
            Err(_) => {
                // Kill and reap so the manager cannot keep mutating
                // node_modules after we have given up on it.
                let _ = child.start_kill();
                let _ = child.wait().await;
                Ok(CommandStatus::TimedOut)
            }
        }
    }
}

/// Installs missing generator plugin packages via the workspace's package
/// manager.
pub struct AutoInstaller {
    root: PathBuf,
    env: Arc<dyn RuntimeEnvironment>,
    resolver: Arc<dyn PackageResolver>,
    runner: Arc<dyn CommandRunner>,
    /// Explicit auto-install flag: proceed without asking.
    auto_install: bool,
    /// Call site opted out of prompting: proceed without asking.
    prompt_disabled: bool,
}

impl AutoInstaller {
    pub fn new(
        root: PathBuf,
        env: Arc<dyn RuntimeEnvironment>,
        resolver: Arc<dyn PackageResolver>,
        runner: Arc<dyn CommandRunner>,
    ) -> Self {
        Self {
            root,
            env,
            resolver,
            runner,
            auto_install: false,
            prompt_disabled: false,
        }
    }

    pub fn with_auto_install(mut self, auto_install: bool) -> Self {
        self.auto_install = auto_install;
        self
    }

    pub fn without_prompt(mut self) -> Self {
        self.prompt_disabled = true;
        self
    }

    /// Install `package` unless it already resolves (or `force` is set).
    ///
    /// A non-zero exit, a timeout, or a package that still does not resolve
    /// after a zero exit are all failures, never partial successes.
    pub async fn install(
        &self,
        package: &str,
        options: &InstallOptions,
    ) -> Result<InstallOutcome, InstallError> {
        if !options.force && self.resolver.can_resolve(&self.root, package) {
            tracing::debug!(package, "Package already resolvable, skipping install");
            return Ok(InstallOutcome::AlreadyInstalled);
        }

        self.authorize(package).await?;

        let manager = options
            .package_manager
            .unwrap_or_else(|| detect(&self.root, self.env.as_ref()));
        let args = manager.install_args(package, options.dev, false);

        tracing::info!(package, manager = %manager, "Installing generator plugin package");

        let status = self
            .runner
            .run(manager.program(), &args, &self.root, options.timeout)
            .await
            .map_err(|e| {
                InstallError::new(
                    package,
                    InstallErrorKind::Spawn,
                    format!("failed to spawn {}: {}", manager.program(), e),
                )
            })?;

        match status {
            CommandStatus::TimedOut => Err(InstallError::new(
                package,
                InstallErrorKind::TimedOut {
                    after: options.timeout,
                },
                format!(
                    "install of '{}' timed out after {}s",
                    package,
                    options.timeout.as_secs()
                ),
            )),
            CommandStatus::Exited { success: false, code } => Err(InstallError::new(
                package,
                InstallErrorKind::CommandFailed { status: code },
                format!(
                    "{} exited with status {} installing '{}'",
                    manager.program(),
                    code.map(|c| c.to_string())
                        .unwrap_or_else(|| "unknown".to_string()),
                    package
                ),
            )),
            CommandStatus::Exited { success: true, .. } => {
                if self.resolver.can_resolve(&self.root, package) {
                    tracing::info!(package, "Package installed");
                    Ok(InstallOutcome::Installed)
                } else {
                    Err(InstallError::new(
                        package,
                        InstallErrorKind::Unresolvable,
                        format!(
                            "'{}' was installed but still cannot be resolved from {}",
                            package,
                            self.root.display()
                        ),
                    ))
                }
            }
        }
    }

    /// Decide whether the install may proceed, asking the user when a
    /// human is present and no explicit flag was given.
    async fn authorize(&self, package: &str) -> Result<(), InstallError> {
        if self.env.is_ci() {
            return Err(InstallError::new(
                package,
                InstallErrorKind::Declined,
                format!("not installing '{}': running in CI", package),
            ));
        }

        if self.auto_install || self.prompt_disabled {
            return Ok(());
        }

        if self.env.is_interactive() {
            if self.confirm(package).await {
                return Ok(());
            }
            return Err(InstallError::new(
                package,
                InstallErrorKind::Declined,
                format!("install of '{}' declined by user", package),
            ));
        }

        Err(InstallError::new(
            package,
            InstallErrorKind::Declined,
            format!(
                "not installing '{}': no confirmation possible in a non-interactive session",
                package
            ),
        ))
    }

    async fn confirm(&self, package: &str) -> bool {
        let prompt = format!(
            "Generator plugin package '{}' is not installed. Install it now?",
            package
        );
        tokio::task::spawn_blocking(move || {
            dialoguer::Confirm::new()
                .with_prompt(prompt)
                .default(false)
                .interact()
                .unwrap_or(false)
        })
        .await
        .unwrap_or(false)
    }
}
