//! Runtime environment capability for the resolution subsystem.
//!
//! CI/interactivity/local-development detection is injected into the loader
//! and installer as a trait object instead of being read from process
//! globals at the point of use, so the gating logic is testable without
//! touching the real environment.

use std::io::IsTerminal;

/// Environment variables that indicate a CI session.
const CI_VARS: &[&str] = &[
    "CI",
    "CONTINUOUS_INTEGRATION",
    "GITHUB_ACTIONS",
    "GITLAB_CI",
    "CIRCLECI",
    "JENKINS_URL",
    "TEAMCITY_VERSION",
    "BUILDKITE",
];

/// Enables probing of locally built plugin libraries instead of relying
/// solely on published packages. Distinct from CI detection.
pub const LOCAL_DEV_VAR: &str = "APIGEN_LOCAL_DEV";

fn is_truthy(value: &str) -> bool {
    !matches!(value, "" | "0" | "false")
}

/// Ambient process environment, as seen by the loader and installer.
pub trait RuntimeEnvironment: Send + Sync {
    /// Read a single environment variable.
    fn var(&self, name: &str) -> Option<String>;

    /// Whether a human is attached to the terminal.
    fn is_interactive(&self) -> bool;

    /// Whether the process is running under a CI system.
    ///
    /// A CI variable explicitly set to "false" or "0" does not count.
    fn is_ci(&self) -> bool {
        CI_VARS
            .iter()
            .any(|name| self.var(name).is_some_and(|value| is_truthy(&value)))
    }

    /// Whether local-development fallback paths should be probed.
    fn local_dev(&self) -> bool {
        self.var(LOCAL_DEV_VAR)
            .is_some_and(|value| is_truthy(&value))
    }
}

/// The real process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemEnvironment;

impl RuntimeEnvironment for SystemEnvironment {
    fn var(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }

    fn is_interactive(&self) -> bool {
        std::io::stdin().is_terminal() && std::io::stderr().is_terminal()
    }
}


#[cfg(test)]
mod tests {
    use super::testing::MockEnvironment;
    use super::*;

    #[test]
    fn test_ci_detection_standard_vars() {
        assert!(MockEnvironment::ci().is_ci());
        assert!(MockEnvironment::new().with_var("GITHUB_ACTIONS", "true").is_ci());
        assert!(MockEnvironment::new()
            .with_var("JENKINS_URL", "https://ci.example.com")
            .is_ci());
        assert!(!MockEnvironment::new().is_ci());
    }

    #[test]
    fn test_ci_explicitly_disabled_does_not_count() {
        assert!(!MockEnvironment::new().with_var("CI", "false").is_ci());
        assert!(!MockEnvironment::new().with_var("CI", "0").is_ci());
        assert!(!MockEnvironment::new().with_var("CI", "").is_ci());
    }

    #[test]
    fn test_local_dev_flag() {
        assert!(MockEnvironment::new().with_local_dev().local_dev());
        assert!(MockEnvironment::new().with_var(LOCAL_DEV_VAR, "true").local_dev());
        assert!(!MockEnvironment::new().with_var(LOCAL_DEV_VAR, "0").local_dev());
        assert!(!MockEnvironment::new().with_local_dev().is_ci());
    }

    #[test]
    fn test_interactive_flag() {
        assert!(MockEnvironment::new().interactive().is_interactive());
        assert!(!MockEnvironment::new().is_interactive());
    }

    #[test]
    #[serial_test::serial]
    fn test_system_environment_reads_process_env() {
        unsafe { std::env::set_var("APIGEN_TEST_VAR", "1") };
        assert_eq!(
            SystemEnvironment.var("APIGEN_TEST_VAR").as_deref(),
            Some("1")
        );

        unsafe { std::env::remove_var("APIGEN_TEST_VAR") };
        assert!(SystemEnvironment.var("APIGEN_TEST_VAR").is_none());
    }
}
