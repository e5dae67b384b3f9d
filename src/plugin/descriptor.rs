//! Host-side descriptor wrapping a validated generator plugin.
//!
//! The descriptor is the validation boundary: a candidate trait object is
//! only promoted to a `PluginDescriptor` once its shape checks out (non-empty
//! name, compatible interface version). All FFI calls go through the
//! panic-catching wrappers from the interface crate.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use abi_stable::std_types::{RBox, RResult};
use apigen_plugin_interface::{
    call_plugin_generate, call_plugin_validate, is_version_compatible, FfiGenerateRequest,
    GeneratorPlugin_TO, INTERFACE_VERSION,
};

use crate::plugin::errors::PluginError;

/// A single generation request, host-side.
#[derive(Debug, Clone)]
pub struct GenerateRequest {
    pub spec_path: PathBuf,
    pub output_dir: PathBuf,
    /// Generator-specific options; defaults to an empty object.
    pub options: serde_json::Value,
}

impl GenerateRequest {
    pub fn new(spec_path: PathBuf, output_dir: PathBuf) -> Self {
        Self {
            spec_path,
            output_dir,
            options: serde_json::Value::Object(Default::default()),
        }
    }

    fn to_ffi(&self) -> FfiGenerateRequest {
        FfiGenerateRequest {
            spec_path: self.spec_path.to_string_lossy().into_owned().into(),
            output_dir: self.output_dir.to_string_lossy().into_owned().into(),
            options_json: self.options.to_string().into(),
        }
    }
}

/// The outcome of a successful generator run, host-side.
#[derive(Debug, Clone, Default)]
pub struct GenerateOutput {
    pub written_files: Vec<PathBuf>,
    pub warnings: Vec<String>,
}

/// A validated, callable generator implementation.
pub struct PluginDescriptor {
    plugin: GeneratorPlugin_TO<'static, RBox<()>>,
    name: String,
    version: String,
}

impl PluginDescriptor {
    /// Promote a candidate trait object to a descriptor.
    ///
    /// Rejects candidates with an empty name or an incompatible minimum
    /// interface version; the returned message is the load-error reason.
    pub fn from_ffi(plugin: GeneratorPlugin_TO<'static, RBox<()>>) -> Result<Self, String> {
        let name = plugin.name().to_string();
        if name.is_empty() {
            return Err("plugin reported an empty name".to_string());
        }

        let min_version = plugin.min_interface_version().to_string();
        match is_version_compatible(&min_version, INTERFACE_VERSION) {
            Ok(true) => {}
            Ok(false) => {
                return Err(format!(
                    "plugin '{}' requires interface version {}, host provides {}",
                    name, min_version, INTERFACE_VERSION
                ));
            }
            Err(e) => {
                return Err(format!("version check failed for plugin '{}': {}", name, e));
            }
        }

        let version = plugin.version().to_string();
        Ok(Self {
            plugin,
            name,
            version,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// Run the generator, blocking the current thread.
    pub fn generate_blocking(&self, request: &GenerateRequest) -> Result<GenerateOutput, PluginError> {
        match call_plugin_generate(&self.plugin, request.to_ffi()) {
            RResult::ROk(result) => Ok(GenerateOutput {
                written_files: result
                    .written_files
                    .into_iter()
                    .map(|f| PathBuf::from(f.as_str()))
                    .collect(),
                warnings: result.warnings.into_iter().map(|w| w.into()).collect(),
            }),
            RResult::RErr(message) => Err(PluginError::Generate {
                name: self.name.clone(),
                message: message.into(),
            }),
        }
    }

    /// Run the generator on the blocking thread pool.
    pub async fn generate(
        self: Arc<Self>,
        request: GenerateRequest,
    ) -> Result<GenerateOutput, PluginError> {
        let name = self.name.clone();
        tokio::task::spawn_blocking(move || self.generate_blocking(&request))
            .await
            .map_err(|e| PluginError::Generate {
                name,
                message: format!("generate task failed: {}", e),
            })?
    }

    /// Validate generator options ahead of a run.
    pub fn validate_options(&self, options: &serde_json::Value) -> Result<(), PluginError> {
        match call_plugin_validate(&self.plugin, options.to_string().into()) {
            RResult::ROk(()) => Ok(()),
            RResult::RErr(message) => Err(PluginError::Validation {
                name: self.name.clone(),
                message: message.into(),
            }),
        }
    }

    /// JSON schema for this generator's options, when the plugin provides
    /// one.
    pub fn schema(&self) -> Option<String> {
        self.plugin.schema().into_option().map(|s| s.into())
    }
}

impl fmt::Debug for PluginDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginDescriptor")
            .field("name", &self.name)
            .field("version", &self.version)
            .finish()
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use abi_stable::sabi_trait::prelude::TD_Opaque;
    use abi_stable::std_types::{ROption, RString, RVec};
    use apigen_plugin_interface::{FfiGenerateResult, GeneratorPlugin};

    /// Minimal in-process generator used across the subsystem's tests.
    #[derive(Debug, Clone)]
    pub(crate) struct TestGenerator {
        pub name: &'static str,
        pub min_interface_version: &'static str,
        pub fail_generate: bool,
    }

    impl TestGenerator {
        pub fn named(name: &'static str) -> Self {
            Self {
                name,
                min_interface_version: "0.1.0",
                fail_generate: false,
            }
        }
    }

    impl GeneratorPlugin for TestGenerator {
        fn name(&self) -> RString {
            self.name.into()
        }

        fn version(&self) -> RString {
            "1.0.0".into()
        }

        fn min_interface_version(&self) -> RString {
            self.min_interface_version.into()
        }

        fn generate(&self, request: FfiGenerateRequest) -> RResult<FfiGenerateResult, RString> {
            if self.fail_generate {
                return RResult::RErr("generation failed".into());
            }
            RResult::ROk(FfiGenerateResult {
                written_files: vec![request.output_dir].into(),
                warnings: RVec::new(),
            })
        }

        fn validate(&self, options_json: RString) -> RResult<(), RString> {
            if options_json.as_str().contains("invalid") {
                RResult::RErr("unknown option 'invalid'".into())
            } else {
                RResult::ROk(())
            }
        }

        fn schema(&self) -> ROption<RString> {
            ROption::RNone
        }
    }

    pub(crate) fn plugin_to(generator: TestGenerator) -> GeneratorPlugin_TO<'static, RBox<()>> {
        GeneratorPlugin_TO::from_value(generator, TD_Opaque)
    }

    pub(crate) fn descriptor(name: &'static str) -> Arc<PluginDescriptor> {
        Arc::new(PluginDescriptor::from_ffi(plugin_to(TestGenerator::named(name))).unwrap())
    }
}

#[cfg(test)]
mod tests {
    use super::testing::{descriptor, plugin_to, TestGenerator};
    use super::*;

    #[test]
    fn test_from_ffi_accepts_valid_plugin() {
        let descriptor = descriptor("openapi-tools");
        assert_eq!(descriptor.name(), "openapi-tools");
        assert_eq!(descriptor.version(), "1.0.0");
    }

    #[test]
    fn test_from_ffi_rejects_empty_name() {
        let err = PluginDescriptor::from_ffi(plugin_to(TestGenerator::named(""))).unwrap_err();
        assert!(err.contains("empty name"));
    }

    #[test]
    fn test_from_ffi_rejects_incompatible_interface_version() {
        let mut generator = TestGenerator::named("future");
        generator.min_interface_version = "99.0.0";
        let err = PluginDescriptor::from_ffi(plugin_to(generator)).unwrap_err();
        assert!(err.contains("requires interface version 99.0.0"));
    }

    #[test]
    fn test_from_ffi_rejects_unparseable_interface_version() {
        let mut generator = TestGenerator::named("garbled");
        generator.min_interface_version = "not-semver";
        let err = PluginDescriptor::from_ffi(plugin_to(generator)).unwrap_err();
        assert!(err.contains("version check failed"));
    }

    #[test]
    fn test_generate_blocking_success() {
        let descriptor = descriptor("gen");
        let request = GenerateRequest::new(PathBuf::from("api.yaml"), PathBuf::from("out"));
        let output = descriptor.generate_blocking(&request).unwrap();
        assert_eq!(output.written_files, vec![PathBuf::from("out")]);
    }

    #[test]
    fn test_generate_blocking_error_is_typed() {
        let mut generator = TestGenerator::named("gen");
        generator.fail_generate = true;
        let descriptor = PluginDescriptor::from_ffi(plugin_to(generator)).unwrap();
        let request = GenerateRequest::new(PathBuf::from("api.yaml"), PathBuf::from("out"));
        let err = descriptor.generate_blocking(&request).unwrap_err();
        assert!(matches!(err, PluginError::Generate { .. }));
    }

    #[tokio::test]
    async fn test_generate_async() {
        let descriptor = descriptor("gen");
        let request = GenerateRequest::new(PathBuf::from("api.yaml"), PathBuf::from("out"));
        let output = descriptor.generate(request).await.unwrap();
        assert_eq!(output.written_files, vec![PathBuf::from("out")]);
    }

    #[test]
    fn test_validate_options() {
        let descriptor = descriptor("gen");
        assert!(descriptor.validate_options(&serde_json::json!({"ok": 1})).is_ok());

        let err = descriptor
            .validate_options(&serde_json::json!({"invalid": 1}))
            .unwrap_err();
        assert!(matches!(err, PluginError::Validation { .. }));
    }

    #[test]
    fn test_schema_absent() {
        assert!(descriptor("gen").schema().is_none());
    }
}
