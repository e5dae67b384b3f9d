//! Generator plugin trait definition for the FFI-safe plugin interface.
//!
//! This module defines the core `GeneratorPlugin` trait using `#[sabi_trait]`
//! from abi_stable, which generates the necessary FFI-safe trait object types.

use abi_stable::sabi_trait;
use abi_stable::std_types::{RBox, ROption, RResult, RString};
use std::panic::{catch_unwind, AssertUnwindSafe};

use crate::types::{FfiGenerateRequest, FfiGenerateResult};

/// The contract every generator implementation must satisfy.
///
/// The `#[sabi_trait]` attribute generates `GeneratorPlugin_TO`, a
/// type-erased FFI-safe trait object that can be safely passed across
/// dynamic library boundaries.
///
/// `name` and `generate` carry the real behavior; `validate` and `schema`
/// are optional capabilities. A plugin without them returns `ROk(())` and
/// `RNone` respectively.
///
/// # Example (for plugin implementors)
///
/// ```ignore
/// use apigen_plugin_interface::{FfiGenerateRequest, FfiGenerateResult, GeneratorPlugin};
/// use abi_stable::std_types::{ROption, RResult, RString};
///
/// #[derive(Debug)]
/// struct MyGenerator;
///
/// impl GeneratorPlugin for MyGenerator {
///     fn name(&self) -> RString {
///         "my-generator".into()
///     }
///
///     fn version(&self) -> RString {
///         "1.0.0".into()
///     }
///
///     fn min_interface_version(&self) -> RString {
///         "0.2.0".into()
///     }
///
///     fn generate(&self, request: FfiGenerateRequest) -> RResult<FfiGenerateResult, RString> {
///         RResult::ROk(FfiGenerateResult::default())
///     }
///
///     fn validate(&self, _options_json: RString) -> RResult<(), RString> {
///         RResult::ROk(())
///     }
///
///     fn schema(&self) -> ROption<RString> {
///         ROption::RNone
///     }
/// }
/// ```
#[sabi_trait]
pub trait GeneratorPlugin: Send + Sync + Debug {
    /// Returns the generator's unique name. Must not be empty.
    fn name(&self) -> RString;

    /// Returns the generator's version in semver format (e.g., "1.0.0").
    fn version(&self) -> RString;

    /// Returns the minimum interface version this plugin requires.
    ///
    /// The host checks this against [`crate::INTERFACE_VERSION`] before
    /// calling any other method.
    fn min_interface_version(&self) -> RString;

    /// Run the generator for a single request.
    ///
    /// # Returns
    ///
    /// * `RResult::ROk(result)` - files written and warnings collected
    /// * `RResult::RErr(msg)` - error message describing what went wrong
    fn generate(&self, request: FfiGenerateRequest) -> RResult<FfiGenerateResult, RString>;

    /// Validate generator options before a run.
    ///
    /// Plugins with nothing to validate return `ROk(())`.
    fn validate(&self, options_json: RString) -> RResult<(), RString>;

    /// Return the JSON schema describing this generator's options.
    ///
    /// Plugins without a schema return `RNone`.
    #[sabi(last_prefix_field)]
    fn schema(&self) -> ROption<RString>;
}

/// Wrapper for calling `plugin.generate()` safely.
///
/// Catches any panic from the plugin and converts it to `RResult::RErr`,
/// preventing panics from crossing the FFI boundary, which would be
/// undefined behavior.
pub fn call_plugin_generate(
    plugin: &GeneratorPlugin_TO<'_, RBox<()>>,
    request: FfiGenerateRequest,
) -> RResult<FfiGenerateResult, RString> {
    let result = catch_unwind(AssertUnwindSafe(|| plugin.generate(request)));

    match result {
        Ok(r) => r,
        Err(panic_info) => {
            let msg = if let Some(s) = panic_info.downcast_ref::<&str>() {
                format!("Generator panicked: {}", s)
            } else if let Some(s) = panic_info.downcast_ref::<String>() {
                format!("Generator panicked: {}", s)
            } else {
                "Generator panicked with unknown error".to_string()
            };
            RResult::RErr(msg.into())
        }
    }
}

/// Wrapper for calling `plugin.validate()` safely.
///
/// Catches any panic from the plugin and converts it to `RResult::RErr`.
pub fn call_plugin_validate(
    plugin: &GeneratorPlugin_TO<'_, RBox<()>>,
    options_json: RString,
) -> RResult<(), RString> {
    let result = catch_unwind(AssertUnwindSafe(|| plugin.validate(options_json)));

    match result {
        Ok(r) => r,
        Err(panic_info) => {
            let msg = if let Some(s) = panic_info.downcast_ref::<&str>() {
                format!("Generator panicked during validation: {}", s)
            } else if let Some(s) = panic_info.downcast_ref::<String>() {
                format!("Generator panicked during validation: {}", s)
            } else {
                "Generator panicked during validation with unknown error".to_string()
            };
            RResult::RErr(msg.into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use abi_stable::sabi_trait::prelude::TD_Opaque;

    #[derive(Debug)]
    struct EchoGenerator;

    impl GeneratorPlugin for EchoGenerator {
        fn name(&self) -> RString {
            "echo".into()
        }

        fn version(&self) -> RString {
            "1.0.0".into()
        }

        fn min_interface_version(&self) -> RString {
            "0.1.0".into()
        }

        fn generate(&self, request: FfiGenerateRequest) -> RResult<FfiGenerateResult, RString> {
            RResult::ROk(FfiGenerateResult {
                written_files: vec![request.spec_path].into(),
                warnings: abi_stable::std_types::RVec::new(),
            })
        }

        fn validate(&self, options_json: RString) -> RResult<(), RString> {
            if options_json.as_str().contains("bad") {
                RResult::RErr("bad options".into())
            } else {
                RResult::ROk(())
            }
        }

        fn schema(&self) -> ROption<RString> {
            ROption::RNone
        }
    }

    #[derive(Debug)]
    struct PanickingGenerator;

    impl GeneratorPlugin for PanickingGenerator {
        fn name(&self) -> RString {
            "panicky".into()
        }

        fn version(&self) -> RString {
            "1.0.0".into()
        }

        fn min_interface_version(&self) -> RString {
            "0.1.0".into()
        }

        fn generate(&self, _request: FfiGenerateRequest) -> RResult<FfiGenerateResult, RString> {
            panic!("boom");
        }

        fn validate(&self, _options_json: RString) -> RResult<(), RString> {
            panic!("boom");
        }

        fn schema(&self) -> ROption<RString> {
            ROption::RNone
        }
    }

    fn request() -> FfiGenerateRequest {
        FfiGenerateRequest {
            spec_path: "api.yaml".into(),
            output_dir: "out".into(),
            options_json: "{}".into(),
        }
    }

    #[test]
    fn test_call_generate_passes_through_result() {
        let plugin = GeneratorPlugin_TO::from_value(EchoGenerator, TD_Opaque);
        let result = call_plugin_generate(&plugin, request()).into_result().unwrap();
        assert_eq!(result.written_files.len(), 1);
        assert_eq!(result.written_files[0].as_str(), "api.yaml");
    }

    #[test]
    fn test_call_generate_catches_panic() {
        let plugin = GeneratorPlugin_TO::from_value(PanickingGenerator, TD_Opaque);
        let err = call_plugin_generate(&plugin, request()).into_result().unwrap_err();
        assert!(err.as_str().contains("panicked"));
        assert!(err.as_str().contains("boom"));
    }

    #[test]
    fn test_call_validate_rejects_bad_options() {
        let plugin = GeneratorPlugin_TO::from_value(EchoGenerator, TD_Opaque);
        let err = call_plugin_validate(&plugin, r#"{"bad": true}"#.into())
            .into_result()
            .unwrap_err();
        assert_eq!(err.as_str(), "bad options");
    }

    #[test]
    fn test_call_validate_catches_panic() {
        let plugin = GeneratorPlugin_TO::from_value(PanickingGenerator, TD_Opaque);
        let err = call_plugin_validate(&plugin, "{}".into()).into_result().unwrap_err();
        assert!(err.as_str().contains("panicked during validation"));
    }
}
