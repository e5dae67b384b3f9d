//! FFI-safe request/result types for generator invocations.

use abi_stable::std_types::{RString, RVec};
use abi_stable::StableAbi;

/// A single generation request passed to a plugin.
///
/// `options_json` carries the generator-specific options as a JSON document;
/// plugins that take no options receive `"{}"`.
#[repr(C)]
#[derive(StableAbi, Clone, Debug)]
pub struct FfiGenerateRequest {
    /// Path to the input specification document (e.g. an OpenAPI document).
    pub spec_path: RString,
    /// Directory the generator should write its output into.
    pub output_dir: RString,
    /// Generator-specific options as a JSON object.
    pub options_json: RString,
}

/// The outcome of a successful generator run.
#[repr(C)]
#[derive(StableAbi, Clone, Debug, Default)]
pub struct FfiGenerateResult {
    /// Paths of the files the generator wrote, relative to `output_dir`
    /// or absolute.
    pub written_files: RVec<RString>,
    /// Non-fatal diagnostics produced during generation.
    pub warnings: RVec<RString>,
}
