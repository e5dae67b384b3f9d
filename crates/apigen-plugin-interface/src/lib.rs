//! FFI-safe types for the apigen generator plugin interface.
//!
//! This crate provides stable ABI types that can be safely passed across
//! dynamic library boundaries between the apigen host and generator plugins.

// Allow non-local definitions from abi_stable's sabi_trait macro.
// This is a known issue with the macro that generates impl blocks in a const.
// See: https://github.com/rust-lang/rust/issues/59629
#![allow(non_local_definitions)]

pub mod plugin;
pub mod types;
pub mod version;

pub use plugin::{
    call_plugin_generate, call_plugin_validate, GeneratorPlugin, GeneratorPlugin_TO,
};
pub use types::{FfiGenerateRequest, FfiGenerateResult};
pub use version::{
    is_version_compatible, GeneratorModule, GeneratorModule_Ref, PluginFactory, INTERFACE_VERSION,
};
