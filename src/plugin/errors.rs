//! Typed error surface for generator plugin resolution.
//!
//! Every failure path in the resolution subsystem rejects with one of these
//! variants; nothing here is fatal to the host process. Installer-internal
//! failures live in [`crate::plugin::installer::InstallError`] and are
//! converted into `NotFound`/`Load` at the loader boundary.

use std::fmt;

/// Error returned to callers of the plugin loader and registry.
#[derive(Debug)]
pub enum PluginError {
    /// Every resolution strategy was exhausted without finding the plugin.
    /// `attempted` is the ordered list of identifiers and paths tried.
    NotFound {
        name: String,
        attempted: Vec<String>,
    },
    /// A module was found but failed to load, or its exports did not satisfy
    /// the descriptor shape. `available_exports` lists the entry points the
    /// module actually had, when that is known.
    Load {
        name: String,
        reason: String,
        available_exports: Vec<String>,
    },
    /// The generator itself failed while producing output (error return or
    /// panic caught at the FFI boundary).
    Generate { name: String, message: String },
    /// Generation options rejected by the plugin's validator.
    Validation { name: String, message: String },
}

impl PluginError {
    /// The generator name the error refers to.
    pub fn plugin_name(&self) -> &str {
        match self {
            PluginError::NotFound { name, .. }
            | PluginError::Load { name, .. }
            | PluginError::Generate { name, .. }
            | PluginError::Validation { name, .. } => name,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, PluginError::NotFound { .. })
    }
}

impl fmt::Display for PluginError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PluginError::NotFound { name, attempted } => {
                write!(f, "generator plugin '{}' not found", name)?;
                if !attempted.is_empty() {
                    write!(f, " (attempted: {})", attempted.join(", "))?;
                }
                Ok(())
            }
            PluginError::Load {
                name,
                reason,
                available_exports,
            } => {
                write!(f, "failed to load generator plugin '{}': {}", name, reason)?;
                if !available_exports.is_empty() {
                    write!(f, " (available exports: {})", available_exports.join(", "))?;
                }
                Ok(())
            }
            PluginError::Generate { name, message } => {
                write!(f, "generator '{}' failed: {}", name, message)
            }
            PluginError::Validation { name, message } => {
                write!(f, "invalid options for generator '{}': {}", name, message)
            }
        }
    }
}

impl std::error::Error for PluginError {}
