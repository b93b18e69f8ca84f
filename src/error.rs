//! Error types shared by the emulator host.
//!
//! Everything that can go wrong while the host is being brought up is a
//! [`FatalError`]: the device cannot run half-configured, so construction
//! either finishes completely or hands one of these back to the entry point.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Failures while converting a model field.
#[derive(Debug, Error)]
pub enum ModelInfoError {
    #[error("model info key '{key}' is not defined")]
    Undefined { key: String },
    #[error("model info key '{key}' holds a {type_name}, not a string")]
    NotAString { key: String, type_name: &'static str },
    #[error("model info key '{key}' is not convertible to int: {value:?}")]
    NotAnInteger { key: String, value: String },
    #[error("model info lookup for '{key}' failed: {source}")]
    Lua {
        key: String,
        #[source]
        source: mlua::Error,
    },
}

impl ModelInfoError {
    /// Key the failed lookup was bound to.
    pub fn key(&self) -> &str {
        match self {
            ModelInfoError::Undefined { key }
            | ModelInfoError::NotAString { key, .. }
            | ModelInfoError::NotAnInteger { key, .. }
            | ModelInfoError::Lua { key, .. } => key,
        }
    }
}

/// Unrecoverable setup failure. The binary reports it and exits.
#[derive(Debug, Error)]
pub enum FatalError {
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("failed to initialise scripting environment: {0}")]
    ScriptInit(#[source] mlua::Error),
    #[error("failed to read model definition {}: {source}", path.display())]
    ModelRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to load model definition {}: {source}", path.display())]
    ModelLoad {
        path: PathBuf,
        #[source]
        source: mlua::Error,
    },
    #[error("model definition {} must return exactly one table, got {found}", path.display())]
    ModelShape { path: PathBuf, found: String },
    #[error(transparent)]
    ModelInfo(#[from] ModelInfoError),
    #[error("model info key '{key}' must be a non-negative dimension, got {value}")]
    InvalidDimension { key: String, value: i32 },
    #[error("frontend failure: {0}")]
    Frontend(String),
    #[error("failed to start periodic timer: {0}")]
    Timer(#[source] io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn model_info_error_reports_key() {
        let err = ModelInfoError::NotAnInteger {
            key: "interface_width".into(),
            value: "4a".into(),
        };
        assert_eq!(err.key(), "interface_width");
        assert_eq!(
            err.to_string(),
            "model info key 'interface_width' is not convertible to int: \"4a\""
        );
    }

    #[test]
    fn fatal_error_wraps_model_info_transparently() {
        let err: FatalError = ModelInfoError::Undefined {
            key: "model_name".into(),
        }
        .into();
        assert_eq!(err.to_string(), "model info key 'model_name' is not defined");
    }
}
