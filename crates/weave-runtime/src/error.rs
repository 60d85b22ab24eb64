//! Runtime error types.
//!
//! These cover setup-time and host-embedding operations only
//! (configuration, plugin loading). The object model in `weave-core`
//! never throws across component boundaries; it reports
//! `weave_core::types::ReturnValue` codes, and nothing here changes
//! that for `Instance`'s own registry operations either.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur during configuration loading.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("configuration file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("failed to read configuration file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("configuration parse error: {0}")]
    ParseError(#[from] figment::Error),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors that can occur while loading a plugin shared library.
#[derive(Error, Debug)]
pub enum PluginError {
    #[error("failed to load plugin library {path}: {source}")]
    LibraryLoad {
        path: PathBuf,
        #[source]
        source: libloading::Error,
    },

    #[error("plugin library {path} has no `{symbol}` export: {source}")]
    MissingEntrypoint {
        path: PathBuf,
        symbol: &'static str,
        #[source]
        source: libloading::Error,
    },

    #[error("plugin entrypoint returned a null handle")]
    NullEntrypoint,

    #[error("plugin initialization failed")]
    InitFailed,
}

pub type PluginResult<T> = Result<T, PluginError>;
