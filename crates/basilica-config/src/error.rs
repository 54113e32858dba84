//! Error types for configuration operations.

use std::path::PathBuf;

use basilica_reverb::EngineError;
use thiserror::Error;

/// Errors that can occur while loading, saving, validating or applying an
/// [`EngineConfig`](crate::EngineConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("cannot read config '{path}': {source}")]
    ReadFile {
        /// Path of the file that could not be read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The config file or its directory could not be written.
    #[error("cannot write config '{path}': {source}")]
    WriteFile {
        /// Path of the file that could not be written.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The document is not valid TOML or does not match the schema.
    #[error("malformed config: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// Serialization failed.
    #[error("cannot encode config as TOML: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    /// The engine rejected a name or value.
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// A field holds a value outside its accepted range or format.
    #[error("invalid value for '{field}': {reason}")]
    InvalidValue {
        /// Dotted path of the field, e.g. `params.time`.
        field: String,
        /// Why it was rejected.
        reason: String,
    },
}

impl ConfigError {
    /// [`ConfigError::ReadFile`] for `path`.
    pub fn read_file(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ConfigError::ReadFile {
            path: path.into(),
            source,
        }
    }

    /// [`ConfigError::WriteFile`] for `path`.
    pub fn write_file(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ConfigError::WriteFile {
            path: path.into(),
            source,
        }
    }

    /// [`ConfigError::InvalidValue`] for a dotted field path.
    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        ConfigError::InvalidValue {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    fn denied() -> std::io::Error {
        std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied")
    }

    #[test]
    fn read_error_keeps_path_and_source() {
        let err = ConfigError::read_file("/etc/basilica/hall.toml", denied());
        let ConfigError::ReadFile { path, .. } = &err else {
            panic!("expected ReadFile, got {err:?}");
        };
        assert_eq!(path, std::path::Path::new("/etc/basilica/hall.toml"));
        assert!(err.source().is_some());
    }

    #[test]
    fn write_error_names_the_file() {
        let msg = ConfigError::write_file("out/room.toml", denied()).to_string();
        assert!(msg.starts_with("cannot write config 'out/room.toml'"), "got: {msg}");
    }

    #[test]
    fn engine_error_is_transparent() {
        let err = ConfigError::from(EngineError::UnknownPreset("hall".into()));
        assert_eq!(err.to_string(), "unknown routing preset 'hall'");
    }

    #[test]
    fn invalid_value_display() {
        let err = ConfigError::invalid("params.time", "must be in [0, 1], got 1.5");
        assert_eq!(
            err.to_string(),
            "invalid value for 'params.time': must be in [0, 1], got 1.5"
        );
        assert!(err.source().is_none());
    }
}
