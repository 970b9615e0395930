use std::path::PathBuf;

use crate::builders::TemplateError;
use crate::loaders::ConfigError;

/// Build-level errors.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("template error: {0}")]
    Template(#[from] TemplateError),

    #[error("no output paths configured")]
    NoOutputPaths,

    #[error("no user data path configured")]
    NoUserDataPath,

    #[error("failed to write output {path}: {source}")]
    OutputWrite {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to write user data {path}: {source}")]
    UserDataWrite {
        path: PathBuf,
        source: std::io::Error,
    },
}
