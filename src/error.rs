use thiserror::Error;

use crate::config::ProfileError;
use crate::pipeline::EngineError;
use crate::schedule::ConfigError;
use crate::source::SourceError;

/// Crate-level convenience error.
///
/// Not a "god error": it is a thin wrapper over the domain errors.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Profile(#[from] ProfileError),

    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    Engine(#[from] EngineError),

    /// `--json` encoding; practically unreachable for these payloads.
    #[error("failed to encode JSON output: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to write output: {0}")]
    Output(#[from] std::io::Error),
}
