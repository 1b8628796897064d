//! Errors raised while loading configuration.

use std::sync::Arc;

use ortho_config::OrthoError;
use thiserror::Error;

/// Errors raised while resolving configuration.
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    /// A configuration layer could not be loaded or merged.
    #[error("failed to load configuration: {source}")]
    Load {
        /// Underlying loader error.
        #[source]
        source: Arc<OrthoError>,
    },
}

impl ConfigError {
    /// Returns the rendered command-line message when loading stopped at
    /// argument parsing, paired with whether it reports a usage failure.
    ///
    /// `--help` output is returned as a non-failure.
    #[must_use]
    pub fn usage(&self) -> Option<(String, bool)> {
        let Self::Load { source } = self;
        match source.as_ref() {
            OrthoError::CliParsing(err) => Some((err.render().to_string(), err.use_stderr())),
            _ => None,
        }
    }
}
