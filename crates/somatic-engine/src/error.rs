//! Error types for the engine binary.
//!
//! [`EngineError`] wraps every failure mode during startup and the run,
//! so `main` can propagate with `?`.

/// Top-level error for the engine binary.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: somatic_core::config::ConfigError,
    },

    /// Engine construction or a login failed.
    #[error("core error: {source}")]
    Core {
        /// The underlying core error.
        #[from]
        source: somatic_core::error::CoreError,
    },

    /// World map construction failed.
    #[error("world error: {source}")]
    World {
        /// The underlying world error.
        #[from]
        source: somatic_world::WorldError,
    },

    /// The run loop failed.
    #[error("runner error: {source}")]
    Runner {
        /// The underlying runner error.
        #[from]
        source: somatic_core::runner::RunnerError,
    },

    /// The cast could not be read or placed.
    #[error("cast error: {message}")]
    Cast {
        /// Description of the cast failure.
        message: String,
    },
}
