//! Error types for platform templates and applications.

use genmap_core::error::MappingError;

/// Errors raised while instantiating an architecture or an application.
#[derive(Debug, thiserror::Error)]
pub enum PlatformError {
    /// The construction API rejected an entity.
    #[error(transparent)]
    Mapping(#[from] MappingError),

    /// No application with that name is built in.
    #[error("unknown application: '{name}'. Available: shell, sort, transpose, router")]
    UnknownApplication { name: String },

    /// No architecture template with that name is built in.
    #[error("unknown architecture: '{name}'. Available: tsar_generic")]
    UnknownArchitecture { name: String },

    /// Template parameters outside the supported range.
    #[error("invalid architecture configuration: {detail}")]
    InvalidConfig { detail: String },
}

/// Result type for platform operations.
pub type Result<T> = std::result::Result<T, PlatformError>;
