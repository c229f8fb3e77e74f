//! Domain-level error type shared by all crates.

/// A domain error that is independent of any transport or storage layer.
///
/// The API crate maps each variant to an HTTP status code; lower layers
/// return it directly.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// An entity lookup found nothing.
    #[error("{entity} '{id}' not found")]
    NotFound {
        /// Entity kind, e.g. `"Project"`.
        entity: &'static str,
        /// The identifier that was looked up.
        id: String,
    },

    /// Caller-supplied input failed validation.
    #[error("Validation error: {0}")]
    Validation(String),

    /// The operation conflicts with current state.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// The caller is not authenticated.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// The caller is authenticated but not allowed to do this.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// An unexpected internal failure.
    #[error("Internal error: {0}")]
    Internal(String),
}
