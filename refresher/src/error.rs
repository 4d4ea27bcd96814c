use thiserror::Error;

/// Errors produced while constructing a [`Refresher`](crate::Refresher).
///
/// Errors returned by the compute function are never wrapped in this type,
/// [`Refresher::load`](crate::Refresher::load) hands them back verbatim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// The configured max age was zero.
    #[error("max_age must be positive duration")]
    NonPositiveMaxAge,
}
