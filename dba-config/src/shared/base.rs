use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// The probe timeout cannot be zero.
    #[error("`probe.timeout_ms` cannot be zero")]
    ProbeTimeoutZero,
    /// A client image for the container runtime is blank.
    #[error("`session.images.{0}` cannot be empty when the container runtime is used")]
    EmptyClientImage(&'static str),
    /// The container runtime binary is blank.
    #[error("`session.container_binary` cannot be empty")]
    EmptyContainerBinary,
}
