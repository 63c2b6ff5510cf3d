//! Error types
//!
//! Configuration faults are rejected once at boot. Runtime faults never
//! propagate out of the engine's entry points; they are logged and the
//! affected input becomes a no-op.

use thiserror_no_std::Error;

/// Rejected smart-interrupt configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// A start/continue/end binding does not name a behavior device
    #[error("binding {index} does not name a behavior device")]
    MissingDeviceBinding { index: usize },
    /// Layer index does not fit the 32-bit layer mask
    #[error("layer {0} is out of range")]
    LayerOutOfRange(u8),
    /// More listed positions than an instance can hold
    #[error("too many listed key positions")]
    TooManyPositions,
    /// An interrupt with a zero timeout would resolve on every release
    #[error("timeout must be non-zero")]
    ZeroTimeout,
}

/// Runtime faults
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// Every interrupt slot is occupied
    #[error("no free smart interrupt slot")]
    PoolExhausted,
    /// The behavior queue cannot take another invocation
    #[error("behavior queue is full")]
    QueueFull,
}
