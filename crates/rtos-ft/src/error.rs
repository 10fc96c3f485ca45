//! Error types for fault-tolerance configuration operations.
//!
//! Fault outcomes are never errors: `report_fault` always resolves to a
//! [`Disposition`](crate::Disposition). `FtError` covers setup-time
//! mistakes that must be returned to the caller instead of ignored.

use thiserror::Error;

use crate::FaultKind;

/// Errors returned by registry, gate, hook and installation operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum FtError {
    /// Raw kind value outside the taxonomy.
    #[error("Unknown fault kind: {0}")]
    UnknownKind(u8),

    /// A handler is already registered and duplicates are rejected.
    #[error("Handler already registered for {0}")]
    AlreadyRegistered(FaultKind),

    /// The pre-reboot hook table is full.
    #[error("Pre-reboot hook table full (capacity {capacity})")]
    HookCapacityExceeded {
        /// Fixed capacity of the table.
        capacity: usize,
    },

    /// Configuration rejected by validation.
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(&'static str),

    /// A process-wide instance is already installed.
    #[error("Fault-tolerance instance already installed")]
    AlreadyInstalled,

    /// No process-wide instance has been installed.
    #[error("Fault-tolerance instance not installed")]
    NotInstalled,
}

impl FtError {
    /// Create an invalid configuration error.
    #[must_use]
    pub const fn invalid_configuration(reason: &'static str) -> Self {
        Self::InvalidConfiguration(reason)
    }

    /// True for errors caused by the caller's configuration rather than by
    /// the lifecycle of the process-wide instance.
    #[must_use]
    pub const fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            Self::UnknownKind(_)
                | Self::AlreadyRegistered(_)
                | Self::HookCapacityExceeded { .. }
                | Self::InvalidConfiguration(_)
        )
    }
}

/// Result type for fault-tolerance operations.
pub type FtResult<T> = core::result::Result<T, FtError>;
