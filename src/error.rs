//! Error types for the fabric manager client.

use std::fmt;

use fmctl_ffi::{fmReturn_t, FmReturn};

/// Result type for fabric manager operations.
pub type Result<T> = std::result::Result<T, FabricError>;

/// The client operation a failure belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    LibInit,
    LibShutdown,
    Connect { address: String },
    Disconnect,
    ListPartitions,
    Activate(u32),
    Deactivate(u32),
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::LibInit => f.write_str("initialize fabric manager library"),
            Operation::LibShutdown => f.write_str("shut down fabric manager library"),
            Operation::Connect { address } => write!(f, "connect to fabric manager at {}", address),
            Operation::Disconnect => f.write_str("disconnect from fabric manager"),
            Operation::ListPartitions => f.write_str("get fabric partitions"),
            Operation::Activate(id) => write!(f, "activate partition {}", id),
            Operation::Deactivate(id) => write!(f, "deactivate partition {}", id),
        }
    }
}

/// Errors that can occur while talking to the fabric manager.
#[derive(Debug, thiserror::Error)]
pub enum FabricError {
    /// The daemon (or SDK) returned a non-success status.
    #[error("failed to {operation}: {code}")]
    Daemon { operation: Operation, code: FmReturn },

    /// Encoded address plus terminator does not fit the native buffer.
    #[error("address is {len} bytes but the native buffer holds at most {} plus a terminator", .capacity.saturating_sub(1))]
    AddressTooLong { len: usize, capacity: usize },

    /// Address contains a NUL byte, which would cut it short on the native side.
    #[error("address contains a NUL byte at offset {0}")]
    AddressContainsNul(usize),

    /// Response violates a structural invariant needed to decode it safely.
    #[error("protocol violation: {0}")]
    ProtocolViolation(String),

    /// The native SDK library could not be loaded.
    #[error("fabric manager library unavailable: {0}")]
    LibraryUnavailable(String),

    /// A native SDK library is already loaded in this process.
    #[error("fabric manager library is already initialized in this process")]
    AlreadyInitialized,

    /// The daemon does not report a partition with this id.
    #[error("partition {0} not found")]
    PartitionNotFound(u32),
}

impl FabricError {
    /// Map a raw SDK status to `Ok(())` or the matching error.
    pub fn check(operation: impl FnOnce() -> Operation, raw: fmReturn_t) -> Result<()> {
        match FmReturn::from_raw(raw) {
            Some(FmReturn::Success) => Ok(()),
            Some(code) => Err(FabricError::Daemon {
                operation: operation(),
                code,
            }),
            None => Err(FabricError::ProtocolViolation(format!(
                "{} returned unknown status code {}",
                operation(),
                raw
            ))),
        }
    }

    /// Returns the daemon status code if this is a daemon-reported error.
    pub fn code(&self) -> Option<FmReturn> {
        match self {
            FabricError::Daemon { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// Returns the failed operation if this is a daemon-reported error.
    pub fn operation(&self) -> Option<&Operation> {
        match self {
            FabricError::Daemon { operation, .. } => Some(operation),
            _ => None,
        }
    }

    pub fn is_daemon_error(&self) -> bool {
        matches!(self, FabricError::Daemon { .. })
    }

    pub fn is_protocol_violation(&self) -> bool {
        matches!(self, FabricError::ProtocolViolation(_))
    }

    /// Returns true for errors caused by the caller's input or usage rather
    /// than by the daemon.
    pub fn is_usage_error(&self) -> bool {
        matches!(
            self,
            FabricError::AddressTooLong { .. }
                | FabricError::AddressContainsNul(_)
                | FabricError::AlreadyInitialized
                | FabricError::PartitionNotFound(_)
        )
    }
}
