//! Error types for the sprdmm library

use std::io;
use thiserror::Error;

/// Main error type for driver operations
#[derive(Error, Debug)]
pub enum GspError {
    /// Null or malformed argument
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Device failed verification (wrong name or not allocated)
    #[error("Bad device: {0}")]
    BadDevice(String),

    /// Ioctl command does not belong to this driver
    #[error("Inappropriate ioctl 0x{0:08x}")]
    NotTty(u32),

    /// Copy from or to user memory failed
    #[error("User memory fault: {0}")]
    Fault(String),

    /// Allocation failed
    #[error("Out of memory: {0}")]
    NoMemory(String),

    /// Resource temporarily exhausted
    #[error("Resource busy: {0}")]
    Busy(String),

    /// Bounded wait expired
    #[error("Timed out: {0}")]
    Timeout(String),

    /// Bounded wait interrupted
    #[error("Interrupted: {0}")]
    Interrupted(String),

    /// No operations table for the compatible string
    #[error("No matching hardware revision: {0}")]
    NoMatch(String),

    /// Devicetree-equivalent configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Register-level failure reported by a core
    #[error("Hardware error: {0}")]
    Hardware(String),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Host I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl GspError {
    /// Negated errno reported through the syscall error channel
    pub fn errno(&self) -> i32 {
        let code = match self {
            GspError::InvalidArgument(_) | GspError::Config(_) => libc::EINVAL,
            GspError::BadDevice(_) => libc::EBADF,
            GspError::NotTty(_) => libc::ENOTTY,
            GspError::Fault(_) => libc::EFAULT,
            GspError::NoMemory(_) => libc::ENOMEM,
            GspError::Busy(_) => libc::EBUSY,
            GspError::Timeout(_) => libc::ETIMEDOUT,
            GspError::Interrupted(_) => libc::EINTR,
            GspError::NoMatch(_) => libc::ENODEV,
            GspError::Hardware(_) | GspError::Json(_) | GspError::Io(_) => libc::EIO,
        };
        -code
    }

    /// True for the two bounded-wait failure kinds
    pub fn is_wait_failure(&self) -> bool {
        matches!(self, GspError::Timeout(_) | GspError::Interrupted(_))
    }
}

/// Result type for driver operations
pub type GspResult<T> = std::result::Result<T, GspError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_errno_is_negative() {
        assert_eq!(GspError::InvalidArgument("cnt".into()).errno(), -libc::EINVAL);
        assert_eq!(GspError::NotTty(0x1234).errno(), -libc::ENOTTY);
        assert_eq!(GspError::Fault("copy".into()).errno(), -libc::EFAULT);
        assert_eq!(GspError::Timeout("resume".into()).errno(), -libc::ETIMEDOUT);
    }

    #[test]
    fn test_wait_failure() {
        assert!(GspError::Timeout(String::new()).is_wait_failure());
        assert!(GspError::Interrupted(String::new()).is_wait_failure());
        assert!(!GspError::Busy(String::new()).is_wait_failure());
    }
}
