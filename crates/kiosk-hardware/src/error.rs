//! Error types for coin acceptor transport operations.
//!
//! This module defines error types for serial device discovery, opening and
//! reading. Open failures are classified so the connection manager can tell
//! a transient permission problem (retried with backoff) from a hard failure.

/// Result type alias for hardware operations.
pub type Result<T> = std::result::Result<T, HardwareError>;

/// Errors that can occur during coin acceptor transport operations.
#[derive(Debug, thiserror::Error)]
pub enum HardwareError {
    /// Device is not connected or has been disconnected.
    #[error("Device disconnected: {device}")]
    Disconnected { device: String },

    /// Enumeration found no serial devices.
    #[error("{}", kiosk_core::constants::NO_DEVICES_MESSAGE)]
    NoDevices,

    /// The operating system refused access to the device.
    ///
    /// Typically transient on kiosks: udev rules or group membership are
    /// applied shortly after the device appears.
    #[error("Permission denied opening {path}: {message}")]
    PermissionDenied { path: String, message: String },

    /// Opening the device failed for any other reason.
    #[error("Failed to open {path}: {message}")]
    OpenFailed { path: String, message: String },

    /// Device communication error.
    #[error("Communication error: {message}")]
    CommunicationError { message: String },

    /// Blocking task or reader thread failed to complete.
    #[error("{0}")]
    Other(String),
}

impl HardwareError {
    /// Create a new disconnected error.
    pub fn disconnected(device: impl Into<String>) -> Self {
        Self::Disconnected {
            device: device.into(),
        }
    }

    /// Create a new permission denied error.
    pub fn permission_denied(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::PermissionDenied {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a new open failure error.
    pub fn open_failed(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::OpenFailed {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a new communication error.
    pub fn communication(message: impl Into<String>) -> Self {
        Self::CommunicationError {
            message: message.into(),
        }
    }

    /// Create a generic error with custom message.
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other(message.into())
    }

    /// Classify a `serialport` open error for the device at `path`.
    ///
    /// Access errors are recognised both by I/O kind and by message, since
    /// some platforms report them as `Unknown` with only a description.
    pub fn from_serial(path: impl Into<String>, error: serialport::Error) -> Self {
        let path = path.into();
        let denied = matches!(
            error.kind(),
            serialport::ErrorKind::Io(std::io::ErrorKind::PermissionDenied)
        ) || is_access_denied_message(&error.description);

        if denied {
            Self::permission_denied(path, error.description)
        } else {
            Self::open_failed(path, error.description)
        }
    }

    /// Returns `true` if the operation may succeed when retried later.
    ///
    /// Only access denials are retried; every other open error is final.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::PermissionDenied { .. })
    }
}

fn is_access_denied_message(message: &str) -> bool {
    let message = message.to_ascii_lowercase();
    message.contains("permission denied") || message.contains("access is denied")
}
