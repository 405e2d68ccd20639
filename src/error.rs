//! Error types for the OSC receiver.

use thiserror::Error;

/// Error returned by a subscriber callback.
pub type CallbackError = Box<dyn std::error::Error + Send + Sync>;

/// Result type returned by subscriber callbacks.
pub type CallbackResult = std::result::Result<(), CallbackError>;

/// Main error type for receiver operations.
#[derive(Debug, Error)]
pub enum ReceiverError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Bind address can not be empty")]
    EmptyAddress,

    #[error("Bundle bind already bound")]
    BundleAlreadyBound,

    #[error("Bundle bind not bound")]
    BundleNotBound,

    #[error("Binds can not be cleared while a delivery is in progress")]
    ClearDuringDelivery,

    #[error("Dispatch cycle already in progress")]
    CycleInProgress,

    #[error("Invalid host: {0}")]
    InvalidHost(String),

    #[error("Subscriber callback failed: {0}")]
    Callback(#[source] CallbackError),
}

/// Result type for receiver operations.
pub type Result<T> = std::result::Result<T, ReceiverError>;
