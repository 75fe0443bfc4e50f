//! Error types for peerkit

use thiserror::Error;

/// Main error type for peerkit operations
#[derive(Error, Debug)]
pub enum PeerKitError {
    /// An execution context thread could not be started
    #[error("Failed to start execution context {context}: {reason}")]
    ContextStart {
        /// Name of the context that failed to start
        context: String,
        /// Reason for the failure
        reason: String,
    },

    /// Work was submitted to a context whose run loop has exited
    #[error("Execution context {context} is stopped")]
    ContextStopped {
        /// Name of the stopped context
        context: String,
    },

    /// A blocking call did not complete because the submitted task panicked
    #[error("Task submitted to {context} was aborted before completing")]
    TaskAborted {
        /// Name of the context that ran the task
        context: String,
    },

    /// Audio device module construction failed
    #[error("Audio device error: {reason}")]
    AudioDevice {
        /// Reason for audio device failure
        reason: String,
    },

    /// The media engine returned no session factory
    #[error("Engine factory creation failed: {reason}")]
    FactoryCreation {
        /// Reason for factory creation failure
        reason: String,
    },

    /// Global crypto subsystem failure
    #[error("Crypto subsystem error: {reason}")]
    Crypto {
        /// Reason for crypto failure
        reason: String,
    },

    /// A codec name, scalability mode or fmtp value could not be parsed
    #[error("Invalid format: {value}")]
    InvalidFormat {
        /// Offending input
        value: String,
    },
}

/// Result alias used across the peerkit crates
pub type PeerKitResult<T> = Result<T, PeerKitError>;

impl PeerKitError {
    /// Get error code for programmatic handling
    pub fn error_code(&self) -> String {
        match self {
            PeerKitError::ContextStart { .. } => "CONTEXT_START_FAILED".to_string(),
            PeerKitError::ContextStopped { .. } => "CONTEXT_STOPPED".to_string(),
            PeerKitError::TaskAborted { .. } => "TASK_ABORTED".to_string(),
            PeerKitError::AudioDevice { .. } => "AUDIO_DEVICE_ERROR".to_string(),
            PeerKitError::FactoryCreation { .. } => "FACTORY_CREATION_FAILED".to_string(),
            PeerKitError::Crypto { .. } => "CRYPTO_ERROR".to_string(),
            PeerKitError::InvalidFormat { .. } => "INVALID_FORMAT".to_string(),
        }
    }
}
