//! Error types for device setup, shader compilation, and chart operations

use thiserror::Error;

/// Errors that can occur while setting up or driving the renderer
#[derive(Error, Debug)]
pub enum RenderError {
    /// No compatible GPU adapter was found on this system
    #[error("no compatible GPU adapter found")]
    NoAdapter,

    /// The adapter refused to provide a device
    #[error("device request failed: {0}")]
    Device(String),

    /// A shader module failed validation
    ///
    /// Carries the module label and the full diagnostic text so the
    /// source of the failure can be located without a debugger.
    #[error("shader '{label}' failed to compile: {message}")]
    Shader { label: String, message: String },

    /// A series type was requested that no registered renderer handles
    #[error("unknown series type: {0}")]
    UnknownSeries(String),

    /// The chart was used after `destroy` was called
    #[error("chart has been destroyed")]
    Destroyed,
}

/// Result type for renderer operations
pub type RenderResult<T> = Result<T, RenderError>;
