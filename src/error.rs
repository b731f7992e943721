//! Error types for the recorder pipeline.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("capture error: {0}")]
    Capture(#[from] CaptureError),

    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("processing error: {0}")]
    Process(#[from] ProcessError),

    #[error("configuration error: {0}")]
    Config(String),
}

/// Failures of the capture capability. All of them are fatal to session start.
#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("permission denied for capture device '{0}'")]
    PermissionDenied(String),

    #[error("capture not supported: {0}")]
    NotSupported(String),

    #[error("capture device not found: {0}")]
    DeviceNotFound(String),

    #[error("capture device error: {0}")]
    Device(String),
}

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("invalid endpoint url: {0}")]
    InvalidUrl(String),

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("handshake timed out after {0} ms")]
    Timeout(u64),

    #[error("send failed: {0}")]
    Send(String),
}

/// Errors raised on the render thread.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ProcessError {
    #[error("quantum length {actual} does not match the configured size {expected}")]
    QuantumLength { expected: usize, actual: usize },

    #[error("frame relay closed")]
    RelayClosed,
}

pub type Result<T> = std::result::Result<T, Error>;
