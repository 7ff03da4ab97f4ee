//! Render context lifecycle, configuration and frame capture.

/// Host capture buffers.
pub mod capture;
/// Context configuration.
pub mod config;
/// The render context state machine.
pub mod context;
/// Integer-handle surface with status codes.
pub mod handles;
