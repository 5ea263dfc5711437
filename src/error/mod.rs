// Error types for the instrument recognition pipeline
//
// This module defines the error type reported by every pipeline stage,
// with stable numeric codes so report consumers can react to failures
// without parsing messages.

mod pipeline;

pub use pipeline::{log_pipeline_error, PipelineError, PipelineErrorCodes};

/// Error codes for structured error reporting
///
/// This trait provides a standard way to get error codes and messages
/// from custom error types, enabling consistent error handling across
/// the library and CLI boundary.
pub trait ErrorCode {
    /// Get the numeric error code
    fn code(&self) -> i32;

    /// Get the human-readable error message
    fn message(&self) -> String;
}
