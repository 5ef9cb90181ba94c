//! Error types for the embedded JavaScript engine

use thiserror::Error;

/// Result type alias for engine operations
pub type Result<T> = std::result::Result<T, JsError>;

/// Errors that can occur while driving the embedded engine
///
/// A script that throws is not an error: it produces an
/// [`Evaluation`](crate::Evaluation) whose status is
/// [`EvalStatus::ScriptException`](crate::EvalStatus::ScriptException).
#[derive(Debug, Error)]
pub enum JsError {
    /// Runtime or context creation failed
    #[error("Engine initialization failed: {message}")]
    Init { message: String },

    /// Any other engine call reported failure
    #[error("Engine error: {message}")]
    Engine { message: String },

    /// Value to host string conversion failed
    #[error("Type conversion error: {message}")]
    TypeConversion { message: String },

    /// The handle was used again while one of its own calls was still running
    #[error("Engine is already in use by an outer call on this thread")]
    Reentrant,

    /// A host callback could not be installed
    #[error("Failed to register host callback '{name}': {message}")]
    Callback { name: String, message: String },

    /// Writing to an output sink failed
    #[error("Output error: {0}")]
    Io(#[from] std::io::Error),
}

impl JsError {
    /// Create an initialization error
    pub fn init(msg: impl Into<String>) -> Self {
        Self::Init {
            message: msg.into(),
        }
    }

    /// Create a generic engine error
    pub fn engine(msg: impl Into<String>) -> Self {
        Self::Engine {
            message: msg.into(),
        }
    }

    /// Create a type conversion error
    pub fn type_conversion(msg: impl Into<String>) -> Self {
        Self::TypeConversion {
            message: msg.into(),
        }
    }

    /// Create a callback registration error
    pub fn callback(name: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Callback {
            name: name.into(),
            message: msg.into(),
        }
    }

    /// Whether this error aborted handle construction
    pub fn is_init(&self) -> bool {
        matches!(self, Self::Init { .. })
    }
}
