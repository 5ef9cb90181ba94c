//! Embedding QuickJS-NG in a Rust host
//!
//! This crate is the host-side glue around an embedded JavaScript engine
//! (rquickjs): it owns the engine's runtime and context, converts engine
//! values into host strings, and exposes host functions to scripts.
//!
//! # Architecture
//!
//! - **Engine Handle** ([`EngineHandle`]): owns one Runtime and one Context,
//!   installs the default host callbacks and evaluates scripts
//! - **Value Bridge** ([`bridge`]): engine value to [`HostString`] conversion
//!   and exception message extraction
//! - **Host Callback Registry** ([`callbacks`]): installs [`HostCallback`]s as
//!   global functions; `echo` is installed by default
//! - **Single-threaded**: the handle is `!Send` and only one may be live per
//!   thread
//!
//! # Example
//!
//! ```rust,no_run
//! use embed_js::EngineHandle;
//!
//! # fn example() -> embed_js::Result<()> {
//! let engine = EngineHandle::new()?;
//!
//! // Prints "hello, world!!" through the echo callback
//! let result = engine.evaluate_script("echo('hello, world!!')")?;
//! assert_eq!(result.text(), "undefined");
//!
//! let result = engine.evaluate_script("throw new Error('boom')")?;
//! assert!(result.is_exception());
//! assert_eq!(result.text(), "boom");
//! # Ok(())
//! # }
//! ```

pub mod bridge;
pub mod callbacks;
pub mod config;
pub mod engine;
pub mod error;

pub use bridge::HostString;
pub use callbacks::{Echo, HostCall, HostCallback, OutputSink};
pub use config::EngineConfig;
pub use engine::{EngineHandle, EvalStatus, Evaluation};
pub use error::{JsError, Result};
