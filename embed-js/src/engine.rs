//! Engine handle: owns the runtime and its single context

use crate::bridge::{self, HostString};
use crate::callbacks::{self, HostCallback, OutputSink};
use crate::config::EngineConfig;
use crate::error::{JsError, Result};
use rquickjs::context::EvalOptions;
use rquickjs::{Context, Ctx, Runtime, Value};
use std::cell::Cell;
use std::fmt;
use std::marker::PhantomData;
use std::rc::Rc;

thread_local! {
    static RUNTIME_ACTIVE: Cell<bool> = const { Cell::new(false) };
}

/// Marks the current thread as owning a live runtime until dropped
struct ThreadClaim {
    _not_send: PhantomData<*const ()>,
}

impl ThreadClaim {
    fn acquire() -> Result<Self> {
        RUNTIME_ACTIVE.with(|active| {
            if active.replace(true) {
                return Err(JsError::init(
                    "another engine runtime is already active on this thread",
                ));
            }
            Ok(Self {
                _not_send: PhantomData,
            })
        })
    }
}

impl Drop for ThreadClaim {
    fn drop(&mut self) {
        RUNTIME_ACTIVE.with(|active| active.set(false));
    }
}

/// Marks the handle as busy for the duration of one outer call
///
/// The runtime lock is not re-entrant, so a nested call through the same
/// handle is refused with [`JsError::Reentrant`] instead of reaching it.
struct EnterGuard<'a> {
    busy: &'a Cell<bool>,
}

impl<'a> EnterGuard<'a> {
    fn acquire(busy: &'a Cell<bool>) -> Result<Self> {
        if busy.replace(true) {
            return Err(JsError::Reentrant);
        }
        Ok(Self { busy })
    }
}

impl Drop for EnterGuard<'_> {
    fn drop(&mut self) {
        self.busy.set(false);
    }
}

/// Parse options for evaluated scripts: global, non-strict code named after `source_tag`
fn script_options(source_tag: &str) -> EvalOptions {
    let mut options = EvalOptions::default();
    options.strict = false;
    if !source_tag.is_empty() {
        options.filename = Some(source_tag.to_string());
    }
    options
}

/// How an evaluation ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvalStatus {
    /// The script ran to completion; the text is its result
    Completed,
    /// The script threw; the text is the thrown error's message
    ScriptException,
}

/// Result of one [`EngineHandle::evaluate`] call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Evaluation {
    cookie: u64,
    status: EvalStatus,
    text: HostString,
}

impl Evaluation {
    /// Cookie the evaluation ran under
    pub fn cookie(&self) -> u64 {
        self.cookie
    }

    pub fn status(&self) -> EvalStatus {
        self.status
    }

    pub fn is_exception(&self) -> bool {
        self.status == EvalStatus::ScriptException
    }

    pub fn text(&self) -> &HostString {
        &self.text
    }

    pub fn into_text(self) -> HostString {
        self.text
    }
}

impl fmt::Display for Evaluation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.text, f)
    }
}

/// An embedded JavaScript engine: one runtime, one context, default host callbacks
///
/// The handle is `!Send`: the runtime stays on the thread that built it, and
/// only one handle may be live per thread. Dropping it tears down the context
/// and then the runtime.
///
/// Calls on the handle do not nest: using it from inside [`with_context`] or
/// from a host callback it is running returns [`JsError::Reentrant`].
///
/// [`with_context`]: EngineHandle::with_context
pub struct EngineHandle {
    // Field order is teardown order
    context: Context,
    runtime: Runtime,
    config: EngineConfig,
    next_cookie: Cell<u64>,
    busy: Cell<bool>,
    _claim: ThreadClaim,
}

impl EngineHandle {
    /// Build an engine with the default configuration, echoing to stdout
    pub fn new() -> Result<Self> {
        Self::with_config(EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> Result<Self> {
        Self::with_output(config, callbacks::stdout_sink())
    }

    /// Build an engine whose `echo` writes to `sink`
    ///
    /// On failure everything created so far is released before returning.
    pub fn with_output(config: EngineConfig, sink: OutputSink) -> Result<Self> {
        let claim = ThreadClaim::acquire()?;

        let runtime = Runtime::new()
            .map_err(|e| JsError::init(format!("failed to create JS runtime: {}", e)))?;
        config.apply(&runtime);

        let context = Context::full(&runtime)
            .map_err(|e| JsError::init(format!("failed to create JS context: {}", e)))?;

        context
            .with(|ctx| callbacks::install_defaults(&ctx, sink))
            .map_err(|e| JsError::init(format!("failed to install host callbacks: {}", e)))?;

        tracing::debug!("JS engine ready");

        Ok(Self {
            context,
            runtime,
            config,
            next_cookie: Cell::new(0),
            busy: Cell::new(false),
            _claim: claim,
        })
    }

    /// Evaluate `script` with an empty source tag
    pub fn evaluate_script(&self, script: impl AsRef<[u8]>) -> Result<Evaluation> {
        self.evaluate(script, "")
    }

    /// Evaluate `script` and convert its result to a host string
    ///
    /// The script runs as non-strict global code, and a non-empty
    /// `source_tag` becomes its file name in stack traces. The script bytes
    /// are only borrowed for the duration of the call. A thrown exception is
    /// cleared from the engine and returned as an [`Evaluation`] with
    /// [`EvalStatus::ScriptException`]; `Err` is reserved for engine and
    /// conversion failures. Every call consumes a cookie, whether or not it
    /// succeeds.
    pub fn evaluate(&self, script: impl AsRef<[u8]>, source_tag: &str) -> Result<Evaluation> {
        let cookie = self.take_cookie();
        let span = tracing::debug_span!("evaluate", cookie, source = source_tag);
        let _entered = span.enter();
        let _guard = EnterGuard::acquire(&self.busy)?;

        let options = script_options(source_tag);
        let outcome = self.context.with(|ctx| -> Result<(EvalStatus, HostString)> {
            match ctx.eval_with_options::<Value, _>(script.as_ref(), options) {
                Ok(value) => {
                    let text = bridge::value_to_string(&ctx, value)?;
                    Ok((EvalStatus::Completed, text))
                }
                Err(rquickjs::Error::Exception) => {
                    let message = bridge::extract_exception(&ctx)?;
                    tracing::debug!("script threw: {}", message);
                    Ok((EvalStatus::ScriptException, message))
                }
                Err(e) => Err(JsError::engine(e.to_string())),
            }
        });

        if self.config.drain_jobs {
            self.drain_pending_jobs();
        }

        let (status, text) = outcome?;
        Ok(Evaluation {
            cookie,
            status,
            text,
        })
    }

    /// Enter the context and run `f` with it
    ///
    /// Values obtained inside `f` cannot escape it. The handle itself must not
    /// be used inside `f`; such calls fail with [`JsError::Reentrant`].
    pub fn with_context<F, R>(&self, f: F) -> Result<R>
    where
        F: FnOnce(Ctx<'_>) -> R,
    {
        let _guard = EnterGuard::acquire(&self.busy)?;
        Ok(self.context.with(f))
    }

    /// Install an additional host callback in the global object
    ///
    /// Fails with [`JsError::Reentrant`] when called from inside another call
    /// on this handle, including from a running host callback.
    pub fn register_global(&self, name: &str, callback: Rc<dyn HostCallback>) -> Result<()> {
        let _guard = EnterGuard::acquire(&self.busy)?;
        self.context
            .with(|ctx| callbacks::register_global(&ctx, name, callback))
    }

    /// Cookie the next evaluation will run under
    pub fn next_cookie(&self) -> u64 {
        self.next_cookie.get()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Run a full garbage collection cycle
    pub fn run_gc(&self) -> Result<()> {
        let _guard = EnterGuard::acquire(&self.busy)?;
        self.runtime.run_gc();
        Ok(())
    }

    /// Tear the engine down now instead of at end of scope
    pub fn dispose(self) {
        drop(self);
    }

    fn take_cookie(&self) -> u64 {
        let cookie = self.next_cookie.get();
        self.next_cookie.set(cookie + 1);
        cookie
    }

    /// Run queued Promise jobs until the queue is empty
    ///
    /// A job that throws is logged and its exception cleared; the jobs queued
    /// behind it still run.
    fn drain_pending_jobs(&self) {
        let mut ran = 0usize;
        let mut failed = 0usize;
        loop {
            match self.runtime.execute_pending_job() {
                Ok(false) => break,
                Ok(true) => ran += 1,
                Err(job) => {
                    failed += 1;
                    let reason = job.0.with(|ctx| {
                        bridge::extract_exception(&ctx)
                            .map(|m| m.to_string())
                            .unwrap_or_else(|e| e.to_string())
                    });
                    tracing::warn!("pending job threw: {}", reason);
                }
            }
        }
        if ran + failed > 0 {
            tracing::debug!("drained {} pending jobs ({} failed)", ran + failed, failed);
        }
    }
}

impl Drop for EngineHandle {
    fn drop(&mut self) {
        tracing::debug!(
            "JS engine shutting down after {} evaluations",
            self.next_cookie.get()
        );
    }
}
