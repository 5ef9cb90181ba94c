//! Host callbacks installed in the engine's global object
//!
//! A [`HostCallback`] is plain Rust code that scripts can call by name. It runs
//! synchronously on the thread that owns the engine, inside the entered
//! context, and may use the [`bridge`](crate::bridge) freely.

use crate::bridge;
use crate::error::{JsError, Result};
use rquickjs::function::{Rest, This};
use rquickjs::{Ctx, Exception, Function, Value};
use std::cell::RefCell;
use std::io::Write;
use std::rc::Rc;

/// Name under which the default [`Echo`] callback is installed
pub const ECHO: &str = "echo";

/// Destination for text written by host callbacks
pub type OutputSink = Rc<RefCell<dyn Write>>;

/// Sink writing to the process's standard output
pub fn stdout_sink() -> OutputSink {
    Rc::new(RefCell::new(std::io::stdout()))
}

/// Arguments of a single script-to-host call
///
/// The engine's raw argument list is `[this, arg0, arg1, ...]`; `this()` is
/// slot zero and `args()` starts at slot one.
pub struct HostCall<'js> {
    ctx: Ctx<'js>,
    this: Value<'js>,
    args: Vec<Value<'js>>,
}

impl<'js> HostCall<'js> {
    pub fn ctx(&self) -> &Ctx<'js> {
        &self.ctx
    }

    /// The `this` binding of the call
    pub fn this(&self) -> &Value<'js> {
        &self.this
    }

    /// User-supplied arguments
    pub fn args(&self) -> &[Value<'js>] {
        &self.args
    }

    /// User-supplied argument `index`, if present
    pub fn arg(&self, index: usize) -> Option<&Value<'js>> {
        self.args.get(index)
    }

    /// Size of the raw argument list, counting `this`
    pub fn argument_count(&self) -> usize {
        self.args.len() + 1
    }

    /// Registered callbacks are plain functions; `new` on them throws a
    /// TypeError before reaching the host.
    pub fn is_construct_call(&self) -> bool {
        false
    }
}

/// Host behavior callable from script
///
/// Returning `Ok(None)` yields `undefined` to the script. Returning an error
/// throws a script-visible `Error` with the error's text as its message.
pub trait HostCallback {
    fn call<'js>(&self, call: &HostCall<'js>) -> Result<Option<Value<'js>>>;
}

/// Install `callback` as the global property `name`, replacing any previous value
pub fn register_global<'js>(
    ctx: &Ctx<'js>,
    name: &str,
    callback: Rc<dyn HostCallback>,
) -> Result<()> {
    let callback_name = name.to_string();
    let function = Function::new(
        ctx.clone(),
        move |ctx: Ctx<'js>,
              this: This<Value<'js>>,
              args: Rest<Value<'js>>|
              -> rquickjs::Result<Value<'js>> {
            let call = HostCall {
                ctx: ctx.clone(),
                this: this.0,
                args: args.0,
            };
            match callback.call(&call) {
                Ok(Some(value)) => Ok(value),
                Ok(None) => Ok(Value::new_undefined(ctx)),
                Err(e) => {
                    tracing::debug!("host callback '{}' failed: {}", callback_name, e);
                    Err(Exception::throw_message(&ctx, &e.to_string()))
                }
            }
        },
    )
    .map_err(|e| JsError::callback(name, e.to_string()))?;

    let id = bridge::property_id(ctx, name)?;
    ctx.globals()
        .set(id, function)
        .map_err(|e| JsError::callback(name, e.to_string()))?;

    tracing::debug!("registered host callback '{}'", name);
    Ok(())
}

/// Install the default host function set
pub fn install_defaults(ctx: &Ctx<'_>, sink: OutputSink) -> Result<()> {
    register_global(ctx, ECHO, Rc::new(Echo::new(sink)))
}

/// `echo(value)`: writes its first argument and a newline to the sink
///
/// Extra arguments are ignored; with no argument nothing is written.
pub struct Echo {
    out: OutputSink,
}

impl Echo {
    pub fn new(out: OutputSink) -> Self {
        Self { out }
    }
}

impl HostCallback for Echo {
    fn call<'js>(&self, call: &HostCall<'js>) -> Result<Option<Value<'js>>> {
        let Some(first) = call.arg(0) else {
            return Ok(None);
        };

        // Convert before borrowing the sink: toString may call back into echo
        let text = bridge::value_to_string(call.ctx(), first.clone())?;

        let mut out = self.out.borrow_mut();
        out.write_all(text.as_bytes())?;
        out.write_all(b"\n")?;
        out.flush()?;
        Ok(None)
    }
}
