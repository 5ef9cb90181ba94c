//! Conversion between engine values and host strings
//!
//! Everything here runs inside an entered context (`Context::with`), so the
//! `'js` lifetime ties every value to the scope it was produced in.

use crate::error::{JsError, Result};
use rquickjs::convert::Coerced;
use rquickjs::{Atom, Ctx, Exception, Value};
use std::borrow::Cow;
use std::fmt;

/// Name of the property read from a thrown error object
const MESSAGE_PROPERTY: &str = "message";

/// A host-owned, zero-terminated byte string produced by the engine
///
/// Holds exactly `len()` payload bytes followed by one zero byte. The payload
/// is whatever the engine produced (UTF-8 for QuickJS) and may itself contain
/// zero bytes, so the length is carried explicitly.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct HostString {
    buf: Box<[u8]>,
}

impl HostString {
    /// Copy `payload` into a new buffer of `payload.len() + 1` bytes
    pub fn from_bytes(payload: &[u8]) -> Self {
        let mut buf = Vec::with_capacity(payload.len() + 1);
        buf.extend_from_slice(payload);
        buf.push(0);
        Self {
            buf: buf.into_boxed_slice(),
        }
    }

    /// Number of payload bytes, excluding the terminator
    pub fn len(&self) -> usize {
        self.buf.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Payload bytes without the terminator
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf[..self.len()]
    }

    /// Payload bytes followed by the zero terminator
    pub fn as_bytes_with_nul(&self) -> &[u8] {
        &self.buf
    }

    pub fn to_string_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(self.as_bytes())
    }

    /// Take the payload, dropping the terminator
    pub fn into_bytes(self) -> Vec<u8> {
        let mut bytes = self.buf.into_vec();
        bytes.pop();
        bytes
    }
}

impl fmt::Display for HostString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_string_lossy())
    }
}

impl fmt::Debug for HostString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HostString({:?})", self.to_string_lossy())
    }
}

impl PartialEq<str> for HostString {
    fn eq(&self, other: &str) -> bool {
        self.as_bytes() == other.as_bytes()
    }
}

impl PartialEq<&str> for HostString {
    fn eq(&self, other: &&str) -> bool {
        self.as_bytes() == other.as_bytes()
    }
}

impl PartialEq<[u8]> for HostString {
    fn eq(&self, other: &[u8]) -> bool {
        self.as_bytes() == other
    }
}

/// Convert an engine value of any type into a host string
///
/// Uses the engine's generic ToString coercion: strings pass through,
/// primitives get their standard textual form and objects go through their
/// own `toString`. If the coercion throws, the pending exception is cleared
/// and reported as [`JsError::TypeConversion`].
pub fn value_to_string<'js>(ctx: &Ctx<'js>, value: Value<'js>) -> Result<HostString> {
    let coerced: Coerced<rquickjs::String<'js>> = value
        .get()
        .map_err(|e| JsError::type_conversion(describe_failure(ctx, e)))?;

    let text = coerced
        .0
        .to_string()
        .map_err(|e| JsError::type_conversion(describe_failure(ctx, e)))?;

    Ok(HostString::from_bytes(text.as_bytes()))
}

/// Create an engine string value from host text
pub fn create_string<'js>(ctx: &Ctx<'js>, text: &str) -> Result<Value<'js>> {
    rquickjs::String::from_str(ctx.clone(), text)
        .map(|s| s.into_value())
        .map_err(|e| engine_failure(ctx, e))
}

/// Intern a property name for use as an object key
pub fn property_id<'js>(ctx: &Ctx<'js>, name: &str) -> Result<Atom<'js>> {
    Atom::from_str(ctx.clone(), name).map_err(|e| engine_failure(ctx, e))
}

/// Retrieve and clear the pending exception, returning its message
///
/// Must be called right after an engine call reported a script exception.
/// Reads the thrown value's `message` property and converts it, so a thrown
/// value with no message (`throw 42`, `throw {}`) yields `undefined`.
pub fn extract_exception<'js>(ctx: &Ctx<'js>) -> Result<HostString> {
    let thrown = ctx.catch();

    let message = match thrown.as_object() {
        Some(object) => {
            let id = property_id(ctx, MESSAGE_PROPERTY)?;
            object.get(id).map_err(|e| engine_failure(ctx, e))?
        }
        None => Value::new_undefined(ctx.clone()),
    };

    value_to_string(ctx, message)
}

/// Map a failed engine call to [`JsError::Engine`], clearing any exception it left pending
pub(crate) fn engine_failure(ctx: &Ctx<'_>, error: rquickjs::Error) -> JsError {
    JsError::engine(describe_failure(ctx, error))
}

/// Describe a failed engine call
///
/// When the failure is a thrown exception it is taken off the context here,
/// so the next engine call does not observe it. Error objects are described
/// by their message, anything else by its string coercion.
fn describe_failure(ctx: &Ctx<'_>, error: rquickjs::Error) -> String {
    if !matches!(error, rquickjs::Error::Exception) {
        return error.to_string();
    }

    let thrown = ctx.catch();
    let message = thrown
        .clone()
        .into_object()
        .and_then(Exception::from_object)
        .and_then(|exception| exception.message());
    if let Some(message) = message {
        return message;
    }

    match thrown.get::<Coerced<String>>() {
        Ok(text) => text.0,
        Err(_) => {
            // The coercion threw as well
            let _ = ctx.catch();
            "thrown value could not be converted".to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rquickjs::{Context, Runtime};

    fn with_ctx<R>(f: impl FnOnce(Ctx<'_>) -> R) -> R {
        let rt = Runtime::new().unwrap();
        let ctx = Context::full(&rt).unwrap();
        ctx.with(f)
    }

    #[test]
    fn test_host_string_layout() {
        let s = HostString::from_bytes(b"abc");
        assert_eq!(s.len(), 3);
        assert_eq!(s.as_bytes(), b"abc");
        assert_eq!(s.as_bytes_with_nul(), b"abc\0");
        assert_eq!(s, "abc");
    }

    #[test]
    fn test_empty_host_string_is_only_terminator() {
        let s = HostString::from_bytes(b"");
        assert!(s.is_empty());
        assert_eq!(s.as_bytes_with_nul(), &[0u8][..]);
    }

    #[test]
    fn test_host_string_keeps_interior_nul() {
        let s = HostString::from_bytes(b"a\0b");
        assert_eq!(s.len(), 3);
        assert_eq!(s.into_bytes(), b"a\0b".to_vec());
    }

    #[test]
    fn test_string_round_trip() {
        with_ctx(|ctx| {
            let value = create_string(&ctx, "héllo wörld").unwrap();
            let s = value_to_string(&ctx, value).unwrap();
            assert_eq!(s, "héllo wörld");
            assert_eq!(s.as_bytes_with_nul().last(), Some(&0));
        });
    }

    #[test]
    fn test_primitive_coercion() {
        with_ctx(|ctx| {
            let cases = [
                ("42", "42"),
                ("1.5", "1.5"),
                ("true", "true"),
                ("undefined", "undefined"),
                ("null", "null"),
                ("[1, 2, 3]", "1,2,3"),
                ("({})", "[object Object]"),
            ];
            for (script, expected) in cases {
                let value: Value = ctx.eval(script).unwrap();
                assert_eq!(value_to_string(&ctx, value).unwrap(), expected, "{}", script);
            }
        });
    }

    #[test]
    fn test_empty_engine_string() {
        with_ctx(|ctx| {
            let value: Value = ctx.eval("''").unwrap();
            let s = value_to_string(&ctx, value).unwrap();
            assert!(s.is_empty());
            assert_eq!(s.as_bytes_with_nul(), b"\0");
        });
    }

    #[test]
    fn test_throwing_to_string_is_conversion_error() {
        with_ctx(|ctx| {
            let value: Value = ctx
                .eval("({ toString() { throw new Error('nope'); } })")
                .unwrap();
            let err = value_to_string(&ctx, value).unwrap_err();
            assert!(matches!(err, JsError::TypeConversion { .. }), "{:?}", err);
            assert!(err.to_string().contains("nope"));

            // The exception was taken off the context
            let after: i32 = ctx.eval("1 + 1").unwrap();
            assert_eq!(after, 2);
        });
    }

    #[test]
    fn test_extract_exception_reads_message() {
        with_ctx(|ctx| {
            let err = ctx.eval::<Value, _>("throw new TypeError('bad input')");
            assert!(matches!(err, Err(rquickjs::Error::Exception)));
            assert_eq!(extract_exception(&ctx).unwrap(), "bad input");
        });
    }

    #[test]
    fn test_extract_exception_non_object_has_no_message() {
        with_ctx(|ctx| {
            assert!(ctx.eval::<Value, _>("throw 42").is_err());
            assert_eq!(extract_exception(&ctx).unwrap(), "undefined");

            let after: i32 = ctx.eval("2 * 3").unwrap();
            assert_eq!(after, 6);
        });
    }

    #[test]
    fn test_extract_exception_object_without_message() {
        with_ctx(|ctx| {
            assert!(ctx.eval::<Value, _>("throw { code: 7 }").is_err());
            assert_eq!(extract_exception(&ctx).unwrap(), "undefined");
        });
    }

    #[test]
    fn test_extract_exception_plain_object_message() {
        with_ctx(|ctx| {
            assert!(ctx.eval::<Value, _>("throw { message: 'custom' }").is_err());
            assert_eq!(extract_exception(&ctx).unwrap(), "custom");
        });
    }

    #[test]
    fn test_conversion_error_keeps_non_error_thrown_value() {
        with_ctx(|ctx| {
            let value: Value = ctx
                .eval("({ toString() { throw 'plain refusal'; } })")
                .unwrap();
            let err = value_to_string(&ctx, value).unwrap_err();
            assert!(matches!(err, JsError::TypeConversion { .. }), "{:?}", err);
            assert!(err.to_string().contains("plain refusal"), "{}", err);

            let after: i32 = ctx.eval("1 + 1").unwrap();
            assert_eq!(after, 2);
        });
    }

    #[test]
    fn test_property_id_reads_property() {
        with_ctx(|ctx| {
            let object: rquickjs::Object = ctx.eval("({ answer: 42 })").unwrap();
            let id = property_id(&ctx, "answer").unwrap();
            let value: Value = object.get(id).unwrap();
            assert_eq!(value_to_string(&ctx, value).unwrap(), "42");
        });
    }
}
