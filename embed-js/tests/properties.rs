//! Property-based tests for the value bridge and the engine handle
//!
//! Each case builds a fresh engine on the proptest thread; the previous
//! case's engine is dropped first, so the one-runtime-per-thread rule holds.

use embed_js::bridge::{create_string, value_to_string};
use embed_js::{EngineConfig, EngineHandle, OutputSink};
use proptest::prelude::*;
use std::cell::RefCell;
use std::rc::Rc;

fn quiet_engine() -> EngineHandle {
    let sink: OutputSink = Rc::new(RefCell::new(std::io::sink()));
    EngineHandle::with_output(EngineConfig::default(), sink).expect("engine should initialize")
}

proptest! {
    /// Property: host text survives a trip through an engine string byte-for-byte
    #[test]
    fn prop_string_round_trip(text in any::<String>()) {
        let engine = quiet_engine();
        let host = engine
            .with_context(|ctx| {
                let value = create_string(&ctx, &text).unwrap();
                value_to_string(&ctx, value).unwrap()
            })
            .unwrap();

        prop_assert_eq!(host.as_bytes(), text.as_bytes());
        prop_assert_eq!(host.len(), text.len());
        prop_assert_eq!(host.as_bytes_with_nul()[text.len()], 0);
    }

    /// Property: values that coerce to the same string convert to that string
    #[test]
    fn prop_equivalent_values_convert_alike(n in -1_000_000i32..1_000_000) {
        let engine = quiet_engine();
        let expected = n.to_string();
        let scripts = [
            format!("{}", n),
            format!("'{}'", n),
            format!("[{}]", n),
            format!("({{ toString() {{ return '{}'; }} }})", n),
            format!("new Number({})", n),
        ];
        for script in scripts {
            let result = engine.evaluate_script(&script).unwrap();
            prop_assert!(!result.is_exception(), "{} threw", script);
            prop_assert_eq!(result.text().as_bytes(), expected.as_bytes());
        }
    }

    /// Property: cookies strictly increase, whatever the scripts do
    #[test]
    fn prop_cookies_strictly_increase(throws in prop::collection::vec(any::<bool>(), 1..20)) {
        let engine = quiet_engine();
        let mut last = None;
        for (i, throw) in throws.iter().enumerate() {
            let script = if *throw {
                format!("throw new Error('e{}')", i)
            } else {
                format!("{}", i)
            };
            let result = engine.evaluate_script(&script).unwrap();
            prop_assert_eq!(result.is_exception(), *throw);
            if let Some(previous) = last {
                prop_assert!(result.cookie() > previous);
            }
            last = Some(result.cookie());
        }
        prop_assert_eq!(engine.next_cookie(), throws.len() as u64);
    }
}
