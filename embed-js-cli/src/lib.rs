//! hello-js: evaluates one script in an embedded engine and prints the result
//!
//! Exit codes:
//! - 0: Success (including a script that threw; its message is printed)
//! - 1: Error (engine could not be initialized, or evaluation failed)

use embed_js::{EngineHandle, Evaluation};
use std::io::Write;

/// Exit code for a completed run
pub const EXIT_SUCCESS: i32 = 0;

/// Exit code when the engine could not be set up or driven
pub const EXIT_ERROR: i32 = 1;

/// Script evaluated by the binary
pub const HELLO_SCRIPT: &str = "echo('hello, world!!')";

/// Evaluate `script` and write the result text plus a newline to `out`
pub fn run_script(
    engine: &EngineHandle,
    script: &str,
    out: &mut dyn Write,
) -> embed_js::Result<Evaluation> {
    let evaluation = engine.evaluate_script(script)?;
    if evaluation.is_exception() {
        tracing::info!("script threw: {}", evaluation);
    }

    out.write_all(evaluation.text().as_bytes())?;
    out.write_all(b"\n")?;
    out.flush()?;
    Ok(evaluation)
}

/// Build an engine, run [`HELLO_SCRIPT`] and map the outcome to an exit code
pub fn run(out: &mut dyn Write) -> i32 {
    let engine = match EngineHandle::new() {
        Ok(engine) => engine,
        Err(e) => {
            tracing::error!("{}", e);
            eprintln!("Failed to initialize JavaScript engine: {}", e);
            return EXIT_ERROR;
        }
    };

    match run_script(&engine, HELLO_SCRIPT, out) {
        Ok(_) => EXIT_SUCCESS,
        Err(e) => {
            tracing::error!("{}", e);
            eprintln!("Error: {}", e);
            EXIT_ERROR
        }
    }
}
