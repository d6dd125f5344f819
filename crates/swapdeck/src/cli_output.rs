//! Centralised helpers for user-facing CLI output.
//!
//! Results go to stdout; warnings and human notices go to stderr so that `--json`
//! output stays machine-readable.

use crate::errors::ErrorBody;
use eyre::Context as _;
use serde::Serialize;
use std::io::Write as _;

pub fn stdout_writeln(s: &str) -> eyre::Result<()> {
    writeln!(std::io::stdout().lock(), "{s}").context("write stdout")
}

pub fn print_json(v: &impl Serialize) -> eyre::Result<()> {
    let s = serde_json::to_string_pretty(v).context("serialize json output")?;
    stdout_writeln(&s)
}

fn stderr_writeln(s: &str) {
    let mut stderr = std::io::stderr().lock();
    if stderr.write_all(s.as_bytes()).is_err() {
        return;
    }
    if stderr.write_all(b"\n").is_err() {
        return;
    }
    let _flush = stderr.flush();
}

pub fn print_warning(msg: &str) {
    stderr_writeln(&format!("warning: {msg}"));
}

/// Write a structured error to stderr as a single JSON line.
pub fn print_error_body(body: &ErrorBody) {
    match serde_json::to_string(&serde_json::json!({ "error": body })) {
        Ok(s) => stderr_writeln(&s),
        Err(_) => stderr_writeln(&format!("error: {}", body.message)),
    }
}
