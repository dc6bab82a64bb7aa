//! Failure isolation for extension code.
//!
//! Extension hooks are trusted but fallible. Every call into extension code
//! goes through [`isolate`], which turns both `Err` returns and panics into
//! a plain message so that one misbehaving extension can never unwind into
//! the manager or the editor.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

/// Run extension code, catching errors and panics.
pub(crate) fn isolate<T>(f: impl FnOnce() -> anyhow::Result<T>) -> Result<T, String> {
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(format!("{e:#}")),
        Err(payload) => Err(format!("panicked: {}", panic_message(payload.as_ref()))),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn test_isolate_ok() {
        assert_eq!(isolate(|| Ok(7)), Ok(7));
    }

    #[test]
    fn test_isolate_error_keeps_context_chain() {
        let result: Result<(), String> = isolate(|| {
            Err(anyhow::anyhow!("disk full")).context("writing backup")
        });
        assert_eq!(result, Err("writing backup: disk full".to_string()));
    }

    #[test]
    fn test_isolate_catches_panic() {
        let result: Result<(), String> = isolate(|| panic!("widget destroyed"));
        assert_eq!(result, Err("panicked: widget destroyed".to_string()));

        let index = 3;
        let result: Result<(), String> = isolate(|| panic!("bad index {index}"));
        assert_eq!(result, Err("panicked: bad index 3".to_string()));
    }
}
