//! Opt-in boundary turning panics raised inside a call into errors.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use crate::config::Config;
use crate::error::{CastError, CastResult};

/// Run `f`, converting a panic into [`CastError::Panic`] when the
/// configuration asks for it. Otherwise panics propagate unchanged.
pub(crate) fn guard<T>(cfg: &Config, f: impl FnOnce() -> CastResult<T>) -> CastResult<T> {
    if !cfg.recover_panics {
        return f();
    }
    catch_panic(f)
}

/// Run `f` and convert any panic into [`CastError::Panic`].
pub fn catch_panic<T>(f: impl FnOnce() -> CastResult<T>) -> CastResult<T> {
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(result) => result,
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            tracing::warn!(%message, "recovered from panic");
            Err(CastError::Panic(message))
        }
    }
}

/// Text of a panic payload. Payloads that are themselves [`CastError`]s
/// keep their message.
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(text) = payload.downcast_ref::<&str>() {
        return (*text).to_string();
    }
    if let Some(text) = payload.downcast_ref::<String>() {
        return text.clone();
    }
    if let Some(err) = payload.downcast_ref::<CastError>() {
        return err.to_string();
    }
    "panic with a non-string payload".to_string()
}
