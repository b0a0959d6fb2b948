//! Opt-in diagnostic output, enabled per client through `ClientOptions::debug`.

use serde::Serialize;

/// Emits a `log::debug!` record only when `$enabled` is true
macro_rules! debug_log {
    ($enabled:expr, $($arg:tt)+) => {
        if $enabled {
            log::debug!($($arg)+);
        }
    };
}

pub(crate) use debug_log;

/// Logs `value` as indented JSON under `label` when `enabled` is true
pub fn debug_json<T: Serialize + ?Sized>(enabled: bool, label: &str, value: &T) {
    if !enabled {
        return;
    }

    match serde_json::to_string_pretty(value) {
        Ok(json) => log::debug!("{label}:\n{json}"),
        Err(e) => log::debug!("Error serializing {label} for debug output: {e}"),
    }
}
