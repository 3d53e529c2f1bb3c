//! A small handful of helper macros

// Reports a broken structural invariant. Logs the message, then panics.
macro_rules! internal_error {
    ($($args:tt)+) => {{
        let msg = format!($($args)+);
        tracing::error!(%msg, "internal error");
        panic!("internal error: {}", msg)
    }};
}
