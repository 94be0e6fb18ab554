//! Logging helper for fallible startup steps.

use std::fmt::Display;

/// Adds `log` to `Result`, recording errors with the caller's location.
pub trait ResultExt<T, E> {
    /// Log the error with `context` if this is an `Err`, then return the
    /// result unchanged.
    fn log<S: Display>(self, context: S) -> Result<T, E>;
}

impl<T, E: Display> ResultExt<T, E> for Result<T, E> {
    #[track_caller]
    fn log<S: Display>(self, context: S) -> Result<T, E> {
        if let Err(ref e) = self {
            let location = std::panic::Location::caller();
            tracing::error!(
                error = %e,
                file = %format!("{}:{}", location.file(), location.line()),
                context = %context,
                "Startup step failed"
            );
        }
        self
    }
}
