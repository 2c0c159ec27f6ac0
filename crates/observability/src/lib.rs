//! Tracing and logging setup shared by the server binary and tests.

pub mod tracing;

pub use self::tracing::{LOG_FORMAT_VAR, LogFormat, init_with};

/// Initialize process-wide logging from the environment.
///
/// This is safe to call multiple times; subsequent calls become no-ops.
pub fn init() {
    self::tracing::init();
}
