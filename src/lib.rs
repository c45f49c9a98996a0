// Export modules for use in tests
pub mod app;
pub mod catalog;
pub mod event_source;
pub mod forms;
pub mod geometry;
pub mod notification;
pub mod panic_handler;
pub mod pdf;
pub mod session;
pub mod settings;
pub mod ui;
pub mod viewer;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

// Re-export main app components
pub use app::{App, AppAction, run_app_with_event_source};
pub use session::{DocumentSession, LoadError, SessionConfig, SessionState, Upload};
