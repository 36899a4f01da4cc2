//! UI hooks invoked when a call fails.

use tracing::{info, warn};

/// Receives user-facing failure notifications from the client.
pub trait Presenter: Send + Sync {
    /// Show `message` to the user (toast, message box, ...).
    fn present_error(&self, message: &str);

    /// Move the user to the login entry point.
    fn navigate_to_login(&self);
}

/// Presenter for headless use: records both events as log lines.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingPresenter;

impl Presenter for TracingPresenter {
    fn present_error(&self, message: &str) {
        warn!(%message, "request failed");
    }

    fn navigate_to_login(&self) {
        info!("login required");
    }
}
