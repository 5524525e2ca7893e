//! Presentation hooks: user-visible notices and navigation.
//!
//! The client never renders anything itself. Whoever embeds it supplies a
//! [`Notifier`] and a [`Navigator`]; the defaults write to the log.

use parking_lot::Mutex;
use talent_ops_core::{Notice, NoticeLevel};

/// Shows transient notices to the user.
pub trait Notifier: Send + Sync {
    fn notify(&self, notice: Notice);
}

/// Moves the user to another route.
pub trait Navigator: Send + Sync {
    fn navigate(&self, path: &str);
}

/// Logs notices at a level matching their severity.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, notice: Notice) {
        let title = notice.title.as_deref().unwrap_or_default();
        match notice.level {
            NoticeLevel::Error => tracing::error!(title, message = %notice.message, "Notice"),
            NoticeLevel::Warning => tracing::warn!(title, message = %notice.message, "Notice"),
            NoticeLevel::Info | NoticeLevel::Success => {
                tracing::info!(level = %notice.level, title, message = %notice.message, "Notice");
            }
        }
    }
}

/// Logs navigation requests.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNavigator;

impl Navigator for TracingNavigator {
    fn navigate(&self, path: &str) {
        tracing::info!(path, "Navigate");
    }
}

/// Keeps every notice in memory.
#[derive(Debug, Default)]
pub struct CollectingNotifier {
    notices: Mutex<Vec<Notice>>,
}

impl CollectingNotifier {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Notices received so far, oldest first.
    pub fn notices(&self) -> Vec<Notice> {
        self.notices.lock().clone()
    }
}

impl Notifier for CollectingNotifier {
    fn notify(&self, notice: Notice) {
        self.notices.lock().push(notice);
    }
}

/// Keeps every navigation request in memory.
#[derive(Debug, Default)]
pub struct CollectingNavigator {
    visits: Mutex<Vec<String>>,
}

impl CollectingNavigator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Paths navigated to so far, oldest first.
    pub fn visits(&self) -> Vec<String> {
        self.visits.lock().clone()
    }
}

impl Navigator for CollectingNavigator {
    fn navigate(&self, path: &str) {
        self.visits.lock().push(path.to_owned());
    }
}
