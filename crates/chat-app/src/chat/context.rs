use nanodash_backend::ChatContext;

use crate::chat::events::{FileSelected, PageChanged};

pub const DEFAULT_PAGE: &str = "status";

/// Pages without a file concept; navigating to one drops the file hint.
pub const NO_FILE_PAGES: [&str; 5] = ["status", "sessions", "cron", "media", ""];

/// Receives dashboard navigation signals.
pub trait NavigationListener {
    fn on_file_selected(&mut self, event: &FileSelected);
    fn on_page_changed(&mut self, event: &PageChanged);
}

/// Tracks which dashboard file the operator is looking at.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ContextBinding {
    page: String,
    file: Option<String>,
}

impl ContextBinding {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current page, `status` when the dashboard sits at its root.
    pub fn page(&self) -> &str {
        if self.page.is_empty() {
            DEFAULT_PAGE
        } else {
            &self.page
        }
    }

    pub fn file(&self) -> Option<&str> {
        self.file.as_deref()
    }

    /// Context to attach to the next outgoing message, if a file is set.
    pub fn hint(&self) -> Option<ChatContext> {
        self.file.as_ref().map(|file| ChatContext {
            page: self.page().to_string(),
            file: file.clone(),
        })
    }

    pub fn clear(&mut self) {
        self.file = None;
    }
}

impl NavigationListener for ContextBinding {
    fn on_file_selected(&mut self, event: &FileSelected) {
        self.file = event
            .path
            .as_deref()
            .filter(|path| !path.is_empty())
            .map(str::to_string);
    }

    fn on_page_changed(&mut self, event: &PageChanged) {
        self.page = event.page.clone();
        if NO_FILE_PAGES.contains(&event.page.as_str()) {
            self.file = None;
        }
    }
}
