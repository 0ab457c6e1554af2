use std::sync::{Mutex, PoisonError};

/// The browsing context: where redirects land and titles are shown.
pub trait Navigator: Send + Sync {
    fn redirect(&self, path: &str);

    fn set_title(&self, title: &str);
}

/// Keeps every redirect and title it is handed, in order.
#[derive(Default)]
pub struct RecordingNavigator {
    redirects: Mutex<Vec<String>>,
    titles: Mutex<Vec<String>>,
}

impl RecordingNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn redirects(&self) -> Vec<String> {
        self.redirects.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn titles(&self) -> Vec<String> {
        self.titles.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn last_title(&self) -> Option<String> {
        self.titles().pop()
    }
}

impl Navigator for RecordingNavigator {
    fn redirect(&self, path: &str) {
        self.redirects
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(path.to_string());
    }

    fn set_title(&self, title: &str) {
        self.titles
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(title.to_string());
    }
}
