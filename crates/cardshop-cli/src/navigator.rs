use std::sync::Mutex;

use cardshop_core::Navigator;

/// Prints redirects the way a browser would follow them.
#[derive(Default)]
pub struct TerminalNavigator {
    title: Mutex<Option<String>>,
}

impl TerminalNavigator {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Navigator for TerminalNavigator {
    fn redirect(&self, path: &str) {
        eprintln!("-> redirected to {}", path);
    }

    fn set_title(&self, title: &str) {
        let mut current = self.title.lock().unwrap_or_else(|e| e.into_inner());
        if current.as_deref() != Some(title) {
            tracing::debug!(title = title, "Title changed");
            *current = Some(title.to_string());
        }
    }
}
