//! Page navigation seen by the API client.

use parking_lot::Mutex;

/// Student and faculty login page.
pub const LOGIN_PATH: &str = "/login";

/// Admin login page.
pub const ADMIN_LOGIN_PATH: &str = "/admin/login";

/// Whether `path` is one of the login pages.
pub fn is_login_page(path: &str) -> bool {
    let path = path.split(&['?', '#'][..]).next().unwrap_or(path);
    let path = match path.trim_end_matches('/') {
        "" => "/",
        trimmed => trimmed,
    };
    path == LOGIN_PATH || path == ADMIN_LOGIN_PATH
}

/// Where the user currently is, and how to send them elsewhere.
pub trait Navigator: Send + Sync {
    fn current_path(&self) -> String;
    fn navigate(&self, path: &str);
}

/// Navigator that records every navigation.
#[derive(Debug)]
pub struct HistoryNavigator {
    history: Mutex<Vec<String>>,
}

impl HistoryNavigator {
    /// Start at `path`.
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            history: Mutex::new(vec![path.into()]),
        }
    }

    /// Every path visited, oldest first, including the starting one.
    pub fn history(&self) -> Vec<String> {
        self.history.lock().clone()
    }

    /// Number of navigations performed after the start.
    pub fn navigations(&self) -> usize {
        self.history.lock().len().saturating_sub(1)
    }
}

impl Default for HistoryNavigator {
    fn default() -> Self {
        Self::new("/")
    }
}

impl Navigator for HistoryNavigator {
    fn current_path(&self) -> String {
        self.history.lock().last().cloned().unwrap_or_else(|| "/".to_string())
    }

    fn navigate(&self, path: &str) {
        self.history.lock().push(path.to_string());
    }
}
