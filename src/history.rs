//! Navigation history
//!
//! The router only needs a small contract from the navigation backend:
//! record a new entry, replace the current one, and report where it is. The
//! [`History`] trait captures it; [`MemoryHistory`] is an in-memory stack with
//! support for:
//! - Forward/backward navigation
//! - History truncation on new navigation
//! - Configurable history limits

/// Navigation backend contract
pub trait History {
    /// Href of the current entry
    fn current(&self) -> &str;

    /// Add an entry after the current one, dropping forward entries
    fn push(&mut self, href: String);

    /// Overwrite the current entry
    fn replace(&mut self, href: String);

    /// Step back; returns the new current href, `None` at the start
    fn back(&mut self) -> Option<String>;

    /// Step forward; returns the new current href, `None` at the end
    fn forward(&mut self) -> Option<String>;
}

/// In-memory history stack
#[derive(Debug, Clone)]
pub struct MemoryHistory {
    /// History stack
    entries: Vec<String>,
    /// Current position in history
    current: usize,
    /// Maximum history size (0 = unlimited)
    max_size: usize,
}

impl MemoryHistory {
    /// Create a new history with initial href
    pub fn new(initial: impl Into<String>) -> Self {
        Self::with_max_size(initial, 1000)
    }

    /// Create with custom max size
    pub fn with_max_size(initial: impl Into<String>, max_size: usize) -> Self {
        Self {
            entries: vec![initial.into()],
            current: 0,
            max_size,
        }
    }

    /// Check if can go back
    pub fn can_go_back(&self) -> bool {
        self.current > 0
    }

    /// Check if can go forward
    pub fn can_go_forward(&self) -> bool {
        self.current + 1 < self.entries.len()
    }

    /// Get history length
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Always false, a history holds at least its initial entry
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    /// Get current index
    pub fn current_index(&self) -> usize {
        self.current
    }

    /// Enforce maximum size limit
    fn enforce_size_limit(&mut self) {
        if self.max_size > 0 && self.entries.len() > self.max_size {
            // Remove oldest entries, keeping the current entry reachable
            let excess = self.entries.len() - self.max_size;
            self.entries.drain(0..excess);
            self.current = self.current.saturating_sub(excess);
        }
    }
}

impl History for MemoryHistory {
    fn current(&self) -> &str {
        &self.entries[self.current]
    }

    fn push(&mut self, href: String) {
        // Remove forward history when pushing
        self.entries.truncate(self.current + 1);
        self.entries.push(href);
        self.current += 1;
        self.enforce_size_limit();
    }

    fn replace(&mut self, href: String) {
        self.entries[self.current] = href;
    }

    fn back(&mut self) -> Option<String> {
        if !self.can_go_back() {
            return None;
        }
        self.current -= 1;
        Some(self.current().to_string())
    }

    fn forward(&mut self) -> Option<String> {
        if !self.can_go_forward() {
            return None;
        }
        self.current += 1;
        Some(self.current().to_string())
    }
}

impl Default for MemoryHistory {
    fn default() -> Self {
        Self::new("/")
    }
}
