//! Rolling buffer of the most recent new chat lines, for diagnostics only.

use std::collections::VecDeque;

pub const DEFAULT_DEBUG_LINES: usize = 12;

#[derive(Debug, Clone)]
pub struct DebugBuffer {
    lines: VecDeque<String>,
    limit: usize,
}

impl Default for DebugBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_DEBUG_LINES)
    }
}

impl DebugBuffer {
    pub fn new(limit: usize) -> Self {
        Self {
            lines: VecDeque::with_capacity(limit),
            limit,
        }
    }

    pub fn push(&mut self, line: impl Into<String>) {
        if self.limit == 0 {
            return;
        }
        if self.lines.len() == self.limit {
            self.lines.pop_front();
        }
        self.lines.push_back(line.into());
    }

    /// Oldest first.
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.lines.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }
}
