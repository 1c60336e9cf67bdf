//! LineSource: the recent chat window, probed through ordered read strategies.

use crate::decode::line_text;
use crate::error::SourceError;
use crate::reader::ChatReader;

/// Lines considered per fetch (the visible chatbox).
pub const DEFAULT_WINDOW: usize = 30;

/// A successful fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedLines {
    /// Plain text, oldest first. Unrecognized records decode to `""`.
    pub lines: Vec<String>,
    /// Name of the strategy that answered.
    pub via: String,
}

/// Supplies the recent window of raw chat lines on demand.
pub trait LineSource: Send + Sync {
    fn fetch_recent(&self) -> Result<FetchedLines, SourceError>;
}

/// Tries each reader in order; the first one that answers wins.
pub struct ProbingLineSource {
    readers: Vec<Box<dyn ChatReader>>,
    window: usize,
}

impl Default for ProbingLineSource {
    fn default() -> Self {
        Self::new()
    }
}

impl ProbingLineSource {
    pub fn new() -> Self {
        Self {
            readers: Vec::new(),
            window: DEFAULT_WINDOW,
        }
    }

    #[must_use]
    pub fn with_reader(mut self, reader: impl ChatReader + 'static) -> Self {
        self.readers.push(Box::new(reader));
        self
    }

    #[must_use]
    pub fn with_window(mut self, window: usize) -> Self {
        self.window = window;
        self
    }

    pub fn reader_names(&self) -> Vec<&str> {
        self.readers.iter().map(|r| r.name()).collect()
    }
}

impl LineSource for ProbingLineSource {
    fn fetch_recent(&self) -> Result<FetchedLines, SourceError> {
        if self.readers.is_empty() {
            return Err(SourceError::Unavailable(
                "no chat reader configured".to_string(),
            ));
        }

        let mut failures = Vec::with_capacity(self.readers.len());
        for reader in &self.readers {
            match reader.read() {
                Ok(records) => {
                    let skip = records.len().saturating_sub(self.window);
                    let lines = records[skip..].iter().map(line_text).collect();
                    return Ok(FetchedLines {
                        lines,
                        via: reader.name().to_string(),
                    });
                }
                Err(e) => {
                    tracing::debug!(reader = reader.name(), "chat read failed: {e}");
                    failures.push(format!("{}: {e}", reader.name()));
                }
            }
        }

        Err(SourceError::Unavailable(failures.join("; ")))
    }
}
