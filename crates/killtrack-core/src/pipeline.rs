//! One ingestion cycle: dedup → extract → session/store merge.
//!
//! `Pipeline` is the single owner of all mutable tracker state. Callers that
//! drive it concurrently must serialize access (one task, or one mutex).

use chrono::{DateTime, Utc};

use crate::debug_buffer::DebugBuffer;
use crate::dedup::LineDeduper;
use crate::extract::extract;
use crate::session::{SessionState, Transition};
use crate::store::{AggregateStore, StoreBackend, StoreError};
use crate::types::KillRecord;

/// Summary of one [`Pipeline::ingest`] call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Non-empty lines offered.
    pub lines: usize,
    /// Lines not seen before.
    pub fresh: usize,
    pub kills: usize,
    pub pets: usize,
    pub store_errors: usize,
    /// Records written this cycle, in order.
    pub written: Vec<KillRecord>,
}

impl CycleReport {
    pub fn is_quiet(&self) -> bool {
        self.fresh == 0
    }
}

pub struct Pipeline<B: StoreBackend> {
    dedup: LineDeduper,
    session: SessionState,
    store: AggregateStore<B>,
    debug: DebugBuffer,
}

impl<B: StoreBackend> Pipeline<B> {
    pub fn new(backend: B) -> Self {
        Self::with_parts(LineDeduper::default(), AggregateStore::new(backend))
    }

    pub fn with_parts(dedup: LineDeduper, store: AggregateStore<B>) -> Self {
        Self {
            dedup,
            session: SessionState::new(),
            store,
            debug: DebugBuffer::default(),
        }
    }

    /// Fresh run: forget seen lines, debug history and the current subject.
    pub fn start(&mut self) {
        self.dedup.clear();
        self.debug.clear();
        self.session.reset();
    }

    pub fn stop(&mut self) {
        self.session.reset();
    }

    /// Process lines in arrival order. Storage failures are counted and logged;
    /// they never abort the remaining lines.
    pub fn ingest<I, S>(&mut self, lines: I, now: DateTime<Utc>) -> CycleReport
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut report = CycleReport::default();

        for line in lines {
            let text = line.as_ref();
            if text.is_empty() {
                continue;
            }
            report.lines += 1;
            if self.dedup.seen(text) {
                continue;
            }
            report.fresh += 1;
            self.debug.push(text);

            let event = extract(text);
            match self.session.apply(event.as_ref(), &mut self.store, now) {
                Ok(Transition::KillRecorded(record)) => {
                    tracing::info!(
                        subject = %record.subject,
                        mode = %record.mode,
                        kill_count = record.kill_count,
                        pet = record.pet_acquired,
                        "kill count recorded"
                    );
                    report.kills += 1;
                    report.written.push(record);
                }
                Ok(Transition::PetRecorded(record)) => {
                    tracing::info!(subject = %record.subject, mode = %record.mode, "pet recorded");
                    report.pets += 1;
                    report.written.push(record);
                }
                Ok(other) => tracing::trace!(?other, line = text, "line processed"),
                Err(e) => {
                    tracing::warn!("failed to persist tracker state: {e}");
                    report.store_errors += 1;
                }
            }
        }

        report
    }

    /// Drop all stored records and the current subject.
    pub fn clear_all(&mut self) -> Result<(), StoreError> {
        self.session.reset();
        self.store.clear()
    }

    pub fn session(&self) -> &SessionState {
        &self.session
    }

    pub fn store(&self) -> &AggregateStore<B> {
        &self.store
    }

    pub fn records(&self) -> Vec<KillRecord> {
        self.store.records()
    }

    pub fn debug_lines(&self) -> Vec<String> {
        self.debug.lines().map(str::to_string).collect()
    }
}

// ─── Tests ──────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use crate::types::{Mode, RecordKey};

    /// Backend whose writes always fail.
    #[derive(Default)]
    struct BrokenStore;

    impl StoreBackend for BrokenStore {
        fn read(&self) -> Result<Option<String>, StoreError> {
            Ok(None)
        }
        fn write(&mut self, _blob: &str) -> Result<(), StoreError> {
            Err(std::io::Error::other("disk full").into())
        }
        fn remove(&mut self) -> Result<(), StoreError> {
            Ok(())
        }
    }

    /// Backend that holds data but cannot currently be read.
    struct UnreadableStore {
        writes: usize,
    }

    impl StoreBackend for UnreadableStore {
        fn read(&self) -> Result<Option<String>, StoreError> {
            Err(std::io::Error::from(std::io::ErrorKind::PermissionDenied).into())
        }
        fn write(&mut self, _blob: &str) -> Result<(), StoreError> {
            self.writes += 1;
            Ok(())
        }
        fn remove(&mut self) -> Result<(), StoreError> {
            Ok(())
        }
    }

    const RIBS: &str = "A golden beam shines over one of your items, You receive: 1x Ribs of Chaos";

    #[test]
    fn redelivered_window_processed_once() {
        let mut p = Pipeline::new(MemoryStore::new());
        let window = vec!["Welcome!", "You have killed 5 Vorkath (hm)."];

        let first = p.ingest(&window, Utc::now());
        assert_eq!(first.fresh, 2);
        assert_eq!(first.kills, 1);

        let second = p.ingest(&window, Utc::now());
        assert_eq!(second.lines, 2);
        assert!(second.is_quiet());
        assert_eq!(second.kills, 0);
        assert_eq!(p.store().backend().writes(), 1);
    }

    #[test]
    fn empty_lines_skipped() {
        let mut p = Pipeline::new(MemoryStore::new());
        let report = p.ingest(["", "", "x"], Utc::now());
        assert_eq!(report.lines, 1);
        assert_eq!(p.debug_lines(), vec!["x".to_string()]);
    }

    #[test]
    fn kill_then_pet_in_one_cycle() {
        let mut p = Pipeline::new(MemoryStore::new());
        let report = p.ingest(["You have killed 3 Kerapac (hm).", RIBS], Utc::now());
        assert_eq!(report.kills, 1);
        assert_eq!(report.pets, 1);
        assert_eq!(report.written.len(), 2);
        assert!(p.store().has_pet(&RecordKey::new("kerapac", Mode::Hard)));
    }

    #[test]
    fn start_forgets_seen_lines_but_not_store() {
        let mut p = Pipeline::new(MemoryStore::new());
        p.ingest(["You have killed 5 Nex."], Utc::now());
        p.start();
        assert!(p.session().current_subject.is_none());
        assert!(p.debug_lines().is_empty());

        let report = p.ingest(["You have killed 5 Nex."], Utc::now());
        assert_eq!(report.fresh, 1, "dedup cache cleared on start");
        assert_eq!(p.records().len(), 1);
    }

    #[test]
    fn stop_resets_session_only() {
        let mut p = Pipeline::new(MemoryStore::new());
        p.ingest(["You have killed 5 Nex."], Utc::now());
        p.stop();
        assert_eq!(*p.session(), SessionState::default());
        assert_eq!(p.ingest(["You have killed 5 Nex."], Utc::now()).fresh, 0);
    }

    #[test]
    fn clear_all_wipes_store_and_session() {
        let mut p = Pipeline::new(MemoryStore::new());
        p.ingest(["You have killed 5 Nex.", RIBS], Utc::now());
        p.clear_all().expect("clear");
        assert!(p.records().is_empty());
        assert!(p.session().current_subject.is_none());
    }

    #[test]
    fn storage_failure_does_not_stop_cycle() {
        let mut p = Pipeline::new(BrokenStore);
        let report = p.ingest(
            ["You have killed 1 Nex.", "You have killed 2 Solak.", "hello"],
            Utc::now(),
        );
        assert_eq!(report.store_errors, 2);
        assert_eq!(report.fresh, 3);
        assert_eq!(p.session().current_kill_count, 2);
    }

    #[test]
    fn unreadable_store_is_never_overwritten() {
        let mut p = Pipeline::new(UnreadableStore { writes: 0 });
        let report = p.ingest(["You have killed 1 Nex.", RIBS], Utc::now());
        assert_eq!(report.kills, 0);
        assert_eq!(report.pets, 0);
        assert_eq!(report.store_errors, 2);
        assert_eq!(p.store().backend().writes, 0);
    }

    #[test]
    fn debug_buffer_bounded() {
        let mut p = Pipeline::new(MemoryStore::new());
        let lines: Vec<String> = (0..30).map(|i| format!("chat {i}")).collect();
        p.ingest(&lines, Utc::now());
        let debug = p.debug_lines();
        assert_eq!(debug.len(), 12);
        assert_eq!(debug.last().map(String::as_str), Some("chat 29"));
    }
}
