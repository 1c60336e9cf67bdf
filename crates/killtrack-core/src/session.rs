//! Per-run "current subject" state machine.
//!
//! Mutated only by extracted events, in arrival order. A kill line sets the
//! current subject; a pet drop line marks the current subject's pet. Every
//! change is merged into the [`AggregateStore`] immediately.

use chrono::{DateTime, Utc};

use crate::extract::{ChatEvent, ItemAcquiredEvent, KillCountEvent};
use crate::store::{AggregateStore, Candidate, StoreBackend, StoreError};
use crate::types::{KillRecord, Mode, RecordKey};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    /// Raw subject from the latest kill line. `None` before the first kill.
    pub current_subject: Option<String>,
    pub current_mode: Mode,
    pub current_kill_count: u64,
    pub current_pet: bool,
}

/// Outcome of applying one event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// No event.
    Ignored,
    /// Kill line merged; carries the record as written.
    KillRecorded(KillRecord),
    /// Pet drop merged; carries the record as written.
    PetRecorded(KillRecord),
    /// Pet drop while the current subject already has its pet.
    PetAlreadyKnown,
    /// Pet drop before any kill line this session.
    PetUnattributed,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Key of the current subject, if any.
    pub fn key(&self) -> Option<RecordKey> {
        self.current_subject
            .as_deref()
            .map(|subject| RecordKey::new(subject, self.current_mode))
    }

    pub fn apply<B: StoreBackend>(
        &mut self,
        event: Option<&ChatEvent>,
        store: &mut AggregateStore<B>,
        now: DateTime<Utc>,
    ) -> Result<Transition, StoreError> {
        match event {
            None => Ok(Transition::Ignored),
            Some(ChatEvent::KillCount(kill)) => self.on_kill(kill, store, now),
            Some(ChatEvent::ItemAcquired(item)) => self.on_item(item, store, now),
        }
    }

    fn on_kill<B: StoreBackend>(
        &mut self,
        kill: &KillCountEvent,
        store: &mut AggregateStore<B>,
        now: DateTime<Utc>,
    ) -> Result<Transition, StoreError> {
        self.current_subject = Some(kill.subject_raw.clone());
        self.current_mode = kill.mode;
        self.current_kill_count = kill.kill_count;

        // A fresh subject starts without its pet, a revisited one keeps it.
        self.current_pet = false;
        let key = RecordKey::new(&kill.subject_raw, kill.mode);
        if store.has_pet(&key) {
            self.current_pet = true;
        }

        Ok(self
            .merge(store, now)?
            .map_or(Transition::Ignored, Transition::KillRecorded))
    }

    fn on_item<B: StoreBackend>(
        &mut self,
        item: &ItemAcquiredEvent,
        store: &mut AggregateStore<B>,
        now: DateTime<Utc>,
    ) -> Result<Transition, StoreError> {
        if self.current_subject.is_none() {
            tracing::debug!(item = %item.item_name, "pet drop before any kill, ignored");
            return Ok(Transition::PetUnattributed);
        }
        if self.current_pet {
            return Ok(Transition::PetAlreadyKnown);
        }
        self.current_pet = true;
        Ok(self
            .merge(store, now)?
            .map_or(Transition::Ignored, Transition::PetRecorded))
    }

    /// Merge the current subject into the store. No-op without a subject.
    pub fn merge<B: StoreBackend>(
        &mut self,
        store: &mut AggregateStore<B>,
        now: DateTime<Utc>,
    ) -> Result<Option<KillRecord>, StoreError> {
        let Some(subject) = self.current_subject.as_deref() else {
            return Ok(None);
        };
        let record = store.upsert(
            &Candidate {
                subject_raw: subject,
                mode: self.current_mode,
                kill_count: self.current_kill_count,
                pet_acquired: self.current_pet,
            },
            now,
        )?;
        self.current_pet = record.pet_acquired;
        Ok(Some(record))
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
