//! killtrack-core: chat line ingestion, event extraction and the durable
//! per-(subject, mode) kill aggregate.
//!
//! Pure library: no async runtime and no process IO. The line source and the
//! poll driver live in `killtrack-source` and `killtrack-runtime`.

pub mod debug_buffer;
pub mod dedup;
pub mod export;
pub mod extract;
pub mod pets;
pub mod pipeline;
pub mod session;
pub mod store;
pub mod types;

pub use extract::{ChatEvent, ItemAcquiredEvent, KillCountEvent, extract};
pub use pipeline::{CycleReport, Pipeline};
pub use store::{AggregateStore, JsonFileStore, MemoryStore, StoreBackend, StoreError};
pub use types::{KillRecord, Mode, RecordKey, normalize_subject};
