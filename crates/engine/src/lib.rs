//! Airwave job orchestration engine.
//!
//! Turns one accepted generation request into: an atomic credit deduction,
//! a provider submission, a bounded polling loop, a live progress stream,
//! disconnect-tolerant background completion, durable persistence, and a
//! guaranteed refund on any failure after the deduction.
//!
//! Collaborators (ledger, artifact store, notifier) are trait-shaped so
//! tests substitute fakes; REST implementations live beside each trait.

pub mod config;
pub mod job;
pub mod ledger;
pub mod notify;
pub mod persist;
pub mod quota;
pub mod registry;
pub mod stream;

pub use config::EngineConfig;
pub use job::{GenerationEngine, JobState, PreparedJob};
pub use ledger::{CreditLedger, DeductOutcome, LedgerError, RestLedger};
pub use notify::{Notifier, NotifyError, RestNotifier};
pub use persist::{ArtifactCategory, ArtifactPersister, CatalogRecord, ObjectStorePersister, PersistError, StoredArtifact};
pub use stream::{StreamEmitter, StreamEvent};
