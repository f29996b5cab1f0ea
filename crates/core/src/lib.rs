//! # Clockwork Core
//!
//! Business services and port interfaces for Clockwork.
//!
//! This crate contains:
//! - The lap ledger (split/merge/aggregate invariants)
//! - The session archive and preferences store
//! - The credential manager (token lifecycle state)
//! - The reconciliation engine and its sync state
//! - Port traits implemented by `clockwork-infra`
//!
//! ## Architecture
//! - Depends only on `clockwork-domain`
//! - No I/O beyond the injected port implementations

pub mod archive;
pub mod auth;
pub mod ledger;
pub mod preferences;
pub mod storage;
pub mod sync;

// Re-export commonly used items
pub use archive::SessionArchive;
pub use auth::CredentialManager;
pub use ledger::{LapLedger, LedgerRejection};
pub use preferences::PreferencesStore;
pub use storage::{KeyValueStore, MemoryStore};
pub use sync::engine::{SyncEngine, SyncOutcome};
pub use sync::ports::{LapImageSource, RemoteTracker};
