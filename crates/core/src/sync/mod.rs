//! Reconciliation of local session state against the remote store.

pub mod engine;
pub mod ports;
pub mod state;

pub use engine::{SyncEngine, SyncOutcome};
pub use ports::{
    CreateLapRequest, CreateSessionRequest, LapImageSource, RemoteLap, RemoteSession,
    RemoteTracker, UpdateLapRequest, UpdateSessionRequest,
};
pub use state::{LiveLink, SyncState};
