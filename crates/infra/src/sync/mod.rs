//! Background sync scheduling and crash-recovery backups.

pub mod backup;
pub mod scheduler;

pub use backup::{LedgerSnapshotSource, LiveBackup, LiveBackupSnapshot};
pub use scheduler::BackgroundSync;
