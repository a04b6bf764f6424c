//! Synchronization of ICS feeds into one destination calendar.
//!
//! A sync resolves the destination by name ([`directory`]), deletes its events
//! ([`clear`]) and re-inserts the events of every feed ([`import`]).

pub mod clear;
pub mod directory;
pub mod error;
pub mod import;
pub mod sync;
pub mod window;

pub use clear::clear;
pub use error::{ClearError, DirectoryError, ImportError, SyncError};
pub use import::{import_all, FeedImport, ImportSummary};
pub use sync::{sync, SyncReport};
pub use window::SyncWindow;
