//! Error types for each sync phase.

use famcal_calendar::CalendarError;
use famcal_feeds::FetchError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("Failed to list calendars: {0}")]
    List(#[source] CalendarError),

    #[error("Failed to create calendar {name:?}: {source}")]
    Create {
        name: String,
        #[source]
        source: CalendarError,
    },

    #[error("Failed to add calendar {calendar_id} to the calendar list: {source}")]
    Register {
        calendar_id: String,
        #[source]
        source: CalendarError,
    },

    #[error("Failed to delete calendar {calendar_id}: {source}")]
    Delete {
        calendar_id: String,
        #[source]
        source: CalendarError,
    },

    #[error("Calendar name {name:?} matches {} calendars: {}", .ids.len(), .ids.join(", "))]
    Ambiguous { name: String, ids: Vec<String> },
}

#[derive(Debug, Error)]
pub enum ClearError {
    #[error("Failed to list events: {0}")]
    List(#[source] CalendarError),

    #[error("Failed to delete event {event_id}: {source}")]
    Delete {
        event_id: String,
        #[source]
        source: CalendarError,
    },
}

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("Feed {feed:?}: {source}")]
    Fetch {
        feed: String,
        #[source]
        source: FetchError,
    },

    #[error("Feed {feed:?}: failed to insert event: {source}")]
    Insert {
        feed: String,
        #[source]
        source: CalendarError,
    },
}

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Clearing calendar failed: {0}")]
    Clear(#[from] ClearError),

    #[error("Importing feeds failed: {0}")]
    Import(#[from] ImportError),
}
