//! The time range events are imported for.

use chrono::{DateTime, Months, Utc};

/// Range passed to every feed fetch of one sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl SyncWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// `months` calendar months starting at `start`.
    pub fn months_from(start: DateTime<Utc>, months: u32) -> Self {
        let end = start
            .checked_add_months(Months::new(months))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        Self { start, end }
    }

    /// From now until `months` months ahead.
    pub fn upcoming(months: u32) -> Self {
        Self::months_from(Utc::now(), months)
    }
}
