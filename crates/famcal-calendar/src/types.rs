//! Calendar API types and data structures.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// An event ready to be inserted into the destination calendar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarEvent {
    /// UID from the originating feed. Cleared before insertion so the destination
    /// assigns its own id.
    pub external_id: Option<String>,
    pub title: Option<String>,
    pub location: Option<String>,
    pub description: Option<String>,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// Event as stored on the remote calendar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: String,
    pub summary: Option<String>,
    pub start: Option<EventTime>,
    pub end: Option<EventTime>,
}

/// Event time - can be a specific datetime or an all-day date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EventTime {
    DateTime(DateTime<Utc>),
    Date(NaiveDate),
}

/// Calendar list entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Calendar {
    pub id: String,
    pub summary: String,
    /// Per-user display name that replaces `summary` in the owner's calendar list.
    pub summary_override: Option<String>,
    pub description: Option<String>,
    pub time_zone: Option<String>,
    pub is_primary: bool,
    pub access_role: AccessRole,
}

impl Calendar {
    /// Name shown to the user: the override if set, otherwise the summary.
    pub fn display_name(&self) -> &str {
        self.summary_override.as_deref().unwrap_or(&self.summary)
    }

    /// Whether `name` equals the canonical summary or the per-user override.
    pub fn matches_name(&self, name: &str) -> bool {
        self.summary == name || self.summary_override.as_deref() == Some(name)
    }
}

/// Calendar access role.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum AccessRole {
    Owner,
    Writer,
    #[default]
    Reader,
    FreeBusyReader,
}

impl AccessRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccessRole::Owner => "owner",
            AccessRole::Writer => "writer",
            AccessRole::Reader => "reader",
            AccessRole::FreeBusyReader => "freeBusyReader",
        }
    }

    fn parse(s: Option<&str>) -> Self {
        match s {
            Some("owner") => AccessRole::Owner,
            Some("writer") => AccessRole::Writer,
            Some("freeBusyReader") => AccessRole::FreeBusyReader,
            _ => AccessRole::Reader,
        }
    }
}

impl std::fmt::Display for AccessRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One page of a paginated listing.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub next_page_token: Option<String>,
}

// API Response Types

/// Google Calendar API event response.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiEvent {
    pub id: String,
    pub summary: Option<String>,
    pub start: Option<ApiEventTime>,
    pub end: Option<ApiEventTime>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiEventTime {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_zone: Option<String>,
}

/// Request body for events.insert.
#[derive(Debug, Serialize)]
pub struct ApiEventInsert {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub start: ApiEventTime,
    pub end: ApiEventTime,
}

/// API response for event list.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventListResponse {
    #[serde(default)]
    pub items: Vec<ApiEvent>,
    pub next_page_token: Option<String>,
}

/// API response for calendar list.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarListResponse {
    #[serde(default)]
    pub items: Vec<ApiCalendar>,
    pub next_page_token: Option<String>,
}

/// Calendar list entry as returned by the API.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiCalendar {
    pub id: String,
    pub summary: Option<String>,
    pub summary_override: Option<String>,
    pub description: Option<String>,
    pub time_zone: Option<String>,
    #[serde(default)]
    pub primary: bool,
    pub access_role: Option<String>,
}

/// Calendar resource returned by calendars.insert.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiCalendarResource {
    pub id: String,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub time_zone: Option<String>,
}

impl From<&CalendarEvent> for ApiEventInsert {
    fn from(event: &CalendarEvent) -> Self {
        Self {
            id: event.external_id.clone(),
            summary: event.title.clone(),
            location: event.location.clone(),
            description: event.description.clone(),
            start: ApiEventTime::at(event.start),
            end: ApiEventTime::at(event.end),
        }
    }
}

impl ApiEventTime {
    fn at(dt: DateTime<Utc>) -> Self {
        Self {
            date_time: Some(dt.to_rfc3339()),
            date: None,
            time_zone: None,
        }
    }
}

impl From<ApiEvent> for Event {
    fn from(api: ApiEvent) -> Self {
        Self {
            id: api.id,
            summary: api.summary,
            start: api.start.as_ref().and_then(parse_event_time),
            end: api.end.as_ref().and_then(parse_event_time),
        }
    }
}

impl From<ApiCalendar> for Calendar {
    fn from(api: ApiCalendar) -> Self {
        Self {
            id: api.id,
            summary: api.summary.unwrap_or_default(),
            summary_override: api.summary_override,
            description: api.description,
            time_zone: api.time_zone,
            is_primary: api.primary,
            access_role: AccessRole::parse(api.access_role.as_deref()),
        }
    }
}

impl From<ApiCalendarResource> for Calendar {
    fn from(api: ApiCalendarResource) -> Self {
        // The creator of a calendar owns it.
        Self {
            id: api.id,
            summary: api.summary.unwrap_or_default(),
            summary_override: None,
            description: api.description,
            time_zone: api.time_zone,
            is_primary: false,
            access_role: AccessRole::Owner,
        }
    }
}

fn parse_event_time(api: &ApiEventTime) -> Option<EventTime> {
    if let Some(dt_str) = &api.date_time {
        if let Ok(dt) = DateTime::parse_from_rfc3339(dt_str) {
            return Some(EventTime::DateTime(dt.with_timezone(&Utc)));
        }
    }
    api.date
        .as_deref()
        .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok())
        .map(EventTime::Date)
}
