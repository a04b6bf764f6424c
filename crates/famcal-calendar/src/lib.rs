//! Google Calendar integration for famcal.
//!
//! Provides the `CalendarService` seam and its Google Calendar API implementation.

pub mod client;
pub mod error;
pub mod service;
pub mod types;

pub use client::GoogleCalendarClient;
pub use error::CalendarError;
pub use service::CalendarService;
pub use types::{AccessRole, Calendar, CalendarEvent, Event, EventTime, Page};
