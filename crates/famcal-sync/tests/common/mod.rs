//! In-memory calendar service and feed fetcher shared by the sync tests.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use famcal_calendar::{
    AccessRole, Calendar, CalendarError, CalendarEvent, CalendarService, Event, EventTime, Page,
};
use famcal_feeds::{FeedFetcher, FetchError};

#[derive(Default)]
struct State {
    calendars: Vec<Calendar>,
    events: HashMap<String, Vec<(String, CalendarEvent)>>,
    next_id: usize,
    received: Vec<CalendarEvent>,
    insert_calls: usize,
    delete_calls: usize,
    create_calls: usize,
    fail_insert_at: Option<usize>,
    fail_delete_at: Option<usize>,
}

/// Calendar service that keeps everything in memory and pages listings.
pub struct FakeCalendarService {
    state: Mutex<State>,
    page_size: usize,
}

impl FakeCalendarService {
    pub fn new() -> Self {
        Self::with_page_size(2)
    }

    pub fn with_page_size(page_size: usize) -> Self {
        Self {
            state: Mutex::new(State::default()),
            page_size,
        }
    }

    pub fn add_calendar(&self, id: &str, summary: &str, summary_override: Option<&str>) {
        let mut state = self.state.lock().unwrap();
        state.calendars.push(Calendar {
            id: id.to_string(),
            summary: summary.to_string(),
            summary_override: summary_override.map(str::to_string),
            description: None,
            time_zone: None,
            is_primary: false,
            access_role: AccessRole::Owner,
        });
    }

    /// Put `count` stale events into `calendar_id`.
    pub fn seed_events(&self, calendar_id: &str, count: usize) {
        let mut state = self.state.lock().unwrap();
        let events = state.events.entry(calendar_id.to_string()).or_default();
        for i in 0..count {
            events.push((
                format!("stale-{}", i),
                event(&format!("stale-{}", i), "Old", t0(), 1),
            ));
        }
    }

    /// Make the `n`th insert call (1-based) fail.
    pub fn fail_insert_at(&self, n: usize) {
        self.state.lock().unwrap().fail_insert_at = Some(n);
    }

    /// Make the `n`th delete call (1-based) fail.
    pub fn fail_delete_at(&self, n: usize) {
        self.state.lock().unwrap().fail_delete_at = Some(n);
    }

    /// Events currently stored in `calendar_id`.
    pub fn events(&self, calendar_id: &str) -> Vec<CalendarEvent> {
        let state = self.state.lock().unwrap();
        state
            .events
            .get(calendar_id)
            .map(|events| events.iter().map(|(_, e)| e.clone()).collect())
            .unwrap_or_default()
    }

    /// Events exactly as passed to `insert_event`.
    pub fn received(&self) -> Vec<CalendarEvent> {
        self.state.lock().unwrap().received.clone()
    }

    pub fn calendar_count(&self) -> usize {
        self.state.lock().unwrap().calendars.len()
    }

    pub fn calendar(&self, id: &str) -> Option<Calendar> {
        let state = self.state.lock().unwrap();
        state.calendars.iter().find(|c| c.id == id).cloned()
    }

    pub fn insert_calls(&self) -> usize {
        self.state.lock().unwrap().insert_calls
    }

    pub fn create_calls(&self) -> usize {
        self.state.lock().unwrap().create_calls
    }
}

fn paginate<T: Clone>(items: &[T], page_token: Option<&str>, page_size: usize) -> Page<T> {
    let start = page_token
        .and_then(|t| t.parse::<usize>().ok())
        .unwrap_or(0)
        .min(items.len());
    let end = (start + page_size).min(items.len());
    Page {
        items: items[start..end].to_vec(),
        next_page_token: (end < items.len()).then(|| end.to_string()),
    }
}

#[async_trait]
impl CalendarService for FakeCalendarService {
    async fn list_calendars(
        &self,
        page_token: Option<&str>,
    ) -> Result<Page<Calendar>, CalendarError> {
        let state = self.state.lock().unwrap();
        Ok(paginate(&state.calendars, page_token, self.page_size))
    }

    async fn create_calendar(&self, summary: &str) -> Result<Calendar, CalendarError> {
        let mut state = self.state.lock().unwrap();
        state.create_calls += 1;
        state.next_id += 1;
        let calendar = Calendar {
            id: format!("cal-{}", state.next_id),
            summary: summary.to_string(),
            summary_override: None,
            description: None,
            time_zone: None,
            is_primary: false,
            access_role: AccessRole::Owner,
        };
        state.calendars.push(calendar.clone());
        Ok(calendar)
    }

    async fn insert_calendar_list_entry(
        &self,
        calendar_id: &str,
        display_name: &str,
        access_role: AccessRole,
    ) -> Result<Calendar, CalendarError> {
        let mut state = self.state.lock().unwrap();
        let calendar = state
            .calendars
            .iter_mut()
            .find(|c| c.id == calendar_id)
            .ok_or_else(|| CalendarError::NotFound(calendar_id.to_string()))?;
        calendar.summary_override = Some(display_name.to_string());
        calendar.access_role = access_role;
        Ok(calendar.clone())
    }

    async fn delete_calendar(&self, calendar_id: &str) -> Result<(), CalendarError> {
        let mut state = self.state.lock().unwrap();
        let before = state.calendars.len();
        state.calendars.retain(|c| c.id != calendar_id);
        if state.calendars.len() == before {
            return Err(CalendarError::NotFound(calendar_id.to_string()));
        }
        state.events.remove(calendar_id);
        Ok(())
    }

    async fn list_events(
        &self,
        calendar_id: &str,
        page_token: Option<&str>,
    ) -> Result<Page<Event>, CalendarError> {
        let state = self.state.lock().unwrap();
        let events: Vec<Event> = state
            .events
            .get(calendar_id)
            .map(|events| {
                events
                    .iter()
                    .map(|(id, e)| Event {
                        id: id.clone(),
                        summary: e.title.clone(),
                        start: Some(EventTime::DateTime(e.start)),
                        end: Some(EventTime::DateTime(e.end)),
                    })
                    .collect()
            })
            .unwrap_or_default();
        Ok(paginate(&events, page_token, self.page_size))
    }

    async fn delete_event(&self, calendar_id: &str, event_id: &str) -> Result<(), CalendarError> {
        let mut state = self.state.lock().unwrap();
        state.delete_calls += 1;
        if state.fail_delete_at == Some(state.delete_calls) {
            return Err(CalendarError::ApiError("delete rejected".into()));
        }
        let events = state.events.entry(calendar_id.to_string()).or_default();
        let before = events.len();
        events.retain(|(id, _)| id != event_id);
        if events.len() == before {
            return Err(CalendarError::NotFound(event_id.to_string()));
        }
        Ok(())
    }

    async fn insert_event(
        &self,
        calendar_id: &str,
        event: &CalendarEvent,
    ) -> Result<Event, CalendarError> {
        let mut state = self.state.lock().unwrap();
        state.insert_calls += 1;
        if state.fail_insert_at == Some(state.insert_calls) {
            return Err(CalendarError::ApiError("insert rejected".into()));
        }
        state.received.push(event.clone());
        state.next_id += 1;
        let id = format!("ev-{}", state.next_id);
        state
            .events
            .entry(calendar_id.to_string())
            .or_default()
            .push((id.clone(), event.clone()));
        Ok(Event {
            id,
            summary: event.title.clone(),
            start: Some(EventTime::DateTime(event.start)),
            end: Some(EventTime::DateTime(event.end)),
        })
    }
}

/// Feed fetcher serving canned events per url.
#[derive(Default)]
pub struct FakeFeedFetcher {
    feeds: HashMap<String, Vec<CalendarEvent>>,
    failing: HashSet<String>,
    fetched: Mutex<Vec<String>>,
}

impl FakeFeedFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_feed(mut self, url: &str, events: Vec<CalendarEvent>) -> Self {
        self.feeds.insert(url.to_string(), events);
        self
    }

    pub fn with_failing_feed(mut self, url: &str) -> Self {
        self.failing.insert(url.to_string());
        self
    }

    /// Urls fetched so far, in order.
    pub fn fetched(&self) -> Vec<String> {
        self.fetched.lock().unwrap().clone()
    }
}

#[async_trait]
impl FeedFetcher for FakeFeedFetcher {
    async fn fetch(
        &self,
        url: &str,
        _window_start: DateTime<Utc>,
        _window_end: DateTime<Utc>,
    ) -> Result<Vec<CalendarEvent>, FetchError> {
        self.fetched.lock().unwrap().push(url.to_string());
        if self.failing.contains(url) {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: 503,
            });
        }
        self.feeds
            .get(url)
            .cloned()
            .ok_or_else(|| FetchError::Status {
                url: url.to_string(),
                status: 404,
            })
    }
}

pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap()
}

/// A feed event lasting `hours` hours from `start`.
pub fn event(uid: &str, title: &str, start: DateTime<Utc>, hours: i64) -> CalendarEvent {
    CalendarEvent {
        external_id: Some(uid.to_string()),
        title: Some(title.to_string()),
        location: None,
        description: None,
        start,
        end: start + Duration::hours(hours),
    }
}

/// Title, start and end of each event, sorted.
pub fn signature(events: &[CalendarEvent]) -> Vec<(Option<String>, DateTime<Utc>, DateTime<Utc>)> {
    let mut sig: Vec<_> = events
        .iter()
        .map(|e| (e.title.clone(), e.start, e.end))
        .collect();
    sig.sort();
    sig
}
