//! Google Calendar API client.

use async_trait::async_trait;
use tracing::instrument;

use crate::error::CalendarError;
use crate::service::CalendarService;
use crate::types::*;

const CALENDAR_LIST_PAGE_SIZE: &str = "250";
const EVENT_PAGE_SIZE: &str = "2500";

pub struct GoogleCalendarClient {
    client: reqwest::Client,
    access_token: String,
    base_url: String,
}

impl GoogleCalendarClient {
    /// Build on a preconfigured HTTP client (timeouts, proxies) and API endpoint.
    pub fn with_client(client: reqwest::Client, access_token: &str, base_url: &str) -> Self {
        Self {
            client,
            access_token: access_token.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    #[cfg(test)]
    pub fn new_with_base_url(access_token: &str, base_url: &str) -> Self {
        Self::with_client(reqwest::Client::new(), access_token, base_url)
    }

    fn auth_header(&self) -> String {
        format!("Bearer {}", self.access_token)
    }

    fn calendar_url(&self, calendar_id: &str) -> String {
        format!(
            "{}/calendars/{}",
            self.base_url,
            urlencoding::encode(calendar_id)
        )
    }

    async fn get_calendar_list_entry(&self, calendar_id: &str) -> Result<Calendar, CalendarError> {
        let url = format!(
            "{}/users/me/calendarList/{}",
            self.base_url,
            urlencoding::encode(calendar_id)
        );

        let response = self
            .client
            .get(&url)
            .header("Authorization", self.auth_header())
            .send()
            .await?;

        let api: ApiCalendar = self.handle_response(response).await?;
        Ok(Calendar::from(api))
    }

    /// Helper to handle API responses and errors.
    async fn handle_response<T: serde::de::DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, CalendarError> {
        let response = self.check_status(response).await?;
        response
            .json()
            .await
            .map_err(|e| CalendarError::ApiError(format!("JSON parse error: {}", e)))
    }

    async fn check_status(
        &self,
        response: reqwest::Response,
    ) -> Result<reqwest::Response, CalendarError> {
        let status = response.status();

        if status.is_success() {
            Ok(response)
        } else if status.as_u16() == 401 {
            Err(CalendarError::TokenExpired)
        } else if status.as_u16() == 403 {
            Err(CalendarError::AuthRequired)
        } else if status.as_u16() == 404 {
            let text = response.text().await.unwrap_or_default();
            Err(CalendarError::NotFound(text))
        } else if status.as_u16() == 409 {
            Err(CalendarError::Conflict)
        } else if status.as_u16() == 429 {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse().ok())
                .unwrap_or(60);
            Err(CalendarError::RateLimited(retry_after))
        } else {
            let text = response.text().await.unwrap_or_default();
            Err(CalendarError::ApiError(format!("{}: {}", status, text)))
        }
    }
}

#[async_trait]
impl CalendarService for GoogleCalendarClient {
    /// List one page of the caller's calendar list.
    #[instrument(skip(self), level = "debug")]
    async fn list_calendars(
        &self,
        page_token: Option<&str>,
    ) -> Result<Page<Calendar>, CalendarError> {
        let url = format!("{}/users/me/calendarList", self.base_url);

        let mut request = self
            .client
            .get(&url)
            .header("Authorization", self.auth_header())
            .query(&[("maxResults", CALENDAR_LIST_PAGE_SIZE)]);
        if let Some(pt) = page_token {
            request = request.query(&[("pageToken", pt)]);
        }

        let resp: CalendarListResponse = self.handle_response(request.send().await?).await?;
        Ok(Page {
            items: resp.items.into_iter().map(Calendar::from).collect(),
            next_page_token: resp.next_page_token,
        })
    }

    /// Create a secondary calendar owned by the caller.
    #[instrument(skip(self), level = "info")]
    async fn create_calendar(&self, summary: &str) -> Result<Calendar, CalendarError> {
        let url = format!("{}/calendars", self.base_url);

        let response = self
            .client
            .post(&url)
            .header("Authorization", self.auth_header())
            .json(&serde_json::json!({ "summary": summary }))
            .send()
            .await?;

        let api: ApiCalendarResource = self.handle_response(response).await?;
        Ok(Calendar::from(api))
    }

    /// Register a calendar in the caller's list.
    ///
    /// Google derives the access role from the calendar's ACL, so the requested role is
    /// verified against the returned entry. An entry that already exists (the API
    /// answers 409) is fetched and verified the same way.
    #[instrument(skip(self), level = "info")]
    async fn insert_calendar_list_entry(
        &self,
        calendar_id: &str,
        display_name: &str,
        access_role: AccessRole,
    ) -> Result<Calendar, CalendarError> {
        let url = format!("{}/users/me/calendarList", self.base_url);

        let response = self
            .client
            .post(&url)
            .header("Authorization", self.auth_header())
            .json(&serde_json::json!({
                "id": calendar_id,
                "summaryOverride": display_name,
            }))
            .send()
            .await?;

        let entry = match self.handle_response::<ApiCalendar>(response).await {
            Ok(api) => Calendar::from(api),
            Err(CalendarError::Conflict) => {
                tracing::debug!("Calendar {} already in calendar list", calendar_id);
                self.get_calendar_list_entry(calendar_id).await?
            }
            Err(e) => return Err(e),
        };

        if entry.access_role != access_role {
            return Err(CalendarError::ApiError(format!(
                "calendar {} registered with {} access, expected {}",
                calendar_id, entry.access_role, access_role
            )));
        }

        Ok(entry)
    }

    #[instrument(skip(self), level = "info")]
    async fn delete_calendar(&self, calendar_id: &str) -> Result<(), CalendarError> {
        let response = self
            .client
            .delete(self.calendar_url(calendar_id))
            .header("Authorization", self.auth_header())
            .send()
            .await?;

        // Delete returns 204 No Content on success
        self.check_status(response).await.map(|_| ())
    }

    /// List one page of events, recurring series returned as their master event.
    #[instrument(skip(self), level = "debug")]
    async fn list_events(
        &self,
        calendar_id: &str,
        page_token: Option<&str>,
    ) -> Result<Page<Event>, CalendarError> {
        let url = format!("{}/events", self.calendar_url(calendar_id));

        let mut request = self
            .client
            .get(&url)
            .header("Authorization", self.auth_header())
            .query(&[("maxResults", EVENT_PAGE_SIZE), ("showDeleted", "false")]);
        if let Some(pt) = page_token {
            request = request.query(&[("pageToken", pt)]);
        }

        let resp: EventListResponse = self.handle_response(request.send().await?).await?;
        Ok(Page {
            items: resp.items.into_iter().map(Event::from).collect(),
            next_page_token: resp.next_page_token,
        })
    }

    #[instrument(skip(self), level = "debug")]
    async fn delete_event(&self, calendar_id: &str, event_id: &str) -> Result<(), CalendarError> {
        let url = format!(
            "{}/events/{}",
            self.calendar_url(calendar_id),
            urlencoding::encode(event_id),
        );

        let response = self
            .client
            .delete(&url)
            .header("Authorization", self.auth_header())
            .send()
            .await?;

        self.check_status(response).await.map(|_| ())
    }

    #[instrument(skip(self, event), fields(title = ?event.title), level = "debug")]
    async fn insert_event(
        &self,
        calendar_id: &str,
        event: &CalendarEvent,
    ) -> Result<Event, CalendarError> {
        let url = format!("{}/events", self.calendar_url(calendar_id));

        let response = self
            .client
            .post(&url)
            .header("Authorization", self.auth_header())
            .json(&ApiEventInsert::from(event))
            .send()
            .await?;

        let api_event: ApiEvent = self.handle_response(response).await?;
        Ok(Event::from(api_event))
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;
    use chrono::{TimeZone, Utc};
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_list_calendars() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/users/me/calendarList"))
            .and(header("Authorization", "Bearer test_token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "items": [
                    {"id": "primary", "summary": "My Calendar", "primary": true, "accessRole": "owner"},
                    {"id": "cal2", "summary": "Work", "summaryOverride": "Job", "accessRole": "writer"}
                ],
                "nextPageToken": "page-2"
            })))
            .mount(&mock_server)
            .await;

        let client = GoogleCalendarClient::new_with_base_url("test_token", &mock_server.uri());
        let page = client.list_calendars(None).await.unwrap();

        assert_eq!(page.items.len(), 2);
        assert!(page.items[0].is_primary);
        assert_eq!(page.items[1].display_name(), "Job");
        assert_eq!(page.next_page_token.as_deref(), Some("page-2"));
    }

    #[tokio::test]
    async fn test_list_events_passes_page_token() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/calendars/shared%40group.calendar.google.com/events"))
            .and(query_param("pageToken", "tok/1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "items": [
                    {
                        "id": "event1",
                        "summary": "Meeting",
                        "start": {"dateTime": "2024-02-01T10:00:00Z"},
                        "end": {"dateTime": "2024-02-01T11:00:00Z"}
                    }
                ]
            })))
            .mount(&mock_server)
            .await;

        let client = GoogleCalendarClient::new_with_base_url("test_token", &mock_server.uri());
        let page = client
            .list_events("shared@group.calendar.google.com", Some("tok/1"))
            .await
            .unwrap();

        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].summary.as_deref(), Some("Meeting"));
        assert!(page.next_page_token.is_none());
    }

    #[tokio::test]
    async fn test_create_calendar() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/calendars"))
            .and(body_json(serde_json::json!({"summary": "Family"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "new@group.calendar.google.com",
                "summary": "Family"
            })))
            .mount(&mock_server)
            .await;

        let client = GoogleCalendarClient::new_with_base_url("test_token", &mock_server.uri());
        let calendar = client.create_calendar("Family").await.unwrap();

        assert_eq!(calendar.id, "new@group.calendar.google.com");
        assert_eq!(calendar.access_role, AccessRole::Owner);
    }

    #[tokio::test]
    async fn test_insert_calendar_list_entry_existing() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/users/me/calendarList"))
            .respond_with(ResponseTemplate::new(409))
            .mount(&mock_server)
            .await;

        Mock::given(method("GET"))
            .and(path("/users/me/calendarList/cal1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "cal1", "summary": "Family", "accessRole": "owner"
            })))
            .mount(&mock_server)
            .await;

        let client = GoogleCalendarClient::new_with_base_url("test_token", &mock_server.uri());
        let entry = client
            .insert_calendar_list_entry("cal1", "Family", AccessRole::Owner)
            .await
            .unwrap();

        assert_eq!(entry.id, "cal1");
    }

    #[tokio::test]
    async fn test_insert_calendar_list_entry_wrong_role() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/users/me/calendarList"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "cal1", "summary": "Family", "accessRole": "reader"
            })))
            .mount(&mock_server)
            .await;

        let client = GoogleCalendarClient::new_with_base_url("test_token", &mock_server.uri());
        let result = client
            .insert_calendar_list_entry("cal1", "Family", AccessRole::Owner)
            .await;

        assert!(matches!(result, Err(CalendarError::ApiError(msg)) if msg.contains("reader")));
    }

    #[tokio::test]
    async fn test_insert_event_body() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/calendars/cal1/events"))
            .and(body_json(serde_json::json!({
                "summary": "Match",
                "location": "Field 3",
                "start": {"dateTime": "2025-03-01T09:00:00+00:00"},
                "end": {"dateTime": "2025-03-01T11:00:00+00:00"}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "generated1",
                "summary": "Match",
                "start": {"dateTime": "2025-03-01T09:00:00Z"},
                "end": {"dateTime": "2025-03-01T11:00:00Z"}
            })))
            .mount(&mock_server)
            .await;

        let event = CalendarEvent {
            external_id: None,
            title: Some("Match".to_string()),
            location: Some("Field 3".to_string()),
            description: None,
            start: Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap(),
            end: Utc.with_ymd_and_hms(2025, 3, 1, 11, 0, 0).unwrap(),
        };

        let client = GoogleCalendarClient::new_with_base_url("test_token", &mock_server.uri());
        let inserted = client.insert_event("cal1", &event).await.unwrap();

        assert_eq!(inserted.id, "generated1");
    }

    #[tokio::test]
    async fn test_token_expired() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/users/me/calendarList"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&mock_server)
            .await;

        let client = GoogleCalendarClient::new_with_base_url("expired_token", &mock_server.uri());
        let result = client.list_calendars(None).await;

        assert!(matches!(result, Err(CalendarError::TokenExpired)));
    }

    #[tokio::test]
    async fn test_rate_limited() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/users/me/calendarList"))
            .respond_with(ResponseTemplate::new(429).append_header("Retry-After", "60"))
            .mount(&mock_server)
            .await;

        let client = GoogleCalendarClient::new_with_base_url("token", &mock_server.uri());
        let result = client.list_calendars(None).await;

        assert!(matches!(result, Err(CalendarError::RateLimited(60))));
    }

    #[tokio::test]
    async fn test_delete_event() {
        let mock_server = MockServer::start().await;

        Mock::given(method("DELETE"))
            .and(path("/calendars/primary/events/event123"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&mock_server)
            .await;

        let client = GoogleCalendarClient::new_with_base_url("test_token", &mock_server.uri());
        let result = client.delete_event("primary", "event123").await;

        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_delete_calendar_not_found() {
        let mock_server = MockServer::start().await;

        Mock::given(method("DELETE"))
            .and(path("/calendars/missing"))
            .respond_with(ResponseTemplate::new(404).set_body_string("Not Found"))
            .mount(&mock_server)
            .await;

        let client = GoogleCalendarClient::new_with_base_url("test_token", &mock_server.uri());
        let result = client.delete_calendar("missing").await;

        assert!(matches!(result, Err(CalendarError::NotFound(_))));
    }
}
