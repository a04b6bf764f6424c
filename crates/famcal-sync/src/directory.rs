//! Locating the destination calendar by display name.

use famcal_calendar::{AccessRole, Calendar, CalendarService};
use tracing::instrument;

use crate::error::DirectoryError;

/// Every calendar in the caller's calendar list, across all pages.
pub async fn list(service: &dyn CalendarService) -> Result<Vec<Calendar>, DirectoryError> {
    let mut calendars = Vec::new();
    let mut page_token: Option<String> = None;

    loop {
        let page = service
            .list_calendars(page_token.as_deref())
            .await
            .map_err(DirectoryError::List)?;
        calendars.extend(page.items);

        match page.next_page_token {
            Some(token) => page_token = Some(token),
            None => break,
        }
    }

    Ok(calendars)
}

/// Id of the calendar whose summary or override equals `display_name`.
///
/// More than one match is an error rather than a guess.
#[instrument(skip(service), level = "debug")]
pub async fn find(
    service: &dyn CalendarService,
    display_name: &str,
) -> Result<Option<String>, DirectoryError> {
    let mut ids: Vec<String> = list(service)
        .await?
        .into_iter()
        .filter(|calendar| calendar.matches_name(display_name))
        .map(|calendar| calendar.id)
        .collect();

    match ids.len() {
        0 => Ok(None),
        1 => Ok(ids.pop()),
        _ => Err(DirectoryError::Ambiguous {
            name: display_name.to_string(),
            ids,
        }),
    }
}

/// Id of the calendar named `display_name`, creating and registering it if absent.
#[instrument(skip(service), level = "info")]
pub async fn resolve_or_create(
    service: &dyn CalendarService,
    display_name: &str,
) -> Result<String, DirectoryError> {
    if let Some(id) = find(service, display_name).await? {
        tracing::info!("Found calendar {} ({})", display_name, id);
        return Ok(id);
    }

    let created = service
        .create_calendar(display_name)
        .await
        .map_err(|source| DirectoryError::Create {
            name: display_name.to_string(),
            source,
        })?;

    service
        .insert_calendar_list_entry(&created.id, display_name, AccessRole::Owner)
        .await
        .map_err(|source| DirectoryError::Register {
            calendar_id: created.id.clone(),
            source,
        })?;

    tracing::info!("Created calendar {} ({})", display_name, created.id);
    Ok(created.id)
}

/// Delete the calendar named `display_name`. Returns the deleted id, or `None` when
/// no calendar has that name.
#[instrument(skip(service), level = "info")]
pub async fn delete(
    service: &dyn CalendarService,
    display_name: &str,
) -> Result<Option<String>, DirectoryError> {
    let Some(id) = find(service, display_name).await? else {
        tracing::info!("No calendar named {}", display_name);
        return Ok(None);
    };

    service
        .delete_calendar(&id)
        .await
        .map_err(|source| DirectoryError::Delete {
            calendar_id: id.clone(),
            source,
        })?;

    tracing::info!("Deleted calendar {} ({})", display_name, id);
    Ok(Some(id))
}
