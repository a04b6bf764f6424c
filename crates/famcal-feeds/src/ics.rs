//! ICS feed parsing using the icalendar crate's parser.
//!
//! Turns a feed document into one [`FeedEvent`] per occurrence that overlaps the
//! requested window. Recurring events are expanded with the `rrule` crate.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use icalendar::parser::{read_calendar, unfold, Component, Property};
use icalendar::{CalendarDateTime, DatePerhapsTime};
use rrule::RRuleSet;
use thiserror::Error;

/// Upper bound on generated occurrences per recurring event.
const MAX_OCCURRENCES: u16 = 1000;

const ICS_DATE_TIME: &str = "%Y%m%dT%H%M%S";

#[derive(Debug, Error)]
pub enum IcsError {
    #[error("Malformed calendar data: {0}")]
    Malformed(String),
}

/// One event occurrence read from a feed.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedEvent {
    pub uid: Option<String>,
    pub summary: Option<String>,
    pub location: Option<String>,
    pub description: Option<String>,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// A VEVENT before window filtering and recurrence expansion.
struct RawEvent<'a> {
    uid: Option<String>,
    summary: Option<String>,
    location: Option<String>,
    description: Option<String>,
    start: DatePerhapsTime,
    start_utc: DateTime<Utc>,
    duration: Duration,
    rrule: Option<&'a str>,
    exdates: HashSet<DateTime<Utc>>,
    recurrence_id: Option<DateTime<Utc>>,
    cancelled: bool,
}

impl RawEvent<'_> {
    fn occurrence(&self, start: DateTime<Utc>) -> FeedEvent {
        FeedEvent {
            uid: self.uid.clone(),
            summary: self.summary.clone(),
            location: self.location.clone(),
            description: self.description.clone(),
            start,
            end: start + self.duration,
        }
    }
}

/// Parse an ICS document and return the events overlapping `[window_start, window_end]`.
///
/// Output follows document order; occurrences of a recurring event are chronological.
pub fn parse_events(
    bytes: &[u8],
    window_start: DateTime<Utc>,
    window_end: DateTime<Utc>,
) -> Result<Vec<FeedEvent>, IcsError> {
    let text = String::from_utf8_lossy(bytes);
    let unfolded = unfold(&text);
    let calendar = read_calendar(&unfolded).map_err(|e| IcsError::Malformed(e.to_string()))?;

    let raw_events: Vec<RawEvent> = calendar
        .components
        .iter()
        .filter(|c| c.name == "VEVENT")
        .filter_map(|c| read_event(c))
        .collect();

    // Instances replaced or cancelled by a RECURRENCE-ID component, keyed by UID.
    let mut overridden: HashMap<&str, HashSet<DateTime<Utc>>> = HashMap::new();
    for raw in &raw_events {
        if let (Some(uid), Some(rid)) = (raw.uid.as_deref(), raw.recurrence_id) {
            overridden.entry(uid).or_default().insert(rid);
        }
    }

    let overlaps = |e: &FeedEvent| e.start <= window_end && e.end >= window_start;
    let mut events = Vec::new();

    for raw in &raw_events {
        if raw.cancelled {
            continue;
        }

        match raw.rrule {
            Some(rrule) if raw.recurrence_id.is_none() => {
                let skip = raw.uid.as_deref().and_then(|uid| overridden.get(uid));
                events.extend(
                    expand(raw, rrule, window_start, window_end)
                        .into_iter()
                        .filter(|start| !raw.exdates.contains(start))
                        .filter(|start| !skip.is_some_and(|s| s.contains(start)))
                        .map(|start| raw.occurrence(start))
                        .filter(overlaps),
                );
            }
            _ => {
                let event = raw.occurrence(raw.start_utc);
                if overlaps(&event) {
                    events.push(event);
                }
            }
        }
    }

    Ok(events)
}

fn read_event<'a>(vevent: &'a Component<'_>) -> Option<RawEvent<'a>> {
    let uid = text_prop(vevent, "UID");

    let start = match vevent
        .find_prop("DTSTART")
        .and_then(|p| DatePerhapsTime::try_from(p).ok())
    {
        Some(start) => start,
        None => {
            tracing::warn!("Skipping event {:?} without a usable DTSTART", uid);
            return None;
        }
    };
    let start_utc = to_utc(&start);

    let end_utc = vevent
        .find_prop("DTEND")
        .and_then(|p| DatePerhapsTime::try_from(p).ok())
        .map(|end| to_utc(&end))
        .or_else(|| {
            vevent
                .find_prop("DURATION")
                .and_then(|p| parse_duration(p.val.as_ref()))
                .map(|d| start_utc + d)
        })
        .unwrap_or_else(|| match start {
            DatePerhapsTime::Date(_) => start_utc + Duration::days(1),
            DatePerhapsTime::DateTime(_) => start_utc,
        });

    let exdates = vevent
        .properties
        .iter()
        .filter(|p| p.name == "EXDATE")
        .flat_map(parse_exdate_property)
        .collect();

    let recurrence_id = vevent
        .find_prop("RECURRENCE-ID")
        .and_then(|p| DatePerhapsTime::try_from(p).ok())
        .map(|rid| to_utc(&rid));

    let cancelled = vevent
        .find_prop("STATUS")
        .is_some_and(|p| p.val.as_ref().eq_ignore_ascii_case("CANCELLED"));

    Some(RawEvent {
        summary: text_prop(vevent, "SUMMARY"),
        location: text_prop(vevent, "LOCATION"),
        description: text_prop(vevent, "DESCRIPTION"),
        uid,
        start,
        start_utc,
        duration: (end_utc - start_utc).max(Duration::zero()),
        rrule: vevent.find_prop("RRULE").map(|p| p.val.as_ref()),
        exdates,
        recurrence_id,
        cancelled,
    })
}

/// Occurrence start times of a recurring event that can overlap the window.
fn expand(
    raw: &RawEvent<'_>,
    rrule: &str,
    window_start: DateTime<Utc>,
    window_end: DateTime<Utc>,
) -> Vec<DateTime<Utc>> {
    let rrule_str = format!(
        "{}\nRRULE:{}",
        dtstart_line(&raw.start, raw.start_utc),
        normalize_until(rrule, known_tzid(&raw.start))
    );

    let rrule_set: RRuleSet = match rrule_str.parse() {
        Ok(set) => set,
        Err(e) => {
            tracing::warn!(
                "Cannot expand RRULE for event {:?} ({}), keeping first occurrence only",
                raw.uid,
                e
            );
            return vec![raw.start_utc];
        }
    };

    // after/before are exclusive; widen by a second and by the event length so
    // occurrences already in progress at window start are kept.
    let tz: rrule::Tz = Utc.into();
    let after = (window_start - raw.duration - Duration::seconds(1)).with_timezone(&tz);
    let before = (window_end + Duration::seconds(1)).with_timezone(&tz);

    let result = rrule_set.after(after).before(before).all(MAX_OCCURRENCES);
    if result.limited {
        tracing::warn!(
            "Event {:?} has more than {} occurrences in the window, truncated",
            raw.uid,
            MAX_OCCURRENCES
        );
    }

    result
        .dates
        .iter()
        .map(|dt| dt.with_timezone(&Utc))
        .collect()
}

/// DTSTART line for the rrule parser. Known zones stay zoned so occurrences follow
/// local wall-clock time across DST changes; everything else is pinned to UTC.
fn dtstart_line(start: &DatePerhapsTime, start_utc: DateTime<Utc>) -> String {
    match (start, known_tzid(start)) {
        (
            DatePerhapsTime::DateTime(CalendarDateTime::WithTimezone { date_time, .. }),
            Some(tzid),
        ) => {
            format!("DTSTART;TZID={}:{}", tzid, date_time.format(ICS_DATE_TIME))
        }
        _ => format!("DTSTART:{}Z", start_utc.format(ICS_DATE_TIME)),
    }
}

/// TZID of a zoned start that chrono-tz can resolve.
fn known_tzid(start: &DatePerhapsTime) -> Option<&str> {
    match start {
        DatePerhapsTime::DateTime(CalendarDateTime::WithTimezone { tzid, .. })
            if tzid.parse::<chrono_tz::Tz>().is_ok() =>
        {
            Some(tzid.as_str())
        }
        _ => None,
    }
}

/// The rrule parser wants UNTIL in UTC. Date-only and floating values are common in
/// feeds; they are local to `tzid` (the DTSTART zone) when there is one.
fn normalize_until(rrule: &str, tzid: Option<&str>) -> String {
    let until_utc = |local: NaiveDateTime| {
        let utc = match tzid {
            Some(tz) => zoned_to_utc(local, tz),
            None => local.and_utc(),
        };
        format!("UNTIL={}Z", utc.format(ICS_DATE_TIME))
    };

    rrule
        .split(';')
        .map(|part| match part.strip_prefix("UNTIL=") {
            // Date-only UNTIL includes the whole day.
            Some(v) if v.len() == 8 => NaiveDate::parse_from_str(v, "%Y%m%d")
                .map(|d| d.and_time(NaiveTime::MIN) + Duration::days(1) - Duration::seconds(1))
                .map(&until_utc)
                .unwrap_or_else(|_| part.to_string()),
            Some(v) if !v.ends_with('Z') => NaiveDateTime::parse_from_str(v, ICS_DATE_TIME)
                .map(&until_utc)
                .unwrap_or_else(|_| part.to_string()),
            _ => part.to_string(),
        })
        .collect::<Vec<_>>()
        .join(";")
}

fn to_utc(dpt: &DatePerhapsTime) -> DateTime<Utc> {
    match dpt {
        DatePerhapsTime::Date(d) => date_to_utc(*d),
        DatePerhapsTime::DateTime(CalendarDateTime::Utc(dt)) => *dt,
        DatePerhapsTime::DateTime(CalendarDateTime::Floating(naive)) => naive.and_utc(),
        DatePerhapsTime::DateTime(CalendarDateTime::WithTimezone { date_time, tzid }) => {
            zoned_to_utc(*date_time, tzid)
        }
    }
}

fn date_to_utc(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

fn zoned_to_utc(local: NaiveDateTime, tzid: &str) -> DateTime<Utc> {
    match tzid.parse::<chrono_tz::Tz>() {
        Ok(tz) => tz
            .from_local_datetime(&local)
            .earliest()
            // Inside a DST gap; the same wall-clock time an hour later exists.
            .or_else(|| tz.from_local_datetime(&(local + Duration::hours(1))).earliest())
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|| local.and_utc()),
        Err(_) => {
            tracing::warn!("Unknown time zone {:?}, treating time as UTC", tzid);
            local.and_utc()
        }
    }
}

/// Parse an EXDATE property, which may carry several comma-separated values.
fn parse_exdate_property(prop: &Property) -> Vec<DateTime<Utc>> {
    let tzid = prop
        .params
        .iter()
        .find(|p| p.key == "TZID")
        .and_then(|p| p.val.as_ref().map(|v| v.to_string()));

    let is_date = prop
        .params
        .iter()
        .any(|p| p.key == "VALUE" && p.val.as_ref().map(|v| v.as_ref()) == Some("DATE"));

    prop.val
        .as_ref()
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .filter_map(|s| {
            if is_date || s.len() == 8 {
                NaiveDate::parse_from_str(s, "%Y%m%d").ok().map(date_to_utc)
            } else if let Some(utc) = s.strip_suffix('Z') {
                NaiveDateTime::parse_from_str(utc, ICS_DATE_TIME)
                    .ok()
                    .map(|dt| dt.and_utc())
            } else {
                let local = NaiveDateTime::parse_from_str(s, ICS_DATE_TIME).ok()?;
                Some(match &tzid {
                    Some(tz) => zoned_to_utc(local, tz),
                    None => local.and_utc(),
                })
            }
        })
        .collect()
}

fn parse_duration(value: &str) -> Option<Duration> {
    let duration = iso8601::duration(value).ok()?;
    let std_duration: std::time::Duration = duration.into();
    Duration::from_std(std_duration).ok()
}

fn text_prop(component: &Component<'_>, name: &str) -> Option<String> {
    component
        .find_prop(name)
        .map(|p| unescape_text(p.val.as_ref()))
        .filter(|s| !s.is_empty())
}

/// Undo RFC 5545 TEXT escaping.
fn unescape_text(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') | Some('N') => out.push('\n'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}
