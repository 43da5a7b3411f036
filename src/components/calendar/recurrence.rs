use super::models::{CalendarEvent, EventType, NewEvent, SYSTEM_CREATOR};
use super::time::{event_window, local_start_date};
use crate::error::{config_error, CalendarResult};
use crate::utils::time::{add_months, days_of_month, parse_time, shift_months};
use chrono::{Datelike, Duration, NaiveDate, Weekday};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Number of month spans covered from the current month on
pub const RECURRENCE_MONTHS: u32 = 3;

/// A weekly series of calendar entries
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecurringSeries {
    /// Prefix of every generated id
    pub tag: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub weekday: Weekday,
    /// Start time (HH:MM)
    pub start_time: String,
    /// End time (HH:MM), earlier than start for overnight slots
    pub end_time: String,
    #[serde(rename = "type")]
    pub event_type: EventType,
    /// Write entries to the store instead of synthesizing them locally
    #[serde(default)]
    pub persist: bool,
}

impl RecurringSeries {
    /// The weekly CodeChef contest slot
    pub fn codechef() -> Self {
        Self {
            tag: "codechef".to_string(),
            title: "CodeChef Weekly Contest".to_string(),
            description: Some("Weekly coding contest on CodeChef platform".to_string()),
            weekday: Weekday::Wed,
            start_time: "20:00".to_string(),
            end_time: "23:00".to_string(),
            event_type: EventType::Contest,
            persist: false,
        }
    }

    /// Parsed start and end times
    pub fn time_window(&self) -> CalendarResult<((u32, u32), (u32, u32))> {
        let start = parse_time(&self.start_time).ok_or_else(|| {
            config_error(&format!("Series '{}' has invalid start time", self.tag))
        })?;
        let end = parse_time(&self.end_time)
            .ok_or_else(|| config_error(&format!("Series '{}' has invalid end time", self.tag)))?;
        Ok((start, end))
    }

    /// Entry of this series on `date`
    pub fn occurrence(&self, date: NaiveDate, tz: &Tz) -> CalendarResult<CalendarEvent> {
        let entry = self.new_entry(date, tz)?;
        Ok(CalendarEvent {
            id: series_event_id(&self.tag, date),
            category: entry.category(),
            title: entry.title,
            description: entry.description,
            start: entry.start,
            end: entry.end,
            event_type: entry.event_type,
            approved: true,
            is_private: false,
            created_by: SYSTEM_CREATOR.to_string(),
        })
    }

    /// Entry of this series on `date`, shaped for a store write
    pub fn new_entry(&self, date: NaiveDate, tz: &Tz) -> CalendarResult<NewEvent> {
        let (start, end) = self.time_window()?;
        let (start, end) = event_window(date, start, end, tz)?;
        Ok(NewEvent {
            title: self.title.clone(),
            description: self.description.clone(),
            start,
            end,
            event_type: self.event_type,
            is_private: false,
        })
    }

    /// Whether a stored event is this series' entry for some day
    fn matches(&self, event: &CalendarEvent) -> bool {
        event.event_type == self.event_type && event.title.contains(&self.title)
    }
}

/// Id of a synthesized entry. Duplicate detection relies on this being the
/// only place ids are built.
pub fn series_event_id(tag: &str, date: NaiveDate) -> String {
    format!("{}-{}", tag, date.format("%Y-%m-%d"))
}

/// Dates on `weekday` in the current month and the following months, from
/// `today` on
pub fn month_span_dates(today: NaiveDate, weekday: Weekday, months: u32) -> Vec<NaiveDate> {
    (0..months)
        .filter_map(|offset| add_months(today, offset))
        .flat_map(|first| days_of_month(first.year(), first.month()))
        .filter(|day| day.weekday() == weekday && *day >= today)
        .collect()
}

/// Dates on `weekday` from `today` through the same day `months` later
pub fn rolling_dates(today: NaiveDate, weekday: Weekday, months: u32) -> Vec<NaiveDate> {
    let last = shift_months(today, months).unwrap_or(today);
    let offset = (7 + weekday.num_days_from_monday() as i64
        - today.weekday().num_days_from_monday() as i64)
        % 7;
    let first = today + Duration::days(offset);
    first
        .iter_weeks()
        .take_while(|day| *day <= last)
        .collect()
}

/// Synthesize the entries of `series` that `known` does not have yet.
///
/// Candidates are keyed by `series_event_id`; any id already present in
/// `known` (or earlier in the output) is skipped, so feeding the previous
/// output back in yields nothing.
pub fn generate(
    series: &RecurringSeries,
    today: NaiveDate,
    tz: &Tz,
    known: &[CalendarEvent],
) -> CalendarResult<Vec<CalendarEvent>> {
    let mut seen: HashSet<String> = known.iter().map(|e| e.id.clone()).collect();
    let mut generated = Vec::new();

    for date in month_span_dates(today, series.weekday, RECURRENCE_MONTHS) {
        if !seen.insert(series_event_id(&series.tag, date)) {
            continue;
        }
        generated.push(series.occurrence(date, tz)?);
    }

    Ok(generated)
}

/// Store writes needed so every target weekday in the rolling window has a
/// persisted entry. Days that already hold a matching event are skipped.
pub fn plan_persisted(
    series: &RecurringSeries,
    today: NaiveDate,
    tz: &Tz,
    known: &[CalendarEvent],
) -> CalendarResult<Vec<NewEvent>> {
    let covered: HashSet<NaiveDate> = known
        .iter()
        .filter(|event| series.matches(event))
        .map(|event| local_start_date(event, tz))
        .collect();

    rolling_dates(today, series.weekday, RECURRENCE_MONTHS)
        .into_iter()
        .filter(|date| !covered.contains(date))
        .map(|date| series.new_entry(date, tz))
        .collect()
}
