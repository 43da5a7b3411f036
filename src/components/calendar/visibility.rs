use super::models::{CalendarEvent, Viewer};
use super::time::local_start_date;
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use chrono_tz::Tz;
use std::collections::BTreeMap;

/// Size of the upcoming list
pub const DEFAULT_UPCOMING_LIMIT: usize = 10;

/// Whether `viewer` may see `event`.
///
/// Privacy dominates approval: a private event is only ever matched by the
/// elevated or creator clauses.
pub fn is_visible(event: &CalendarEvent, viewer: &Viewer) -> bool {
    viewer.is_elevated() || (event.approved && !event.is_private) || viewer.created(event)
}

/// Events `viewer` may see, in input order
pub fn filter_visible<'a, I>(events: I, viewer: &Viewer) -> Vec<CalendarEvent>
where
    I: IntoIterator<Item = &'a CalendarEvent>,
{
    events
        .into_iter()
        .filter(|event| is_visible(event, viewer))
        .cloned()
        .collect()
}

/// The nearest `limit` visible events starting after `now`
pub fn upcoming(
    events: &[CalendarEvent],
    viewer: &Viewer,
    now: DateTime<Utc>,
    limit: usize,
) -> Vec<CalendarEvent> {
    let mut upcoming: Vec<CalendarEvent> = filter_visible(events, viewer)
        .into_iter()
        .filter(|event| event.start > now)
        .collect();
    upcoming.sort_by(|a, b| a.start.cmp(&b.start).then_with(|| a.id.cmp(&b.id)));
    upcoming.truncate(limit);
    upcoming
}

/// Visible events of one month grouped by the day they start on
pub fn month_grid(
    events: &[CalendarEvent],
    viewer: &Viewer,
    year: i32,
    month: u32,
    tz: &Tz,
) -> BTreeMap<NaiveDate, Vec<CalendarEvent>> {
    let mut grid: BTreeMap<NaiveDate, Vec<CalendarEvent>> = BTreeMap::new();
    for event in filter_visible(events, viewer) {
        let day = local_start_date(&event, tz);
        if day.year() == year && day.month() == month {
            grid.entry(day).or_default().push(event);
        }
    }
    for day_events in grid.values_mut() {
        day_events.sort_by(|a, b| a.start.cmp(&b.start));
    }
    grid
}

/// Visible events starting on `day`
pub fn events_on_day(
    events: &[CalendarEvent],
    viewer: &Viewer,
    day: NaiveDate,
    tz: &Tz,
) -> Vec<CalendarEvent> {
    month_grid(events, viewer, day.year(), day.month(), tz)
        .remove(&day)
        .unwrap_or_default()
}

/// Pending public events waiting for an admin. Empty for everyone else.
pub fn moderation_queue(events: &[CalendarEvent], viewer: &Viewer) -> Vec<CalendarEvent> {
    if !viewer.is_elevated() {
        return Vec::new();
    }
    let mut queue: Vec<CalendarEvent> = events
        .iter()
        .filter(|event| event.is_pending() && !event.is_synthesized())
        .cloned()
        .collect();
    queue.sort_by(|a, b| a.start.cmp(&b.start));
    queue
}
