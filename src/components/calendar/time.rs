use super::models::CalendarEvent;
use crate::error::{validation_error, CalendarResult};
use crate::utils::time::localize;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use chrono_tz::Tz;

/// Build the start/end of an event held on `date` between two wall-clock times.
///
/// An end time earlier than the start time means the event runs overnight and
/// ends on the following day.
pub fn event_window(
    date: NaiveDate,
    start: (u32, u32),
    end: (u32, u32),
    tz: &Tz,
) -> CalendarResult<(DateTime<Utc>, DateTime<Utc>)> {
    if start == end {
        return Err(validation_error("End time must be later than start time"));
    }

    let start_naive = date
        .and_hms_opt(start.0, start.1, 0)
        .ok_or_else(|| validation_error("Invalid start time"))?;
    let end_date = if end < start {
        date + Duration::days(1)
    } else {
        date
    };
    let end_naive = end_date
        .and_hms_opt(end.0, end.1, 0)
        .ok_or_else(|| validation_error("Invalid end time"))?;

    Ok((localize(tz, start_naive)?, localize(tz, end_naive)?))
}

/// Calendar day an event starts on, as seen in `tz`
pub fn local_start_date(event: &CalendarEvent, tz: &Tz) -> NaiveDate {
    event.start.with_timezone(tz).date_naive()
}

/// "HH:MM - HH:MM" in `tz`
pub fn format_event_time(event: &CalendarEvent, tz: &Tz) -> String {
    format!(
        "{} - {}",
        event.start.with_timezone(tz).format("%H:%M"),
        event.end.with_timezone(tz).format("%H:%M")
    )
}
