use crate::error::{validation_error, CalendarResult};
use chrono::{DateTime, Datelike, Duration, LocalResult, NaiveDate, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;

/// Parse time string in HH:MM format
pub fn parse_time(time_str: &str) -> Option<(u32, u32)> {
    let parts: Vec<&str> = time_str.split(':').collect();
    if parts.len() != 2 {
        return None;
    }
    if parts[1].len() != 2 || parts[0].is_empty() || parts[0].len() > 2 {
        return None;
    }
    let hour = parts[0].parse::<u32>().ok()?;
    let minute = parts[1].parse::<u32>().ok()?;
    if hour > 23 || minute > 59 {
        return None;
    }
    Some((hour, minute))
}

/// Resolve a wall-clock time in `tz` to UTC
pub fn localize(tz: &Tz, naive: NaiveDateTime) -> CalendarResult<DateTime<Utc>> {
    match tz.from_local_datetime(&naive) {
        LocalResult::Single(dt) => Ok(dt.with_timezone(&Utc)),
        // Repeated hour at a DST change: take the first occurrence
        LocalResult::Ambiguous(earliest, _) => Ok(earliest.with_timezone(&Utc)),
        LocalResult::None => Err(validation_error(&format!(
            "{} does not exist in timezone {}",
            naive, tz
        ))),
    }
}

/// Calculate next daily notification time
pub fn next_daily_time(current_time: &DateTime<Tz>, time_str: &str) -> Option<NaiveDateTime> {
    let (hour, minute) = parse_time(time_str)?;

    // Create a datetime for today at the specified time
    let mut next_time = current_time.date_naive().and_hms_opt(hour, minute, 0)?;

    // If the time has already passed today, schedule for tomorrow
    if current_time.naive_local() >= next_time {
        next_time = next_time.checked_add_signed(Duration::days(1))?;
    }

    Some(next_time)
}

/// Calculate the wait duration in seconds until `next_time`
pub fn calculate_wait_duration(now: &DateTime<Tz>, next_time: &NaiveDateTime) -> i64 {
    let seconds = next_time
        .signed_duration_since(now.naive_local())
        .num_seconds();

    // Close to the scheduled time, wait a minute instead of spinning
    if seconds <= 0 {
        return 60;
    }

    seconds
}

/// First day of the month `months` after the month containing `date`.
///
/// Rolls the year forward when the span crosses December.
pub fn add_months(date: NaiveDate, months: u32) -> Option<NaiveDate> {
    let index = date.month0() + months;
    let year = date.year() + (index / 12) as i32;
    let month = index % 12 + 1;
    NaiveDate::from_ymd_opt(year, month, 1)
}

/// Same day-of-month `months` later, clamped to the end of a shorter month
pub fn shift_months(date: NaiveDate, months: u32) -> Option<NaiveDate> {
    let first = add_months(date, months)?;
    let day = date.day().min(days_in_month(first.year(), first.month())?);
    first.with_day(day)
}

/// Number of days in a month
pub fn days_in_month(year: i32, month: u32) -> Option<u32> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let next = add_months(first, 1)?;
    Some(next.signed_duration_since(first).num_days() as u32)
}

/// All dates of one month, in order
pub fn days_of_month(year: i32, month: u32) -> Vec<NaiveDate> {
    let Some(first) = NaiveDate::from_ymd_opt(year, month, 1) else {
        return Vec::new();
    };
    first
        .iter_days()
        .take_while(|day| day.month() == month)
        .collect()
}
