use super::models::CalendarEvent;
use super::time::format_event_time;
use chrono::NaiveDate;
use chrono_tz::Tz;
use rust_i18n::t;
use tokio::sync::broadcast;
use tracing::info;

/// Capacity of the notice channel
pub const NOTICE_CHANNEL_CAPACITY: usize = 64;

/// Something a session should tell its user about
#[derive(Debug, Clone, PartialEq)]
pub enum Notice {
    /// Events that became visible since the last check
    NewEvents(Vec<CalendarEvent>),
    /// A pending event was approved
    Approved(CalendarEvent),
    /// Today's agenda
    DailyDigest {
        date: NaiveDate,
        events: Vec<CalendarEvent>,
    },
}

impl Notice {
    /// Plain-text rendering in the session's timezone
    pub fn render(&self, tz: &Tz) -> String {
        match self {
            Notice::NewEvents(events) => {
                let mut message = format!("📅 **{}**\n", t!("notice_new_events"));
                for event in events {
                    message.push_str(&event_line(event, tz, "%d.%m. %H:%M"));
                }
                message
            }
            Notice::Approved(event) => {
                t!("notice_approved", title = event.title.as_str()).to_string()
            }
            Notice::DailyDigest { date, events } => {
                let mut message = format!(
                    "📅 **{}**\n",
                    t!("notice_daily_digest", date = date.format("%d.%m.%Y").to_string())
                );
                if events.is_empty() {
                    message.push_str(&t!("notice_daily_digest_empty"));
                    message.push('\n');
                }
                for event in events {
                    message.push_str(&format!(
                        "• {} ({})\n",
                        event.title,
                        format_event_time(event, tz)
                    ));
                }
                message
            }
        }
    }
}

fn event_line(event: &CalendarEvent, tz: &Tz, pattern: &str) -> String {
    format!(
        "• {} ({})\n",
        event.title,
        event.start.with_timezone(tz).format(pattern)
    )
}

/// Log a notice and hand it to every subscriber
pub fn publish(notices: &broadcast::Sender<Notice>, notice: Notice, tz: &Tz) {
    info!("{}", notice.render(tz));
    // No subscribers is fine; the notice has been logged
    let _ = notices.send(notice);
}
