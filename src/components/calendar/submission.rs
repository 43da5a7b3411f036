use super::models::{EventType, NewEvent, Viewer};
use super::time::event_window;
use crate::error::{validation_error, CalendarResult};
use crate::utils::time::parse_time;
use chrono::NaiveDate;
use chrono_tz::Tz;
use rust_i18n::t;
use serde::{Deserialize, Serialize};

/// Shortest accepted title, in characters
pub const MIN_TITLE_LEN: usize = 2;

/// Fields of the add-event form as entered by the user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventForm {
    pub title: String,
    pub description: Option<String>,
    pub date: Option<NaiveDate>,
    /// HH:MM
    pub start_time: String,
    /// HH:MM
    pub end_time: String,
    #[serde(rename = "type")]
    pub event_type: EventType,
    pub is_private: bool,
}

impl EventForm {
    /// Check the form and build the event to submit. Nothing is sent when
    /// this fails.
    pub fn validate(&self, tz: &Tz) -> CalendarResult<NewEvent> {
        let title = self.title.trim();
        if title.chars().count() < MIN_TITLE_LEN {
            return Err(validation_error(&format!(
                "Title must be at least {} characters",
                MIN_TITLE_LEN
            )));
        }
        let date = self
            .date
            .ok_or_else(|| validation_error("A date is required"))?;
        let start = parse_time(&self.start_time)
            .ok_or_else(|| validation_error("Please enter a valid start time (HH:MM)"))?;
        let end = parse_time(&self.end_time)
            .ok_or_else(|| validation_error("Please enter a valid end time (HH:MM)"))?;

        let (start, end) = event_window(date, start, end, tz)?;

        let description = self
            .description
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .map(String::from);

        Ok(NewEvent {
            title: title.to_string(),
            description,
            start,
            end,
            event_type: self.event_type,
            is_private: self.is_private,
        })
    }
}

/// How a submitted event ended up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionOutcome {
    /// Private, visible only to its creator
    PersonalReminder,
    /// Public and approved right away
    Published,
    /// Public, waiting for an admin
    AwaitingApproval,
}

impl SubmissionOutcome {
    pub fn for_submission(viewer: &Viewer, event: &NewEvent) -> Self {
        if event.is_private {
            SubmissionOutcome::PersonalReminder
        } else if viewer.is_elevated() {
            SubmissionOutcome::Published
        } else {
            SubmissionOutcome::AwaitingApproval
        }
    }

    pub fn title(self) -> String {
        match self {
            SubmissionOutcome::PersonalReminder => t!("submission_personal_title"),
            SubmissionOutcome::Published => t!("submission_published_title"),
            SubmissionOutcome::AwaitingApproval => t!("submission_pending_title"),
        }
        .to_string()
    }

    pub fn description(self) -> String {
        match self {
            SubmissionOutcome::PersonalReminder => t!("submission_personal_description"),
            SubmissionOutcome::Published => t!("submission_published_description"),
            SubmissionOutcome::AwaitingApproval => t!("submission_pending_description"),
        }
        .to_string()
    }
}

/// A confirmed submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub id: String,
    pub outcome: SubmissionOutcome,
}
