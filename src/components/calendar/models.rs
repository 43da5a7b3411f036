use crate::error::{validation_error, Error};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Creator id of entries synthesized by the recurrence generator
pub const SYSTEM_CREATOR: &str = "system";

/// Display category of an event, derived from its type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventCategory {
    Hackathon,
    Holiday,
    Workshop,
    Personal,
    Club,
    Contest,
    Notice,
}

impl EventCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            EventCategory::Hackathon => "hackathon",
            EventCategory::Holiday => "holiday",
            EventCategory::Workshop => "workshop",
            EventCategory::Personal => "personal",
            EventCategory::Club => "club",
            EventCategory::Contest => "contest",
            EventCategory::Notice => "notice",
        }
    }
}

impl fmt::Display for EventCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Event type chosen by the submitter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventType {
    Hackathon,
    Workshop,
    #[serde(rename = "Club Meetup")]
    ClubMeetup,
    Holiday,
    Contest,
    Notice,
    #[serde(rename = "Personal Reminder")]
    PersonalReminder,
}

impl EventType {
    pub const ALL: [EventType; 7] = [
        EventType::Hackathon,
        EventType::Workshop,
        EventType::ClubMeetup,
        EventType::Holiday,
        EventType::Contest,
        EventType::Notice,
        EventType::PersonalReminder,
    ];

    /// The one category belonging to this type
    pub fn category(self) -> EventCategory {
        match self {
            EventType::Hackathon => EventCategory::Hackathon,
            EventType::Workshop => EventCategory::Workshop,
            EventType::ClubMeetup => EventCategory::Club,
            EventType::Holiday => EventCategory::Holiday,
            EventType::Contest => EventCategory::Contest,
            EventType::Notice => EventCategory::Notice,
            EventType::PersonalReminder => EventCategory::Personal,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            EventType::Hackathon => "Hackathon",
            EventType::Workshop => "Workshop",
            EventType::ClubMeetup => "Club Meetup",
            EventType::Holiday => "Holiday",
            EventType::Contest => "Contest",
            EventType::Notice => "Notice",
            EventType::PersonalReminder => "Personal Reminder",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EventType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| validation_error(&format!("Unknown event type '{}'", s)))
    }
}

/// A calendar entry as held by the client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarEvent {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub category: EventCategory,
    #[serde(rename = "type")]
    pub event_type: EventType,
    pub approved: bool,
    pub is_private: bool,
    pub created_by: String,
}

impl CalendarEvent {
    /// Generated by a recurring series rather than persisted
    pub fn is_synthesized(&self) -> bool {
        self.created_by == SYSTEM_CREATOR
    }

    /// Waiting for an admin. Private events never are.
    pub fn is_pending(&self) -> bool {
        !self.approved && !self.is_private
    }
}

/// Fields of a new event before the store assigns an id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewEvent {
    pub title: String,
    pub description: Option<String>,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    #[serde(rename = "type")]
    pub event_type: EventType,
    pub is_private: bool,
}

impl NewEvent {
    pub fn category(&self) -> EventCategory {
        self.event_type.category()
    }

    /// Approval state the store assigns at creation
    pub fn initially_approved(&self, creator: &Viewer) -> bool {
        creator.is_elevated() || self.is_private
    }

    /// Materialize as a stored event
    pub fn into_event(self, id: String, creator: &Viewer) -> CalendarEvent {
        let approved = self.initially_approved(creator);
        CalendarEvent {
            id,
            category: self.category(),
            title: self.title,
            description: self.description,
            start: self.start,
            end: self.end,
            event_type: self.event_type,
            approved,
            is_private: self.is_private,
            created_by: creator.id.clone(),
        }
    }
}

/// Role of a session, resolved once at sign-in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Member,
}

impl Role {
    pub fn resolve(username: &str, admin_usernames: &[String]) -> Self {
        if admin_usernames.iter().any(|admin| admin == username) {
            Role::Admin
        } else {
            Role::Member
        }
    }
}

/// The user looking at the calendar
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewer {
    pub id: String,
    pub username: String,
    pub role: Role,
}

impl Viewer {
    pub fn new(id: impl Into<String>, username: impl Into<String>, role: Role) -> Self {
        Self {
            id: id.into(),
            username: username.into(),
            role,
        }
    }

    pub fn is_elevated(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn created(&self, event: &CalendarEvent) -> bool {
        event.created_by == self.id
    }
}
