use super::models::{CalendarEvent, NewEvent, Viewer};
use super::visibility::is_visible;
use crate::error::{authorization_error, not_found_error, validation_error, CalendarResult};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

/// Remote store holding the persisted calendar events.
///
/// Each call is one atomic request; role and ownership are enforced by the
/// store itself.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Events the viewer may see, already filtered by the store
    async fn list_visible_events(&self, viewer: &Viewer) -> CalendarResult<Vec<CalendarEvent>>;

    /// Persist a new event and return its id. The store decides `approved`.
    async fn create_event(&self, viewer: &Viewer, event: NewEvent) -> CalendarResult<String>;

    /// Mark a pending event approved. Returns false when nothing changed
    /// because the event was approved already.
    async fn approve_event(&self, viewer: &Viewer, id: &str) -> CalendarResult<bool>;

    /// Remove an event
    async fn delete_event(&self, viewer: &Viewer, id: &str) -> CalendarResult<bool>;
}

/// Event store kept in process memory, applying the same rules as the
/// hosted one
#[derive(Debug, Clone, Default)]
pub struct InMemoryEventStore {
    events: Arc<Mutex<Vec<CalendarEvent>>>,
}

impl InMemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-populated with events
    pub fn with_events(events: Vec<CalendarEvent>) -> Self {
        Self {
            events: Arc::new(Mutex::new(events)),
        }
    }

    /// Every stored event, ignoring visibility
    pub async fn all_events(&self) -> Vec<CalendarEvent> {
        self.events.lock().await.clone()
    }
}

#[async_trait]
impl EventStore for InMemoryEventStore {
    async fn list_visible_events(&self, viewer: &Viewer) -> CalendarResult<Vec<CalendarEvent>> {
        let events = self.events.lock().await;
        let mut visible: Vec<CalendarEvent> = events
            .iter()
            .filter(|event| is_visible(event, viewer))
            .cloned()
            .collect();
        visible.sort_by(|a, b| a.start.cmp(&b.start));
        Ok(visible)
    }

    async fn create_event(&self, viewer: &Viewer, event: NewEvent) -> CalendarResult<String> {
        let id = uuid::Uuid::new_v4().to_string();
        let event = event.into_event(id.clone(), viewer);
        debug!("Storing event {} (approved: {})", id, event.approved);
        self.events.lock().await.push(event);
        Ok(id)
    }

    async fn approve_event(&self, viewer: &Viewer, id: &str) -> CalendarResult<bool> {
        if !viewer.is_elevated() {
            return Err(authorization_error("Only admins can approve events"));
        }
        let mut events = self.events.lock().await;
        let event = events
            .iter_mut()
            .find(|event| event.id == id)
            .ok_or_else(|| not_found_error(id))?;
        if event.is_private {
            return Err(validation_error("Private events are not moderated"));
        }
        if event.approved {
            return Ok(false);
        }
        event.approved = true;
        Ok(true)
    }

    async fn delete_event(&self, viewer: &Viewer, id: &str) -> CalendarResult<bool> {
        let mut events = self.events.lock().await;
        let index = events
            .iter()
            .position(|event| event.id == id)
            .ok_or_else(|| not_found_error(id))?;
        if !viewer.is_elevated() && !viewer.created(&events[index]) {
            return Err(authorization_error(
                "Only admins or the creator can delete an event",
            ));
        }
        events.remove(index);
        Ok(true)
    }
}
