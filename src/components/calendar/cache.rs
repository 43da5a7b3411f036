use super::models::CalendarEvent;
use std::collections::HashMap;

/// The session's working copy of the calendar.
///
/// Persisted events and synthesized recurring entries live in the same map,
/// keyed by id. All writes go through `merge` or `remove`.
#[derive(Debug, Clone, Default)]
pub struct EventCache {
    events: HashMap<String, CalendarEvent>,
}

impl EventCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace by id. Returns true for an id not seen before.
    pub fn merge(&mut self, event: CalendarEvent) -> bool {
        self.events.insert(event.id.clone(), event).is_none()
    }

    /// Merge several events, returning how many were new
    pub fn merge_all<I>(&mut self, events: I) -> usize
    where
        I: IntoIterator<Item = CalendarEvent>,
    {
        let mut added = 0;
        for event in events {
            if self.merge(event) {
                added += 1;
            }
        }
        added
    }

    /// Apply a full fetch from the store.
    ///
    /// Persisted entries missing from `fetched` were deleted remotely and are
    /// dropped; synthesized entries are kept.
    pub fn replace_persisted(&mut self, fetched: Vec<CalendarEvent>) -> usize {
        let fetched_ids: std::collections::HashSet<&str> =
            fetched.iter().map(|e| e.id.as_str()).collect();
        self.events
            .retain(|id, event| event.is_synthesized() || fetched_ids.contains(id.as_str()));
        self.merge_all(fetched)
    }

    pub fn remove(&mut self, id: &str) -> Option<CalendarEvent> {
        self.events.remove(id)
    }

    pub fn get(&self, id: &str) -> Option<&CalendarEvent> {
        self.events.get(id)
    }

    /// All events ordered by start time, then id
    pub fn snapshot(&self) -> Vec<CalendarEvent> {
        let mut events: Vec<CalendarEvent> = self.events.values().cloned().collect();
        events.sort_by(|a, b| a.start.cmp(&b.start).then_with(|| a.id.cmp(&b.id)));
        events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
