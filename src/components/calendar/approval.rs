use super::models::{CalendarEvent, Viewer};
use super::store::EventStore;
use crate::error::{authorization_error, not_found_error, validation_error, CalendarResult};
use tracing::info;

/// Moderation state of a persisted event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventState {
    Pending,
    Approved,
}

impl EventState {
    /// Private events count as approved from creation on
    pub fn of(event: &CalendarEvent) -> Self {
        if event.approved || event.is_private {
            EventState::Approved
        } else {
            EventState::Pending
        }
    }
}

/// Confirmed result of a moderation request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// pending -> approved
    Approved,
    /// Already approved; nothing was sent
    Unchanged,
    /// Record removed
    Deleted,
}

/// Local check before asking the store to approve
pub fn check_approve(viewer: &Viewer, event: &CalendarEvent) -> CalendarResult<()> {
    if !viewer.is_elevated() {
        return Err(authorization_error("Only admins can approve events"));
    }
    if event.is_private {
        return Err(validation_error("Private events are not moderated"));
    }
    if event.is_synthesized() {
        return Err(validation_error("Recurring entries are not stored"));
    }
    Ok(())
}

/// Local check before asking the store to delete
pub fn check_delete(viewer: &Viewer, event: &CalendarEvent) -> CalendarResult<()> {
    if !viewer.is_elevated() && !viewer.created(event) {
        return Err(authorization_error(
            "Only admins or the creator can delete an event",
        ));
    }
    if event.is_synthesized() {
        return Err(validation_error("Recurring entries are not stored"));
    }
    Ok(())
}

/// Approve a pending event.
///
/// Approving twice is a no-op: an event already approved is not sent to the
/// store again, and a store that reports nothing changed (another session
/// got there first) also yields `Unchanged`.
pub async fn approve(
    store: &dyn EventStore,
    viewer: &Viewer,
    event: &CalendarEvent,
) -> CalendarResult<Transition> {
    check_approve(viewer, event)?;
    if EventState::of(event) == EventState::Approved {
        return Ok(Transition::Unchanged);
    }

    if !store.approve_event(viewer, &event.id).await? {
        info!("Event {} was already approved", event.id);
        return Ok(Transition::Unchanged);
    }
    info!("Event {} approved by {}", event.id, viewer.username);
    Ok(Transition::Approved)
}

/// Delete a pending or approved event
pub async fn delete(
    store: &dyn EventStore,
    viewer: &Viewer,
    event: &CalendarEvent,
) -> CalendarResult<Transition> {
    check_delete(viewer, event)?;

    if !store.delete_event(viewer, &event.id).await? {
        return Err(not_found_error(&event.id));
    }
    info!("Event {} deleted by {}", event.id, viewer.username);
    Ok(Transition::Deleted)
}
