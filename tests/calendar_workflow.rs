mod common;

use campus_calendar::components::calendar::approval::Transition;
use campus_calendar::components::calendar::notifications::Notice;
use campus_calendar::components::calendar::submission::SubmissionOutcome;
use campus_calendar::components::calendar::models::SYSTEM_CREATOR;
use campus_calendar::components::calendar::{
    refresh_cycle, EventStore, EventType, InMemoryEventStore,
};
use campus_calendar::error::Error;
use chrono::{TimeZone, Utc};
use common::*;
use std::sync::Arc;
use tokio::sync::broadcast::error::TryRecvError;

/// A member's public event stays hidden until an admin approves it
#[tokio::test]
async fn test_member_event_waits_for_approval() {
    let store: Arc<dyn EventStore> = Arc::new(InMemoryEventStore::new());
    let alice = session_as(ALICE, Arc::clone(&store)).await;
    let bob = session_as(BOB, Arc::clone(&store)).await;
    let admin = session_as(ADMIN, Arc::clone(&store)).await;

    let submission = alice
        .submit(form("Board games", date(2030, 5, 14), EventType::ClubMeetup, false))
        .await
        .unwrap();
    assert_eq!(submission.outcome, SubmissionOutcome::AwaitingApproval);

    // The creator sees the pending event, other members do not
    assert_eq!(ids(&alice.events().await.unwrap()), vec![submission.id.clone()]);
    bob.refresh().await.unwrap();
    assert!(bob.events().await.unwrap().is_empty());

    admin.refresh().await.unwrap();
    let queue = admin.moderation_queue().await.unwrap();
    assert_eq!(ids(&queue), vec![submission.id.clone()]);

    let mut notices = admin.subscribe();
    assert_eq!(admin.approve(&submission.id).await.unwrap(), Transition::Approved);
    match notices.recv().await.unwrap() {
        Notice::Approved(event) => {
            assert_eq!(event.id, submission.id);
            assert!(event.approved);
        }
        other => panic!("unexpected notice: {:?}", other),
    }
    assert!(admin.moderation_queue().await.unwrap().is_empty());

    // Approving again changes nothing and announces nothing
    assert_eq!(admin.approve(&submission.id).await.unwrap(), Transition::Unchanged);
    assert!(matches!(notices.try_recv(), Err(TryRecvError::Empty)));

    bob.refresh().await.unwrap();
    assert_eq!(ids(&bob.events().await.unwrap()), vec![submission.id]);
}

/// Admin submissions are published right away
#[tokio::test]
async fn test_admin_event_is_published() {
    let store: Arc<dyn EventStore> = Arc::new(InMemoryEventStore::new());
    let admin = session_as(ADMIN, Arc::clone(&store)).await;
    let bob = session_as(BOB, Arc::clone(&store)).await;

    let submission = admin
        .submit(form("Exam week", date(2030, 5, 20), EventType::Notice, false))
        .await
        .unwrap();
    assert_eq!(submission.outcome, SubmissionOutcome::Published);

    bob.refresh().await.unwrap();
    let events = bob.events().await.unwrap();
    assert_eq!(events.len(), 1);
    assert!(events[0].approved);
    assert_eq!(events[0].event_type, EventType::Notice);
}

/// Private reminders are seen by their creator and admins only, and are
/// never queued for moderation
#[tokio::test]
async fn test_private_reminder_visibility() {
    let store: Arc<dyn EventStore> = Arc::new(InMemoryEventStore::new());
    let alice = session_as(ALICE, Arc::clone(&store)).await;
    let bob = session_as(BOB, Arc::clone(&store)).await;
    let admin = session_as(ADMIN, Arc::clone(&store)).await;

    let submission = alice
        .submit(form("Dentist", date(2030, 5, 15), EventType::PersonalReminder, true))
        .await
        .unwrap();
    assert_eq!(submission.outcome, SubmissionOutcome::PersonalReminder);

    bob.refresh().await.unwrap();
    assert!(bob.events().await.unwrap().is_empty());

    admin.refresh().await.unwrap();
    assert_eq!(ids(&admin.events().await.unwrap()), vec![submission.id.clone()]);
    assert!(admin.moderation_queue().await.unwrap().is_empty());
    assert!(matches!(
        admin.approve(&submission.id).await,
        Err(Error::Validation(_))
    ));
}

/// An invalid form never reaches the store
#[tokio::test]
async fn test_invalid_form_is_rejected() {
    let store = Arc::new(InMemoryEventStore::new());
    let alice = session_as(ALICE, store.clone()).await;

    let mut short_title = form("A", date(2030, 5, 14), EventType::ClubMeetup, false);
    assert!(matches!(alice.submit(short_title.clone()).await, Err(Error::Validation(_))));

    short_title.title = "Chess club".to_string();
    short_title.end_time = short_title.start_time.clone();
    assert!(matches!(alice.submit(short_title).await, Err(Error::Validation(_))));

    assert!(store.all_events().await.is_empty());
}

/// An overnight slot ends on the following day
#[tokio::test]
async fn test_overnight_submission() {
    let store = Arc::new(InMemoryEventStore::new());
    let alice = session_as(ALICE, store.clone()).await;

    let mut overnight = form("Hackathon", date(2030, 5, 14), EventType::Contest, true);
    overnight.start_time = "22:00".to_string();
    overnight.end_time = "02:00".to_string();
    alice.submit(overnight).await.unwrap();

    let stored = store.all_events().await;
    assert_eq!(stored.len(), 1);
    // Helsinki is UTC+3 in May
    assert_eq!(stored[0].start, Utc.with_ymd_and_hms(2030, 5, 14, 19, 0, 0).unwrap());
    assert_eq!(stored[0].end, Utc.with_ymd_and_hms(2030, 5, 14, 23, 0, 0).unwrap());
}

/// A failed store request leaves the session's events as they were
#[tokio::test]
async fn test_store_failure_leaves_state_unchanged() {
    let store = FlakyStore::new();
    let alice = session_as(ALICE, Arc::new(store.clone())).await;

    let kept = alice
        .submit(form("Study group", date(2030, 5, 14), EventType::ClubMeetup, false))
        .await
        .unwrap();

    store.set_failing(true);
    let result = alice
        .submit(form("Movie night", date(2030, 5, 16), EventType::ClubMeetup, false))
        .await;
    assert!(matches!(result, Err(Error::TransientStore(_))));
    assert!(matches!(alice.refresh().await, Err(Error::TransientStore(_))));
    assert!(matches!(alice.delete(&kept.id).await, Err(Error::TransientStore(_))));

    assert_eq!(ids(&alice.events().await.unwrap()), vec![kept.id.clone()]);

    store.set_failing(false);
    alice.refresh().await.unwrap();
    assert_eq!(ids(&alice.events().await.unwrap()), vec![kept.id]);
    assert_eq!(store.all_events().await.len(), 1);
}

/// Deleted events disappear from later fetches
#[tokio::test]
async fn test_delete_removes_event() {
    let store = Arc::new(InMemoryEventStore::new());
    let alice = session_as(ALICE, store.clone()).await;
    let admin = session_as(ADMIN, store.clone()).await;

    let submission = alice
        .submit(form("Sauna evening", date(2030, 6, 1), EventType::ClubMeetup, false))
        .await
        .unwrap();

    admin.refresh().await.unwrap();
    assert_eq!(admin.delete(&submission.id).await.unwrap(), Transition::Deleted);
    assert!(admin.events().await.unwrap().is_empty());
    assert!(store.all_events().await.is_empty());

    // Alice still holds the event; the store says it is gone and the
    // session catches up
    let result = alice.delete(&submission.id).await;
    match result {
        Err(e) => assert!(e.should_refresh()),
        Ok(t) => panic!("expected not found, got {:?}", t),
    }
    assert!(alice.events().await.unwrap().is_empty());
}

/// Members cannot delete or approve other people's events
#[tokio::test]
async fn test_member_moderation_is_rejected() {
    let store = Arc::new(InMemoryEventStore::new());
    let admin = session_as(ADMIN, store.clone()).await;
    let bob = session_as(BOB, store.clone()).await;

    let submission = admin
        .submit(form("Orientation", date(2030, 8, 25), EventType::Notice, false))
        .await
        .unwrap();

    bob.refresh().await.unwrap();
    assert!(matches!(bob.delete(&submission.id).await, Err(Error::Authorization(_))));
    assert!(matches!(bob.approve(&submission.id).await, Err(Error::Authorization(_))));
    assert_eq!(store.all_events().await.len(), 1);

    // Unknown ids are reported as missing
    assert!(matches!(bob.delete("no-such-event").await, Err(Error::NotFound(_))));
}

/// Local recurring entries are generated once and survive refreshes
#[tokio::test]
async fn test_recurring_entries_are_idempotent() {
    let store = Arc::new(InMemoryEventStore::new());
    let mut config = test_config(BOB);
    config.series = vec![codechef_series(false)];
    let bob = session(config, store.clone()).await;

    let today = date(2025, 1, 1);
    // Five Wednesdays in January, four in February and March
    assert_eq!(bob.generate_recurring(today).await.unwrap(), 13);
    assert_eq!(bob.generate_recurring(today).await.unwrap(), 0);

    bob.refresh().await.unwrap();
    let events = bob.events().await.unwrap();
    assert_eq!(events.len(), 13);
    assert_eq!(events[0].id, "codechef-2025-01-01");
    assert!(store.all_events().await.is_empty());

    let grid = bob.month_grid(2025, 1).await.unwrap();
    assert_eq!(grid.len(), 5);
    let day = bob.day(date(2025, 1, 8)).await.unwrap();
    assert_eq!(ids(&day), vec!["codechef-2025-01-08".to_string()]);

    // Generated entries are not stored, so they cannot be deleted
    assert!(matches!(
        bob.delete("codechef-2025-01-08").await,
        Err(Error::Authorization(_)) | Err(Error::Validation(_))
    ));
}

/// Persisted series write each missing weekday once
#[tokio::test]
async fn test_persisted_series_sync() {
    let store = Arc::new(InMemoryEventStore::new());
    let mut config = test_config(ADMIN);
    config.series = vec![codechef_series(true)];
    let admin = session(config, store.clone()).await;

    let today = date(2025, 1, 1);
    let report = admin.sync_recurring(today).await.unwrap();
    assert_eq!(report.added, 13);
    assert_eq!(report.failed, 0);

    let report = admin.sync_recurring(today).await.unwrap();
    assert_eq!(report.added, 0);
    assert_eq!(store.all_events().await.len(), 13);
    assert!(store.all_events().await.iter().all(|e| e.approved));

    // Persisted series are never synthesized locally
    assert_eq!(admin.generate_recurring(today).await.unwrap(), 0);
}

/// Two admins approving the same pending event announce it once
#[tokio::test]
async fn test_second_admin_approval_is_a_no_op() {
    let store: Arc<dyn EventStore> = Arc::new(InMemoryEventStore::new());
    let alice = session_as(ALICE, Arc::clone(&store)).await;
    let first = session_as(ADMIN, Arc::clone(&store)).await;
    let mut config = test_config(ADMIN);
    config.session_user_id = "admin-laptop-id".to_string();
    let second = session(config, Arc::clone(&store)).await;

    let submission = alice
        .submit(form("Hack night", date(2030, 6, 3), EventType::ClubMeetup, false))
        .await
        .unwrap();
    first.refresh().await.unwrap();
    second.refresh().await.unwrap();
    assert_eq!(ids(&second.moderation_queue().await.unwrap()), vec![submission.id.clone()]);

    let mut first_notices = first.subscribe();
    let mut second_notices = second.subscribe();
    assert_eq!(first.approve(&submission.id).await.unwrap(), Transition::Approved);
    assert!(matches!(first_notices.recv().await.unwrap(), Notice::Approved(_)));

    // The second session still holds the pending copy
    assert_eq!(second.approve(&submission.id).await.unwrap(), Transition::Unchanged);
    assert!(matches!(second_notices.try_recv(), Err(TryRecvError::Empty)));
    assert!(second.moderation_queue().await.unwrap().is_empty());
    let cached = second.events().await.unwrap();
    assert_eq!(ids(&cached), vec![submission.id]);
    assert!(cached[0].approved);
}

/// Weekly contest entries still show up while the store is down
#[tokio::test]
async fn test_refresh_cycle_generates_while_store_is_down() {
    let store = FlakyStore::new();
    let mut config = test_config(BOB);
    config.series = vec![codechef_series(false)];
    let tz = config.tz().unwrap();
    let bob = session(config, Arc::new(store.clone())).await;
    let mut notices = bob.subscribe();

    assert!(bob.events().await.unwrap().is_empty());
    store.set_failing(true);
    refresh_cycle(&bob, &tz).await;

    let events = bob.events().await.unwrap();
    assert!(!events.is_empty());
    assert!(events.iter().all(|e| e.created_by == SYSTEM_CREATOR));
    assert!(store.all_events().await.is_empty());
    assert!(matches!(notices.try_recv(), Err(TryRecvError::Empty)));
}

/// The first check only records; later checks report what is new
#[tokio::test]
async fn test_new_event_detection() {
    let store = Arc::new(InMemoryEventStore::new());
    let admin = session_as(ADMIN, store.clone()).await;
    let bob = session_as(BOB, store.clone()).await;

    admin
        .submit(form("Welcome party", date(2030, 9, 1), EventType::ClubMeetup, false))
        .await
        .unwrap();
    bob.refresh().await.unwrap();
    assert!(bob.check_new_events().await.unwrap().is_empty());

    let added = admin
        .submit(form("Career fair", date(2030, 9, 10), EventType::Notice, false))
        .await
        .unwrap();
    let mut notices = bob.subscribe();
    bob.refresh().await.unwrap();
    let new_events = bob.check_new_events().await.unwrap();
    assert_eq!(ids(&new_events), vec![added.id.clone()]);
    match notices.recv().await.unwrap() {
        Notice::NewEvents(events) => assert_eq!(ids(&events), vec![added.id]),
        other => panic!("unexpected notice: {:?}", other),
    }

    assert!(bob.check_new_events().await.unwrap().is_empty());
}

/// The upcoming list is limited and ordered by start
#[tokio::test]
async fn test_upcoming_is_limited() {
    let store = Arc::new(InMemoryEventStore::new());
    let mut config = test_config(ADMIN);
    config.upcoming_limit = 3;
    let admin = session(config, store.clone()).await;

    for day in (10..15).rev() {
        admin
            .submit(form(&format!("Lecture {}", day), date(2030, 3, day), EventType::Notice, false))
            .await
            .unwrap();
    }

    let now = Utc.with_ymd_and_hms(2030, 3, 11, 0, 0, 0).unwrap();
    let upcoming = admin.upcoming(now).await.unwrap();
    let titles: Vec<_> = upcoming.iter().map(|e| e.title.as_str()).collect();
    assert_eq!(titles, vec!["Lecture 11", "Lecture 12", "Lecture 13"]);
}

/// The daily digest lists the day's events and is published
#[tokio::test]
async fn test_daily_digest() {
    let store = Arc::new(InMemoryEventStore::new());
    let admin = session_as(ADMIN, store.clone()).await;

    admin
        .submit(form("Graduation", date(2030, 6, 7), EventType::Holiday, false))
        .await
        .unwrap();

    let mut notices = admin.subscribe();
    let events = admin.daily_digest(date(2030, 6, 7)).await.unwrap();
    assert_eq!(events.len(), 1);
    match notices.recv().await.unwrap() {
        Notice::DailyDigest { date: day, events } => {
            assert_eq!(day, date(2030, 6, 7));
            assert_eq!(events.len(), 1);
        }
        other => panic!("unexpected notice: {:?}", other),
    }

    assert!(admin.daily_digest(date(2030, 6, 8)).await.unwrap().is_empty());
}
