#![allow(dead_code)]

use async_trait::async_trait;
use campus_calendar::components::calendar::recurrence::RecurringSeries;
use campus_calendar::components::calendar::submission::EventForm;
use campus_calendar::components::calendar::{
    CalendarEvent, CalendarHandle, EventStore, EventType, InMemoryEventStore, NewEvent, Viewer,
};
use campus_calendar::components::redis_service::RedisActorHandle;
use campus_calendar::config::{Config, DEFAULT_REDIS_URL};
use campus_calendar::error::{store_error, CalendarResult};
use chrono::NaiveDate;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

pub const ADMIN: &str = "admin";
pub const ALICE: &str = "alice";
pub const BOB: &str = "bob";

/// Config for a session signed in as `username`; `admin` is the only admin
pub fn test_config(username: &str) -> Config {
    let mut components = HashMap::new();
    components.insert("calendar".to_string(), true);

    Config {
        store_url: "http://localhost:54321".to_string(),
        store_api_key: "test-api-key".to_string(),
        session_token: String::new(),
        session_user_id: format!("{}-id", username),
        session_username: username.to_string(),
        admin_usernames: vec![ADMIN.to_string()],
        components,
        series: Vec::new(),
        timezone: "Europe/Helsinki".to_string(),
        redis_url: DEFAULT_REDIS_URL.to_string(),
        refresh_interval: 300,
        daily_digest_time: "07:00".to_string(),
        upcoming_limit: 10,
        request_timeout: 30,
        locale: "en".to_string(),
    }
}

/// Start a calendar session against a shared store, without Redis
pub async fn session(config: Config, store: Arc<dyn EventStore>) -> CalendarHandle {
    CalendarHandle::new(
        Arc::new(RwLock::new(config)),
        store,
        RedisActorHandle::empty(),
    )
    .await
    .unwrap()
}

pub async fn session_as(username: &str, store: Arc<dyn EventStore>) -> CalendarHandle {
    session(test_config(username), store).await
}

pub fn codechef_series(persist: bool) -> RecurringSeries {
    RecurringSeries {
        persist,
        ..RecurringSeries::codechef()
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// A filled-in form for an evening event on `day`
pub fn form(title: &str, day: NaiveDate, event_type: EventType, is_private: bool) -> EventForm {
    EventForm {
        title: title.to_string(),
        description: Some(format!("{} description", title)),
        date: Some(day),
        start_time: "18:00".to_string(),
        end_time: "20:00".to_string(),
        event_type,
        is_private,
    }
}

pub fn ids(events: &[CalendarEvent]) -> Vec<String> {
    events.iter().map(|e| e.id.clone()).collect()
}

/// Store that can be switched into failing every request
#[derive(Clone, Default)]
pub struct FlakyStore {
    inner: InMemoryEventStore,
    failing: Arc<AtomicBool>,
}

impl FlakyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub async fn all_events(&self) -> Vec<CalendarEvent> {
        self.inner.all_events().await
    }

    fn check(&self) -> CalendarResult<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(store_error("connection reset by peer"));
        }
        Ok(())
    }
}

#[async_trait]
impl EventStore for FlakyStore {
    async fn list_visible_events(&self, viewer: &Viewer) -> CalendarResult<Vec<CalendarEvent>> {
        self.check()?;
        self.inner.list_visible_events(viewer).await
    }

    async fn create_event(&self, viewer: &Viewer, event: NewEvent) -> CalendarResult<String> {
        self.check()?;
        self.inner.create_event(viewer, event).await
    }

    async fn approve_event(&self, viewer: &Viewer, id: &str) -> CalendarResult<bool> {
        self.check()?;
        self.inner.approve_event(viewer, id).await
    }

    async fn delete_event(&self, viewer: &Viewer, id: &str) -> CalendarResult<bool> {
        self.check()?;
        self.inner.delete_event(viewer, id).await
    }
}
