use super::actor::{CalendarActor, CalendarActorHandle, SyncReport};
use super::approval::Transition;
use super::models::CalendarEvent;
use super::notifications::{Notice, NOTICE_CHANNEL_CAPACITY};
use super::store::EventStore;
use super::submission::{EventForm, Submission};
use crate::components::redis_service::RedisActorHandle;
use crate::config::Config;
use crate::error::CalendarResult;
use chrono::{DateTime, NaiveDate, Utc};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};
use tokio::task::JoinHandle;

/// Handle for interacting with a calendar session
#[derive(Clone)]
pub struct CalendarHandle {
    actor_handle: CalendarActorHandle,
    notices: broadcast::Sender<Notice>,
    _actor_task: Arc<JoinHandle<()>>,
}

impl CalendarHandle {
    /// Create a new CalendarHandle and spawn the actor
    pub async fn new(
        config: Arc<RwLock<Config>>,
        store: Arc<dyn EventStore>,
        redis_handle: RedisActorHandle,
    ) -> CalendarResult<Self> {
        let (notices, _) = broadcast::channel(NOTICE_CHANNEL_CAPACITY);

        let (mut actor, handle) = {
            let config_read = config.read().await;
            CalendarActor::new(&config_read, store, redis_handle, notices.clone())?
        };

        let actor_task = tokio::spawn(async move {
            actor.run().await;
        });

        Ok(Self {
            actor_handle: handle,
            notices,
            _actor_task: Arc::new(actor_task),
        })
    }

    /// Receive every notice published from now on
    pub fn subscribe(&self) -> broadcast::Receiver<Notice> {
        self.notices.subscribe()
    }

    /// Fetch the visible events from the store
    pub async fn refresh(&self) -> CalendarResult<usize> {
        self.actor_handle.refresh().await
    }

    /// All events the session may see, ordered by start
    pub async fn events(&self) -> CalendarResult<Vec<CalendarEvent>> {
        self.actor_handle.events().await
    }

    pub async fn upcoming(&self, now: DateTime<Utc>) -> CalendarResult<Vec<CalendarEvent>> {
        self.actor_handle.upcoming(now).await
    }

    pub async fn month_grid(
        &self,
        year: i32,
        month: u32,
    ) -> CalendarResult<BTreeMap<NaiveDate, Vec<CalendarEvent>>> {
        self.actor_handle.month_grid(year, month).await
    }

    /// Events on the selected day
    pub async fn day(&self, date: NaiveDate) -> CalendarResult<Vec<CalendarEvent>> {
        self.actor_handle.day(date).await
    }

    pub async fn moderation_queue(&self) -> CalendarResult<Vec<CalendarEvent>> {
        self.actor_handle.moderation_queue().await
    }

    /// Validate and submit a new event
    pub async fn submit(&self, form: EventForm) -> CalendarResult<Submission> {
        self.actor_handle.submit(form).await
    }

    pub async fn approve(&self, id: impl Into<String>) -> CalendarResult<Transition> {
        self.actor_handle.approve(id).await
    }

    pub async fn delete(&self, id: impl Into<String>) -> CalendarResult<Transition> {
        self.actor_handle.delete(id).await
    }

    /// Add the local recurring entries for the coming months
    pub async fn generate_recurring(&self, today: NaiveDate) -> CalendarResult<usize> {
        self.actor_handle.generate_recurring(today).await
    }

    /// Write the persisted recurring entries for the coming months
    pub async fn sync_recurring(&self, today: NaiveDate) -> CalendarResult<SyncReport> {
        self.actor_handle.sync_recurring(today).await
    }

    pub async fn check_new_events(&self) -> CalendarResult<Vec<CalendarEvent>> {
        self.actor_handle.check_new_events().await
    }

    pub async fn daily_digest(&self, date: NaiveDate) -> CalendarResult<Vec<CalendarEvent>> {
        self.actor_handle.daily_digest(date).await
    }

    /// Shutdown the actor
    pub async fn shutdown(&self) -> CalendarResult<()> {
        self.actor_handle.shutdown().await
    }
}
