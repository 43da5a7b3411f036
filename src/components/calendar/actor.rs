use super::approval::{self, Transition};
use super::cache::EventCache;
use super::models::{CalendarEvent, Viewer};
use super::notifications::{publish, Notice};
use super::recurrence::{self, RecurringSeries};
use super::store::EventStore;
use super::submission::{EventForm, Submission, SubmissionOutcome};
use super::visibility;
use crate::components::redis_service::RedisActorHandle;
use crate::config::Config;
use crate::error::{component_error, not_found_error, CalendarResult};
use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};
use tracing::{info, warn};

/// Result of writing a persisted recurring series to the store
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub added: usize,
    pub failed: usize,
}

/// The calendar actor that owns the session's event cache
pub struct CalendarActor {
    store: Arc<dyn EventStore>,
    viewer: Viewer,
    tz: Tz,
    series: Vec<RecurringSeries>,
    upcoming_limit: usize,
    cache: EventCache,
    seen: Option<HashSet<String>>,
    notices: broadcast::Sender<Notice>,
    redis_handle: RedisActorHandle,
    command_rx: mpsc::Receiver<CalendarCommand>,
}

type Reply<T> = mpsc::Sender<CalendarResult<T>>;

/// Commands that can be sent to the calendar actor
pub enum CalendarCommand {
    Refresh(Reply<usize>),
    Events(Reply<Vec<CalendarEvent>>),
    Upcoming(DateTime<Utc>, Reply<Vec<CalendarEvent>>),
    MonthGrid(i32, u32, Reply<BTreeMap<NaiveDate, Vec<CalendarEvent>>>),
    Day(NaiveDate, Reply<Vec<CalendarEvent>>),
    ModerationQueue(Reply<Vec<CalendarEvent>>),
    Submit(EventForm, Reply<Submission>),
    Approve(String, Reply<Transition>),
    Delete(String, Reply<Transition>),
    GenerateRecurring(NaiveDate, Reply<usize>),
    SyncRecurring(NaiveDate, Reply<SyncReport>),
    CheckNewEvents(Reply<Vec<CalendarEvent>>),
    DailyDigest(NaiveDate, Reply<Vec<CalendarEvent>>),
    Shutdown,
}

/// Handle for communicating with the calendar actor
#[derive(Clone)]
pub struct CalendarActorHandle {
    command_tx: mpsc::Sender<CalendarCommand>,
}

impl CalendarActorHandle {
    async fn request<T>(
        &self,
        command: impl FnOnce(Reply<T>) -> CalendarCommand,
    ) -> CalendarResult<T> {
        let (response_tx, mut response_rx) = mpsc::channel(1);
        self.command_tx
            .send(command(response_tx))
            .await
            .map_err(|e| component_error(&format!("Actor mailbox error: {}", e)))?;

        response_rx
            .recv()
            .await
            .ok_or_else(|| component_error("Response channel closed"))?
    }

    pub async fn refresh(&self) -> CalendarResult<usize> {
        self.request(CalendarCommand::Refresh).await
    }

    pub async fn events(&self) -> CalendarResult<Vec<CalendarEvent>> {
        self.request(CalendarCommand::Events).await
    }

    pub async fn upcoming(&self, now: DateTime<Utc>) -> CalendarResult<Vec<CalendarEvent>> {
        self.request(|tx| CalendarCommand::Upcoming(now, tx)).await
    }

    pub async fn month_grid(
        &self,
        year: i32,
        month: u32,
    ) -> CalendarResult<BTreeMap<NaiveDate, Vec<CalendarEvent>>> {
        self.request(|tx| CalendarCommand::MonthGrid(year, month, tx)).await
    }

    pub async fn day(&self, date: NaiveDate) -> CalendarResult<Vec<CalendarEvent>> {
        self.request(|tx| CalendarCommand::Day(date, tx)).await
    }

    pub async fn moderation_queue(&self) -> CalendarResult<Vec<CalendarEvent>> {
        self.request(CalendarCommand::ModerationQueue).await
    }

    pub async fn submit(&self, form: EventForm) -> CalendarResult<Submission> {
        self.request(|tx| CalendarCommand::Submit(form, tx)).await
    }

    pub async fn approve(&self, id: impl Into<String>) -> CalendarResult<Transition> {
        let id = id.into();
        self.request(|tx| CalendarCommand::Approve(id, tx)).await
    }

    pub async fn delete(&self, id: impl Into<String>) -> CalendarResult<Transition> {
        let id = id.into();
        self.request(|tx| CalendarCommand::Delete(id, tx)).await
    }

    pub async fn generate_recurring(&self, today: NaiveDate) -> CalendarResult<usize> {
        self.request(|tx| CalendarCommand::GenerateRecurring(today, tx)).await
    }

    pub async fn sync_recurring(&self, today: NaiveDate) -> CalendarResult<SyncReport> {
        self.request(|tx| CalendarCommand::SyncRecurring(today, tx)).await
    }

    pub async fn check_new_events(&self) -> CalendarResult<Vec<CalendarEvent>> {
        self.request(CalendarCommand::CheckNewEvents).await
    }

    pub async fn daily_digest(&self, date: NaiveDate) -> CalendarResult<Vec<CalendarEvent>> {
        self.request(|tx| CalendarCommand::DailyDigest(date, tx)).await
    }

    /// Shutdown the actor
    pub async fn shutdown(&self) -> CalendarResult<()> {
        let _ = self.command_tx.send(CalendarCommand::Shutdown).await;
        Ok(())
    }
}

impl CalendarActor {
    /// Create a new actor and return its handle
    pub fn new(
        config: &Config,
        store: Arc<dyn EventStore>,
        redis_handle: RedisActorHandle,
        notices: broadcast::Sender<Notice>,
    ) -> CalendarResult<(Self, CalendarActorHandle)> {
        let (command_tx, command_rx) = mpsc::channel(32);

        let actor = Self {
            store,
            viewer: config.viewer(),
            tz: config.tz()?,
            series: config.series.clone(),
            upcoming_limit: config.upcoming_limit,
            cache: EventCache::new(),
            seen: None,
            notices,
            redis_handle,
            command_rx,
        };

        let handle = CalendarActorHandle { command_tx };

        Ok((actor, handle))
    }

    /// Start the actor's processing loop
    pub async fn run(&mut self) {
        info!("Calendar actor started for {}", self.viewer.username);

        // Replies are dropped silently when the caller stopped waiting
        while let Some(cmd) = self.command_rx.recv().await {
            match cmd {
                CalendarCommand::Refresh(response_tx) => {
                    let result = self.refresh().await;
                    let _ = response_tx.send(result).await;
                }
                CalendarCommand::Events(response_tx) => {
                    let _ = response_tx.send(Ok(self.visible_events())).await;
                }
                CalendarCommand::Upcoming(now, response_tx) => {
                    let result = visibility::upcoming(
                        &self.cache.snapshot(),
                        &self.viewer,
                        now,
                        self.upcoming_limit,
                    );
                    let _ = response_tx.send(Ok(result)).await;
                }
                CalendarCommand::MonthGrid(year, month, response_tx) => {
                    let result = visibility::month_grid(
                        &self.cache.snapshot(),
                        &self.viewer,
                        year,
                        month,
                        &self.tz,
                    );
                    let _ = response_tx.send(Ok(result)).await;
                }
                CalendarCommand::Day(date, response_tx) => {
                    let result = self.events_on(date);
                    let _ = response_tx.send(Ok(result)).await;
                }
                CalendarCommand::ModerationQueue(response_tx) => {
                    let result = visibility::moderation_queue(&self.cache.snapshot(), &self.viewer);
                    let _ = response_tx.send(Ok(result)).await;
                }
                CalendarCommand::Submit(form, response_tx) => {
                    let result = self.submit(form).await;
                    let _ = response_tx.send(result).await;
                }
                CalendarCommand::Approve(id, response_tx) => {
                    let result = self.approve(&id).await;
                    let _ = response_tx.send(result).await;
                }
                CalendarCommand::Delete(id, response_tx) => {
                    let result = self.delete(&id).await;
                    let _ = response_tx.send(result).await;
                }
                CalendarCommand::GenerateRecurring(today, response_tx) => {
                    let result = self.generate_recurring(today);
                    let _ = response_tx.send(result).await;
                }
                CalendarCommand::SyncRecurring(today, response_tx) => {
                    let result = self.sync_recurring(today).await;
                    let _ = response_tx.send(result).await;
                }
                CalendarCommand::CheckNewEvents(response_tx) => {
                    let result = self.check_new_events().await;
                    let _ = response_tx.send(Ok(result)).await;
                }
                CalendarCommand::DailyDigest(date, response_tx) => {
                    let events = self.events_on(date);
                    publish(
                        &self.notices,
                        Notice::DailyDigest {
                            date,
                            events: events.clone(),
                        },
                        &self.tz,
                    );
                    let _ = response_tx.send(Ok(events)).await;
                }
                CalendarCommand::Shutdown => {
                    info!("Calendar actor shutting down");
                    break;
                }
            }
        }

        info!("Calendar actor shut down");
    }

    fn visible_events(&self) -> Vec<CalendarEvent> {
        visibility::filter_visible(&self.cache.snapshot(), &self.viewer)
    }

    fn events_on(&self, date: NaiveDate) -> Vec<CalendarEvent> {
        visibility::events_on_day(&self.cache.snapshot(), &self.viewer, date, &self.tz)
    }

    /// Replace the persisted part of the cache with the store's view
    async fn refresh(&mut self) -> CalendarResult<usize> {
        let fetched = self.store.list_visible_events(&self.viewer).await?;
        let fetched_count = fetched.len();
        let added = self.cache.replace_persisted(fetched);
        info!(
            "Fetched {} events ({} new, {} cached)",
            fetched_count,
            added,
            self.cache.len()
        );
        Ok(added)
    }

    /// Refresh after a failure that may mean the cache is stale
    async fn refresh_quietly(&mut self) {
        if let Err(e) = self.refresh().await {
            warn!("Failed to refresh events: {}", e);
        }
    }

    /// Merge the local recurring series into the cache
    fn generate_recurring(&mut self, today: NaiveDate) -> CalendarResult<usize> {
        let mut added = 0;
        for series in self.series.iter().filter(|s| !s.persist) {
            let generated = recurrence::generate(series, today, &self.tz, &self.cache.snapshot())?;
            added += self.cache.merge_all(generated);
        }
        if added > 0 {
            info!("Added {} recurring entries", added);
        }
        Ok(added)
    }

    /// Write missing entries of persisted series to the store.
    ///
    /// Every write stands on its own; a failed one is counted and the rest
    /// still go through.
    async fn sync_recurring(&mut self, today: NaiveDate) -> CalendarResult<SyncReport> {
        let mut report = SyncReport::default();
        if !self.series.iter().any(|s| s.persist) {
            return Ok(report);
        }

        self.refresh().await?;
        let known = self.cache.snapshot();

        for series in self.series.iter().filter(|s| s.persist) {
            for entry in recurrence::plan_persisted(series, today, &self.tz, &known)? {
                let start = entry.start;
                match self.store.create_event(&self.viewer, entry).await {
                    Ok(_) => report.added += 1,
                    Err(e) => {
                        warn!("Failed to add {} entry for {}: {}", series.tag, start, e);
                        report.failed += 1;
                    }
                }
            }
        }

        if report.added > 0 {
            info!("Added {} new recurring entries", report.added);
            self.refresh_quietly().await;
        }
        Ok(report)
    }

    async fn submit(&mut self, form: EventForm) -> CalendarResult<Submission> {
        let event = form.validate(&self.tz)?;
        let outcome = SubmissionOutcome::for_submission(&self.viewer, &event);

        let id = self.store.create_event(&self.viewer, event.clone()).await?;
        self.cache.merge(event.into_event(id.clone(), &self.viewer));
        info!("Submitted event {} ({:?})", id, outcome);

        self.refresh_quietly().await;
        Ok(Submission { id, outcome })
    }

    async fn approve(&mut self, id: &str) -> CalendarResult<Transition> {
        let event = self.cache.get(id).cloned().ok_or_else(|| not_found_error(id))?;

        match approval::approve(self.store.as_ref(), &self.viewer, &event).await {
            Ok(Transition::Approved) => {
                let approved = CalendarEvent {
                    approved: true,
                    ..event
                };
                self.cache.merge(approved.clone());
                publish(&self.notices, Notice::Approved(approved), &self.tz);
                Ok(Transition::Approved)
            }
            Ok(Transition::Unchanged) if !event.approved => {
                // Approved elsewhere; pick up the store's state
                self.refresh_quietly().await;
                Ok(Transition::Unchanged)
            }
            Ok(transition) => Ok(transition),
            Err(e) => {
                if e.should_refresh() {
                    self.refresh_quietly().await;
                }
                Err(e)
            }
        }
    }

    async fn delete(&mut self, id: &str) -> CalendarResult<Transition> {
        let event = self.cache.get(id).cloned().ok_or_else(|| not_found_error(id))?;

        match approval::delete(self.store.as_ref(), &self.viewer, &event).await {
            Ok(transition) => {
                self.cache.remove(id);
                Ok(transition)
            }
            Err(e) => {
                if e.should_refresh() {
                    self.refresh_quietly().await;
                }
                Err(e)
            }
        }
    }

    /// Visible stored events the viewer has not been told about yet.
    ///
    /// The first check of a viewer with no saved snapshot only records what
    /// is there.
    async fn check_new_events(&mut self) -> Vec<CalendarEvent> {
        let current: Vec<CalendarEvent> = self
            .visible_events()
            .into_iter()
            .filter(|event| !event.is_synthesized())
            .collect();
        let current_ids: HashSet<String> = current.iter().map(|e| e.id.clone()).collect();

        if self.seen.is_none() {
            match self.redis_handle.get_seen_events(&self.viewer.id).await {
                Ok(saved) => self.seen = saved.map(|ids| ids.into_iter().collect()),
                Err(e) => warn!("Could not load seen events: {}", e),
            }
        }

        let new_events: Vec<CalendarEvent> = match &self.seen {
            Some(seen) => current
                .into_iter()
                .filter(|event| !seen.contains(&event.id))
                .collect(),
            None => Vec::new(),
        };

        let mut ids: Vec<String> = current_ids.iter().cloned().collect();
        ids.sort();
        if let Err(e) = self.redis_handle.save_seen_events(&self.viewer.id, ids).await {
            warn!("Could not save seen events: {}", e);
        }
        self.seen = Some(current_ids);

        if !new_events.is_empty() {
            publish(&self.notices, Notice::NewEvents(new_events.clone()), &self.tz);
        }
        new_events
    }
}
