mod actor;
pub mod approval;
mod cache;
mod handle;
pub mod models;
pub mod notifications;
pub mod recurrence;
pub mod rest;
mod scheduler;
pub mod store;
pub mod submission;
mod time;
pub mod visibility;

pub use actor::SyncReport;
pub use handle::CalendarHandle;
pub use models::{CalendarEvent, EventCategory, EventType, NewEvent, Role, Viewer};
pub use scheduler::{refresh_cycle, CalendarScheduler};
pub use store::{EventStore, InMemoryEventStore};

use crate::config::Config;
use crate::error::CalendarResult;
use crate::utils::scheduler::Scheduler;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

use super::redis_service::RedisActorHandle;

/// Calendar component for one signed-in session
pub struct Calendar {
    store: Arc<dyn EventStore>,
    handle: RwLock<Option<CalendarHandle>>,
    scheduler: RwLock<Option<CalendarScheduler>>,
}

impl Calendar {
    /// Create a new calendar component backed by `store`
    pub fn new(store: Arc<dyn EventStore>) -> Self {
        Self {
            store,
            handle: RwLock::new(None),
            scheduler: RwLock::new(None),
        }
    }

    /// Get the handle if it exists
    pub async fn get_handle(&self) -> Option<CalendarHandle> {
        let handle_lock = self.handle.read().await;
        handle_lock.clone()
    }
}

#[async_trait]
impl super::Component for Calendar {
    fn name(&self) -> &'static str {
        "calendar"
    }

    async fn init(
        &self,
        config: Arc<RwLock<Config>>,
        redis_handle: RedisActorHandle,
    ) -> CalendarResult<()> {
        // Create a new handle if one doesn't exist
        let handle = {
            let mut handle_lock = self.handle.write().await;
            match &*handle_lock {
                Some(handle) => handle.clone(),
                None => {
                    let handle = CalendarHandle::new(
                        Arc::clone(&config),
                        Arc::clone(&self.store),
                        redis_handle,
                    )
                    .await?;
                    *handle_lock = Some(handle.clone());
                    handle
                }
            }
        };

        // Initial load; the first new-event check only records what is there
        let tz = config.read().await.tz()?;
        refresh_cycle(&handle, &tz).await;

        let mut scheduler_lock = self.scheduler.write().await;
        if scheduler_lock.is_none() {
            *scheduler_lock = Some(CalendarScheduler::start(config, handle).await?);
        }

        Ok(())
    }

    async fn shutdown(&self) -> CalendarResult<()> {
        if let Some(scheduler) = self.scheduler.write().await.take() {
            scheduler.stop().await?;
        }

        // Shutdown the handle if it exists
        let handle_lock = self.handle.read().await;
        if let Some(handle) = &*handle_lock {
            handle.shutdown().await?;
        }
        Ok(())
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}
