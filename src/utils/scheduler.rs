use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::config::Config;
use crate::error::CalendarResult;

/// Trait for component schedulers that run periodic work
pub trait Scheduler: Send + Sync + Sized + 'static {
    /// The type of handle used by this scheduler
    type Handle: Clone + Send + Sync + 'static;

    /// Start the scheduler's background tasks
    fn start(
        config: Arc<RwLock<Config>>,
        handle: Self::Handle,
    ) -> Pin<Box<dyn Future<Output = CalendarResult<Self>> + Send>>;

    /// Stop the scheduler gracefully
    fn stop(&self) -> Pin<Box<dyn Future<Output = CalendarResult<()>> + Send + '_>>;
}
