use chrono::Utc;
use chrono_tz::Tz;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tokio::sync::{watch, Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{sleep, Duration as TokioDuration};
use tracing::{error, info, warn};

use super::handle::CalendarHandle;
use crate::config::Config;
use crate::error::CalendarResult;
use crate::utils::scheduler::Scheduler;
use crate::utils::time::{calculate_wait_duration, next_daily_time};

/// Background refresh and daily digest for a calendar session
pub struct CalendarScheduler {
    stop_tx: watch::Sender<bool>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl Scheduler for CalendarScheduler {
    type Handle = CalendarHandle;

    fn start(
        config: Arc<RwLock<Config>>,
        handle: CalendarHandle,
    ) -> Pin<Box<dyn Future<Output = CalendarResult<Self>> + Send>> {
        Box::pin(async move {
            let (stop_tx, stop_rx) = watch::channel(false);

            let (tz, refresh_interval, digest_time) = {
                let config_read = config.read().await;
                (
                    config_read.tz()?,
                    config_read.refresh_interval,
                    config_read.daily_digest_time.clone(),
                )
            };

            info!("Starting calendar scheduler");

            let refresh_handle = handle.clone();
            let refresh_stop = stop_rx.clone();
            let tasks = vec![
                tokio::spawn(async move {
                    run_refresh_loop(refresh_handle, tz, refresh_interval, refresh_stop).await;
                }),
                tokio::spawn(async move {
                    run_digest_loop(handle, tz, digest_time, stop_rx).await;
                }),
            ];

            Ok(Self {
                stop_tx,
                tasks: Mutex::new(tasks),
            })
        })
    }

    fn stop(&self) -> Pin<Box<dyn Future<Output = CalendarResult<()>> + Send + '_>> {
        Box::pin(async move {
            let _ = self.stop_tx.send(true);

            let mut tasks = self.tasks.lock().await;
            if tasks.is_empty() {
                return Ok(());
            }
            for task in tasks.drain(..) {
                if let Err(e) = task.await {
                    error!("Calendar scheduler task failed: {}", e);
                }
            }
            info!("Calendar scheduler stopped");
            Ok(())
        })
    }
}

/// Wait for `seconds` or until a stop is requested. Returns false on stop.
async fn wait_or_stop(seconds: u64, stop_rx: &mut watch::Receiver<bool>) -> bool {
    tokio::select! {
        _ = sleep(TokioDuration::from_secs(seconds)) => {}
        _ = stop_rx.changed() => return false,
    }
    !*stop_rx.borrow()
}

/// One refresh pass: store fetch, local recurring entries, new-event check.
///
/// Local entries are generated even when the store is unreachable; the
/// new-event check waits for a successful fetch.
pub async fn refresh_cycle(handle: &CalendarHandle, tz: &Tz) {
    let today = Utc::now().with_timezone(tz).date_naive();

    let refreshed = match handle.refresh().await {
        Ok(_) => true,
        Err(e) => {
            error!("Failed to refresh events: {}", e);
            false
        }
    };
    if let Err(e) = handle.generate_recurring(today).await {
        error!("Failed to generate recurring entries: {}", e);
    }
    if !refreshed {
        return;
    }
    if let Err(e) = handle.check_new_events().await {
        error!("Failed to check for new events: {}", e);
    }
}

async fn run_refresh_loop(
    handle: CalendarHandle,
    tz: Tz,
    interval: u64,
    mut stop_rx: watch::Receiver<bool>,
) {
    while wait_or_stop(interval, &mut stop_rx).await {
        refresh_cycle(&handle, &tz).await;
    }
}

async fn run_digest_loop(
    handle: CalendarHandle,
    tz: Tz,
    digest_time: String,
    mut stop_rx: watch::Receiver<bool>,
) {
    loop {
        let now = Utc::now().with_timezone(&tz);

        let Some(next_time) = next_daily_time(&now, &digest_time) else {
            error!("Error calculating next digest time from '{}'", digest_time);
            if !wait_or_stop(3600, &mut stop_rx).await {
                break;
            }
            continue;
        };

        info!("Next daily digest scheduled for {}", next_time);

        let wait_seconds = calculate_wait_duration(&now, &next_time);
        if !wait_or_stop(wait_seconds as u64, &mut stop_rx).await {
            break;
        }

        let today = Utc::now().with_timezone(&tz).date_naive();
        match handle.sync_recurring(today).await {
            Ok(report) if report.failed > 0 => {
                warn!(
                    "Recurring sync added {} entries, {} failed",
                    report.added, report.failed
                );
            }
            Ok(_) => {}
            Err(e) => error!("Failed to sync recurring entries: {}", e),
        }

        if let Err(e) = handle.daily_digest(today).await {
            error!("Failed to send daily digest: {}", e);
        }
    }
}
