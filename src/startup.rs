use crate::components::calendar::rest::RestEventStore;
use crate::components::calendar::Calendar;
use crate::components::redis_service::RedisActor;
use crate::components::ComponentManager;
use crate::config::Config;
use crate::error::Error;
use crate::shutdown;
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::{oneshot, RwLock};
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Initialize logging with environment-based configuration
pub fn init_logging() -> miette::Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,reqwest=warn,hyper=warn")),
        )
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| Error::Other(format!("Failed to set up logging: {}", e)))?;

    Ok(())
}

/// Load and initialize the application config
pub async fn load_config() -> miette::Result<Arc<RwLock<Config>>> {
    match Config::load() {
        Ok(config) => Ok(Arc::new(RwLock::new(config))),
        Err(e) => {
            error!("Failed to load configuration: {:?}", e);
            Err(e.into())
        }
    }
}

/// Start the calendar session and run until a shutdown signal arrives
pub async fn start_service(config: Arc<RwLock<Config>>) -> miette::Result<()> {
    // Set locale from config
    let store = {
        let config_read = config.read().await;
        rust_i18n::set_locale(&config_read.locale);
        info!("Setting locale to {}", config_read.locale);
        info!(
            "Signed in as {} ({:?})",
            config_read.session_username,
            config_read.viewer().role
        );
        RestEventStore::new(&config_read)?
    };

    // Initialize Redis service
    let (mut redis_actor, redis_handle) = RedisActor::new(Arc::clone(&config));

    // Spawn Redis actor task
    tokio::spawn(async move {
        redis_actor.run().await;
    });

    // Initialize component manager
    let mut component_manager = ComponentManager::new(Arc::clone(&config));
    component_manager
        .register(Calendar::new(Arc::new(store)))
        .await;
    let component_manager = Arc::new(component_manager);

    // Create shutdown channel
    let (shutdown_send, shutdown_recv) = oneshot::channel();

    // Spawn signal handler task
    let shutdown_components = Arc::clone(&component_manager);
    let shutdown_redis = redis_handle.clone();
    tokio::spawn(async move {
        shutdown::handle_signals(shutdown_send, shutdown_components, shutdown_redis).await;
    });

    // Initialize components
    component_manager.init_all(redis_handle).await?;

    if let Some(handle) = component_manager.calendar_handle().await {
        match handle.upcoming(Utc::now()).await {
            Ok(events) => {
                info!("{} upcoming events", events.len());
                for event in events {
                    info!("  {} {} ({})", event.start, event.title, event.event_type);
                }
            }
            Err(e) => error!("Failed to list upcoming events: {}", e.user_message()),
        }
    }

    // Wait for the shutdown signal
    if shutdown_recv.await.is_err() {
        error!("Shutdown handler ended without a signal");
    }
    info!("Received shutdown signal, stopped");
    Ok(())
}
