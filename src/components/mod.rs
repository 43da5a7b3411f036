use crate::components::redis_service::RedisActorHandle;
use crate::config::Config;
use crate::error::CalendarResult;
use async_trait::async_trait;
use std::any::Any;
use std::fmt;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;

// Export components
pub mod calendar;
pub mod redis_service;

// Re-export the calendar handle
pub use calendar::CalendarHandle;

/// Component trait that all components must implement
#[async_trait]
pub trait Component: Send + Sync + Any {
    /// Get the name of the component
    fn name(&self) -> &'static str;

    /// Initialize the component
    async fn init(
        &self,
        config: Arc<RwLock<Config>>,
        redis_handle: RedisActorHandle,
    ) -> CalendarResult<()>;

    /// Shutdown the component
    async fn shutdown(&self) -> CalendarResult<()>;

    /// Convert to Any for downcasting
    fn as_any(&self) -> &dyn Any;
}

/// Manager for all components
pub struct ComponentManager {
    components: Vec<Box<dyn Component>>,
    config: Arc<RwLock<Config>>,
}

impl fmt::Debug for ComponentManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentManager")
            .field("component_count", &self.components.len())
            .field("config", &self.config)
            .finish()
    }
}

impl ComponentManager {
    /// Create a new component manager
    pub fn new(config: Arc<RwLock<Config>>) -> Self {
        Self {
            components: Vec::new(),
            config,
        }
    }

    /// Register a component if it is enabled in the config
    pub async fn register<T: Component + 'static>(&mut self, component: T) {
        let enabled = self.config.read().await.is_component_enabled(component.name());
        if !enabled {
            info!("Component {} is disabled, skipping", component.name());
            return;
        }
        info!("Registering component: {}", component.name());
        self.components.push(Box::new(component));
    }

    /// Names of the registered components, in registration order
    pub fn component_names(&self) -> Vec<&'static str> {
        self.components.iter().map(|c| c.name()).collect()
    }

    /// Initialize all registered components
    pub async fn init_all(&self, redis_handle: RedisActorHandle) -> CalendarResult<()> {
        for component in &self.components {
            info!("Initializing component: {}", component.name());

            if let Err(e) = component
                .init(Arc::clone(&self.config), redis_handle.clone())
                .await
            {
                // Log error but continue with other components
                tracing::error!("Error initializing component {}: {:?}", component.name(), e);
            }
        }

        Ok(())
    }

    /// Shutdown all components
    pub async fn shutdown_all(&self) -> CalendarResult<()> {
        info!("Shutting down all components");

        for component in &self.components {
            info!("Shutting down component: {}", component.name());

            if let Err(e) = component.shutdown().await {
                // Log error but continue with other components
                tracing::error!(
                    "Error shutting down component {}: {:?}",
                    component.name(),
                    e
                );
            }
        }

        Ok(())
    }

    /// Get a component by name
    pub fn get_component_by_name(&self, name: &str) -> Option<&dyn Component> {
        self.components
            .iter()
            .find(|c| c.name() == name)
            .map(|c| c.as_ref())
    }

    /// The calendar handle, once the calendar component is initialized
    pub async fn calendar_handle(&self) -> Option<CalendarHandle> {
        let component = self.get_component_by_name("calendar")?;
        let calendar = component.as_any().downcast_ref::<calendar::Calendar>()?;
        calendar.get_handle().await
    }
}
