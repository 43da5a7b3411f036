use crate::config::Config;
use crate::error::{component_error, CalendarResult};
use redis::aio::MultiplexedConnection;
use redis::{AsyncCommands, Client as RedisClient};
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};
use tracing::info;

// Redis key constants
pub mod keys {
    pub const SEEN_EVENTS_PREFIX: &str = "calendar:seen:";

    /// Key holding the event ids a viewer has already been told about
    pub fn seen_events(viewer_id: &str) -> String {
        format!("{}{}", SEEN_EVENTS_PREFIX, viewer_id)
    }
}

/// The Redis actor that processes messages
pub struct RedisActor {
    config: Arc<RwLock<Config>>,
    connection: Option<MultiplexedConnection>,
    command_rx: mpsc::Receiver<RedisCommand>,
}

/// Commands that can be sent to the Redis actor
pub enum RedisCommand {
    SaveSeenEvents(String, Vec<String>, mpsc::Sender<CalendarResult<()>>),
    GetSeenEvents(String, mpsc::Sender<CalendarResult<Option<Vec<String>>>>),
    Shutdown,
}

/// Handle for communicating with the Redis actor
#[derive(Clone)]
pub struct RedisActorHandle {
    command_tx: mpsc::Sender<RedisCommand>,
}

impl RedisActorHandle {
    /// Create a handle with no actor behind it; every request fails
    pub fn empty() -> Self {
        let (command_tx, _) = mpsc::channel(32);
        Self { command_tx }
    }

    /// Remember which event ids a viewer has seen
    pub async fn save_seen_events(&self, viewer_id: &str, ids: Vec<String>) -> CalendarResult<()> {
        let (response_tx, mut response_rx) = mpsc::channel(1);
        self.command_tx
            .send(RedisCommand::SaveSeenEvents(viewer_id.to_string(), ids, response_tx))
            .await
            .map_err(|e| component_error(&format!("Actor mailbox error: {}", e)))?;

        response_rx
            .recv()
            .await
            .ok_or_else(|| component_error("Response channel closed"))?
    }

    /// Event ids a viewer has seen, if any were saved
    pub async fn get_seen_events(&self, viewer_id: &str) -> CalendarResult<Option<Vec<String>>> {
        let (response_tx, mut response_rx) = mpsc::channel(1);
        self.command_tx
            .send(RedisCommand::GetSeenEvents(viewer_id.to_string(), response_tx))
            .await
            .map_err(|e| component_error(&format!("Actor mailbox error: {}", e)))?;

        response_rx
            .recv()
            .await
            .ok_or_else(|| component_error("Response channel closed"))?
    }

    /// Shutdown the actor
    pub async fn shutdown(&self) -> CalendarResult<()> {
        let _ = self.command_tx.send(RedisCommand::Shutdown).await;
        Ok(())
    }
}

impl RedisActor {
    /// Create a new actor and return its handle
    pub fn new(config: Arc<RwLock<Config>>) -> (Self, RedisActorHandle) {
        let (command_tx, command_rx) = mpsc::channel(32);

        let actor = Self {
            config,
            connection: None,
            command_rx,
        };

        let handle = RedisActorHandle { command_tx };

        (actor, handle)
    }

    /// Start the actor's processing loop
    pub async fn run(&mut self) {
        info!("Redis actor started");

        // Process commands
        while let Some(cmd) = self.command_rx.recv().await {
            match cmd {
                RedisCommand::SaveSeenEvents(viewer_id, ids, response_tx) => {
                    let result = self.save_seen_events(&viewer_id, ids).await;
                    let _ = response_tx.send(result).await;
                }
                RedisCommand::GetSeenEvents(viewer_id, response_tx) => {
                    let result = self.get_seen_events(&viewer_id).await;
                    let _ = response_tx.send(result).await;
                }
                RedisCommand::Shutdown => {
                    info!("Redis actor shutting down");
                    break;
                }
            }
        }

        info!("Redis actor shut down");
    }

    /// Get a redis connection, connecting on first use
    async fn connection(&mut self) -> CalendarResult<MultiplexedConnection> {
        if let Some(connection) = &self.connection {
            return Ok(connection.clone());
        }

        let redis_url = {
            let config_guard = self.config.read().await;
            config_guard.redis_url.clone()
        };

        let client = RedisClient::open(redis_url)
            .map_err(|e| component_error(&format!("Failed to create Redis client: {}", e)))?;
        let connection = client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| component_error(&format!("Failed to connect to Redis: {}", e)))?;

        self.connection = Some(connection.clone());
        Ok(connection)
    }

    /// Save seen ids to Redis
    async fn save_seen_events(&mut self, viewer_id: &str, ids: Vec<String>) -> CalendarResult<()> {
        let mut redis_conn = self.connection().await?;

        let ids_json = serde_json::to_string(&ids)?;

        () = redis_conn
            .set(keys::seen_events(viewer_id), ids_json)
            .await
            .map_err(|e| component_error(&format!("Failed to save seen events to Redis: {}", e)))?;

        Ok(())
    }

    /// Get seen ids from Redis
    async fn get_seen_events(&mut self, viewer_id: &str) -> CalendarResult<Option<Vec<String>>> {
        let mut redis_conn = self.connection().await?;

        let ids_json: Option<String> = redis_conn
            .get(keys::seen_events(viewer_id))
            .await
            .map_err(|e| component_error(&format!("Failed to read seen events from Redis: {}", e)))?;

        match ids_json {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }
}
