use super::models::{CalendarEvent, EventType, NewEvent, Viewer};
use super::store::EventStore;
use crate::config::Config;
use crate::error::{
    authorization_error, config_error, not_found_error, store_error, validation_error,
    CalendarResult, Error,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// Row shape returned by `get_visible_calendar_events`
#[derive(Debug, Clone, Deserialize)]
pub struct EventRecord {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub start: String,
    pub end: String,
    pub category: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub approved: bool,
    pub is_private: bool,
    pub created_by: String,
    #[serde(default)]
    pub created_at: Option<String>,
}

impl TryFrom<EventRecord> for CalendarEvent {
    type Error = Error;

    fn try_from(record: EventRecord) -> Result<Self, Self::Error> {
        let event_type: EventType = record.event_type.parse()?;
        let category = event_type.category();
        if category.as_str() != record.category {
            warn!(
                "Event {} has category '{}' but type {} implies '{}'",
                record.id, record.category, event_type, category
            );
        }

        let start = parse_timestamp(&record.start)?;
        let end = parse_timestamp(&record.end)?;
        if end <= start {
            return Err(validation_error(&format!("Event {} ends before it starts", record.id)));
        }

        Ok(CalendarEvent {
            id: record.id,
            title: record.title,
            description: record.description,
            start,
            end,
            category,
            event_type,
            approved: record.approved,
            is_private: record.is_private,
            created_by: record.created_by,
        })
    }
}

fn parse_timestamp(value: &str) -> CalendarResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| validation_error(&format!("Invalid timestamp '{}': {}", value, e)))
}

/// Event store reached through the hosted backend's RPC endpoints
#[derive(Clone)]
pub struct RestEventStore {
    client: Client,
    base_url: Url,
    api_key: String,
    session_token: String,
}

impl RestEventStore {
    /// Create a store client from the service configuration
    pub fn new(config: &Config) -> CalendarResult<Self> {
        let mut base_url = Url::parse(&config.store_url)
            .map_err(|e| config_error(&format!("Invalid STORE_URL: {}", e)))?;
        // Keep the last path segment when joining endpoint names
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout))
            .build()
            .map_err(|e| config_error(&format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url,
            api_key: config.store_api_key.clone(),
            session_token: config.session_token.clone(),
        })
    }

    /// URL of an RPC function
    pub fn rpc_url(&self, function: &str) -> CalendarResult<Url> {
        self.base_url
            .join(&format!("rest/v1/rpc/{}", function))
            .map_err(|e| config_error(&format!("Failed to build URL: {}", e)))
    }

    async fn call_rpc<T: DeserializeOwned>(&self, function: &str, args: Value) -> CalendarResult<T> {
        let url = self.rpc_url(function)?;
        debug!("Calling {}", url);

        let bearer = if self.session_token.is_empty() {
            &self.api_key
        } else {
            &self.session_token
        };

        let response = self
            .client
            .post(url)
            .header("apikey", &self.api_key)
            .bearer_auth(bearer)
            .json(&args)
            .send()
            .await
            .map_err(|e| store_error(&format!("Request to {} failed: {}", function, e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Could not read error response".to_string());
            return Err(classify_failure(status, &body));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| store_error(&format!("Failed to parse {} response: {}", function, e)))
    }
}

/// Map a failed RPC response onto the error taxonomy
pub fn classify_failure(status: StatusCode, body: &str) -> Error {
    let message = format!("HTTP {} - {}", status, body);
    let lower = body.to_lowercase();
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => authorization_error(&message),
        StatusCode::NOT_FOUND => not_found_error(&message),
        s if s.is_client_error() => {
            if lower.contains("not found") {
                not_found_error(&message)
            } else if lower.contains("not authorized") || lower.contains("permission") {
                authorization_error(&message)
            } else {
                validation_error(&message)
            }
        }
        _ => store_error(&message),
    }
}

#[async_trait]
impl EventStore for RestEventStore {
    async fn list_visible_events(&self, viewer: &Viewer) -> CalendarResult<Vec<CalendarEvent>> {
        debug!("Fetching visible events for {}", viewer.username);
        let records: Vec<EventRecord> = self.call_rpc("get_visible_calendar_events", json!({})).await?;

        let mut events = Vec::with_capacity(records.len());
        for record in records {
            let id = record.id.clone();
            match CalendarEvent::try_from(record) {
                Ok(event) => events.push(event),
                Err(e) => warn!("Skipping malformed event {}: {}", id, e),
            }
        }
        Ok(events)
    }

    async fn create_event(&self, _viewer: &Viewer, event: NewEvent) -> CalendarResult<String> {
        let args = json!({
            "event_title": event.title,
            "event_description": event.description,
            "event_start": event.start.to_rfc3339(),
            "event_end": event.end.to_rfc3339(),
            "event_category": event.category().as_str(),
            "event_type": event.event_type.as_str(),
            "event_is_private": event.is_private,
        });
        self.call_rpc("add_calendar_event", args).await
    }

    async fn approve_event(&self, _viewer: &Viewer, id: &str) -> CalendarResult<bool> {
        self.call_rpc("approve_calendar_event", json!({ "event_id": id }))
            .await
    }

    async fn delete_event(&self, _viewer: &Viewer, id: &str) -> CalendarResult<bool> {
        self.call_rpc("delete_calendar_event", json!({ "event_id": id }))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::calendar::models::EventCategory;

    fn record() -> EventRecord {
        serde_json::from_value(json!({
            "id": "7b1c",
            "title": "Robotics club",
            "description": null,
            "start": "2025-06-10T15:00:00+00:00",
            "end": "2025-06-10T17:00:00+00:00",
            "category": "club",
            "type": "Club Meetup",
            "approved": false,
            "is_private": false,
            "created_by": "u1",
            "created_at": "2025-06-01T08:00:00+00:00"
        }))
        .unwrap()
    }

    #[test]
    fn test_record_conversion() {
        let event = CalendarEvent::try_from(record()).unwrap();
        assert_eq!(event.event_type, EventType::ClubMeetup);
        assert_eq!(event.category, EventCategory::Club);
        assert!(event.is_pending());
    }

    #[test]
    fn test_category_follows_type() {
        let mut rec = record();
        rec.category = "holiday".to_string();
        let event = CalendarEvent::try_from(rec).unwrap();
        assert_eq!(event.category, EventCategory::Club);
    }

    #[test]
    fn test_malformed_records_rejected() {
        let mut rec = record();
        rec.event_type = "Party".to_string();
        assert!(CalendarEvent::try_from(rec).is_err());

        let mut rec = record();
        rec.end = "yesterday".to_string();
        assert!(CalendarEvent::try_from(rec).is_err());
    }

    #[test]
    fn test_classify_failure() {
        assert!(matches!(
            classify_failure(StatusCode::FORBIDDEN, ""),
            Error::Authorization(_)
        ));
        assert!(matches!(
            classify_failure(StatusCode::BAD_REQUEST, "Event not found"),
            Error::NotFound(_)
        ));
        assert!(matches!(
            classify_failure(StatusCode::BAD_REQUEST, "Not authorized to approve events"),
            Error::Authorization(_)
        ));
        assert!(matches!(
            classify_failure(StatusCode::BAD_GATEWAY, ""),
            Error::TransientStore(_)
        ));
    }

    #[test]
    fn test_rpc_url_keeps_base_path() {
        let config = crate::config::Config {
            store_url: "https://example.supabase.co/proxy".to_string(),
            store_api_key: "anon".to_string(),
            session_token: String::new(),
            session_user_id: "u1".to_string(),
            session_username: "alice".to_string(),
            admin_usernames: Vec::new(),
            components: Default::default(),
            series: Vec::new(),
            timezone: "UTC".to_string(),
            redis_url: crate::config::DEFAULT_REDIS_URL.to_string(),
            refresh_interval: 300,
            daily_digest_time: "07:00".to_string(),
            upcoming_limit: 10,
            request_timeout: 30,
            locale: "en".to_string(),
        };
        let store = RestEventStore::new(&config).unwrap();
        assert_eq!(
            store.rpc_url("approve_calendar_event").unwrap().as_str(),
            "https://example.supabase.co/proxy/rest/v1/rpc/approve_calendar_event"
        );
    }
}
