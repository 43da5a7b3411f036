use crate::components::calendar::models::{Role, Viewer};
use crate::components::calendar::recurrence::RecurringSeries;
use crate::components::calendar::visibility::DEFAULT_UPCOMING_LIMIT;
use crate::error::{config_error, env_error, CalendarResult};
use crate::utils::time::parse_time;
use chrono_tz::Tz;
use dotenvy::dotenv;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;
use std::fs;

/// Default Redis connection
pub const DEFAULT_REDIS_URL: &str = "redis://127.0.0.1:6379";

const COMPONENTS_FILE: &str = "config/components.toml";
const SERIES_FILE: &str = "config/series.toml";

/// Main configuration structure for the service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Base URL of the hosted event store
    pub store_url: String,
    /// Public API key sent with every store request
    pub store_api_key: String,
    /// Access token of the signed-in user
    pub session_token: String,
    /// Id of the signed-in user
    pub session_user_id: String,
    /// Username of the signed-in user
    pub session_username: String,
    /// Usernames that hold the admin role
    pub admin_usernames: Vec<String>,
    /// Map of component names to their enabled status
    pub components: HashMap<String, bool>,
    /// Recurring series synthesized into the calendar
    pub series: Vec<RecurringSeries>,
    /// Timezone for day boundaries and recurring entries
    pub timezone: String,
    /// Redis connection string
    pub redis_url: String,
    /// Seconds between event refreshes
    pub refresh_interval: u64,
    /// Daily digest time (HH:MM)
    pub daily_digest_time: String,
    /// Number of entries in the upcoming list
    pub upcoming_limit: usize,
    /// Store request timeout in seconds
    pub request_timeout: u64,
    /// Locale for user-visible messages
    pub locale: String,
}

#[derive(Debug, Deserialize)]
struct SeriesFile {
    #[serde(default)]
    series: Vec<RecurringSeries>,
}

impl Config {
    /// Load configuration from environment and config files
    pub fn load() -> CalendarResult<Self> {
        // Load .env file if it exists
        dotenv().ok();

        let store_url = required("STORE_URL")?;
        let store_api_key = required("STORE_API_KEY")?;
        let session_user_id = required("SESSION_USER_ID")?;
        let session_username = required("SESSION_USERNAME")?;
        let session_token = env::var("SESSION_TOKEN").unwrap_or_default();

        let admin_usernames = env::var("ADMIN_USERNAMES")
            .map(|list| split_list(&list))
            .unwrap_or_default();

        let timezone = env::var("TIMEZONE").unwrap_or_else(|_| String::from("UTC"));
        let redis_url = env::var("REDIS_URL").unwrap_or_else(|_| String::from(DEFAULT_REDIS_URL));
        let daily_digest_time =
            env::var("DAILY_DIGEST_TIME").unwrap_or_else(|_| String::from("07:00"));
        let locale = env::var("LOCALE").unwrap_or_else(|_| String::from("en"));

        let refresh_interval = numeric("REFRESH_INTERVAL", 300)?;
        let upcoming_limit = numeric("UPCOMING_LIMIT", DEFAULT_UPCOMING_LIMIT)?;
        let request_timeout = numeric("REQUEST_TIMEOUT", 30)?;

        // Initialize default components
        let mut components = HashMap::new();
        components.insert("calendar".to_string(), true);

        // Merge component toggles from file if it exists
        if let Ok(content) = fs::read_to_string(COMPONENTS_FILE) {
            let file_components = toml::from_str::<HashMap<String, bool>>(&content)?;
            components.extend(file_components);
        }

        let series = match fs::read_to_string(SERIES_FILE) {
            Ok(content) => toml::from_str::<SeriesFile>(&content)?.series,
            Err(_) => vec![RecurringSeries::codechef()],
        };

        let config = Config {
            store_url,
            store_api_key,
            session_token,
            session_user_id,
            session_username,
            admin_usernames,
            components,
            series,
            timezone,
            redis_url,
            refresh_interval,
            daily_digest_time,
            upcoming_limit,
            request_timeout,
            locale,
        };
        config.validate()?;

        Ok(config)
    }

    /// Reject values that would only fail later inside a scheduled task
    pub fn validate(&self) -> CalendarResult<()> {
        self.tz()?;
        if parse_time(&self.daily_digest_time).is_none() {
            return Err(config_error(&format!(
                "Invalid DAILY_DIGEST_TIME '{}', expected HH:MM",
                self.daily_digest_time
            )));
        }
        if self.refresh_interval == 0 {
            return Err(config_error("REFRESH_INTERVAL must be positive"));
        }
        for series in &self.series {
            series.time_window()?;
        }
        Ok(())
    }

    /// Parsed timezone
    pub fn tz(&self) -> CalendarResult<Tz> {
        self.timezone
            .parse::<Tz>()
            .map_err(|_| config_error(&format!("Unknown timezone '{}'", self.timezone)))
    }

    /// The signed-in user, with the role resolved once for the session
    pub fn viewer(&self) -> Viewer {
        let role = Role::resolve(&self.session_username, &self.admin_usernames);
        Viewer::new(&self.session_user_id, &self.session_username, role)
    }

    /// Check if a component is enabled
    pub fn is_component_enabled(&self, name: &str) -> bool {
        *self.components.get(name).unwrap_or(&false)
    }
}

fn required(var: &str) -> CalendarResult<String> {
    env::var(var).map_err(|_| env_error(var))
}

fn numeric<T: std::str::FromStr>(var: &str, default: T) -> CalendarResult<T> {
    match env::var(var) {
        Ok(value) => value
            .trim()
            .parse::<T>()
            .map_err(|_| env_error(&format!("Invalid {} format", var))),
        Err(_) => Ok(default),
    }
}

fn split_list(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_list() {
        assert_eq!(split_list("alice, bob,,carol "), vec!["alice", "bob", "carol"]);
        assert!(split_list("").is_empty());
    }
}
