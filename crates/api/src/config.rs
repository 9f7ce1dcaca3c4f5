use std::time::Duration;

use rigforge_core::gallery::DEFAULT_GALLERY_CAPACITY;
use rigforge_core::generation::DEFAULT_RIG_HEIGHT_METERS;
use rigforge_meshy::MeshyConfig;
use rigforge_pipeline::animation::{RUNNING_ACTION_ID, WALKING_ACTION_ID};
use rigforge_pipeline::{AnimationJobConfig, OrchestratorConfig, PollConfig};

/// Server configuration loaded from environment variables.
///
/// All fields have sensible defaults suitable for local development.
/// In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// How long finished sessions stay queryable, in seconds (default: `3600`).
    pub session_retention_secs: u64,
    /// Generation service connection settings.
    pub meshy: MeshyConfig,
    /// Polling cadence, rig height, animation actions, gallery size.
    pub pipeline: OrchestratorConfig,
    /// Asset proxy settings.
    pub proxy: ProxyConfig,
    /// Postgres URL for the shared gallery. In-memory gallery when unset.
    pub database_url: Option<String>,
}

/// Settings for the signed-URL asset proxy.
#[derive(Debug, Clone)]
pub struct ProxyConfig {
    /// Fixed `User-Agent` sent upstream instead of the browser's.
    pub user_agent: String,
    /// Fixed `Accept` sent upstream.
    pub accept: String,
    pub connect_timeout_secs: u64,
    /// Hosts the proxy may contact. Empty allows any host.
    pub allowed_hosts: Vec<String>,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            user_agent: concat!("rigforge-proxy/", env!("CARGO_PKG_VERSION")).to_string(),
            accept: "*/*".to_string(),
            connect_timeout_secs: 15,
            allowed_hosts: Vec::new(),
        }
    }
}

impl ProxyConfig {
    /// HTTP client settings for upstream asset requests.
    ///
    /// Redirects are returned to the caller instead of followed, so every
    /// host the proxy contacts has passed [`ProxyConfig::is_host_allowed`].
    pub fn client_builder(&self) -> reqwest::ClientBuilder {
        reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(self.connect_timeout_secs))
            .redirect(reqwest::redirect::Policy::none())
    }

    /// Whether `host` may be proxied: an exact match or a subdomain of an
    /// allowed host.
    pub fn is_host_allowed(&self, host: &str) -> bool {
        if self.allowed_hosts.is_empty() {
            return true;
        }
        let host = host.to_ascii_lowercase();
        self.allowed_hosts.iter().any(|allowed| {
            host == *allowed
                || host
                    .strip_suffix(allowed.as_str())
                    .is_some_and(|prefix| prefix.ends_with('.'))
        })
    }
}

fn env_or<T: std::str::FromStr>(name: &str, default: &str) -> T {
    std::env::var(name)
        .unwrap_or_else(|_| default.into())
        .parse()
        .unwrap_or_else(|_| panic!("{name} must be a valid {}", std::any::type_name::<T>()))
}

fn env_list(name: &str, default: &str) -> Vec<String> {
    std::env::var(name)
        .unwrap_or_else(|_| default.into())
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

impl ServerConfig {
    pub fn session_retention(&self) -> Duration {
        Duration::from_secs(self.session_retention_secs)
    }

    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                      | Default                    |
    /// |------------------------------|----------------------------|
    /// | `HOST`                       | `0.0.0.0`                  |
    /// | `PORT`                       | `3000`                     |
    /// | `CORS_ORIGINS`               | `http://localhost:5173`    |
    /// | `REQUEST_TIMEOUT_SECS`       | `30`                       |
    /// | `SESSION_RETENTION_SECS`     | `3600`                     |
    /// | `MESHY_API_KEY`              | (none)                     |
    /// | `MESHY_BASE_URL`             | `https://api.meshy.ai`     |
    /// | `POLL_INITIAL_DELAY_SECS`    | `2`                        |
    /// | `POLL_INTERVAL_SECS`         | `5`                        |
    /// | `POLL_MAX_ATTEMPTS`          | `120`                      |
    /// | `RIG_HEIGHT_METERS`          | `1.7`                      |
    /// | `RUNNING_ACTION_ID`          | `14`                       |
    /// | `WALKING_ACTION_ID`          | `30`                       |
    /// | `GALLERY_CAPACITY`           | `20`                       |
    /// | `PROXY_USER_AGENT`           | `rigforge-proxy/<version>` |
    /// | `PROXY_CONNECT_TIMEOUT_SECS` | `15`                       |
    /// | `PROXY_ALLOWED_HOSTS`        | (empty: any host)          |
    /// | `DATABASE_URL`               | (unset: in-memory gallery) |
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let port: u16 = env_or("PORT", "3000");
        let cors_origins = env_list("CORS_ORIGINS", "http://localhost:5173");
        let request_timeout_secs: u64 = env_or("REQUEST_TIMEOUT_SECS", "30");
        let session_retention_secs: u64 = env_or("SESSION_RETENTION_SECS", "3600");

        let poll = PollConfig {
            initial_delay: Duration::from_secs(env_or("POLL_INITIAL_DELAY_SECS", "2")),
            interval: Duration::from_secs(env_or("POLL_INTERVAL_SECS", "5")),
            max_attempts: env_or("POLL_MAX_ATTEMPTS", "120"),
        };
        let pipeline = OrchestratorConfig {
            poll,
            rig_height_meters: env_or("RIG_HEIGHT_METERS", &DEFAULT_RIG_HEIGHT_METERS.to_string()),
            animation: AnimationJobConfig {
                running_action_id: env_or("RUNNING_ACTION_ID", &RUNNING_ACTION_ID.to_string()),
                walking_action_id: env_or("WALKING_ACTION_ID", &WALKING_ACTION_ID.to_string()),
                poll,
            },
            gallery_capacity: env_or("GALLERY_CAPACITY", &DEFAULT_GALLERY_CAPACITY.to_string()),
        };

        let defaults = ProxyConfig::default();
        let proxy = ProxyConfig {
            user_agent: std::env::var("PROXY_USER_AGENT").unwrap_or(defaults.user_agent),
            accept: defaults.accept,
            connect_timeout_secs: env_or("PROXY_CONNECT_TIMEOUT_SECS", "15"),
            allowed_hosts: env_list("PROXY_ALLOWED_HOSTS", "")
                .into_iter()
                .map(|h| h.to_ascii_lowercase())
                .collect(),
        };

        let database_url = std::env::var("DATABASE_URL")
            .ok()
            .filter(|url| !url.trim().is_empty());

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            session_retention_secs,
            meshy: MeshyConfig::from_env(),
            pipeline,
            proxy,
            database_url,
        }
    }
}
