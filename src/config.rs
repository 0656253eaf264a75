use std::env;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Deployment {
    Local,
    Dev,
    Stage,
    Prod,
}

impl Deployment {
    #[must_use]
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "dev" | "development" => Self::Dev,
            "stage" | "staging" => Self::Stage,
            "prod" | "production" => Self::Prod,
            _ => Self::Local,
        }
    }

    /// Local runs log human-readable lines, everything else logs JSON.
    #[must_use]
    pub fn json_logs(&self) -> bool {
        !matches!(self, Self::Local)
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    // Database
    pub database_url: String,
    pub run_migrations: bool,

    // Firebase Realtime Database
    pub firebase_database_url: String,
    pub firebase_auth_token: Option<String>,
    pub firebase_machines_path: String,
    pub firebase_reconnect_delay_seconds: u64,
    pub firebase_idle_timeout_seconds: u64,

    // Sync settings
    pub sync_event_buffer: usize,

    // API settings
    pub api_host: String,
    pub api_port: u16,

    // Rate limiting
    pub disable_rate_limiting: bool,
    pub rate_limit_per_second: u64,
    pub rate_limit_burst: u32,
    /// Key the limiter on `X-Forwarded-For` / `X-Real-IP`. Only safe behind a proxy.
    pub trust_proxy_headers: bool,

    // Application metadata
    pub deployment: Deployment,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Missing` if required environment variables are not set.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        Ok(Self {
            // Database
            database_url: env::var("DATABASE_URL")
                .map_err(|_| ConfigError::Missing("DATABASE_URL"))?,
            run_migrations: env::var("RUN_MIGRATIONS")
                .unwrap_or_else(|_| "true".to_string())
                .parse()
                .unwrap_or(true),

            // Firebase
            firebase_database_url: env::var("FIREBASE_DATABASE_URL")
                .map_err(|_| ConfigError::Missing("FIREBASE_DATABASE_URL"))?
                .trim_end_matches('/')
                .to_string(),
            firebase_auth_token: env::var("FIREBASE_AUTH_TOKEN")
                .ok()
                .filter(|t| !t.is_empty()),
            firebase_machines_path: env::var("FIREBASE_MACHINES_PATH")
                .unwrap_or_else(|_| "machines".to_string())
                .trim_matches('/')
                .to_string(),
            firebase_reconnect_delay_seconds: env::var("FIREBASE_RECONNECT_DELAY_SECONDS")
                .unwrap_or_else(|_| "5".to_string())
                .parse()
                .unwrap_or(5),
            firebase_idle_timeout_seconds: env::var("FIREBASE_IDLE_TIMEOUT_SECONDS")
                .unwrap_or_else(|_| "90".to_string())
                .parse()
                .unwrap_or(90), // Firebase sends keep-alive every 30s

            // Sync settings
            sync_event_buffer: env::var("SYNC_EVENT_BUFFER")
                .unwrap_or_else(|_| "1024".to_string())
                .parse()
                .unwrap_or(1024),

            // API settings
            api_host: env::var("API_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            api_port: env::var("API_PORT")
                .unwrap_or_else(|_| "5000".to_string())
                .parse()
                .unwrap_or(5000),

            // Rate limiting
            disable_rate_limiting: env::var("DISABLE_RATE_LIMITING")
                .unwrap_or_else(|_| "false".to_string())
                .parse()
                .unwrap_or(false),
            rate_limit_per_second: env::var("RATE_LIMIT_PER_SECOND")
                .unwrap_or_else(|_| "10".to_string())
                .parse()
                .unwrap_or(10),
            rate_limit_burst: env::var("RATE_LIMIT_BURST")
                .unwrap_or_else(|_| "60".to_string())
                .parse()
                .unwrap_or(60),
            trust_proxy_headers: env::var("TRUST_PROXY_HEADERS")
                .unwrap_or_else(|_| "false".to_string())
                .parse()
                .unwrap_or(false),

            // Application metadata
            deployment: Deployment::from_str(
                &env::var("DEPLOYMENT").unwrap_or_else(|_| "local".to_string()),
            ),
        })
    }

    #[must_use]
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.api_host, self.api_port)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),
}
