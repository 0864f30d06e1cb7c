//! Configuration module
//!
//! Configuration is read from the environment (and an optional `.env` file) once at
//! process start. Each component receives the section it needs at construction time;
//! nothing reads the environment after startup.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

// Common constants
const CDN_FTP_PORT: u16 = 21;
const CDN_TIMEOUT_SECS: u64 = 30;
const GEOCODE_TIMEOUT_SECS: u64 = 10;
const LISTING_TIMEOUT_SECS: u64 = 30;
const QUEUE_MAX_WORKERS: usize = 4;
const QUEUE_MAX_ATTEMPTS: u32 = 3;
const QUEUE_MAX_EXCEPTIONS: u32 = 2;
const QUEUE_BACKOFF_SECS: u64 = 10;
const QUEUE_JOB_TIMEOUT_SECS: u64 = 120;

pub const DEFAULT_GOOGLE_GEOCODE_BASE_URL: &str = "https://maps.googleapis.com/maps/api";
pub const DEFAULT_NOMINATIM_BASE_URL: &str = "https://nominatim.openstreetmap.org";
pub const DEFAULT_GEOCODER_USER_AGENT: &str =
    "HomesteadListings/1.0 (property listing geocoder; ops@homestead.local)";
pub const DEFAULT_LISTING_API_HOST: &str = "zillow-com1.p.rapidapi.com";

/// CDN (FTP origin + pull zone) settings.
#[derive(Clone, Debug)]
pub struct CdnConfig {
    pub host: Option<String>,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub pull_zone: Option<String>,
    /// Also keep a local copy when the CDN upload succeeds.
    pub local_backup: bool,
    pub timeout: Duration,
}

impl Default for CdnConfig {
    fn default() -> Self {
        Self {
            host: None,
            port: CDN_FTP_PORT,
            username: None,
            password: None,
            pull_zone: None,
            local_backup: false,
            timeout: Duration::from_secs(CDN_TIMEOUT_SECS),
        }
    }
}

impl CdnConfig {
    /// The CDN is usable only when every credential and the pull zone are present.
    pub fn is_configured(&self) -> bool {
        [&self.host, &self.username, &self.password, &self.pull_zone]
            .iter()
            .all(|v| v.as_deref().is_some_and(|s| !s.trim().is_empty()))
    }
}

#[derive(Clone, Debug)]
pub struct LocalStorageConfig {
    pub root: PathBuf,
    pub base_url: String,
    /// Directory the web tier writes accepted uploads into before a job picks them up.
    pub temp_dir: PathBuf,
}

#[derive(Clone, Debug)]
pub struct GeocodingConfig {
    pub google_api_key: Option<String>,
    pub google_base_url: String,
    pub nominatim_base_url: String,
    pub user_agent: String,
    pub timeout: Duration,
}

impl Default for GeocodingConfig {
    fn default() -> Self {
        Self {
            google_api_key: None,
            google_base_url: DEFAULT_GOOGLE_GEOCODE_BASE_URL.to_string(),
            nominatim_base_url: DEFAULT_NOMINATIM_BASE_URL.to_string(),
            user_agent: DEFAULT_GEOCODER_USER_AGENT.to_string(),
            timeout: Duration::from_secs(GEOCODE_TIMEOUT_SECS),
        }
    }
}

/// External listing search API (RapidAPI-style host + key headers).
#[derive(Clone, Debug)]
pub struct ListingApiConfig {
    pub api_key: Option<String>,
    pub host: String,
    /// Host serving the property detail/photo endpoint. Defaults to `host`.
    pub images_host: String,
    /// Overrides `https://{host}`; used for self-hosted proxies and tests.
    pub base_url: Option<String>,
    pub images_base_url: Option<String>,
    pub timeout: Duration,
}

impl ListingApiConfig {
    pub fn is_configured(&self) -> bool {
        self.api_key.as_deref().is_some_and(|k| !k.trim().is_empty())
    }

    pub fn search_base_url(&self) -> String {
        self.base_url
            .clone()
            .unwrap_or_else(|| format!("https://{}", self.host))
    }

    pub fn details_base_url(&self) -> String {
        self.images_base_url
            .clone()
            .or_else(|| self.base_url.clone())
            .unwrap_or_else(|| format!("https://{}", self.images_host))
    }
}

impl Default for ListingApiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            host: DEFAULT_LISTING_API_HOST.to_string(),
            images_host: DEFAULT_LISTING_API_HOST.to_string(),
            base_url: None,
            images_base_url: None,
            timeout: Duration::from_secs(LISTING_TIMEOUT_SECS),
        }
    }
}

/// Ingestion queue settings.
#[derive(Clone, Debug)]
pub struct QueueConfig {
    pub max_workers: usize,
    pub max_attempts: u32,
    /// Consecutive-exception cap, independent of `max_attempts`.
    pub max_exceptions: u32,
    pub backoff: Duration,
    pub job_timeout: Duration,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            max_workers: QUEUE_MAX_WORKERS,
            max_attempts: QUEUE_MAX_ATTEMPTS,
            max_exceptions: QUEUE_MAX_EXCEPTIONS,
            backoff: Duration::from_secs(QUEUE_BACKOFF_SECS),
            job_timeout: Duration::from_secs(QUEUE_JOB_TIMEOUT_SECS),
        }
    }
}

/// Application configuration.
#[derive(Clone, Debug)]
pub struct Config {
    pub environment: String,
    pub cdn: CdnConfig,
    pub local_storage: LocalStorageConfig,
    pub geocoding: GeocodingConfig,
    pub listing_api: ListingApiConfig,
    pub queue: QueueConfig,
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn env_flag(key: &str, default: bool) -> bool {
    match env_opt(key).map(|s| s.to_lowercase()) {
        Some(v) => matches!(v.as_str(), "1" | "true" | "yes" | "on"),
        None => default,
    }
}

impl Config {
    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        let env = self.environment.to_lowercase();
        env == "production" || env == "prod"
    }

    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let environment = env::var("ENVIRONMENT")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string());

        let cdn = CdnConfig {
            host: env_opt("CDN_FTP_HOST"),
            port: env::var("CDN_FTP_PORT")
                .unwrap_or_else(|_| CDN_FTP_PORT.to_string())
                .parse()
                .unwrap_or(CDN_FTP_PORT),
            username: env_opt("CDN_FTP_USERNAME"),
            password: env_opt("CDN_FTP_PASSWORD"),
            pull_zone: env_opt("CDN_PULL_ZONE"),
            local_backup: env_flag("CDN_LOCAL_BACKUP", false),
            timeout: Duration::from_secs(
                env::var("CDN_TIMEOUT_SECS")
                    .unwrap_or_else(|_| CDN_TIMEOUT_SECS.to_string())
                    .parse()
                    .unwrap_or(CDN_TIMEOUT_SECS),
            ),
        };

        let local_root = PathBuf::from(
            env_opt("LOCAL_STORAGE_PATH").unwrap_or_else(|| "storage/app/public".to_string()),
        );
        let local_storage = LocalStorageConfig {
            temp_dir: env_opt("UPLOAD_TEMP_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| env::temp_dir().join("homestead-uploads")),
            root: local_root,
            base_url: env_opt("LOCAL_STORAGE_BASE_URL").unwrap_or_else(|| "/storage".to_string()),
        };

        let geocoding = GeocodingConfig {
            google_api_key: env_opt("GOOGLE_MAPS_API_KEY"),
            google_base_url: env_opt("GOOGLE_GEOCODE_BASE_URL")
                .unwrap_or_else(|| DEFAULT_GOOGLE_GEOCODE_BASE_URL.to_string()),
            nominatim_base_url: env_opt("NOMINATIM_BASE_URL")
                .unwrap_or_else(|| DEFAULT_NOMINATIM_BASE_URL.to_string()),
            user_agent: env_opt("GEOCODER_USER_AGENT")
                .unwrap_or_else(|| DEFAULT_GEOCODER_USER_AGENT.to_string()),
            timeout: Duration::from_secs(
                env::var("GEOCODE_TIMEOUT_SECS")
                    .unwrap_or_else(|_| GEOCODE_TIMEOUT_SECS.to_string())
                    .parse()
                    .unwrap_or(GEOCODE_TIMEOUT_SECS),
            ),
        };

        let listing_host =
            env_opt("LISTING_API_HOST").unwrap_or_else(|| DEFAULT_LISTING_API_HOST.to_string());
        let listing_api = ListingApiConfig {
            api_key: env_opt("LISTING_API_KEY"),
            images_host: env_opt("LISTING_API_IMAGES_HOST").unwrap_or_else(|| listing_host.clone()),
            host: listing_host,
            base_url: env_opt("LISTING_API_BASE_URL"),
            images_base_url: env_opt("LISTING_API_IMAGES_BASE_URL"),
            timeout: Duration::from_secs(LISTING_TIMEOUT_SECS),
        };

        let queue = QueueConfig {
            max_workers: env::var("QUEUE_MAX_WORKERS")
                .unwrap_or_else(|_| QUEUE_MAX_WORKERS.to_string())
                .parse()
                .unwrap_or(QUEUE_MAX_WORKERS),
            max_attempts: env::var("QUEUE_MAX_ATTEMPTS")
                .unwrap_or_else(|_| QUEUE_MAX_ATTEMPTS.to_string())
                .parse()
                .unwrap_or(QUEUE_MAX_ATTEMPTS),
            max_exceptions: env::var("QUEUE_MAX_EXCEPTIONS")
                .unwrap_or_else(|_| QUEUE_MAX_EXCEPTIONS.to_string())
                .parse()
                .unwrap_or(QUEUE_MAX_EXCEPTIONS),
            backoff: Duration::from_secs(
                env::var("QUEUE_BACKOFF_SECS")
                    .unwrap_or_else(|_| QUEUE_BACKOFF_SECS.to_string())
                    .parse()
                    .unwrap_or(QUEUE_BACKOFF_SECS),
            ),
            job_timeout: Duration::from_secs(
                env::var("QUEUE_JOB_TIMEOUT_SECS")
                    .unwrap_or_else(|_| QUEUE_JOB_TIMEOUT_SECS.to_string())
                    .parse()
                    .unwrap_or(QUEUE_JOB_TIMEOUT_SECS),
            ),
        };

        let config = Config {
            environment,
            cdn,
            local_storage,
            geocoding,
            listing_api,
            queue,
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.queue.max_workers == 0 {
            return Err(anyhow::anyhow!("QUEUE_MAX_WORKERS must be at least 1"));
        }

        if self.queue.max_attempts == 0 || self.queue.max_exceptions == 0 {
            return Err(anyhow::anyhow!(
                "QUEUE_MAX_ATTEMPTS and QUEUE_MAX_EXCEPTIONS must be at least 1"
            ));
        }

        if let Some(zone) = self.cdn.pull_zone.as_deref() {
            if zone.contains("://") || zone.contains('/') {
                return Err(anyhow::anyhow!(
                    "CDN_PULL_ZONE must be a bare hostname (e.g. cdn.example.com)"
                ));
            }
        }

        if self.cdn.port == 0 {
            return Err(anyhow::anyhow!("CDN_FTP_PORT must be a valid port"));
        }

        Ok(())
    }
}
