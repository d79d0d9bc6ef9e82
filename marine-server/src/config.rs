//! Server configuration module
//!
//! Loads configuration from environment variables. The database, broker and
//! matching service are required; everything else has a sensible default.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use marine_core::{FrameFormat, VerdictPolicy, DEFAULT_PIRACY_THRESHOLD};
use thiserror::Error;

/// Configuration errors that prevent startup
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required variable is unset or empty
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    /// A variable is set but cannot be interpreted
    #[error("Invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

/// Server configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// Server port (default: 8080)
    pub port: u16,
    /// Server host (default: 127.0.0.1)
    pub host: [u8; 4],
    /// Allowed CORS origins, comma-separated (default: allow all in dev)
    pub allowed_origins: Option<Vec<String>>,
    /// Request body limit in MB (default: 512)
    pub body_limit_mb: usize,
    /// Maximum file size per upload in MB (default: 500)
    pub max_file_size_mb: usize,
    /// Request timeout in seconds (default: 60)
    pub timeout_secs: u64,
    /// Enable rate limiting (default: false for tests, true when loaded from env)
    pub rate_limit_enabled: bool,
    /// Rate limit: requests per second (default: 10)
    pub rate_limit_per_sec: u64,
    /// Rate limit: burst size (default: 20)
    pub rate_limit_burst: u32,

    /// PostgreSQL connection string (required)
    pub database_url: String,
    /// Database connection pool maximum connections (default: 20)
    pub database_max_connections: u32,
    /// Database connection pool minimum connections (default: 2)
    pub database_min_connections: u32,
    /// Directory uploaded files are written to (default: ./uploads)
    pub uploads_dir: PathBuf,

    /// Kafka bootstrap servers (required)
    pub kafka_broker: String,
    /// Detection topic (default: piracy_links)
    pub kafka_topic: String,
    /// Consumer group of the detection consumer (default: marine-ai)
    pub kafka_group_id: String,
    /// Encoding of frames written by the producer (default: json)
    pub frame_format: FrameFormat,
    /// Delay before retrying a failed broker read (default: 1000 ms)
    pub consumer_retry_interval: Duration,

    /// Matching service base URL (required)
    pub ai_service_url: String,
    /// Matching request timeout (default: 30 s)
    pub match_timeout: Duration,
    /// Score at or above which a match counts as piracy (default: 85.0)
    pub piracy_threshold: f64,
    /// Base of the reporting URL derived for local piracy verdicts
    pub piracy_report_base_url: String,
    /// Discovery service base URL (default: http://localhost:8002)
    pub discovery_service_url: String,
    /// Detection stream (SSE) base URL (default: http://localhost:8000)
    pub detection_stream_url: String,
    /// Crawler service base URL; drained batches are forwarded when set
    pub crawler_service_url: Option<String>,

    /// Upper bound on concurrently running background jobs (default: 64)
    pub dispatch_max_in_flight: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8080,
            host: [127, 0, 0, 1],
            allowed_origins: None, // None = allow all (dev mode)
            body_limit_mb: 512,
            max_file_size_mb: 500,
            timeout_secs: 60,
            rate_limit_enabled: false, // Disabled by default (for tests)
            rate_limit_per_sec: 10,
            rate_limit_burst: 20,
            database_url: String::new(),
            database_max_connections: 20,
            database_min_connections: 2,
            uploads_dir: PathBuf::from("uploads"),
            kafka_broker: String::new(),
            kafka_topic: "piracy_links".to_string(),
            kafka_group_id: "marine-ai".to_string(),
            frame_format: FrameFormat::Json,
            consumer_retry_interval: Duration::from_secs(1),
            ai_service_url: "http://localhost:8000".to_string(),
            match_timeout: Duration::from_secs(30),
            piracy_threshold: DEFAULT_PIRACY_THRESHOLD,
            piracy_report_base_url: "https://example.com/pirated/".to_string(),
            discovery_service_url: "http://localhost:8002".to_string(),
            detection_stream_url: "http://localhost:8000".to_string(),
            crawler_service_url: None,
            dispatch_max_in_flight: 64,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    ///
    /// Fails when `DATABASE_URL`, `KAFKA_BROKER` or `AI_SERVICE_URL` is missing.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let get = |name: &str| var(&lookup, name);
        let required = |name: &'static str| get(name).ok_or(ConfigError::Missing(name));

        let database_url = required("DATABASE_URL")?;
        let kafka_broker = required("KAFKA_BROKER")?;
        let ai_service_url = required("AI_SERVICE_URL")?;
        validate_base_url("AI_SERVICE_URL", &ai_service_url)?;

        let host = get("HOST")
            .map(|h| {
                if h == "0.0.0.0" {
                    [0, 0, 0, 0]
                } else {
                    [127, 0, 0, 1]
                }
            })
            .unwrap_or(defaults.host);

        let allowed_origins = get("ALLOWED_ORIGINS").map(|origins| {
            origins
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect()
        });

        // Rate limiting enabled by default in production, can be disabled with RATE_LIMIT_ENABLED=false
        let rate_limit_enabled = get("RATE_LIMIT_ENABLED")
            .map(|v| v.to_lowercase() != "false")
            .unwrap_or(true);

        let frame_format = match get("BROKER_FRAME_FORMAT") {
            Some(raw) => raw.parse().map_err(|e: marine_core::MarineError| {
                ConfigError::Invalid {
                    name: "BROKER_FRAME_FORMAT",
                    reason: e.to_string(),
                }
            })?,
            None => defaults.frame_format,
        };

        let discovery_service_url =
            get("DISCOVERY_SERVICE_URL").unwrap_or(defaults.discovery_service_url);
        validate_base_url("DISCOVERY_SERVICE_URL", &discovery_service_url)?;

        let detection_stream_url =
            get("DETECTION_STREAM_URL").unwrap_or(defaults.detection_stream_url);
        validate_base_url("DETECTION_STREAM_URL", &detection_stream_url)?;

        let crawler_service_url = get("CRAWLER_SERVICE_URL");
        if let Some(ref url) = crawler_service_url {
            validate_base_url("CRAWLER_SERVICE_URL", url)?;
        }

        let piracy_threshold: f64 =
            parsed(&lookup, "PIRACY_THRESHOLD").unwrap_or(defaults.piracy_threshold);
        if !(0.0..=100.0).contains(&piracy_threshold) {
            return Err(ConfigError::Invalid {
                name: "PIRACY_THRESHOLD",
                reason: format!("{} is outside [0, 100]", piracy_threshold),
            });
        }

        Ok(Self {
            port: parsed(&lookup, "PORT").unwrap_or(defaults.port),
            host,
            allowed_origins,
            body_limit_mb: parsed(&lookup, "BODY_LIMIT_MB").unwrap_or(defaults.body_limit_mb),
            max_file_size_mb: parsed(&lookup, "MAX_FILE_SIZE_MB")
                .unwrap_or(defaults.max_file_size_mb),
            timeout_secs: parsed(&lookup, "REQUEST_TIMEOUT_SECS")
                .unwrap_or(defaults.timeout_secs),
            rate_limit_enabled,
            rate_limit_per_sec: parsed(&lookup, "RATE_LIMIT_PER_SEC")
                .unwrap_or(defaults.rate_limit_per_sec),
            rate_limit_burst: parsed(&lookup, "RATE_LIMIT_BURST")
                .unwrap_or(defaults.rate_limit_burst),
            database_url,
            database_max_connections: parsed(&lookup, "DATABASE_MAX_CONNECTIONS")
                .unwrap_or(defaults.database_max_connections),
            database_min_connections: parsed(&lookup, "DATABASE_MIN_CONNECTIONS")
                .unwrap_or(defaults.database_min_connections),
            uploads_dir: get("UPLOADS_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.uploads_dir),
            kafka_broker,
            kafka_topic: get("KAFKA_TOPIC").unwrap_or(defaults.kafka_topic),
            kafka_group_id: get("KAFKA_GROUP_ID").unwrap_or(defaults.kafka_group_id),
            frame_format,
            consumer_retry_interval: parsed(&lookup, "CONSUMER_RETRY_INTERVAL_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.consumer_retry_interval),
            ai_service_url,
            match_timeout: parsed(&lookup, "MATCH_TIMEOUT_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.match_timeout),
            piracy_threshold,
            piracy_report_base_url: get("PIRACY_REPORT_BASE_URL")
                .unwrap_or(defaults.piracy_report_base_url),
            discovery_service_url,
            detection_stream_url,
            crawler_service_url,
            dispatch_max_in_flight: parsed(&lookup, "DISPATCH_MAX_IN_FLIGHT")
                .filter(|n: &usize| *n > 0)
                .unwrap_or(defaults.dispatch_max_in_flight),
        })
    }

    /// Get socket address from config
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::from((self.host, self.port))
    }

    /// Maximum upload size in bytes
    pub fn max_file_size(&self) -> usize {
        self.max_file_size_mb * 1024 * 1024
    }

    /// Threshold policy applied to matching results
    pub fn verdict_policy(&self) -> VerdictPolicy {
        VerdictPolicy {
            threshold: self.piracy_threshold,
            report_base_url: self.piracy_report_base_url.clone(),
        }
    }
}

fn var<F: Fn(&str) -> Option<String>>(lookup: &F, name: &str) -> Option<String> {
    lookup(name).filter(|v| !v.trim().is_empty())
}

fn parsed<T: FromStr, F: Fn(&str) -> Option<String>>(lookup: &F, name: &str) -> Option<T> {
    var(lookup, name).and_then(|v| v.trim().parse().ok())
}

fn validate_base_url(name: &'static str, raw: &str) -> Result<(), ConfigError> {
    let parsed = url::Url::parse(raw).map_err(|e| ConfigError::Invalid {
        name,
        reason: e.to_string(),
    })?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => Err(ConfigError::Invalid {
            name,
            reason: format!("unsupported scheme '{}'", other),
        }),
    }
}
