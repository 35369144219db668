//! Configuration module
//!
//! Env-driven configuration for the API process. Values are read once at
//! startup via [`Config::from_env`] and validated before anything binds a
//! port or touches the database.

use std::env;

use crate::constants::{DEFAULT_MAX_FILE_SIZE_BYTES, DEFAULT_USER_QUOTA_BYTES};

const MAX_CONNECTIONS: u32 = 20;
const CONNECTION_TIMEOUT_SECS: u64 = 30;
const HTTP_RATE_LIMIT_PER_MINUTE: u32 = 100;
const UPLOAD_RATE_LIMIT_PER_MINUTE: u32 = 20;
const SCANNER_TIMEOUT_SECS: u64 = 30;

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.is_empty())
}

fn env_bool(key: &str, default: bool) -> bool {
    env::var(key)
        .map(|v| matches!(v.to_lowercase().as_str(), "true" | "1" | "yes"))
        .unwrap_or(default)
}

/// Application configuration.
#[derive(Clone, Debug)]
pub struct Config {
    server_port: u16,
    environment: String,
    cors_origins: Vec<String>,

    database_url: String,
    db_max_connections: u32,
    db_timeout_seconds: u64,

    jwt_secret: String,

    s3_bucket: String,
    s3_region: String,
    s3_endpoint: Option<String>,

    max_file_size_bytes: u64,
    user_quota_bytes: u64,

    scanner_enabled: bool,
    scanner_host: String,
    scanner_port: u16,
    scanner_fail_closed: bool,
    scanner_timeout_secs: u64,

    http_rate_limit_per_minute: u32,
    upload_rate_limit_per_minute: u32,
}

impl Config {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        let database_url = env_opt("DATABASE_URL")
            .ok_or_else(|| anyhow::anyhow!("DATABASE_URL must be set"))?;
        let jwt_secret =
            env_opt("JWT_SECRET").ok_or_else(|| anyhow::anyhow!("JWT_SECRET must be set"))?;
        let s3_bucket =
            env_opt("S3_BUCKET").ok_or_else(|| anyhow::anyhow!("S3_BUCKET must be set"))?;

        let cors_origins = env_opt("CORS_ORIGINS")
            .map(|v| v.split(',').map(|s| s.trim().to_string()).collect())
            .unwrap_or_default();

        Ok(Self {
            server_port: env_or("SERVER_PORT", 8080),
            environment: env_opt("ENVIRONMENT").unwrap_or_else(|| "development".to_string()),
            cors_origins,
            database_url,
            db_max_connections: env_or("DB_MAX_CONNECTIONS", MAX_CONNECTIONS),
            db_timeout_seconds: env_or("DB_TIMEOUT_SECONDS", CONNECTION_TIMEOUT_SECS),
            jwt_secret,
            s3_bucket,
            s3_region: env_opt("S3_REGION").unwrap_or_else(|| "us-east-1".to_string()),
            s3_endpoint: env_opt("S3_ENDPOINT"),
            max_file_size_bytes: env_or("MAX_FILE_SIZE_BYTES", DEFAULT_MAX_FILE_SIZE_BYTES),
            user_quota_bytes: env_or("USER_QUOTA_BYTES", DEFAULT_USER_QUOTA_BYTES),
            scanner_enabled: env_bool("SCANNER_ENABLED", false),
            scanner_host: env_opt("SCANNER_HOST").unwrap_or_else(|| "localhost".to_string()),
            scanner_port: env_or("SCANNER_PORT", 3310),
            scanner_fail_closed: env_bool("SCANNER_FAIL_CLOSED", false),
            scanner_timeout_secs: env_or("SCANNER_TIMEOUT_SECS", SCANNER_TIMEOUT_SECS),
            http_rate_limit_per_minute: env_or(
                "HTTP_RATE_LIMIT_PER_MINUTE",
                HTTP_RATE_LIMIT_PER_MINUTE,
            ),
            upload_rate_limit_per_minute: env_or(
                "UPLOAD_RATE_LIMIT_PER_MINUTE",
                UPLOAD_RATE_LIMIT_PER_MINUTE,
            ),
        })
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.jwt_secret.len() < 32 {
            anyhow::bail!("JWT_SECRET must be at least 32 characters");
        }
        if self.max_file_size_bytes == 0 {
            anyhow::bail!("MAX_FILE_SIZE_BYTES must be positive");
        }
        if self.max_file_size_bytes > self.user_quota_bytes {
            anyhow::bail!("MAX_FILE_SIZE_BYTES cannot exceed USER_QUOTA_BYTES");
        }
        Ok(())
    }

    pub fn is_production(&self) -> bool {
        matches!(self.environment.to_lowercase().as_str(), "production" | "prod")
    }

    pub fn server_port(&self) -> u16 {
        self.server_port
    }

    pub fn environment(&self) -> &str {
        &self.environment
    }

    pub fn cors_origins(&self) -> &[String] {
        &self.cors_origins
    }

    pub fn database_url(&self) -> &str {
        &self.database_url
    }

    pub fn db_max_connections(&self) -> u32 {
        self.db_max_connections
    }

    pub fn db_timeout_seconds(&self) -> u64 {
        self.db_timeout_seconds
    }

    pub fn jwt_secret(&self) -> &str {
        &self.jwt_secret
    }

    pub fn s3_bucket(&self) -> &str {
        &self.s3_bucket
    }

    pub fn s3_region(&self) -> &str {
        &self.s3_region
    }

    pub fn s3_endpoint(&self) -> Option<&str> {
        self.s3_endpoint.as_deref()
    }

    pub fn max_file_size_bytes(&self) -> u64 {
        self.max_file_size_bytes
    }

    pub fn user_quota_bytes(&self) -> u64 {
        self.user_quota_bytes
    }

    pub fn scanner_enabled(&self) -> bool {
        self.scanner_enabled
    }

    pub fn scanner_host(&self) -> &str {
        &self.scanner_host
    }

    pub fn scanner_port(&self) -> u16 {
        self.scanner_port
    }

    /// If true, scan errors are hard rejections instead of warnings. The
    /// default is fail-open: scanner unavailability must not block uploads.
    pub fn scanner_fail_closed(&self) -> bool {
        self.scanner_fail_closed
    }

    pub fn scanner_timeout_secs(&self) -> u64 {
        self.scanner_timeout_secs
    }

    pub fn http_rate_limit_per_minute(&self) -> u32 {
        self.http_rate_limit_per_minute
    }

    pub fn upload_rate_limit_per_minute(&self) -> u32 {
        self.upload_rate_limit_per_minute
    }
}
