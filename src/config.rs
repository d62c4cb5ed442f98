//! Service configuration read from the process environment.

use crate::template::DEFAULT_LOGO_URL;
use anyhow::{bail, Context, Result};
use secrecy::SecretString;
use std::fmt::Display;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_PORT: u16 = 3003;
pub const DEFAULT_BUCKET: &str = "avatars";
pub const DEFAULT_BODY_LIMIT_BYTES: usize = 5 * 1024 * 1024;
pub const DEFAULT_MAX_CONCURRENT_RENDERS: usize = 4;
pub const DEFAULT_RENDER_TIMEOUT_SECS: u64 = 30;

/// Output format of the tracing subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

/// Runtime settings, resolved once at startup.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Listen host (`HOST`)
    pub host: String,
    /// Listen port (`PORT`)
    pub port: u16,
    /// Object store base URL, without trailing slash (`SUPABASE_URL`)
    pub storage_url: String,
    /// Object store service key (`SUPABASE_KEY`)
    pub storage_key: SecretString,
    /// Bucket that receives rendered PDFs (`STORAGE_BUCKET`)
    pub bucket: String,
    /// Largest accepted request body (`BODY_LIMIT_BYTES`)
    pub body_limit_bytes: usize,
    /// Browser sessions allowed at once (`MAX_CONCURRENT_RENDERS`)
    pub max_concurrent_renders: usize,
    /// Deadline for one render, also used for part downloads (`RENDER_TIMEOUT_SECS`)
    pub render_timeout: Duration,
    /// Logo used when a request names none (`DEFAULT_LOGO_URL`)
    pub default_logo_url: String,
    /// Browser binary; auto-detected when unset (`CHROME_PATH`)
    pub chrome_path: Option<PathBuf>,
    pub log_format: LogFormat,
    /// OTLP collector; span export is off when unset
    pub otlp_endpoint: Option<String>,
    pub service_name: String,
}

impl ServiceConfig {
    /// Loads `.env` if present, then reads the process environment.
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    ///
    /// Blank values count as unset.
    ///
    /// # Arguments
    /// * `lookup` - Returns the raw value for an environment key
    ///
    /// # Returns
    /// The validated configuration, or an error naming the offending key.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let storage_url = get("SUPABASE_URL").context("SUPABASE_URL must be set")?;
        let storage_key = get("SUPABASE_KEY").context("SUPABASE_KEY must be set")?;

        let log_format = match get("LOG_FORMAT").as_deref() {
            None | Some("text") => LogFormat::Text,
            Some("json") => LogFormat::Json,
            Some(other) => bail!("LOG_FORMAT must be `text` or `json`, got `{}`", other),
        };

        let config = Self {
            host: get("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: parse_or(get("PORT"), "PORT", DEFAULT_PORT)?,
            storage_url: storage_url.trim_end_matches('/').to_string(),
            storage_key: SecretString::new(storage_key),
            bucket: get("STORAGE_BUCKET").unwrap_or_else(|| DEFAULT_BUCKET.to_string()),
            body_limit_bytes: parse_or(
                get("BODY_LIMIT_BYTES"),
                "BODY_LIMIT_BYTES",
                DEFAULT_BODY_LIMIT_BYTES,
            )?,
            max_concurrent_renders: parse_or(
                get("MAX_CONCURRENT_RENDERS"),
                "MAX_CONCURRENT_RENDERS",
                DEFAULT_MAX_CONCURRENT_RENDERS,
            )?,
            render_timeout: Duration::from_secs(parse_or(
                get("RENDER_TIMEOUT_SECS"),
                "RENDER_TIMEOUT_SECS",
                DEFAULT_RENDER_TIMEOUT_SECS,
            )?),
            default_logo_url: get("DEFAULT_LOGO_URL")
                .unwrap_or_else(|| DEFAULT_LOGO_URL.to_string()),
            chrome_path: get("CHROME_PATH").map(PathBuf::from),
            log_format,
            otlp_endpoint: get("OTEL_EXPORTER_OTLP_ENDPOINT"),
            service_name: get("OTEL_SERVICE_NAME")
                .unwrap_or_else(|| "markdown-pdf-service".to_string()),
        };

        config.validate()?;
        Ok(config)
    }

    /// Address the HTTP listener binds to.
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("Invalid bind address {}:{}", self.host, self.port))
    }

    fn validate(&self) -> Result<()> {
        if self.port == 0 {
            bail!("PORT must be greater than zero");
        }
        if self.body_limit_bytes == 0 {
            bail!("BODY_LIMIT_BYTES must be greater than zero");
        }
        if self.max_concurrent_renders == 0 {
            bail!("MAX_CONCURRENT_RENDERS must be greater than zero");
        }
        if self.render_timeout.is_zero() {
            bail!("RENDER_TIMEOUT_SECS must be greater than zero");
        }
        Ok(())
    }
}

fn parse_or<T>(value: Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    match value {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow::anyhow!("{} has invalid value `{}`: {}", key, raw, e)),
    }
}
