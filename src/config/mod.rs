//! Configuration layer: typed settings with layered precedence (file → env → CLI).

#[cfg(test)]
mod tests;

use std::{
    net::{IpAddr, SocketAddr},
    num::{NonZeroU32, NonZeroU64},
    path::PathBuf,
};

use clap::{Args, Parser, Subcommand, ValueHint};
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use time::Duration;
use tracing::level_filters::LevelFilter;

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "blogicum";
const ENV_PREFIX: &str = "BLOGICUM";
const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 8000;
const DEFAULT_DB_MAX_CONNECTIONS: u32 = 8;
const DEFAULT_PAGE_SIZE: u32 = 10;
const DEFAULT_SESSION_TTL_HOURS: u64 = 14 * 24;
const DEFAULT_UPLOAD_DIR: &str = "uploads";
const DEFAULT_UPLOAD_REQUEST_LIMIT_BYTES: u64 = 10 * 1024 * 1024;

/// Command-line arguments for the blogicum binary.
#[derive(Debug, Parser)]
#[command(name = "blogicum", version, about = "Blogicum blog server")]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "BLOGICUM_CONFIG_FILE", value_name = "PATH", value_hint = ValueHint::FilePath)]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Run the blogicum HTTP service.
    Serve(Box<ServeArgs>),
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeArgs {
    #[command(flatten)]
    pub overrides: ServeOverrides,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeOverrides {
    /// Override the listener host.
    #[arg(long = "server-host", value_name = "HOST")]
    pub server_host: Option<String>,

    /// Override the listener port.
    #[arg(long = "server-port", value_name = "PORT")]
    pub server_port: Option<u16>,

    /// Override the database connection URL.
    #[arg(long = "database-url", value_name = "URL")]
    pub database_url: Option<String>,

    /// Override the database connection pool size.
    #[arg(long = "database-max-connections", value_name = "COUNT")]
    pub database_max_connections: Option<u32>,

    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Emit logs as JSON.
    #[arg(long = "log-json", value_name = "BOOL", num_args = 0..=1, default_missing_value = "true")]
    pub log_json: Option<bool>,

    /// Override the listing page size.
    #[arg(long = "page-size", value_name = "COUNT")]
    pub page_size: Option<u32>,

    /// Override the session lifetime in hours.
    #[arg(long = "session-ttl-hours", value_name = "HOURS")]
    pub session_ttl_hours: Option<u64>,

    /// Override the image upload directory.
    #[arg(long = "uploads-directory", value_name = "PATH", value_hint = ValueHint::DirPath)]
    pub uploads_directory: Option<PathBuf>,

    /// Override the maximum request body size for uploads, in bytes.
    #[arg(long = "uploads-max-request-bytes", value_name = "BYTES")]
    pub uploads_max_request_bytes: Option<u64>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),
    #[error("invalid configuration: {message}")]
    Invalid { message: String },
}

impl ConfigError {
    fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid {
            message: message.into(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RawSettings {
    pub server: RawServerSettings,
    pub database: RawDatabaseSettings,
    pub logging: RawLoggingSettings,
    pub pagination: RawPaginationSettings,
    pub sessions: RawSessionSettings,
    pub uploads: RawUploadSettings,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RawServerSettings {
    pub host: Option<String>,
    pub port: Option<u16>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RawDatabaseSettings {
    pub url: Option<String>,
    pub max_connections: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RawLoggingSettings {
    pub level: Option<String>,
    pub json: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RawPaginationSettings {
    pub page_size: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RawSessionSettings {
    pub ttl_hours: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RawUploadSettings {
    pub directory: Option<PathBuf>,
    pub max_request_bytes: Option<u64>,
}

impl RawSettings {
    pub fn apply_serve_overrides(&mut self, overrides: &ServeOverrides) {
        if let Some(host) = &overrides.server_host {
            self.server.host = Some(host.clone());
        }
        if let Some(port) = overrides.server_port {
            self.server.port = Some(port);
        }
        if let Some(url) = &overrides.database_url {
            self.database.url = Some(url.clone());
        }
        if let Some(max) = overrides.database_max_connections {
            self.database.max_connections = Some(max);
        }
        if let Some(level) = &overrides.log_level {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
        if let Some(size) = overrides.page_size {
            self.pagination.page_size = Some(size);
        }
        if let Some(hours) = overrides.session_ttl_hours {
            self.sessions.ttl_hours = Some(hours);
        }
        if let Some(directory) = &overrides.uploads_directory {
            self.uploads.directory = Some(directory.clone());
        }
        if let Some(bytes) = overrides.uploads_max_request_bytes {
            self.uploads.max_request_bytes = Some(bytes);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Compact,
    Json,
}

#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub addr: SocketAddr,
}

#[derive(Debug, Clone)]
pub struct DatabaseSettings {
    pub url: Option<String>,
    pub max_connections: NonZeroU32,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone)]
pub struct PaginationSettings {
    pub page_size: NonZeroU32,
}

#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub ttl: Duration,
}

#[derive(Debug, Clone)]
pub struct UploadSettings {
    pub directory: PathBuf,
    pub max_request_bytes: NonZeroU64,
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub database: DatabaseSettings,
    pub logging: LoggingSettings,
    pub pagination: PaginationSettings,
    pub sessions: SessionSettings,
    pub uploads: UploadSettings,
}

impl Settings {
    pub fn from_raw(raw: RawSettings) -> Result<Self, ConfigError> {
        let host = raw.server.host.as_deref().unwrap_or(DEFAULT_HOST);
        let host: IpAddr = host
            .parse()
            .map_err(|_| ConfigError::invalid(format!("`{host}` is not a valid listen address")))?;
        let port = raw.server.port.unwrap_or(DEFAULT_PORT);

        let level = match raw.logging.level.as_deref() {
            None => LevelFilter::INFO,
            Some(raw_level) => raw_level.parse().map_err(|_| {
                ConfigError::invalid(format!("`{raw_level}` is not a valid log level"))
            })?,
        };
        let format = if raw.logging.json.unwrap_or(false) {
            LogFormat::Json
        } else {
            LogFormat::Compact
        };

        let max_connections = raw
            .database
            .max_connections
            .unwrap_or(DEFAULT_DB_MAX_CONNECTIONS);
        let max_connections = NonZeroU32::new(max_connections)
            .ok_or_else(|| ConfigError::invalid("database.max_connections must be positive"))?;

        let page_size = raw.pagination.page_size.unwrap_or(DEFAULT_PAGE_SIZE);
        let page_size = NonZeroU32::new(page_size)
            .ok_or_else(|| ConfigError::invalid("pagination.page_size must be positive"))?;

        let ttl_hours = raw.sessions.ttl_hours.unwrap_or(DEFAULT_SESSION_TTL_HOURS);
        if ttl_hours == 0 {
            return Err(ConfigError::invalid("sessions.ttl_hours must be positive"));
        }

        let max_request_bytes = raw
            .uploads
            .max_request_bytes
            .unwrap_or(DEFAULT_UPLOAD_REQUEST_LIMIT_BYTES);
        let max_request_bytes = NonZeroU64::new(max_request_bytes)
            .ok_or_else(|| ConfigError::invalid("uploads.max_request_bytes must be positive"))?;

        Ok(Self {
            server: ServerSettings {
                addr: SocketAddr::new(host, port),
            },
            database: DatabaseSettings {
                url: raw.database.url,
                max_connections,
            },
            logging: LoggingSettings { level, format },
            pagination: PaginationSettings { page_size },
            sessions: SessionSettings {
                ttl: Duration::hours(ttl_hours as i64),
            },
            uploads: UploadSettings {
                directory: raw
                    .uploads
                    .directory
                    .unwrap_or_else(|| PathBuf::from(DEFAULT_UPLOAD_DIR)),
                max_request_bytes,
            },
        })
    }
}

/// Parse CLI arguments and resolve settings with file < environment < CLI
/// precedence.
pub fn load_with_cli() -> Result<(CliArgs, Settings), ConfigError> {
    let cli = CliArgs::parse();
    let settings = load_settings(&cli)?;
    Ok((cli, settings))
}

fn load_settings(cli: &CliArgs) -> Result<Settings, ConfigError> {
    let mut builder = Config::builder();

    builder = match &cli.config_file {
        Some(path) => builder.add_source(File::from(path.clone())),
        None => builder
            .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
            .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false)),
    };

    let loaded = builder
        .add_source(Environment::with_prefix(ENV_PREFIX).separator("__"))
        .build()?;

    let mut raw: RawSettings = loaded.try_deserialize()?;

    if let Some(Command::Serve(serve)) = &cli.command {
        raw.apply_serve_overrides(&serve.overrides);
    }

    Settings::from_raw(raw)
}
