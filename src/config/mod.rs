//! Configuration layer: typed settings with layered precedence (file → env → CLI).

mod cli;

use std::{collections::BTreeMap, net::SocketAddr, num::NonZeroUsize, str::FromStr, time::Duration};

use clap::Parser;
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;

pub use cli::{CliArgs, Command, PageOverrides, RenderArgs, ServeArgs, ServeOverrides};

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "shellstream";
const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 3000;
const DEFAULT_PAGE_NAME: &str = "Shellstream User";
const DEFAULT_PAGE_TITLE: &str = "Shellstream";
const DEFAULT_DEFERRED_DELAY_MS: u64 = 250;
const MAX_DEFERRED_DELAY_MS: u64 = 60_000;

/// Fully-resolved settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub logging: LoggingSettings,
    pub page: PageSettings,
}

#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub addr: SocketAddr,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Json,
    Compact,
}

/// What the demo route renders and how it answers.
#[derive(Debug, Clone)]
pub struct PageSettings {
    pub name: String,
    pub title: String,
    pub identifier_prefix: Option<String>,
    pub bootstrap_scripts: Vec<String>,
    pub bootstrap_modules: Vec<String>,
    pub bootstrap_script_content: Option<String>,
    pub nonce: Option<String>,
    pub progressive_chunk_size: Option<NonZeroUsize>,
    pub deferred_delay: Duration,
    pub status: Option<u16>,
    pub headers: Vec<(String, String)>,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    pub(crate) fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Load settings using the configured precedence (file → environment → CLI).
pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(Environment::with_prefix("SHELLSTREAM").separator("__"));

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;

    match cli.command.as_ref() {
        Some(Command::Serve(args)) => raw.apply_serve_overrides(&args.overrides),
        Some(Command::Render(args)) => raw.apply_page_overrides(&args.page),
        None => raw.apply_serve_overrides(&ServeOverrides::default()),
    }

    Settings::from_raw(raw)
}

/// Resolve configuration using the process arguments, returning both for downstream use.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    server: RawServerSettings,
    logging: RawLoggingSettings,
    page: RawPageSettings,
}

impl RawSettings {
    fn apply_serve_overrides(&mut self, overrides: &ServeOverrides) {
        if let Some(host) = overrides.server_host.as_ref() {
            self.server.host = Some(host.clone());
        }
        if let Some(port) = overrides.server_port {
            self.server.port = Some(port);
        }
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }

        self.apply_page_overrides(&overrides.page);
    }

    fn apply_page_overrides(&mut self, overrides: &PageOverrides) {
        if let Some(name) = overrides.name.as_ref() {
            self.page.name = Some(name.clone());
        }
        if let Some(prefix) = overrides.identifier_prefix.as_ref() {
            self.page.identifier_prefix = Some(prefix.clone());
        }
        if let Some(delay) = overrides.deferred_delay_ms {
            self.page.deferred_delay_ms = Some(delay);
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            server,
            logging,
            page,
        } = raw;

        Ok(Self {
            server: build_server_settings(server)?,
            logging: build_logging_settings(logging)?,
            page: build_page_settings(page)?,
        })
    }
}

fn build_server_settings(server: RawServerSettings) -> Result<ServerSettings, LoadError> {
    let host = server.host.unwrap_or_else(|| DEFAULT_HOST.to_string());
    let port = server.port.unwrap_or(DEFAULT_PORT);
    if port == 0 {
        return Err(LoadError::invalid(
            "server.port",
            "port must be greater than zero",
        ));
    }

    let addr = parse_socket_addr(&host, port)
        .map_err(|reason| LoadError::invalid("server.addr", reason))?;

    Ok(ServerSettings { addr })
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None => LevelFilter::INFO,
    };

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    Ok(LoggingSettings { level, format })
}

fn build_page_settings(page: RawPageSettings) -> Result<PageSettings, LoadError> {
    let name = non_blank(page.name).unwrap_or_else(|| DEFAULT_PAGE_NAME.to_string());
    let title = non_blank(page.title).unwrap_or_else(|| DEFAULT_PAGE_TITLE.to_string());

    let status = match page.status {
        Some(code) if !(100..=599).contains(&code) => {
            return Err(LoadError::invalid(
                "page.status",
                format!("`{code}` is not an HTTP status code"),
            ));
        }
        other => other,
    };

    let progressive_chunk_size = match page.progressive_chunk_size {
        Some(size) => Some(
            NonZeroUsize::new(size).ok_or_else(|| {
                LoadError::invalid("page.progressive_chunk_size", "must be greater than zero")
            })?,
        ),
        None => None,
    };

    let delay_ms = page.deferred_delay_ms.unwrap_or(DEFAULT_DEFERRED_DELAY_MS);
    if delay_ms > MAX_DEFERRED_DELAY_MS {
        return Err(LoadError::invalid(
            "page.deferred_delay_ms",
            format!("must not exceed {MAX_DEFERRED_DELAY_MS}"),
        ));
    }

    let headers = page
        .headers
        .unwrap_or_default()
        .into_iter()
        .map(|(name, value)| (name.trim().to_ascii_lowercase(), value))
        .collect::<Vec<_>>();
    if headers.iter().any(|(name, _)| name.is_empty()) {
        return Err(LoadError::invalid(
            "page.headers",
            "header names must not be empty",
        ));
    }

    Ok(PageSettings {
        name,
        title,
        identifier_prefix: non_blank(page.identifier_prefix),
        bootstrap_scripts: page.bootstrap_scripts.unwrap_or_default(),
        bootstrap_modules: page.bootstrap_modules.unwrap_or_default(),
        bootstrap_script_content: non_blank(page.bootstrap_script_content),
        nonce: non_blank(page.nonce),
        progressive_chunk_size,
        deferred_delay: Duration::from_millis(delay_ms),
        status,
        headers,
    })
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawServerSettings {
    host: Option<String>,
    port: Option<u16>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawPageSettings {
    name: Option<String>,
    title: Option<String>,
    identifier_prefix: Option<String>,
    bootstrap_scripts: Option<Vec<String>>,
    bootstrap_modules: Option<Vec<String>>,
    bootstrap_script_content: Option<String>,
    nonce: Option<String>,
    progressive_chunk_size: Option<usize>,
    deferred_delay_ms: Option<u64>,
    status: Option<u16>,
    headers: Option<BTreeMap<String, String>>,
}

fn parse_socket_addr(host: &str, port: u16) -> Result<SocketAddr, String> {
    let candidate = format!("{host}:{port}");
    candidate
        .parse()
        .map_err(|err| format!("invalid address `{candidate}`: {err}"))
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.and_then(|value| {
        let trimmed = value.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    })
}

#[cfg(test)]
mod tests;
