use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueHint, builder::BoolishValueParser};

/// Command-line arguments for the Shellstream binary.
#[derive(Debug, Parser)]
#[command(name = "shellstream", version, about = "Streaming server-side render demo")]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(
        long = "config-file",
        env = "SHELLSTREAM_CONFIG_FILE",
        value_name = "PATH",
        value_hint = ValueHint::FilePath
    )]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Serve the application page over HTTP.
    Serve(Box<ServeArgs>),
    /// Stream the application page to stdout.
    Render(RenderArgs),
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeArgs {
    #[command(flatten)]
    pub overrides: ServeOverrides,
}

#[derive(Debug, Args, Default, Clone)]
pub struct PageOverrides {
    /// Override the name greeted by the application page.
    #[arg(long = "page-name", value_name = "NAME")]
    pub name: Option<String>,

    /// Override the identifier prefix passed to the renderer.
    #[arg(long = "page-identifier-prefix", value_name = "PREFIX")]
    pub identifier_prefix: Option<String>,

    /// Override the delay before the deferred section resolves.
    #[arg(long = "page-deferred-delay-ms", value_name = "MILLISECONDS")]
    pub deferred_delay_ms: Option<u64>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeOverrides {
    #[command(flatten)]
    pub page: PageOverrides,

    /// Override the listener host.
    #[arg(long = "server-host", value_name = "HOST")]
    pub server_host: Option<String>,

    /// Override the listener port.
    #[arg(long = "server-port", value_name = "PORT")]
    pub server_port: Option<u16>,

    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub log_json: Option<bool>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct RenderArgs {
    #[command(flatten)]
    pub page: PageOverrides,
}
