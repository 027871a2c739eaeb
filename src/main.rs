//! braze-mcp-write stdio server - main entry point.
//!
//! Reads settings from flags or `BRAZE_*` environment variables, builds the
//! tool registry and serves MCP over stdin/stdout. Logs go to stderr.

use std::time::Duration;

use braze_mcp_write::observability::{init_tracing, is_json_format};
use braze_mcp_write::types::{ApiConfig, ObservabilityConfig, SafetyConfig, DEFAULT_ALLOWED_WORKSPACES};
use braze_mcp_write::{Config, Runtime};
use clap::builder::BoolishValueParser;
use clap::{ArgAction, Parser};

#[derive(Debug, Parser)]
#[command(name = "braze-mcp-write", version, about = "MCP server for guarded Braze write operations")]
struct Cli {
    /// REST API key
    #[arg(long, env = "BRAZE_API_KEY", hide_env_values = true, default_value = "")]
    api_key: String,

    /// Workspace REST endpoint, e.g. https://rest.iad-01.braze.com
    #[arg(long, env = "BRAZE_BASE_URL", default_value = "")]
    base_url: String,

    /// Master switch for write operations
    #[arg(long, env = "BRAZE_WRITE_ENABLED", default_value = "false",
          action = ArgAction::Set, value_parser = BoolishValueParser::new())]
    write_enabled: bool,

    /// Allow writes to workspaces outside the allow-list
    #[arg(long, env = "BRAZE_ALLOW_PRODUCTION", default_value = "false",
          action = ArgAction::Set, value_parser = BoolishValueParser::new())]
    allow_production: bool,

    /// Dry-run mutating tools unless dry_run=false is passed
    #[arg(long, env = "BRAZE_DRY_RUN_DEFAULT", default_value = "false",
          action = ArgAction::Set, value_parser = BoolishValueParser::new())]
    dry_run_default: bool,

    /// Comma-separated substrings that mark a workspace as safe
    #[arg(long, env = "BRAZE_ALLOWED_WORKSPACES", default_value = DEFAULT_ALLOWED_WORKSPACES)]
    allowed_workspaces: String,

    #[arg(long, env = "BRAZE_MAX_SENDS_PER_HOUR", default_value_t = 1000)]
    max_sends_per_hour: u32,

    #[arg(long, env = "BRAZE_MAX_CATALOG_UPDATES_PER_MIN", default_value_t = 100)]
    max_catalog_updates_per_min: u32,

    /// Timeout for each REST call, in seconds
    #[arg(long, env = "BRAZE_REQUEST_TIMEOUT_SECS", default_value_t = 30)]
    request_timeout_secs: u64,

    /// Log output format: text or json
    #[arg(long, env = "BRAZE_LOG_FORMAT", default_value = "text")]
    log_format: String,

    /// Level used when RUST_LOG is unset
    #[arg(long, env = "BRAZE_LOG_LEVEL", default_value = "info")]
    log_level: String,
}

impl From<Cli> for Config {
    fn from(cli: Cli) -> Self {
        Config {
            api: ApiConfig::new(cli.base_url, cli.api_key)
                .with_timeout(Duration::from_secs(cli.request_timeout_secs)),
            safety: SafetyConfig {
                write_enabled: cli.write_enabled,
                allow_production: cli.allow_production,
                dry_run_default: cli.dry_run_default,
                allowed_workspaces: SafetyConfig::parse_patterns(&cli.allowed_workspaces),
                max_sends_per_hour: cli.max_sends_per_hour,
                max_catalog_updates_per_min: cli.max_catalog_updates_per_min,
            },
            observability: ObservabilityConfig {
                log_level: cli.log_level,
                json_logs: is_json_format(&cli.log_format),
            },
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::from(Cli::parse());

    init_tracing(&config.observability);

    let rt = tokio::runtime::Builder::new_multi_thread().enable_all().build()?;
    let result = rt.block_on(run(config));
    // Stdin is read on a blocking thread that may still be parked in read().
    rt.shutdown_background();
    result
}

async fn run(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let runtime = Runtime::bootstrap(config)?;
    let server = runtime.server();

    let cancel = server.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupt received");
            cancel.cancel();
        }
    });

    server.serve(tokio::io::stdin(), tokio::io::stdout()).await?;
    tracing::info!("Server stopped");
    Ok(())
}
