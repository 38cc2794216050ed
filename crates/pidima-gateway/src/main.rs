//! Pidima gateway entry point.
//!
//! Loads configuration and starts the axum-based HTTP gateway.
//!
//! # Environment variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `PIDIMA_CONFIG` | *(none)* | Path to a YAML/TOML/JSON config file. |
//! | `PIDIMA_*` | | Overrides, `__` for nesting (`PIDIMA_JWT__SECRET`). |
//! | `LOG_FORMAT` | text | `json` for JSON log lines. |
//! | `RUST_LOG` | `pidima_gateway=info` | Log filter directives. |

use eyre::WrapErr;
use pidima_gateway::server::GatewayServer;
use pidima_kernel::config;
use pidima_kernel::gateway::GatewayConfig;
use tracing::info;
use tracing_subscriber::EnvFilter;

const ENV_PREFIX: &str = "PIDIMA";

fn init_tracing() -> eyre::Result<()> {
    let filter = EnvFilter::from_default_env().add_directive("pidima_gateway=info".parse()?);
    let json = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));
    if json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
    Ok(())
}

fn load_config() -> eyre::Result<GatewayConfig> {
    match std::env::var("PIDIMA_CONFIG") {
        Ok(path) => config::load_with_env(&path, ENV_PREFIX)
            .wrap_err_with(|| format!("failed to load config from {path}")),
        Err(_) => config::load_from_env(ENV_PREFIX).wrap_err("failed to load config from env"),
    }
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    init_tracing()?;

    let gateway_config = load_config()?;
    gateway_config
        .validate()
        .wrap_err("invalid gateway configuration")?;

    info!(
        port = gateway_config.port,
        users = gateway_config.users.len(),
        upstream = ?gateway_config.upstream.base_url,
        "Pidima gateway configuration loaded"
    );

    GatewayServer::new(gateway_config)
        .start()
        .await
        .wrap_err("gateway stopped")?;
    Ok(())
}
