//! Grant negotiation server - Entry Point

use clap::Parser;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use gnap_negotiator::config::{CallbackRefParam, Config, ExpiryPolicy};
use gnap_negotiator::server::GrantServer;

#[derive(Parser, Debug)]
#[command(name = "gnap-negotiator")]
#[command(about = "Grant negotiation server with rotating continuation handles")]
#[command(version)]
struct Cli {
    /// TCP port to listen on
    #[arg(long, default_value = "3000", env = "PORT")]
    port: u16,

    /// Host used to build interaction URLs (overrides INTERACTION_HOST)
    #[arg(long)]
    host: Option<String>,

    /// Expiry policy: absolute or sliding (overrides EXPIRY_POLICY)
    #[arg(long)]
    expiry_policy: Option<ExpiryPolicy>,

    /// Callback reference parameter: interact or interaction_handle
    /// (overrides CALLBACK_REF_PARAM)
    #[arg(long)]
    callback_param: Option<CallbackRefParam>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", env = "RUST_LOG")]
    log_level: String,

    /// Output logs as JSON
    #[arg(long)]
    json_logs: bool,
}

impl Cli {
    /// Apply command-line overrides on top of the environment configuration.
    fn apply(&self, mut config: Config) -> Config {
        if let Some(host) = &self.host {
            config.interaction_host.clone_from(host);
        }
        if let Some(policy) = self.expiry_policy {
            config.expiry_policy = policy;
        }
        if let Some(param) = self.callback_param {
            config.callback_ref_param = param;
        }
        config
    }
}

fn init_tracing(log_level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    let subscriber = tracing_subscriber::registry().with(filter);

    if json {
        subscriber.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        subscriber.with(tracing_subscriber::fmt::layer().compact()).init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    init_tracing(&cli.log_level, cli.json_logs);

    let config = cli.apply(Config::from_env()?);

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        host = %config.interaction_host,
        expiry_policy = ?config.expiry_policy,
        "Starting grant negotiation server"
    );

    GrantServer::new(config).run_http(cli.port).await
}
