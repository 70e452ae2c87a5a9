use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "ledger-gateway",
    version,
    about = "Origin-checked gateway to a ledger node's JSON-RPC and streaming endpoints"
)]
pub struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "gateway.yaml")]
    pub config: PathBuf,

    /// Address to bind (overrides config file setting)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to listen on (overrides config file setting)
    #[arg(short, long, env = "PORT")]
    pub port: Option<u16>,

    /// Upstream JSON-RPC endpoint
    #[arg(long, env = "RPC_URL")]
    pub rpc_url: Option<String>,

    /// Upstream WebSocket endpoint
    #[arg(long, env = "WS_URL")]
    pub ws_url: Option<String>,

    /// Comma-separated list of browser origins allowed to connect
    #[arg(long, env = "ALLOWED_ORIGINS", value_delimiter = ',')]
    pub allowed_origins: Option<Vec<String>>,

    /// Log level used when RUST_LOG is not set
    #[arg(long)]
    pub log_level: Option<String>,

    /// Audit log path; an empty value disables auditing
    #[arg(long)]
    pub audit_log: Option<String>,
}
