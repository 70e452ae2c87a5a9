use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context};
use gateway_front::GatewayConfig;
use origin_guard::OriginAllowlist;
use serde::Deserialize;
use url::Url;

use crate::cli::Cli;

#[derive(Debug, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub network: NetworkConfig,
    #[serde(default)]
    pub upstream: UpstreamConfig,
    #[serde(default = "default_allowed_origins")]
    pub allowed_origins: Vec<String>,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            network: NetworkConfig::default(),
            upstream: UpstreamConfig::default(),
            allowed_origins: default_allowed_origins(),
            logging: LoggingConfig::default(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct NetworkConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct UpstreamConfig {
    #[serde(default = "default_rpc_url")]
    pub rpc_url: String,
    #[serde(default = "default_ws_url")]
    pub ws_url: String,
    #[serde(default = "default_rpc_timeout")]
    pub rpc_timeout_secs: u64,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_close_timeout")]
    pub close_timeout_secs: u64,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            rpc_url: default_rpc_url(),
            ws_url: default_ws_url(),
            rpc_timeout_secs: default_rpc_timeout(),
            connect_timeout_secs: default_connect_timeout(),
            close_timeout_secs: default_close_timeout(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Empty disables the audit log.
    #[serde(default = "default_audit_path")]
    pub audit_log_path: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            audit_log_path: default_audit_path(),
        }
    }
}

// ---------------------------------------------------------------------------
// Default-value functions used by serde
// ---------------------------------------------------------------------------

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_rpc_url() -> String {
    "https://s1.ripple.com:51234/".to_string()
}

fn default_ws_url() -> String {
    "wss://s1.ripple.com/".to_string()
}

fn default_allowed_origins() -> Vec<String> {
    vec![
        "http://localhost:3000".to_string(),
        "http://localhost:5173".to_string(),
    ]
}

fn default_rpc_timeout() -> u64 {
    20
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_close_timeout() -> u64 {
    5
}

fn default_max_body_bytes() -> usize {
    gateway_front::DEFAULT_MAX_BODY_BYTES
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_audit_path() -> String {
    "audit.jsonl".to_string()
}

// ---------------------------------------------------------------------------
// Loader
// ---------------------------------------------------------------------------

/// Where the loaded configuration came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSource {
    File,
    /// The file did not exist.
    Defaults,
}

/// Load configuration from a YAML file.
///
/// A missing file is not an error: defaults are returned so the gateway can
/// run from environment variables alone. The caller logs the source once
/// tracing is up.
pub fn load(path: &Path) -> anyhow::Result<(Config, ConfigSource)> {
    if !path.exists() {
        return Ok((Config::default(), ConfigSource::Defaults));
    }

    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {}", path.display()))?;

    let config: Config = serde_yml::from_str(&contents)
        .with_context(|| format!("failed to parse config file {}", path.display()))?;

    Ok((config, ConfigSource::File))
}

impl Config {
    /// Apply command-line and environment overrides on top of the file.
    pub fn apply_cli(&mut self, cli: &Cli) {
        if let Some(host) = &cli.host {
            self.network.host = host.clone();
        }
        if let Some(port) = cli.port {
            self.network.port = port;
        }
        if let Some(rpc_url) = &cli.rpc_url {
            self.upstream.rpc_url = rpc_url.clone();
        }
        if let Some(ws_url) = &cli.ws_url {
            self.upstream.ws_url = ws_url.clone();
        }
        if let Some(origins) = &cli.allowed_origins {
            self.allowed_origins = origins.clone();
        }
        if let Some(level) = &cli.log_level {
            self.logging.level = level.clone();
        }
        if let Some(path) = &cli.audit_log {
            self.logging.audit_log_path = path.clone();
        }
    }

    pub fn audit_log_path(&self) -> Option<PathBuf> {
        let path = self.logging.audit_log_path.trim();
        (!path.is_empty()).then(|| PathBuf::from(path))
    }

    /// Validate the upstream URLs and build the front's configuration.
    pub fn gateway_config(&self) -> anyhow::Result<GatewayConfig> {
        let rpc_url = parse_url(&self.upstream.rpc_url, &["http", "https"], "RPC_URL")?;
        let ws_url = parse_url(&self.upstream.ws_url, &["ws", "wss"], "WS_URL")?;

        let mut config = GatewayConfig::new(
            rpc_url,
            ws_url,
            OriginAllowlist::new(&self.allowed_origins),
        );
        config.rpc_timeout = Duration::from_secs(self.upstream.rpc_timeout_secs);
        config.upstream_connect_timeout = Duration::from_secs(self.upstream.connect_timeout_secs);
        config.bridge_close_timeout = Duration::from_secs(self.upstream.close_timeout_secs);
        config.max_body_bytes = self.max_body_bytes;
        Ok(config)
    }
}

fn parse_url(raw: &str, schemes: &[&str], name: &str) -> anyhow::Result<Url> {
    let url = Url::parse(raw).with_context(|| format!("{name} is not a valid URL: {raw}"))?;
    if !schemes.contains(&url.scheme()) {
        bail!(
            "{name} must use one of {} (got {})",
            schemes.join("/"),
            url.scheme()
        );
    }
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::io::Write;

    #[test]
    fn defaults_when_file_missing() {
        let dir = tempfile::tempdir().unwrap();
        let (cfg, source) = load(&dir.path().join("absent.yaml")).unwrap();
        assert_eq!(source, ConfigSource::Defaults);

        assert_eq!(cfg.network.host, "0.0.0.0");
        assert_eq!(cfg.network.port, 8080);
        assert_eq!(cfg.upstream.rpc_url, "https://s1.ripple.com:51234/");
        assert_eq!(cfg.upstream.ws_url, "wss://s1.ripple.com/");
        assert_eq!(
            cfg.allowed_origins,
            vec!["http://localhost:3000", "http://localhost:5173"]
        );
        assert_eq!(cfg.max_body_bytes, 1024 * 1024);
        assert_eq!(cfg.audit_log_path(), Some(PathBuf::from("audit.jsonl")));
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "network:\n  port: 9000\nupstream:\n  ws_url: ws://127.0.0.1:6006/\nallowed_origins:\n  - https://wallet.example"
        )
        .unwrap();

        let (cfg, source) = load(file.path()).unwrap();
        assert_eq!(source, ConfigSource::File);
        assert_eq!(cfg.network.port, 9000);
        assert_eq!(cfg.network.host, "0.0.0.0");
        assert_eq!(cfg.upstream.ws_url, "ws://127.0.0.1:6006/");
        assert_eq!(cfg.upstream.rpc_url, "https://s1.ripple.com:51234/");
        assert_eq!(cfg.upstream.rpc_timeout_secs, 20);
        assert_eq!(cfg.allowed_origins, vec!["https://wallet.example"]);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "network: [unterminated").unwrap();
        assert!(load(file.path()).is_err());
    }

    #[test]
    fn cli_overrides_file_values() {
        let mut cfg = Config::default();
        let cli = Cli::try_parse_from([
            "ledger-gateway",
            "--port",
            "9100",
            "--rpc-url",
            "http://127.0.0.1:5005/",
            "--allowed-origins",
            "https://a.example,https://b.example",
            "--audit-log",
            "",
        ])
        .unwrap();

        cfg.apply_cli(&cli);

        assert_eq!(cfg.network.port, 9100);
        assert_eq!(cfg.upstream.rpc_url, "http://127.0.0.1:5005/");
        assert_eq!(
            cfg.allowed_origins,
            vec!["https://a.example", "https://b.example"]
        );
        assert_eq!(cfg.audit_log_path(), None);
    }

    #[test]
    fn gateway_config_carries_limits_and_origins() {
        let mut cfg = Config::default();
        cfg.upstream.rpc_timeout_secs = 3;
        cfg.max_body_bytes = 4096;

        let gateway = cfg.gateway_config().unwrap();
        assert_eq!(gateway.rpc_timeout, Duration::from_secs(3));
        assert_eq!(gateway.max_body_bytes, 4096);
        assert!(gateway.allowlist.contains("http://localhost:5173"));
        assert_eq!(gateway.ws_url.scheme(), "wss");
    }

    #[test]
    fn rpc_url_must_be_http() {
        let mut cfg = Config::default();
        cfg.upstream.rpc_url = "wss://s1.ripple.com/".to_string();
        let err = cfg.gateway_config().unwrap_err();
        assert!(err.to_string().contains("RPC_URL"));
    }

    #[test]
    fn ws_url_must_be_websocket() {
        let mut cfg = Config::default();
        cfg.upstream.ws_url = "https://s1.ripple.com/".to_string();
        assert!(cfg.gateway_config().is_err());

        cfg.upstream.ws_url = "not a url".to_string();
        assert!(cfg.gateway_config().is_err());
    }
}
