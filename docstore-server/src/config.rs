use anyhow::Context;
use clap::Parser;
use docstore::identifier::PolicyKind;
use serde::{Deserialize, Serialize};
use std::net::{SocketAddr, ToSocketAddrs};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Command line flags. Every flag that is given overrides the matching
/// setting of the configuration file.
#[derive(Parser, Debug)]
#[command(name = "docstore-server")]
#[command(about = "Schema-less JSON document collections over HTTP")]
pub struct Args {
    /// TOML configuration file; defaults apply when it does not exist
    #[arg(short, long, default_value = "docstore.toml")]
    pub config: PathBuf,

    #[arg(long)]
    pub host: Option<String>,

    #[arg(short, long)]
    pub port: Option<u16>,

    /// Directory of the fjall keyspace
    #[arg(short, long)]
    pub data_dir: Option<PathBuf>,

    /// Collection manifest, one collection name per line
    #[arg(short, long)]
    pub manifest: Option<PathBuf>,

    /// Identifier policy: `token` or `positional`
    #[arg(long)]
    pub policy: Option<PolicyKind>,

    /// Keep every collection in memory instead of on disk
    #[arg(long)]
    pub in_memory: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub data_dir: PathBuf,
    pub manifest: PathBuf,
    pub identifier_policy: PolicyKind,
    pub request_timeout_secs: u64,
    pub in_memory: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            host: "localhost".to_string(),
            port: 8888,
            data_dir: PathBuf::from("storage"),
            manifest: PathBuf::from("collections.conf"),
            identifier_policy: PolicyKind::Token,
            request_timeout_secs: 30,
            in_memory: false,
        }
    }
}

impl ServerConfig {
    /// Reads the configuration file, or returns the defaults when there is
    /// none at `path`.
    pub fn load(path: &Path) -> anyhow::Result<ServerConfig> {
        if !path.exists() {
            log::info!("Configuration file {} not found, using defaults", path.display());
            return Ok(ServerConfig::default());
        }
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("could not read configuration file {}", path.display()))?;
        ServerConfig::from_toml(&text)
            .with_context(|| format!("invalid configuration file {}", path.display()))
    }

    pub fn from_toml(text: &str) -> anyhow::Result<ServerConfig> {
        Ok(toml::from_str::<ServerConfig>(text)?)
    }

    pub fn apply(&mut self, args: &Args) {
        if let Some(host) = &args.host {
            self.host = host.clone();
        }
        if let Some(port) = args.port {
            self.port = port;
        }
        if let Some(data_dir) = &args.data_dir {
            self.data_dir = data_dir.clone();
        }
        if let Some(manifest) = &args.manifest {
            self.manifest = manifest.clone();
        }
        if let Some(policy) = args.policy {
            self.identifier_policy = policy;
        }
        if args.in_memory {
            self.in_memory = true;
        }
    }

    pub fn bind_addr(&self) -> anyhow::Result<SocketAddr> {
        (self.host.as_str(), self.port)
            .to_socket_addrs()
            .with_context(|| format!("could not resolve {}:{}", self.host, self.port))?
            .next()
            .with_context(|| format!("no address for {}:{}", self.host, self.port))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
