use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::import::FetchSettings;

/// Recipe box backend: recipe collection, media folders and web import.
#[derive(Debug, Clone, Parser)]
#[command(name = "kitchen-api", version, about)]
pub struct Config {
    /// Address to listen on
    #[arg(long, env = "KITCHEN_BIND", default_value = "0.0.0.0:3000")]
    pub bind: SocketAddr,

    /// Data root; holds `recipes/recipes.json` and `recipes/medias/`
    #[arg(long, env = "KITCHEN_ROOT", default_value = ".")]
    pub root: PathBuf,

    /// Directory of front-end files served for unmatched routes
    #[arg(long, env = "KITCHEN_STATIC_DIR")]
    pub static_dir: Option<PathBuf>,

    /// Total timeout for outbound fetches during import, in seconds
    #[arg(long, env = "KITCHEN_FETCH_TIMEOUT_SECS", default_value_t = 10)]
    pub fetch_timeout_secs: u64,

    /// Connect timeout for outbound fetches during import, in seconds
    #[arg(long, env = "KITCHEN_CONNECT_TIMEOUT_SECS", default_value_t = 5)]
    pub connect_timeout_secs: u64,

    /// Accept invalid TLS certificates when importing
    #[arg(long, env = "KITCHEN_INSECURE_SSL")]
    pub insecure_ssl: bool,

    /// Maximum request body size in megabytes
    #[arg(long, env = "KITCHEN_MAX_BODY_MB", default_value_t = 50)]
    pub max_body_mb: usize,
}

impl Config {
    /// Configuration rooted at `root` with every other setting at its default.
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        let mut config = Self::parse_from(["kitchen-api"]);
        config.root = root.into();
        config
    }

    pub fn recipes_file(&self) -> PathBuf {
        self.root.join("recipes").join("recipes.json")
    }

    pub fn media_dir(&self) -> PathBuf {
        self.root.join("recipes").join("medias")
    }

    pub fn max_body_bytes(&self) -> usize {
        self.max_body_mb.saturating_mul(1024 * 1024)
    }

    pub fn fetch_settings(&self) -> FetchSettings {
        FetchSettings {
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            timeout: Duration::from_secs(self.fetch_timeout_secs),
            insecure_ssl: self.insecure_ssl,
        }
    }
}
