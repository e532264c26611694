//! ============================================================================
//! Runtime Configuration - Environment-driven settings
//! ============================================================================

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const DEFAULT_PORT: u16 = 5174;

/// Server bind and client target settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuntimeConfig {
    pub allow_lan: bool,
    pub host: String,
    pub port: u16,
    /// Base URL the sync controller talks to
    pub server_url: String,
    /// Client snapshot database; None means ~/.shopkeeper/campaign.redb
    pub db_path: Option<PathBuf>,
    /// Served document database; None means ~/.shopkeeper/server.redb
    pub server_db_path: Option<PathBuf>,
}

impl RuntimeConfig {
    /// Resolve from the process environment
    pub fn from_env() -> Self {
        Self::resolve_with(|key| std::env::var(key).ok())
    }

    /// Resolve from an arbitrary variable lookup
    pub fn resolve_with<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let allow_lan = lookup("ALLOW_LAN").as_deref() != Some("false");
        let host = if allow_lan { "0.0.0.0" } else { "127.0.0.1" }.to_string();

        // An unparseable PROXY_PORT falls through to PORT, then the default
        let port = ["PROXY_PORT", "PORT"]
            .iter()
            .find_map(|key| lookup(key).and_then(|v| v.trim().parse::<u16>().ok()))
            .unwrap_or(DEFAULT_PORT);

        let server_url = lookup("SHOP_SERVER_URL")
            .filter(|url| !url.trim().is_empty())
            .unwrap_or_else(|| format!("http://127.0.0.1:{}", port));

        let path_var = |key: &str| {
            lookup(key)
                .filter(|path| !path.trim().is_empty())
                .map(PathBuf::from)
        };
        let db_path = path_var("SHOP_DB_PATH");
        let server_db_path = path_var("SHOP_SERVER_DB_PATH");

        Self {
            allow_lan,
            host,
            port,
            server_url,
            db_path,
            server_db_path,
        }
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self::resolve_with(|_| None)
    }
}
