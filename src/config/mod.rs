use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;

const DEFAULT_PORT: u16 = 5004;
const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_LAYOUT: &str = "index";

/// Application configuration and constants
#[derive(Debug, Clone)]
pub struct Config {
    pub theme_dir: Arc<PathBuf>,
    pub static_dir: Arc<PathBuf>,
    pub layout: String,
    pub port: u16,
    pub host: String,
}

impl Config {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self {
            theme_dir: Arc::new(PathBuf::from("theme")),
            static_dir: Arc::new(PathBuf::from("theme/static")),
            layout: DEFAULT_LAYOUT.to_string(),
            port: DEFAULT_PORT,
            host: DEFAULT_HOST.to_string(),
        }
    }

    /// Create configuration with custom values
    pub fn with_custom(
        theme_dir: PathBuf,
        layout: Option<String>,
        port: Option<u16>,
        host: Option<String>,
    ) -> Self {
        let static_dir = theme_dir.join("static");
        Self {
            theme_dir: Arc::new(theme_dir),
            static_dir: Arc::new(static_dir),
            layout: layout.unwrap_or_else(|| DEFAULT_LAYOUT.to_string()),
            port: port.unwrap_or(DEFAULT_PORT),
            host: host.unwrap_or_else(|| DEFAULT_HOST.to_string()),
        }
    }

    /// Read `RIALTO_HOST`, `RIALTO_PORT`, `RIALTO_THEME` and `RIALTO_LAYOUT`
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a configuration from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let theme_dir = lookup("RIALTO_THEME")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("theme"));

        let port = lookup("RIALTO_PORT").and_then(|raw| match raw.parse::<u16>() {
            Ok(port) => Some(port),
            Err(_) => {
                log::warn!("Ignoring invalid RIALTO_PORT '{}', using {}", raw, DEFAULT_PORT);
                None
            }
        });

        let host = lookup("RIALTO_HOST").and_then(|raw| match raw.parse::<IpAddr>() {
            Ok(_) => Some(raw),
            Err(_) => {
                log::warn!("Ignoring invalid RIALTO_HOST '{}', using {}", raw, DEFAULT_HOST);
                None
            }
        });

        let layout = lookup("RIALTO_LAYOUT").filter(|name| !name.trim().is_empty());

        Self::with_custom(theme_dir, layout, port, host)
    }

    /// Get the socket address for binding
    pub fn socket_addr(&self) -> SocketAddr {
        let ip = self
            .host
            .parse::<IpAddr>()
            .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED));
        SocketAddr::new(ip, self.port)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn defaults_without_environment() {
        let config = Config::from_lookup(|_| None);
        assert_eq!(config.port, 5004);
        assert_eq!(config.layout, "index");
        assert_eq!(*config.theme_dir, PathBuf::from("theme"));
        assert_eq!(*config.static_dir, PathBuf::from("theme/static"));
        assert_eq!(config.socket_addr().to_string(), "0.0.0.0:5004");
    }

    #[test]
    fn reads_overrides() {
        let config = Config::from_lookup(lookup_from(&[
            ("RIALTO_HOST", "127.0.0.1"),
            ("RIALTO_PORT", "8080"),
            ("RIALTO_THEME", "/srv/theme"),
            ("RIALTO_LAYOUT", "base"),
        ]));
        assert_eq!(config.socket_addr().to_string(), "127.0.0.1:8080");
        assert_eq!(config.layout, "base");
        assert_eq!(*config.static_dir, PathBuf::from("/srv/theme/static"));
    }

    #[test]
    fn invalid_values_fall_back() {
        let config = Config::from_lookup(lookup_from(&[
            ("RIALTO_HOST", "not a host"),
            ("RIALTO_PORT", "eighty"),
            ("RIALTO_LAYOUT", "  "),
        ]));
        assert_eq!(config.port, 5004);
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.layout, "index");
    }
}
