//! Server Configuration

use std::time::Duration;

use fastpos_core::media::DEFAULT_MAX_UPLOAD_BYTES;

/// Settings read once at startup
#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_addr: String,

    /// Directory holding the compiled web shell
    pub static_dir: String,

    /// Delay between video operation status checks
    pub poll_interval: Duration,

    pub max_upload_bytes: usize,

    /// Surfaces untouched for this long are closed by the idle sweep
    pub surface_idle: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:3000".into(),
            static_dir: "static".into(),
            poll_interval: Duration::from_secs(5),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            surface_idle: Duration::from_secs(30 * 60),
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let poll_interval = lookup("VIDEO_POLL_SECS")
            .and_then(|s| s.parse::<u64>().ok())
            .filter(|secs| *secs > 0)
            .map_or(defaults.poll_interval, Duration::from_secs);
        let surface_idle = lookup("SURFACE_IDLE_SECS")
            .and_then(|s| s.parse::<u64>().ok())
            .filter(|secs| *secs > 0)
            .map_or(defaults.surface_idle, Duration::from_secs);
        let max_upload_bytes = lookup("MAX_UPLOAD_BYTES")
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.max_upload_bytes);

        Self {
            bind_addr: lookup("BIND_ADDR").unwrap_or(defaults.bind_addr),
            static_dir: lookup("STATIC_DIR").unwrap_or(defaults.static_dir),
            poll_interval,
            max_upload_bytes,
            surface_idle,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_when_unset() {
        let config = ServerConfig::from_lookup(|_| None);
        assert_eq!(config.bind_addr, "0.0.0.0:3000");
        assert_eq!(config.static_dir, "static");
        assert_eq!(config.poll_interval, Duration::from_secs(5));
        assert_eq!(config.max_upload_bytes, 20 * 1024 * 1024);
        assert_eq!(config.surface_idle, Duration::from_secs(1800));
    }

    #[test]
    fn test_overrides_and_bad_values() {
        let config = ServerConfig::from_lookup(|name| match name {
            "BIND_ADDR" => Some("127.0.0.1:8080".into()),
            "VIDEO_POLL_SECS" => Some("0".into()),
            "MAX_UPLOAD_BYTES" => Some("1048576".into()),
            "SURFACE_IDLE_SECS" => Some("600".into()),
            _ => None,
        });
        assert_eq!(config.bind_addr, "127.0.0.1:8080");
        assert_eq!(config.poll_interval, Duration::from_secs(5));
        assert_eq!(config.max_upload_bytes, 1_048_576);
        assert_eq!(config.surface_idle, Duration::from_secs(600));
    }
}
