use std::env;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

/// Top-level configuration, read from the environment (and `.env`).
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub uploads: UploadConfig,
    pub sessions: SessionConfig,
    pub otp_ttl_minutes: i64,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

#[derive(Debug, Clone)]
pub struct UploadConfig {
    pub dir: PathBuf,
    pub max_bytes: usize,
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub idle_minutes: i64,
    pub secure: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self { idle_minutes: 60, secure: false }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{key} must be {expected}, got '{value}'")]
    Invalid {
        key: &'static str,
        expected: &'static str,
        value: String,
    },
    #[error("APP_HOST must parse to an IPv4 or IPv6 address")]
    InvalidHost(#[source] std::net::AddrParseError),
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_owned());

        Ok(Self {
            database_url: var("DATABASE_URL", "sqlite://hakkutsu.db?mode=rwc"),
            server: ServerConfig {
                host: var("APP_HOST", "127.0.0.1"),
                port: parse("APP_PORT", var("APP_PORT", "8080"), "a port number")?,
            },
            telemetry: TelemetryConfig {
                log_level: var("APP_LOG_LEVEL", "info"),
            },
            uploads: UploadConfig {
                dir: PathBuf::from(var("UPLOAD_DIR", "uploads")),
                max_bytes: parse("UPLOAD_MAX_BYTES", var("UPLOAD_MAX_BYTES", "5242880"), "a byte count")?,
            },
            sessions: SessionConfig {
                idle_minutes: parse("SESSION_IDLE_MINUTES", var("SESSION_IDLE_MINUTES", "60"), "a number of minutes")?,
                secure: parse("SESSION_SECURE", var("SESSION_SECURE", "false"), "true or false")?,
            },
            otp_ttl_minutes: parse("OTP_TTL_MINUTES", var("OTP_TTL_MINUTES", "10"), "a number of minutes")?,
        })
    }
}

fn parse<T: std::str::FromStr>(key: &'static str, value: String, expected: &'static str) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::Invalid { key, expected, value })
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self.host.parse().map_err(ConfigError::InvalidHost)?;
        Ok(SocketAddr::new(ip, self.port))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = load(&[]).expect("defaults load");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.telemetry.log_level, "info");
        assert_eq!(config.uploads.max_bytes, 5 * 1024 * 1024);
        assert_eq!(config.sessions.idle_minutes, 60);
        assert!(!config.sessions.secure);
        assert_eq!(config.otp_ttl_minutes, 10);
    }

    #[test]
    fn rejects_bad_port() {
        let err = load(&[("APP_PORT", "eighty")]).expect_err("port must be numeric");
        assert!(matches!(err, ConfigError::Invalid { key: "APP_PORT", .. }));
    }

    #[test]
    fn localhost_resolves_to_loopback() {
        let config = load(&[("APP_HOST", "localhost"), ("APP_PORT", "3000")]).expect("config loads");
        let addr = config.server.socket_addr().expect("localhost resolves");
        assert_eq!(addr, SocketAddr::new(IpAddr::from([127, 0, 0, 1]), 3000));
    }

    #[test]
    fn hostnames_other_than_localhost_are_rejected() {
        let config = load(&[("APP_HOST", "example.com")]).expect("config loads");
        assert!(matches!(config.server.socket_addr(), Err(ConfigError::InvalidHost(_))));
    }
}
