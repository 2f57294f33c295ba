//! Service configuration from environment variables.
//!
//! Fails fast: a missing `DATABASE_URL` or malformed value aborts startup
//! before anything binds or connects. Insecure defaults are tolerated only
//! outside production.

use std::env;

/// Development-only default for the webhook secret encryption key.
const DEV_ENCRYPTION_KEY_HEX: &str =
    "7777777777777777777777777777777777777777777777777777777777777777";

/// Service configuration.
pub struct Config {
    /// Deployment environment (`development`, `staging`, `production`).
    pub app_env: String,
    /// Bind host.
    pub host: String,
    /// Bind port.
    pub port: u16,
    /// Default log filter when `RUST_LOG` is unset.
    pub rust_log: String,
    /// PostgreSQL connection string.
    pub database_url: String,
    /// Connection pool size.
    pub db_max_connections: u32,
    /// 32-byte key for endpoint signing secrets at rest (hex-encoded in env).
    pub webhook_encryption_key: [u8; 32],
    /// Allow plain-HTTP endpoint URLs (dev/test only).
    pub allow_http_endpoints: bool,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("app_env", &self.app_env)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database_url", &"[redacted]")
            .field("db_max_connections", &self.db_max_connections)
            .field("allow_http_endpoints", &self.allow_http_endpoints)
            .finish_non_exhaustive()
    }
}

impl Config {
    /// Load configuration from the environment (and `.env` if present).
    pub fn from_env() -> Result<Self, String> {
        dotenvy::dotenv().ok();

        let app_env = env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());
        let host = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = env::var("PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse::<u16>()
            .map_err(|e| format!("PORT must be a valid port number: {e}"))?;
        let rust_log = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        let database_url =
            env::var("DATABASE_URL").map_err(|_| "DATABASE_URL must be set".to_string())?;
        let db_max_connections = env::var("DB_MAX_CONNECTIONS")
            .unwrap_or_else(|_| "10".to_string())
            .parse::<u32>()
            .map_err(|e| format!("DB_MAX_CONNECTIONS must be a number: {e}"))?;

        let key_hex = env::var("WEBHOOK_ENCRYPTION_KEY")
            .unwrap_or_else(|_| DEV_ENCRYPTION_KEY_HEX.to_string());
        if app_env == "production" && key_hex == DEV_ENCRYPTION_KEY_HEX {
            return Err(
                "WEBHOOK_ENCRYPTION_KEY must be set to a real key in production".to_string(),
            );
        }
        let webhook_encryption_key = parse_hex_key("WEBHOOK_ENCRYPTION_KEY", &key_hex)?;

        let allow_http_endpoints = env::var("ALLOW_HTTP_ENDPOINTS")
            .map(|v| v == "true" || v == "1")
            .unwrap_or(false);
        if app_env == "production" && allow_http_endpoints {
            return Err("ALLOW_HTTP_ENDPOINTS cannot be enabled in production".to_string());
        }

        Ok(Self {
            app_env,
            host,
            port,
            rust_log,
            database_url,
            db_max_connections,
            webhook_encryption_key,
            allow_http_endpoints,
        })
    }
}

/// Parse a hex-encoded 32-byte key.
fn parse_hex_key(name: &str, hex_value: &str) -> Result<[u8; 32], String> {
    let bytes =
        hex::decode(hex_value).map_err(|e| format!("{name} must be hex-encoded: {e}"))?;
    let len = bytes.len();
    bytes
        .try_into()
        .map_err(|_| format!("{name} must decode to 32 bytes, got {len}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex_key_accepts_32_bytes() {
        let key = parse_hex_key("TEST_KEY", &"ab".repeat(32)).unwrap();
        assert_eq!(key, [0xabu8; 32]);
    }

    #[test]
    fn test_parse_hex_key_rejects_wrong_length() {
        let err = parse_hex_key("TEST_KEY", &"ab".repeat(16)).unwrap_err();
        assert!(err.contains("32 bytes"));
    }

    #[test]
    fn test_parse_hex_key_rejects_non_hex() {
        assert!(parse_hex_key("TEST_KEY", "zz").is_err());
    }
}
