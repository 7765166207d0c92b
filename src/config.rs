//! Configuration for the capture server

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

/// Configuration for a capture server instance.
///
/// Supplied once at `start` and immutable for the running lifetime of the
/// server; a new configuration requires a stop/start cycle.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Listen host
    pub host: String,

    /// Listen port (0 picks an ephemeral port)
    pub port: u16,

    /// Whether each captured webhook is written to `file_path`
    pub save_to_file: bool,

    /// Target file for captured webhooks
    pub file_path: PathBuf,

    /// Whether inbound signatures are checked against `secret`
    pub validate_signature: bool,

    /// Shared secret for signature validation; empty disables checking
    pub secret: String,

    /// Static informational headers supplied by the caller; not enforced
    pub headers: HashMap<String, String>,

    /// Maximum time to read a request's headers
    pub header_read_timeout: Duration,

    /// Maximum time to read a full request body
    pub read_timeout: Duration,

    /// Maximum time a single response write may stall
    pub write_timeout: Duration,

    /// Maximum time a keep-alive connection may sit idle
    pub idle_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            save_to_file: false,
            file_path: PathBuf::new(),
            validate_signature: false,
            secret: String::new(),
            headers: HashMap::new(),
            header_read_timeout: Duration::from_secs(10),
            read_timeout: Duration::from_secs(30),
            write_timeout: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(90),
        }
    }
}

impl ServerConfig {
    /// Create a configuration with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a builder for custom configuration
    pub fn builder() -> ServerConfigBuilder {
        ServerConfigBuilder::new()
    }

    /// The `host:port` string the listener binds
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Builder for [`ServerConfig`]
#[derive(Debug, Clone, Default)]
pub struct ServerConfigBuilder {
    config: ServerConfig,
}

impl ServerConfigBuilder {
    /// Create a new builder with default settings
    pub fn new() -> Self {
        Self {
            config: ServerConfig::default(),
        }
    }

    /// Set the listen host
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.config.host = host.into();
        self
    }

    /// Set the listen port
    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    /// Persist each captured webhook to the given file
    pub fn save_to_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.save_to_file = true;
        self.config.file_path = path.into();
        self
    }

    /// Validate inbound signatures against the given secret
    pub fn validate_signature(mut self, secret: impl Into<String>) -> Self {
        self.config.validate_signature = true;
        self.config.secret = secret.into();
        self
    }

    /// Attach a static informational header
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.config.headers.insert(name.into(), value.into());
        self
    }

    /// Set the header read timeout
    pub fn header_read_timeout(mut self, timeout: Duration) -> Self {
        self.config.header_read_timeout = timeout;
        self
    }

    /// Set the full-request read timeout
    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.config.read_timeout = timeout;
        self
    }

    /// Set the response write timeout
    pub fn write_timeout(mut self, timeout: Duration) -> Self {
        self.config.write_timeout = timeout;
        self
    }

    /// Set the keep-alive idle timeout
    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.config.idle_timeout = timeout;
        self
    }

    /// Build the configuration
    pub fn build(self) -> ServerConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.addr(), "127.0.0.1:8080");
        assert!(!config.save_to_file);
        assert!(!config.validate_signature);
        assert_eq!(config.header_read_timeout, Duration::from_secs(10));
        assert_eq!(config.idle_timeout, Duration::from_secs(90));
    }

    #[test]
    fn test_builder() {
        let config = ServerConfig::builder()
            .host("0.0.0.0")
            .port(9999)
            .save_to_file("/tmp/hook.json")
            .validate_signature("s3cr3t")
            .header("X-Env", "dev")
            .read_timeout(Duration::from_secs(5))
            .build();

        assert_eq!(config.addr(), "0.0.0.0:9999");
        assert!(config.save_to_file);
        assert_eq!(config.file_path, PathBuf::from("/tmp/hook.json"));
        assert!(config.validate_signature);
        assert_eq!(config.secret, "s3cr3t");
        assert_eq!(config.headers.get("X-Env").unwrap(), "dev");
        assert_eq!(config.read_timeout, Duration::from_secs(5));
    }
}
