//! Server settings, filled from the command line by the `server` binary.

use crate::error::ServerError;
use crate::slime::SEND_BUFFER;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Route of the WebSocket endpoint; the player count is served at `{path}/num`
    pub path: String,
    /// Outbound queue size per player
    pub send_buffer: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            path: "/slime".to_string(),
            send_buffer: SEND_BUFFER,
        }
    }
}

impl ServerConfig {
    pub fn validate(&self) -> Result<(), ServerError> {
        if !self.path.starts_with('/') || self.path.len() < 2 {
            return Err(ServerError::InvalidPath(self.path.clone()));
        }
        if self.send_buffer == 0 {
            return Err(ServerError::InvalidSendBuffer);
        }
        Ok(())
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = ServerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.address(), "127.0.0.1:8080");
    }

    #[test]
    fn test_validate_rejects_bad_path() {
        for path in ["slime", "/", ""] {
            let config = ServerConfig {
                path: path.to_string(),
                ..ServerConfig::default()
            };
            assert!(matches!(
                config.validate(),
                Err(ServerError::InvalidPath(p)) if p == path
            ));
        }
    }

    #[test]
    fn test_validate_rejects_empty_buffer() {
        let config = ServerConfig {
            send_buffer: 0,
            ..ServerConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ServerError::InvalidSendBuffer)
        ));
    }
}
