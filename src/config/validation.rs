use super::models::Config;
use std::net::SocketAddr;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("bind_addr {addr} is not a loopback address; the control surface is local-only")]
    NonLoopbackBind { addr: SocketAddr },

    #[error("Interval must be positive: {field} = 0")]
    ZeroInterval { field: &'static str },

    #[error("Path must not be empty: {field}")]
    EmptyPath { field: &'static str },
}

/// Validate the entire configuration
pub fn validate(config: &Config) -> Result<(), ValidationError> {
    validate_server(config)?;
    validate_intervals(config)?;
    validate_paths(config)?;
    Ok(())
}

/// The control surface has no authentication, so it must never leave the host
fn validate_server(config: &Config) -> Result<(), ValidationError> {
    let addr = config.server.bind_addr;
    if !addr.ip().is_loopback() {
        return Err(ValidationError::NonLoopbackBind { addr });
    }
    Ok(())
}

fn validate_intervals(config: &Config) -> Result<(), ValidationError> {
    if config.worker.poll_interval_ms == 0 {
        return Err(ValidationError::ZeroInterval {
            field: "worker.poll_interval_ms",
        });
    }
    if config.store.shutdown_wait_ms == 0 {
        return Err(ValidationError::ZeroInterval {
            field: "store.shutdown_wait_ms",
        });
    }
    Ok(())
}

fn validate_paths(config: &Config) -> Result<(), ValidationError> {
    if config.store.path.as_os_str().is_empty() {
        return Err(ValidationError::EmptyPath { field: "store.path" });
    }
    if config.crypto.secret_key_path.as_os_str().is_empty() {
        return Err(ValidationError::EmptyPath {
            field: "crypto.secret_key_path",
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate(&Config::default()).is_ok());
    }

    #[test]
    fn test_ipv6_loopback_is_valid() {
        let mut config = Config::default();
        config.server.bind_addr = "[::1]:11200".parse().unwrap();
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_rejects_wildcard_bind() {
        let mut config = Config::default();
        config.server.bind_addr = "0.0.0.0:11200".parse().unwrap();

        let err = validate(&config).unwrap_err();
        assert!(matches!(err, ValidationError::NonLoopbackBind { .. }));
    }

    #[test]
    fn test_rejects_zero_poll_interval() {
        let mut config = Config::default();
        config.worker.poll_interval_ms = 0;

        let err = validate(&config).unwrap_err();
        assert!(matches!(
            err,
            ValidationError::ZeroInterval {
                field: "worker.poll_interval_ms"
            }
        ));
    }

    #[test]
    fn test_rejects_zero_shutdown_wait() {
        let mut config = Config::default();
        config.store.shutdown_wait_ms = 0;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_rejects_empty_store_path() {
        let mut config = Config::default();
        config.store.path = PathBuf::new();

        let err = validate(&config).unwrap_err();
        assert!(matches!(err, ValidationError::EmptyPath { field: "store.path" }));
    }
}
