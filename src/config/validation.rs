use crate::config::types::{Backend, Config};
use crate::ConfigError;
use url::Url;

/// Upper bound on the worker pool size
const MAX_WORKERS_LIMIT: usize = 10_000;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_required(config)?;
    validate_workers(config)?;
    validate_api_base(&config.api_base)?;
    validate_backend(config)?;
    Ok(())
}

/// Host and client id must both be present
fn validate_required(config: &Config) -> Result<(), ConfigError> {
    if config.host.trim().is_empty() {
        return Err(ConfigError::Missing("host"));
    }
    if config.client_id.trim().is_empty() {
        return Err(ConfigError::Missing("client_id"));
    }
    Ok(())
}

fn validate_workers(config: &Config) -> Result<(), ConfigError> {
    if let Some(n) = config.max_workers {
        if n > MAX_WORKERS_LIMIT {
            return Err(ConfigError::Validation(format!(
                "max_workers must be at most {}, got {}",
                MAX_WORKERS_LIMIT, n
            )));
        }
    }
    Ok(())
}

fn validate_api_base(api_base: &str) -> Result<(), ConfigError> {
    let url = Url::parse(api_base)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid api_base: {}", e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "api_base '{}' must use http or https",
            api_base
        )));
    }

    Ok(())
}

/// Backend-specific checks
fn validate_backend(config: &Config) -> Result<(), ConfigError> {
    match config.backend {
        Backend::Redis => {
            if config.port == 0 {
                return Err(ConfigError::Validation("port cannot be 0".to_string()));
            }
        }
        Backend::Sqlite => {
            if let Some(path) = &config.database_path {
                if path.is_empty() {
                    return Err(ConfigError::Validation(
                        "database_path cannot be empty".to_string(),
                    ));
                }
            }
        }
    }
    Ok(())
}
