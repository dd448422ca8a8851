/// Configuration management for the DisTim server
use crate::error::{DistimError, DistimResult};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

/// Default claim carrying the user's role in identity-provider tokens
pub const DEFAULT_ROLE_CLAIM: &str = "https://distim.com/role";

/// Main server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub service: ServiceConfig,
    pub storage: StorageConfig,
    pub authentication: AuthConfig,
    pub story: StoryConfig,
    pub rate_limit: RateLimitConfig,
    pub logging: LoggingConfig,
}

/// Service-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub hostname: String,
    pub port: u16,
    pub version: String,
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub data_directory: PathBuf,
    pub database: PathBuf,
    pub device_store: DeviceStoreConfig,
}

/// Where anonymous passports live
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum DeviceStoreConfig {
    Disk { location: PathBuf },
    Memory,
}

/// How bearer tokens are verified
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum TokenVerification {
    /// RS256 tokens checked against the identity provider's JWKS
    Jwks {
        domain: String,
        audience: String,
    },
    /// HS256 tokens signed with a shared secret (local development, tests)
    SharedSecret { secret: String },
}

/// Authentication configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    pub verification: TokenVerification,
    /// Claim holding the role string ("admin" grants the admin API)
    pub role_claim: String,
}

/// Story generation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoryConfig {
    /// Gemini API key; without one every story is the local fallback
    pub api_key: Option<String>,
    pub model: String,
    pub api_base_url: String,
}

/// Rate limiting configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    pub enabled: bool,
    pub anonymous_rps: u32,
    pub authenticated_rps: u32,
    pub admin_rps: u32,
    pub burst_size: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            anonymous_rps: 10,
            authenticated_rps: 50,
            admin_rps: 200,
            burst_size: 50,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

impl ServerConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> DistimResult<Self> {
        dotenv::dotenv().ok();

        let hostname = env::var("DISTIM_HOSTNAME").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = env::var("DISTIM_PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse()
            .map_err(|_| DistimError::Validation("Invalid port number".to_string()))?;
        let version =
            env::var("DISTIM_VERSION").unwrap_or_else(|_| env!("CARGO_PKG_VERSION").to_string());

        let data_directory: PathBuf = env::var("DISTIM_DATA_DIRECTORY")
            .unwrap_or_else(|_| "./data".to_string())
            .into();
        let database = env::var("DISTIM_DATABASE_LOCATION")
            .map(PathBuf::from)
            .unwrap_or_else(|_| data_directory.join("distim.sqlite"));

        let device_store = match env::var("DISTIM_DEVICE_STORE").as_deref() {
            Ok("memory") => DeviceStoreConfig::Memory,
            _ => DeviceStoreConfig::Disk {
                location: env::var("DISTIM_DEVICE_STORE_LOCATION")
                    .map(PathBuf::from)
                    .unwrap_or_else(|_| data_directory.join("devices")),
            },
        };

        let verification = if let Ok(domain) = env::var("DISTIM_AUTH_DOMAIN") {
            TokenVerification::Jwks {
                domain: domain.trim_end_matches('/').to_string(),
                audience: env::var("DISTIM_AUTH_AUDIENCE").map_err(|_| {
                    DistimError::Validation("DISTIM_AUTH_AUDIENCE required with a domain".to_string())
                })?,
            }
        } else {
            TokenVerification::SharedSecret {
                secret: env::var("DISTIM_JWT_SECRET").map_err(|_| {
                    DistimError::Validation(
                        "Either DISTIM_AUTH_DOMAIN or DISTIM_JWT_SECRET is required".to_string(),
                    )
                })?,
            }
        };
        let role_claim =
            env::var("DISTIM_ROLE_CLAIM").unwrap_or_else(|_| DEFAULT_ROLE_CLAIM.to_string());

        let api_key = env::var("GEMINI_API_KEY").ok().filter(|k| !k.trim().is_empty());
        let model = env::var("DISTIM_STORY_MODEL").unwrap_or_else(|_| "gemini-2.0-flash".to_string());
        let api_base_url = env::var("DISTIM_STORY_API_URL")
            .unwrap_or_else(|_| "https://generativelanguage.googleapis.com/v1beta".to_string());

        let defaults = RateLimitConfig::default();
        let rate_limit = RateLimitConfig {
            enabled: env_or("DISTIM_RATE_LIMITS_ENABLED", defaults.enabled),
            anonymous_rps: env_or("DISTIM_RATE_LIMIT_ANONYMOUS_RPS", defaults.anonymous_rps),
            authenticated_rps: env_or(
                "DISTIM_RATE_LIMIT_AUTHENTICATED_RPS",
                defaults.authenticated_rps,
            ),
            admin_rps: env_or("DISTIM_RATE_LIMIT_ADMIN_RPS", defaults.admin_rps),
            burst_size: env_or("DISTIM_RATE_LIMIT_BURST", defaults.burst_size),
        };

        let log_level = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        Ok(ServerConfig {
            service: ServiceConfig {
                hostname,
                port,
                version,
            },
            storage: StorageConfig {
                data_directory,
                database,
                device_store,
            },
            authentication: AuthConfig {
                verification,
                role_claim,
            },
            story: StoryConfig {
                api_key,
                model,
                api_base_url,
            },
            rate_limit,
            logging: LoggingConfig { level: log_level },
        })
    }

    /// Validate configuration
    pub fn validate(&self) -> DistimResult<()> {
        if self.service.hostname.is_empty() {
            return Err(DistimError::Validation("Hostname cannot be empty".to_string()));
        }

        match &self.authentication.verification {
            TokenVerification::SharedSecret { secret } if secret.len() < 32 => {
                return Err(DistimError::Validation(
                    "JWT secret must be at least 32 characters".to_string(),
                ));
            }
            TokenVerification::Jwks { domain, audience } if domain.is_empty() || audience.is_empty() => {
                return Err(DistimError::Validation(
                    "Identity provider domain and audience cannot be empty".to_string(),
                ));
            }
            _ => {}
        }

        if self.authentication.role_claim.is_empty() {
            return Err(DistimError::Validation("Role claim cannot be empty".to_string()));
        }

        Ok(())
    }
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with(verification: TokenVerification) -> ServerConfig {
        ServerConfig {
            service: ServiceConfig {
                hostname: "localhost".to_string(),
                port: 8080,
                version: "0.1.0".to_string(),
            },
            storage: StorageConfig {
                data_directory: PathBuf::from("./data"),
                database: PathBuf::from("./data/distim.sqlite"),
                device_store: DeviceStoreConfig::Memory,
            },
            authentication: AuthConfig {
                verification,
                role_claim: DEFAULT_ROLE_CLAIM.to_string(),
            },
            story: StoryConfig {
                api_key: None,
                model: "gemini-2.0-flash".to_string(),
                api_base_url: "http://localhost".to_string(),
            },
            rate_limit: RateLimitConfig::default(),
            logging: LoggingConfig {
                level: "info".to_string(),
            },
        }
    }

    #[test]
    fn test_short_secret_rejected() {
        let config = config_with(TokenVerification::SharedSecret {
            secret: "short".to_string(),
        });
        assert!(matches!(config.validate(), Err(DistimError::Validation(_))));
    }

    #[test]
    fn test_jwks_config_validates() {
        let config = config_with(TokenVerification::Jwks {
            domain: "distim.eu.auth0.com".to_string(),
            audience: "https://api.distim.ro".to_string(),
        });
        assert!(config.validate().is_ok());
    }
}
