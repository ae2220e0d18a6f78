use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub auth: AuthConfig,
    /// Maximum upload size in bytes
    pub max_upload_size: u64,
    /// Seconds between expiration sweeps
    pub sweep_interval_secs: u64,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_address: String,
    pub data_dir: String,
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Directory for the local storage backend (always available as the
    /// fallback target)
    pub local_storage_path: String,
    pub object_store: ObjectStoreConfig,
}

#[derive(Debug, Clone)]
pub struct ObjectStoreConfig {
    pub enabled: bool,
    /// Bucket name (required when enabled)
    pub bucket: Option<String>,
    /// Path to a service account JSON key (optional, defaults to the
    /// instance metadata server)
    pub credentials_file: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// HS256 secret for verifying claim tokens
    pub jwt_secret: String,
    /// Static API keys accepted as the shared api-user identity
    pub api_keys: Vec<String>,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        let bind_address =
            std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:8080".to_string());

        let data_dir = std::env::var("DATA_DIR").unwrap_or_else(|_| "./data".to_string());

        let local_storage_path =
            std::env::var("LOCAL_STORAGE_PATH").unwrap_or_else(|_| "./files".to_string());

        let object_store_enabled = std::env::var("OBJECT_STORE_ENABLED")
            .map(|v| v == "true" || v == "1")
            .unwrap_or(false);

        let object_store_bucket = std::env::var("OBJECT_STORE_BUCKET").ok();
        let object_store_credentials = std::env::var("OBJECT_STORE_CREDENTIALS_FILE").ok();

        let jwt_secret = std::env::var("JWT_SECRET").unwrap_or_default();

        let api_keys: Vec<String> = std::env::var("API_KEYS")
            .map(|keys| {
                keys.split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        let max_upload_size = std::env::var("MAX_UPLOAD_SIZE")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(50 * 1024 * 1024); // 50MB

        let sweep_interval_secs = std::env::var("SWEEP_INTERVAL_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(300);

        let config = Config {
            server: ServerConfig {
                bind_address,
                data_dir,
            },
            storage: StorageConfig {
                local_storage_path,
                object_store: ObjectStoreConfig {
                    enabled: object_store_enabled,
                    bucket: object_store_bucket,
                    credentials_file: object_store_credentials,
                },
            },
            auth: AuthConfig {
                jwt_secret,
                api_keys,
            },
            max_upload_size,
            sweep_interval_secs,
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.auth.jwt_secret.is_empty() && self.auth.api_keys.is_empty() {
            return Err(ConfigError::ValidationError(
                "at least one of JWT_SECRET or API_KEYS must be set".to_string(),
            ));
        }

        if self.storage.object_store.enabled && self.storage.object_store.bucket.is_none() {
            return Err(ConfigError::ValidationError(
                "OBJECT_STORE_BUCKET is required when OBJECT_STORE_ENABLED=true".to_string(),
            ));
        }

        if self.sweep_interval_secs == 0 {
            return Err(ConfigError::ValidationError(
                "SWEEP_INTERVAL_SECS must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}
