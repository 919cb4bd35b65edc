use anyhow::{bail, Context};
use serde::Deserialize;

use crate::services::ModerationPolicy;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub moderation: ModerationConfig,
    pub admin: AdminConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Postgres,
    Sqlite,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    /// Falls back to the URL scheme when unset.
    #[serde(default)]
    pub backend: Option<StoreBackend>,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl DatabaseConfig {
    pub fn resolved_backend(&self) -> anyhow::Result<StoreBackend> {
        if let Some(backend) = self.backend {
            return Ok(backend);
        }
        if self.url.starts_with("postgres://") || self.url.starts_with("postgresql://") {
            Ok(StoreBackend::Postgres)
        } else if self.url.starts_with("sqlite:") {
            Ok(StoreBackend::Sqlite)
        } else {
            bail!(
                "cannot infer database backend from url; set DATABASE__BACKEND to postgres or sqlite"
            )
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModerationConfig {
    #[serde(default = "default_policy")]
    pub default_status: ModerationPolicy,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AdminConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub username: Option<String>,
    /// Plaintext password. Ignored when `password_hash` is set.
    #[serde(default)]
    pub password: Option<String>,
    /// Argon2 PHC string.
    #[serde(default)]
    pub password_hash: Option<String>,
    #[serde(default = "default_display_name")]
    pub display_name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoggingConfig {
    #[serde(default)]
    pub json: bool,
}

pub const MIN_API_KEY_LEN: usize = 16;

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_max_connections() -> u32 {
    10
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_policy() -> ModerationPolicy {
    ModerationPolicy::RequireReview
}

fn default_display_name() -> String {
    "Admin".to_string()
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(config::Environment::default().separator("__"))
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8080)?
            .set_default("database.url", "sqlite://guestbook.db?mode=rwc")?
            .set_default("database.max_connections", 10)?
            .set_default("database.timeout_secs", 10)?
            .set_default("moderation.default_status", "pending")?
            .set_default("admin.display_name", "Admin")?
            .set_default("logging.json", false)?
            .build()?;

        let config: Config = config
            .try_deserialize()
            .context("Failed to parse configuration")?;
        let config = config.normalized();
        config.validate()?;
        Ok(config)
    }

    /// Strip whitespace that env files tend to leave around secrets.
    pub fn normalized(mut self) -> Self {
        self.admin.api_key = self.admin.api_key.trim().to_string();
        self
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        self.database.resolved_backend()?;

        if self.database.max_connections == 0 {
            bail!("DATABASE__MAX_CONNECTIONS must be at least 1");
        }
        if self.database.timeout_secs == 0 {
            bail!("DATABASE__TIMEOUT_SECS must be at least 1");
        }

        let key = self.admin.api_key.as_str();
        if key.trim().is_empty() {
            bail!("ADMIN__API_KEY is required");
        }
        if key.trim() != key {
            bail!("ADMIN__API_KEY must not have leading or trailing whitespace");
        }
        if key.len() < MIN_API_KEY_LEN {
            bail!("ADMIN__API_KEY must be at least {} characters", MIN_API_KEY_LEN);
        }

        if self.admin.display_name.trim().is_empty() {
            bail!("ADMIN__DISPLAY_NAME must not be blank");
        }

        if let Some(hash) = &self.admin.password_hash {
            argon2::PasswordHash::new(hash)
                .map_err(|e| anyhow::anyhow!("ADMIN__PASSWORD_HASH is not a valid PHC string: {}", e))?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> Config {
        Config {
            server: ServerConfig {
                host: default_host(),
                port: default_port(),
            },
            database: DatabaseConfig {
                url: "sqlite::memory:".into(),
                backend: None,
                max_connections: 1,
                timeout_secs: 5,
            },
            moderation: ModerationConfig {
                default_status: ModerationPolicy::RequireReview,
            },
            admin: AdminConfig {
                api_key: "0123456789abcdef0123".into(),
                username: None,
                password: None,
                password_hash: None,
                display_name: default_display_name(),
            },
            logging: LoggingConfig::default(),
        }
    }

    #[test]
    fn test_valid_config_passes() {
        assert!(config().validate().is_ok());
    }

    #[test]
    fn test_backend_inferred_from_url() {
        let mut cfg = config();
        assert_eq!(cfg.database.resolved_backend().unwrap(), StoreBackend::Sqlite);

        cfg.database.url = "postgres://localhost/guestbook".into();
        assert_eq!(cfg.database.resolved_backend().unwrap(), StoreBackend::Postgres);

        cfg.database.url = "mysql://localhost/guestbook".into();
        assert!(cfg.database.resolved_backend().is_err());

        cfg.database.backend = Some(StoreBackend::Postgres);
        assert_eq!(cfg.database.resolved_backend().unwrap(), StoreBackend::Postgres);
    }

    #[test]
    fn test_missing_or_short_api_key_rejected() {
        let mut cfg = config();
        cfg.admin.api_key = "".into();
        assert!(cfg.validate().is_err());

        cfg.admin.api_key = "short".into();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_api_key_whitespace_trimmed_on_load_and_rejected_otherwise() {
        let mut cfg = config();
        cfg.admin.api_key = "  0123456789abcdef0123\n".into();
        assert!(cfg.validate().is_err());

        let cfg = cfg.normalized();
        assert_eq!(cfg.admin.api_key, "0123456789abcdef0123");
        assert!(cfg.validate().is_ok());

        // The loaded key is what a client presents as its bearer token
        let gate = crate::services::AdminGate::new(&cfg.admin);
        assert!(gate.verify_bearer(Some("0123456789abcdef0123")).is_ok());
    }

    #[test]
    fn test_bad_password_hash_rejected() {
        let mut cfg = config();
        cfg.admin.password_hash = Some("not-a-phc-string".into());
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_policy_deserializes_from_status_name() {
        let approved: ModerationConfig =
            serde_json::from_str(r#"{"default_status":"approved"}"#).unwrap();
        assert_eq!(approved.default_status, ModerationPolicy::AutoApprove);

        let pending: ModerationConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(pending.default_status, ModerationPolicy::RequireReview);

        let mixed_case: ModerationConfig =
            serde_json::from_str(r#"{"default_status":"Approved"}"#).unwrap();
        assert_eq!(mixed_case.default_status, ModerationPolicy::AutoApprove);

        let err = serde_json::from_str::<ModerationConfig>(r#"{"default_status":"open"}"#)
            .unwrap_err()
            .to_string();
        assert!(err.contains("expected approved or pending"), "{}", err);
    }
}
