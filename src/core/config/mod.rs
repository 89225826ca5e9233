use anyhow::Context;
use log::warn;

const DEV_JWT_SECRET: &str = "hive-development-secret";

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database_url: Option<String>,
    pub jwt_secret: String,
    pub stakwork: StakworkConfig,
    pub webhook_secret: Option<String>,
    pub drive: DriveConfig,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub base_url: String,
}

#[derive(Clone, Debug, Default)]
pub struct StakworkConfig {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    /// Comma separated list, indexed by execution mode.
    pub workflow_ids: Option<String>,
    pub janitor_workflow_id: Option<String>,
    pub timeout_secs: u64,
}

impl StakworkConfig {
    pub fn is_configured(&self) -> bool {
        [&self.api_key, &self.base_url, &self.workflow_ids]
            .iter()
            .all(|v| v.as_deref().is_some_and(|s| !s.trim().is_empty()))
    }

    pub fn janitor_configured(&self) -> bool {
        self.api_key.is_some()
            && self.base_url.is_some()
            && self.janitor_workflow_id.as_deref().is_some_and(|s| !s.trim().is_empty())
    }
}

#[derive(Clone, Debug)]
pub struct DriveConfig {
    pub server: String,
    pub access_key: String,
    pub secret_key: String,
    pub bucket: String,
    pub region: String,
    pub presign_ttl_secs: u64,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    pub fn from_vars<F>(get: F) -> Result<Self, anyhow::Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| get(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let get_str = |key: &str, default: &str| non_empty(key).unwrap_or_else(|| default.to_string());

        let port = match non_empty("SERVER_PORT") {
            Some(raw) => raw
                .parse::<u16>()
                .with_context(|| format!("SERVER_PORT is not a valid port: {raw}"))?,
            None => 8080,
        };
        let timeout_secs = match non_empty("STAKWORK_TIMEOUT_SECS") {
            Some(raw) => raw
                .parse::<u64>()
                .with_context(|| format!("STAKWORK_TIMEOUT_SECS is not a number: {raw}"))?,
            None => 30,
        };
        let presign_ttl_secs = match non_empty("DRIVE_PRESIGN_TTL_SECS") {
            Some(raw) => raw
                .parse::<u64>()
                .with_context(|| format!("DRIVE_PRESIGN_TTL_SECS is not a number: {raw}"))?,
            None => 3600,
        };

        let jwt_secret = match non_empty("JWT_SECRET") {
            Some(secret) => secret,
            None => {
                warn!("JWT_SECRET not set, using the development secret");
                DEV_JWT_SECRET.to_string()
            }
        };

        Ok(AppConfig {
            server: ServerConfig {
                host: get_str("SERVER_HOST", "0.0.0.0"),
                port,
                base_url: get_str("APP_BASE_URL", "http://localhost:8080")
                    .trim_end_matches('/')
                    .to_string(),
            },
            database_url: non_empty("DATABASE_URL"),
            jwt_secret,
            stakwork: StakworkConfig {
                api_key: non_empty("STAKWORK_API_KEY"),
                base_url: non_empty("STAKWORK_BASE_URL").map(|u| u.trim_end_matches('/').to_string()),
                workflow_ids: non_empty("STAKWORK_WORKFLOW_ID"),
                janitor_workflow_id: non_empty("STAKWORK_JANITOR_WORKFLOW_ID"),
                timeout_secs,
            },
            webhook_secret: non_empty("WEBHOOK_SECRET"),
            drive: DriveConfig {
                server: get_str("DRIVE_SERVER", ""),
                access_key: get_str("DRIVE_ACCESSKEY", ""),
                secret_key: get_str("DRIVE_SECRET", ""),
                bucket: get_str("DRIVE_BUCKET", ""),
                region: get_str("DRIVE_REGION", "auto"),
                presign_ttl_secs,
            },
        })
    }
}

impl DriveConfig {
    pub fn is_configured(&self) -> bool {
        !self.server.is_empty() && !self.bucket.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> anyhow::Result<AppConfig> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_vars(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]).expect("config");
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.base_url, "http://localhost:8080");
        assert_eq!(config.jwt_secret, DEV_JWT_SECRET);
        assert_eq!(config.stakwork.timeout_secs, 30);
        assert_eq!(config.drive.region, "auto");
        assert!(!config.stakwork.is_configured());
        assert!(config.webhook_secret.is_none());
    }

    #[test]
    fn test_stakwork_requires_all_three_values() {
        let partial = config_from(&[
            ("STAKWORK_API_KEY", "key"),
            ("STAKWORK_BASE_URL", "https://api.stakwork.com/api/v1/"),
        ])
        .expect("config");
        assert!(!partial.stakwork.is_configured());

        let full = config_from(&[
            ("STAKWORK_API_KEY", "key"),
            ("STAKWORK_BASE_URL", "https://api.stakwork.com/api/v1/"),
            ("STAKWORK_WORKFLOW_ID", "11,22,33"),
        ])
        .expect("config");
        assert!(full.stakwork.is_configured());
        assert_eq!(
            full.stakwork.base_url.as_deref(),
            Some("https://api.stakwork.com/api/v1")
        );
    }

    #[test]
    fn test_blank_values_count_as_unset() {
        let config = config_from(&[("STAKWORK_API_KEY", "  "), ("WEBHOOK_SECRET", "")]).expect("config");
        assert!(config.stakwork.api_key.is_none());
        assert!(config.webhook_secret.is_none());
    }

    #[test]
    fn test_bad_port_is_an_error() {
        assert!(config_from(&[("SERVER_PORT", "eighty")]).is_err());
    }
}
