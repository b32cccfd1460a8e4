use std::env;
use std::path::PathBuf;

use crate::error::CredentialDiagnostic;

pub const DEFAULT_NAVER_API_URL: &str = "https://openapi.naver.com/v1";

/// Process configuration, sourced from the environment once at startup and
/// passed into the gateway explicitly. Credential rotation requires a
/// restart; in exchange everything is injectable in tests.
#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub naver: NaverConfig,
    pub remote: Option<RemoteConfig>,
    pub scheduler: SchedulerConfig,
    pub state_path: PathBuf,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
}

#[derive(Debug, Clone)]
pub struct NaverConfig {
    pub base_url: String,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
}

impl NaverConfig {
    /// Both credentials, or a diagnostic of which one is unset.
    pub fn credentials(&self) -> Result<(&str, &str), CredentialDiagnostic> {
        match (self.client_id.as_deref(), self.client_secret.as_deref()) {
            (Some(id), Some(secret)) => Ok((id, secret)),
            _ => Err(CredentialDiagnostic {
                has_client_id: self.client_id.is_some(),
                has_client_secret: self.client_secret.is_some(),
            }),
        }
    }
}

/// Optional remote datastore (PostgREST-style API).
#[derive(Debug, Clone)]
pub struct RemoteConfig {
    pub url: String,
    pub api_key: String,
}

#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub enabled: bool,
    pub interval_secs: u64,
}

impl Config {
    pub fn from_env() -> Self {
        let remote = match (env_opt("SUPABASE_URL"), env_opt("SUPABASE_ANON_KEY")) {
            (Some(url), Some(api_key)) => Some(RemoteConfig { url, api_key }),
            _ => None,
        };

        Self {
            server: ServerConfig {
                port: env_opt("PORT")
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(5000),
            },
            naver: NaverConfig {
                base_url: env_opt("NAVER_API_URL")
                    .unwrap_or_else(|| DEFAULT_NAVER_API_URL.to_string()),
                client_id: env_opt("NAVER_CLIENT_ID"),
                client_secret: env_opt("NAVER_CLIENT_SECRET"),
            },
            remote,
            scheduler: SchedulerConfig {
                enabled: env_opt("SCHEDULER_ENABLED")
                    .map(|v| v != "false" && v != "0")
                    .unwrap_or(true),
                interval_secs: env_opt("SCHEDULE_INTERVAL_SECS")
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(60),
            },
            state_path: env_opt("STATE_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("state.json")),
        }
    }
}

/// Empty values count as unset, so `FOO=` behaves like no `FOO` at all.
fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
pub(crate) fn test_config(base_url: &str) -> Config {
    Config {
        server: ServerConfig { port: 0 },
        naver: NaverConfig {
            base_url: base_url.to_string(),
            client_id: Some("test-client-id".to_string()),
            client_secret: Some("test-client-secret".to_string()),
        },
        remote: None,
        scheduler: SchedulerConfig {
            enabled: false,
            interval_secs: 60,
        },
        state_path: PathBuf::from("/dev/null"),
    }
}
