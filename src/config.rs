//! Environment-driven configuration for both programs.

use crate::error::ConfigError;
use std::path::PathBuf;

pub const SESSION_VAR: &str = "DNDBEYOND_SESSION";
pub const CAMPAIGNS_DIR_VAR: &str = "DNDBEYOND_CAMPAIGNS_DIR";
pub const DEFAULT_CAMPAIGNS_DIR: &str = "campaigns";

const DEFAULT_SITE_URL: &str = "https://www.dndbeyond.com";
const DEFAULT_AUTH_URL: &str = "https://auth-service.dndbeyond.com";
const DEFAULT_CHARACTER_URL: &str = "https://character-service.dndbeyond.com";

/// Everything the scraper needs to talk to D&D Beyond.
#[derive(Clone)]
pub struct ScraperConfig {
    /// Value of the `CobaltSession` cookie.
    pub session: String,
    /// Main site, serving campaign pages and the campaign list API.
    pub site_url: String,
    /// Service exchanging the session cookie for a short-lived bearer token.
    pub auth_url: String,
    /// Service serving full character documents.
    pub character_url: String,
}

impl std::fmt::Debug for ScraperConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScraperConfig")
            .field("session", &"<redacted>")
            .field("site_url", &self.site_url)
            .field("auth_url", &self.auth_url)
            .field("character_url", &self.character_url)
            .finish()
    }
}

impl ScraperConfig {
    /// Read the session cookie from `DNDBEYOND_SESSION`. Endpoints default to
    /// the public D&D Beyond hosts and may be overridden with
    /// `DNDBEYOND_SITE_URL`, `DNDBEYOND_AUTH_URL` and `DNDBEYOND_CHARACTER_URL`.
    pub fn from_env() -> Result<Self, ConfigError> {
        let session = std::env::var(SESSION_VAR)
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .ok_or(ConfigError::MissingSession { var: SESSION_VAR })?;

        Ok(Self {
            session,
            site_url: env_url("DNDBEYOND_SITE_URL", DEFAULT_SITE_URL),
            auth_url: env_url("DNDBEYOND_AUTH_URL", DEFAULT_AUTH_URL),
            character_url: env_url("DNDBEYOND_CHARACTER_URL", DEFAULT_CHARACTER_URL),
        })
    }

    /// Config pointing every endpoint at one base URL. Used against local
    /// test servers.
    pub fn with_base_url(session: &str, base: &str) -> Self {
        let base = base.trim_end_matches('/').to_string();
        Self {
            session: session.to_string(),
            site_url: base.clone(),
            auth_url: base.clone(),
            character_url: base,
        }
    }
}

fn env_url(var: &str, default: &str) -> String {
    std::env::var(var)
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| default.into())
        .trim_end_matches('/')
        .to_string()
}

/// Resolve the campaigns directory: explicit flag, then
/// `DNDBEYOND_CAMPAIGNS_DIR`, then `./campaigns`.
pub fn campaigns_dir(flag: Option<PathBuf>) -> PathBuf {
    flag.or_else(|| {
        std::env::var_os(CAMPAIGNS_DIR_VAR)
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
    })
    .unwrap_or_else(|| PathBuf::from(DEFAULT_CAMPAIGNS_DIR))
}
