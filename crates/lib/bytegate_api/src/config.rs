//! Service configuration.
//!
//! Values come from the environment (after `dotenvy` has loaded any `.env`).
//! Listener address and database URL are CLI flags on the binary instead.

use std::str::FromStr;

use bytegate_core::allow_list::{AllowList, PatternError};
use bytegate_core::auth::jwt::DEFAULT_ACCESS_TTL_SECS;
use bytegate_core::auth::signing_key::KeyError;
use thiserror::Error;

use crate::services::proxy::{RouteError, RouteTable};

/// Paths reachable without a token.
pub const DEFAULT_ALLOW_LIST: &str =
    "/api/v1/auth/**,/v3/api-docs/**,/swagger-ui/**,/actuator/**,/error";

/// Upstreams behind the gateway, as `prefix=url` pairs.
pub const DEFAULT_GATEWAY_ROUTES: &str =
    "/api/v1/auth=http://127.0.0.1:8081,/api/v1/users=http://127.0.0.1:8081";

/// Refresh token lifetime: 24 hours.
pub const DEFAULT_REFRESH_TTL_SECS: i64 = 24 * 60 * 60;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(transparent)]
    Key(#[from] KeyError),

    #[error("invalid ALLOW_LIST: {0}")]
    AllowList(#[from] PatternError),

    #[error("invalid GATEWAY_ROUTES: {0}")]
    Routes(#[from] RouteError),

    #[error("invalid {var}={value:?}: {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

/// How a backend learns who is calling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrustModeKind {
    /// Trust `X-User-*` headers injected by the edge gateway.
    #[default]
    Gateway,
    /// Re-verify the bearer token on every request.
    Token,
}

impl FromStr for TrustModeKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gateway" => Ok(Self::Gateway),
            "token" => Ok(Self::Token),
            other => Err(format!("expected 'gateway' or 'token', got '{other}'")),
        }
    }
}

/// Token lifetimes shared by issuer and verifiers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthSettings {
    pub access_ttl_secs: i64,
    /// Declared for parity with deployments that configure it; no refresh
    /// flow consumes it.
    pub refresh_ttl_secs: i64,
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            access_ttl_secs: DEFAULT_ACCESS_TTL_SECS,
            refresh_ttl_secs: DEFAULT_REFRESH_TTL_SECS,
        }
    }
}

impl AuthSettings {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(env_lookup)
    }

    /// | Variable                 | Default |
    /// |--------------------------|---------|
    /// | `ACCESS_TOKEN_TTL_SECS`  | `3600`  |
    /// | `REFRESH_TOKEN_TTL_SECS` | `86400` |
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let access_ttl_secs = parse_ttl(&lookup, "ACCESS_TOKEN_TTL_SECS", DEFAULT_ACCESS_TTL_SECS)?;
        let refresh_ttl_secs = parse_ttl(&lookup, "REFRESH_TOKEN_TTL_SECS", DEFAULT_REFRESH_TTL_SECS)?;
        Ok(Self {
            access_ttl_secs,
            refresh_ttl_secs,
        })
    }

    pub fn access_ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.access_ttl_secs)
    }
}

/// Identity service configuration.
#[derive(Debug, Clone, Default)]
pub struct IdentityConfig {
    pub auth: AuthSettings,
    pub trust_mode: TrustModeKind,
}

impl IdentityConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(env_lookup)
    }

    /// Reads [`AuthSettings`] plus `TRUST_MODE` (default `gateway`).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let trust_mode = match lookup("TRUST_MODE") {
            Some(value) => value.parse().map_err(|reason| ConfigError::Invalid {
                var: "TRUST_MODE",
                value,
                reason,
            })?,
            None => TrustModeKind::default(),
        };
        Ok(Self {
            auth: AuthSettings::from_lookup(&lookup)?,
            trust_mode,
        })
    }
}

/// Edge gateway configuration.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub auth: AuthSettings,
    pub allow_list: AllowList,
    pub routes: RouteTable,
}

impl GatewayConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(env_lookup)
    }

    /// Reads [`AuthSettings`], `ALLOW_LIST` and `GATEWAY_ROUTES`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let allow_list = lookup("ALLOW_LIST").unwrap_or_else(|| DEFAULT_ALLOW_LIST.into());
        let routes = lookup("GATEWAY_ROUTES").unwrap_or_else(|| DEFAULT_GATEWAY_ROUTES.into());
        Ok(Self {
            auth: AuthSettings::from_lookup(&lookup)?,
            allow_list: AllowList::from_csv(&allow_list)?,
            routes: RouteTable::from_csv(&routes)?,
        })
    }
}

fn env_lookup(var: &str) -> Option<String> {
    std::env::var(var).ok().filter(|v| !v.trim().is_empty())
}

fn parse_ttl(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
    default: i64,
) -> Result<i64, ConfigError> {
    let Some(value) = lookup(var) else {
        return Ok(default);
    };
    match value.trim().parse::<i64>() {
        Ok(secs) if secs >= 1 => Ok(secs),
        Ok(_) => Err(ConfigError::Invalid {
            var,
            value,
            reason: "must be at least 1 second".into(),
        }),
        Err(e) => Err(ConfigError::Invalid {
            var,
            value,
            reason: e.to_string(),
        }),
    }
}
