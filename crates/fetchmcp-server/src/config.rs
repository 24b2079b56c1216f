//! Process configuration: every environment variable in the external
//! interfaces contract, parsed once and validated eagerly before any
//! socket opens.
//!
//! Eager `std::env::var` parsing into one flat struct, plus a
//! categorized startup exit code on failure.

use std::net::SocketAddr;
use std::path::PathBuf;
use thiserror::Error;

use fetchmcp_types::strategy::OptimizeFor;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {field}: {message}")]
    Invalid { field: &'static str, message: String },
    #[error("invalid allow-list entry in {field}: {entry}")]
    InvalidAllowList { field: &'static str, entry: String },
    #[error("persisted-state root {0} is not usable: {1}")]
    UnreachableRoot(PathBuf, std::io::Error),
}

impl ConfigError {
    /// §6 exit codes: `1` generic config error, `2` invalid allow-list,
    /// `3` unreachable persisted-state root.
    pub fn exit_code(&self) -> i32 {
        match self {
            ConfigError::Invalid { .. } => 1,
            ConfigError::InvalidAllowList { .. } => 2,
            ConfigError::UnreachableRoot(..) => 3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeploymentMode {
    Development,
    Production,
}

impl DeploymentMode {
    pub fn enforces_guards(&self) -> bool {
        matches!(self, DeploymentMode::Production)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceStorageKind {
    Memory,
    Filesystem,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

/// An allow-list entry pre-parsed into either an exact match or a
/// `*.`-prefixed wildcard domain match, so the per-request guard in the
/// host/origin middleware never re-parses a string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostMatcher {
    Exact(String),
    WildcardDomain(String),
}

impl HostMatcher {
    fn parse(raw: &str) -> Self {
        match raw.strip_prefix("*.") {
            Some(domain) => HostMatcher::WildcardDomain(domain.to_lowercase()),
            None => HostMatcher::Exact(raw.to_lowercase()),
        }
    }

    pub fn matches(&self, host: &str) -> bool {
        let host = host.to_lowercase();
        match self {
            HostMatcher::Exact(expected) => &host == expected,
            HostMatcher::WildcardDomain(domain) => {
                host == *domain || host.ends_with(&format!(".{domain}"))
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub bind_addr: SocketAddr,
    pub deployment: DeploymentMode,

    pub resource_storage: ResourceStorageKind,
    pub resource_root: Option<PathBuf>,
    pub resource_ttl_secs: u64,
    pub resource_max_bytes: u64,
    pub resource_max_items: usize,
    pub sweep_interval_secs: u64,

    pub allowed_hosts: Vec<HostMatcher>,
    pub allowed_origins: Vec<String>,

    pub metrics_auth_enabled: bool,
    pub metrics_auth_key: Option<String>,

    pub enable_oauth: bool,

    pub upstream_base_url: String,
    pub upstream_api_key: String,

    pub llm_provider: Option<String>,
    pub llm_api_key: Option<String>,

    pub optimize_for: OptimizeFor,
    pub debug: bool,
    pub log_format: LogFormat,

    pub session_idle_timeout_secs: u64,
    pub ring_buffer_size: usize,
    pub per_host_concurrency: usize,

    pub strategy_registry_path: Option<PathBuf>,
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

fn parse_num<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env_var(name) {
        None => Ok(default),
        Some(raw) => raw.parse().map_err(|_| ConfigError::Invalid { field: name, message: raw }),
    }
}

fn parse_bool(name: &'static str, default: bool) -> Result<bool, ConfigError> {
    match env_var(name) {
        None => Ok(default),
        Some(raw) => match raw.to_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::Invalid { field: name, message: raw }),
        },
    }
}

fn parse_allow_list(name: &'static str) -> Result<Vec<String>, ConfigError> {
    let Some(raw) = env_var(name) else {
        return Ok(Vec::new());
    };
    let mut entries = Vec::new();
    for entry in raw.split(',') {
        let entry = entry.trim();
        if entry.is_empty() {
            return Err(ConfigError::InvalidAllowList { field: name, entry: raw.clone() });
        }
        entries.push(entry.to_string());
    }
    Ok(entries)
}

impl ServiceConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let deployment = match env_var("NODE_ENV").as_deref() {
            None | Some("development") => DeploymentMode::Development,
            Some("production") => DeploymentMode::Production,
            Some(other) => {
                return Err(ConfigError::Invalid { field: "NODE_ENV", message: other.to_string() })
            }
        };

        let resource_storage = match env_var("MCP_RESOURCE_STORAGE").as_deref() {
            None | Some("memory") => ResourceStorageKind::Memory,
            Some("filesystem") => ResourceStorageKind::Filesystem,
            Some(other) => {
                return Err(ConfigError::Invalid { field: "MCP_RESOURCE_STORAGE", message: other.to_string() })
            }
        };

        let resource_root = env_var("MCP_RESOURCE_ROOT").map(PathBuf::from);
        if resource_storage == ResourceStorageKind::Filesystem {
            let root = resource_root.clone().unwrap_or_else(|| PathBuf::from("./data/resources"));
            std::fs::create_dir_all(&root).map_err(|e| ConfigError::UnreachableRoot(root.clone(), e))?;
        }

        let optimize_for = match env_var("OPTIMIZE_FOR").as_deref() {
            None | Some("cost") => OptimizeFor::Cost,
            Some("speed") => OptimizeFor::Speed,
            Some(other) => {
                return Err(ConfigError::Invalid { field: "OPTIMIZE_FOR", message: other.to_string() })
            }
        };

        let log_format = match env_var("LOG_FORMAT").as_deref() {
            None | Some("text") => LogFormat::Text,
            Some("json") => LogFormat::Json,
            Some(other) => {
                return Err(ConfigError::Invalid { field: "LOG_FORMAT", message: other.to_string() })
            }
        };

        let allowed_hosts = parse_allow_list("ALLOWED_HOSTS")?.iter().map(|s| HostMatcher::parse(s)).collect();
        let allowed_origins = parse_allow_list("ALLOWED_ORIGINS")?;

        let metrics_auth_enabled = parse_bool("METRICS_AUTH_ENABLED", false)?;
        let metrics_auth_key = env_var("METRICS_AUTH_KEY");
        if metrics_auth_enabled && metrics_auth_key.is_none() {
            return Err(ConfigError::Invalid {
                field: "METRICS_AUTH_KEY",
                message: "required when METRICS_AUTH_ENABLED=true".to_string(),
            });
        }

        let port: u16 = parse_num("PORT", 8080)?;
        let bind_addr: SocketAddr = format!("0.0.0.0:{port}")
            .parse()
            .map_err(|_| ConfigError::Invalid { field: "PORT", message: port.to_string() })?;

        Ok(Self {
            bind_addr,
            deployment,
            resource_storage,
            resource_root,
            resource_ttl_secs: parse_num("MCP_RESOURCE_TTL", 0)?,
            resource_max_bytes: parse_num::<u64>("MCP_RESOURCE_MAX_SIZE", 512)? * 1024 * 1024,
            resource_max_items: parse_num("MCP_RESOURCE_MAX_ITEMS", 10_000)?,
            sweep_interval_secs: parse_num("SWEEP_INTERVAL_SECS", 60)?,
            allowed_hosts,
            allowed_origins,
            metrics_auth_enabled,
            metrics_auth_key,
            enable_oauth: parse_bool("ENABLE_OAUTH", false)?,
            upstream_base_url: env_var("UPSTREAM_BASE_URL").unwrap_or_else(|| "https://api.upstream.example".to_string()),
            upstream_api_key: env_var("UPSTREAM_API_KEY").unwrap_or_default(),
            llm_provider: env_var("LLM_PROVIDER"),
            llm_api_key: env_var("LLM_API_KEY"),
            optimize_for,
            debug: parse_bool("DEBUG", false)?,
            log_format,
            session_idle_timeout_secs: parse_num("SESSION_IDLE_TIMEOUT_SECS", 1800)?,
            ring_buffer_size: parse_num("RING_BUFFER_SIZE", 1024)?,
            per_host_concurrency: parse_num("PER_HOST_CONCURRENCY", 4)?,
            strategy_registry_path: env_var("MCP_STRATEGY_REGISTRY_PATH").map(PathBuf::from),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wildcard_matcher_matches_subdomains_and_apex() {
        let m = HostMatcher::parse("*.example.com");
        assert!(m.matches("example.com"));
        assert!(m.matches("api.example.com"));
        assert!(!m.matches("example.org"));
    }

    #[test]
    fn exact_matcher_is_case_insensitive() {
        let m = HostMatcher::parse("Example.com");
        assert!(m.matches("example.COM"));
    }
}
