//! Process configuration, read once at startup and injected everywhere else.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};

use crate::identity::SessionConfig;

const MIN_SECRET_LEN: usize = 16;
const DEFAULT_TTL_SECS: u64 = 30 * 24 * 3600;
const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: String,
    pub http_port: u16,
    pub data_dir: PathBuf,
    pub session: SessionConfig,
    pub cookie_secure: bool,
    pub max_upload_bytes: usize,
}

impl ServerConfig {
    /// Defaults suitable for tests and local runs with an explicit secret.
    pub fn with_secret(secret: impl Into<String>, data_dir: impl Into<PathBuf>) -> Self {
        Self {
            bind_addr: "0.0.0.0".to_string(),
            http_port: 3000,
            data_dir: data_dir.into(),
            session: SessionConfig::new(secret, Duration::from_secs(DEFAULT_TTL_SECS)),
            cookie_secure: true,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }

    /// Build from `VETSENSE_*` environment variables; CLI flags override port and data dir.
    pub fn from_env(args: &[String]) -> Result<Self> {
        let secret = env::var("VETSENSE_SESSION_SECRET")
            .map_err(|_| anyhow!("VETSENSE_SESSION_SECRET must be set"))?;
        if secret.len() < MIN_SECRET_LEN {
            return Err(anyhow!("VETSENSE_SESSION_SECRET must be at least {MIN_SECRET_LEN} bytes"));
        }
        let data_dir = parse_arg(args, "--data-dir")
            .or_else(|| env::var("VETSENSE_DATA_DIR").ok())
            .unwrap_or_else(|| "data".to_string());
        let mut cfg = Self::with_secret(secret, data_dir);

        if let Some(port) = parse_arg(args, "--port") {
            cfg.http_port = port.parse().with_context(|| format!("invalid --port '{port}'"))?;
        } else if let Some(port) = parse_env::<u16>("VETSENSE_HTTP_PORT")? {
            cfg.http_port = port;
        }
        if let Ok(addr) = env::var("VETSENSE_BIND_ADDR") {
            cfg.bind_addr = addr;
        }
        if let Some(ttl) = parse_env::<u64>("VETSENSE_SESSION_TTL_SECS")? {
            if ttl == 0 {
                return Err(anyhow!("VETSENSE_SESSION_TTL_SECS must be positive"));
            }
            cfg.session.ttl = Duration::from_secs(ttl);
        }
        if let Some(secure) = parse_bool_env("VETSENSE_COOKIE_SECURE") {
            cfg.cookie_secure = secure;
        }
        if let Some(max) = parse_env::<usize>("VETSENSE_MAX_UPLOAD_BYTES")? {
            cfg.max_upload_bytes = max;
        }
        Ok(cfg)
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.bind_addr, self.http_port)
    }
}

fn parse_arg(args: &[String], flag: &str) -> Option<String> {
    let mut i = 0;
    while i < args.len() {
        if args[i] == flag && i + 1 < args.len() {
            return Some(args[i + 1].clone());
        }
        i += 1;
    }
    None
}

fn parse_env<T: std::str::FromStr>(name: &str) -> Result<Option<T>> {
    match env::var(name) {
        Ok(v) => v.trim().parse::<T>().map(Some).map_err(|_| anyhow!("invalid value for {name}: '{v}'")),
        Err(_) => Ok(None),
    }
}

fn parse_bool(v: &str) -> Option<bool> {
    match v.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn parse_bool_env(name: &str) -> Option<bool> {
    env::var(name).ok().and_then(|v| parse_bool(&v))
}
