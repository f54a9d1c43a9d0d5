//! Process-wide server settings.
//!
//! | Variable | Default | Meaning |
//! |----------|---------|---------|
//! | `BIND_ADDR` | `0.0.0.0` | Interface to listen on |
//! | `PORT` | `5000` | Listen port |
//! | `UPLOAD_DIR` | `uploads` | Where request bodies are stored while processed |
//! | `UPLOAD_MAX_BYTES` | unset | Body size cap; unset means no cap |
//! | `STRICT_ROWS` | `false` | Check required columns on every row, not just the first |
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;

use crate::validate::ValidationMode;
use crate::{CsvResult, IngestError, IngestOptions};

pub const DEFAULT_PORT: u16 = 5000;
pub const DEFAULT_UPLOAD_DIR: &str = "uploads";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub bind: SocketAddr,
    pub upload_dir: PathBuf,
    pub max_upload_bytes: Option<usize>,
    pub ingest: IngestOptions,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), DEFAULT_PORT),
            upload_dir: PathBuf::from(DEFAULT_UPLOAD_DIR),
            max_upload_bytes: None,
            ingest: IngestOptions::default(),
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> CsvResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; unset keys keep their defaults, malformed ones are errors.
    pub fn from_lookup<F>(lookup: F) -> CsvResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let ip: IpAddr = match get("BIND_ADDR") {
            Some(v) => parse("BIND_ADDR", &v)?,
            None => cfg.bind.ip(),
        };
        let port: u16 = match get("PORT") {
            Some(v) => parse("PORT", &v)?,
            None => cfg.bind.port(),
        };
        cfg.bind = SocketAddr::new(ip, port);

        if let Some(dir) = get("UPLOAD_DIR") {
            cfg.upload_dir = PathBuf::from(dir);
        }
        if let Some(v) = get("UPLOAD_MAX_BYTES") {
            cfg.max_upload_bytes = Some(parse("UPLOAD_MAX_BYTES", &v)?);
        }
        if let Some(v) = get("STRICT_ROWS") {
            cfg.ingest.validation = if parse_bool("STRICT_ROWS", &v)? {
                ValidationMode::EveryRow
            } else {
                ValidationMode::FirstRow
            };
        }
        Ok(cfg)
    }
}

fn parse<T: FromStr>(key: &str, value: &str) -> CsvResult<T> {
    value
        .trim()
        .parse()
        .map_err(|_| IngestError::Config(format!("{key}: cannot parse '{value}'")))
}

pub fn parse_bool(key: &str, value: &str) -> CsvResult<bool> {
    match value.trim() {
        "1" | "true" | "TRUE" | "yes" | "YES" => Ok(true),
        "0" | "false" | "FALSE" | "no" | "NO" => Ok(false),
        other => Err(IngestError::Config(format!("{key}: expected a boolean, got '{other}'"))),
    }
}
