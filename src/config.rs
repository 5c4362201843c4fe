use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;

use crate::error::{Error, Result};

const INTERACTIONS_FILE: &str = "interactions.csv";
const ATTEMPTS_FILE: &str = "attempts.csv";

#[derive(Debug, Clone)]
pub struct Config {
    pub host: IpAddr,
    pub port: u16,
    pub log_level: String,
    /// Directory with `interactions.csv` and `attempts.csv`. When unset the
    /// server seeds a demo cohort instead.
    pub data_dir: Option<PathBuf>,
    pub demo_students: usize,
    pub demo_seed: u64,
    /// Set when `ENABLE_FILE_LOGS` is on; `LOG_DIR` or `./logs`.
    pub file_log_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)),
            port: 8080,
            log_level: "info".to_string(),
            data_dir: None,
            demo_students: 12,
            demo_seed: 42,
            file_log_dir: None,
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|value| value.parse::<T>().ok())
}

fn file_logging_enabled() -> bool {
    std::env::var("ENABLE_FILE_LOGS")
        .map(|v| v == "true" || v == "1")
        .unwrap_or(false)
}

impl Config {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            host: env_parse("HOST").unwrap_or(defaults.host),
            port: env_parse("PORT").unwrap_or(defaults.port),
            log_level: std::env::var("RUST_LOG").unwrap_or(defaults.log_level),
            data_dir: std::env::var("ANALYTICS_DATA_DIR")
                .ok()
                .filter(|value| !value.trim().is_empty())
                .map(PathBuf::from),
            demo_students: env_parse("DEMO_STUDENTS").unwrap_or(defaults.demo_students),
            demo_seed: env_parse("DEMO_SEED").unwrap_or(defaults.demo_seed),
            file_log_dir: file_logging_enabled().then(|| {
                std::env::var("LOG_DIR")
                    .map(PathBuf::from)
                    .unwrap_or_else(|_| PathBuf::from("./logs"))
            }),
        }
    }

    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Interactions and attempts CSV paths, or `None` when no data
    /// directory is configured. Both files must exist.
    pub fn data_paths(&self) -> Result<Option<(PathBuf, PathBuf)>> {
        let Some(dir) = &self.data_dir else {
            return Ok(None);
        };
        if !dir.is_dir() {
            return Err(Error::Config(format!(
                "ANALYTICS_DATA_DIR {} is not a directory",
                dir.display()
            )));
        }

        let interactions = dir.join(INTERACTIONS_FILE);
        let attempts = dir.join(ATTEMPTS_FILE);
        for path in [&interactions, &attempts] {
            if !path.is_file() {
                return Err(Error::Config(format!(
                    "ANALYTICS_DATA_DIR is missing {}",
                    path.display()
                )));
            }
        }
        Ok(Some((interactions, attempts)))
    }
}
