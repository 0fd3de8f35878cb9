use crate::storage::LocalStorage;
use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::PathBuf;

pub const CONFIG_ENV: &str = "PACKPAL_CONFIG";

fn default_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_timeout() -> u64 {
    10
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Config {
    #[serde(default = "default_url")]
    pub url: String,
    #[serde(default)]
    pub token: String,
    #[serde(default = "default_timeout")]
    pub request_timeout_secs: u64,
    #[serde(default)]
    pub allow_insecure_certs: bool,
    /// Checklist id to open on start; otherwise the last used one, then the first.
    #[serde(default)]
    pub default_checklist: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            url: default_url(),
            token: String::new(),
            request_timeout_secs: default_timeout(),
            allow_insecure_certs: false,
            default_checklist: None,
        }
    }
}

impl Config {
    pub fn get_path() -> Option<PathBuf> {
        if let Ok(path) = env::var(CONFIG_ENV) {
            return Some(PathBuf::from(path));
        }
        ProjectDirs::from("com", "packpal", "packpal")
            .map(|proj| proj.config_dir().join("config.toml"))
    }

    /// Missing file means defaults; a file that does not parse is an error.
    pub fn load() -> Result<Self> {
        match Self::get_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => Ok(Self::default()),
        }
    }

    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let config: Config =
            toml::from_str(&content).with_context(|| format!("parsing {}", path.display()))?;
        Ok(config)
    }

    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        LocalStorage::atomic_write(path, content)
    }
}
