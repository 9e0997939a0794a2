use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::errors::ConfigError;

/// When templates get compiled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TemplatePolicy {
    /// Compile on first request, at most once per name.
    #[default]
    Lazy,
    /// Compile every registered template at startup; any failure is fatal.
    Eager,
}

/// Site-wide settings, read once at startup and never mutated.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteConfig {
    #[serde(alias = "ListenOn")]
    pub listen_address: String,
    #[serde(alias = "Title")]
    pub site_title: String,
    #[serde(default = "default_www_root")]
    pub www_root: PathBuf,
    #[serde(default)]
    pub template_policy: TemplatePolicy,
    #[serde(default = "default_carousel_ttl_secs")]
    pub carousel_ttl_secs: u64,
    #[serde(default = "default_log_requests")]
    pub log_requests: bool,
}

fn default_www_root() -> PathBuf {
    PathBuf::from("www")
}

fn default_carousel_ttl_secs() -> u64 {
    60
}

fn default_log_requests() -> bool {
    true
}

impl SiteConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let data = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&data).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    fn parse(data: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(data)
    }

    pub fn templates_dir(&self) -> PathBuf {
        self.www_root.join("dynamic")
    }

    pub fn static_dir(&self) -> PathBuf {
        self.www_root.join("static")
    }

    pub fn galleries_dir(&self) -> PathBuf {
        self.static_dir().join("galleries")
    }

    pub fn galleries_manifest(&self) -> PathBuf {
        self.galleries_dir().join("galleries.json")
    }

    pub fn carousel_manifest(&self) -> PathBuf {
        self.static_dir().join("carousel").join("carousel.json")
    }

    pub fn carousel_ttl(&self) -> Duration {
        Duration::from_secs(self.carousel_ttl_secs)
    }
}
