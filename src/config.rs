//! Configuration parsing and validation.
//!
//! Configuration is read from a TOML file (default `./config/portal.toml`).
//! Only `[db]` is required; every other section has defaults matching the
//! legacy CMS deployment.
//!
//! # Example
//!
//! ```toml
//! [db]
//! path = "./data/portal.sqlite"
//!
//! [media]
//! base_url = "https://cms.example.com"
//! local_disk = "public"
//! local_path_prefix = "portal-media"
//!
//! [disks.public]
//! root = "./storage/app/public"
//! url = "http://127.0.0.1:8000/storage"
//!
//! [sync]
//! page_size = 200
//! timeout_secs = 60
//!
//! [[sync.sources]]
//! table = "mg_news"
//! columns = ["image", "content", "description"]
//!
//! [server]
//! bind = "127.0.0.1:8000"
//! ```
//!
//! # Environment Variables
//!
//! - `PORTAL_MEDIA_BASE_URL` — overrides `media.base_url` when set.

use anyhow::{bail, Context, Result};
use portal_media_core::models::{MediaSettings, DEFAULT_LOCAL_DISK, DEFAULT_LOCAL_PREFIX};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Environment variable that overrides `media.base_url`.
pub const BASE_URL_ENV: &str = "PORTAL_MEDIA_BASE_URL";

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    #[serde(default)]
    pub media: MediaConfig,
    #[serde(default = "default_disks")]
    pub disks: BTreeMap<String, DiskConfig>,
    #[serde(default)]
    pub sync: SyncConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

/// Location of the legacy CMS content database.
#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct MediaConfig {
    /// Remote origin serving `/uploads/...`. Required only by `media sync`.
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default = "default_local_disk")]
    pub local_disk: String,
    #[serde(default = "default_local_path_prefix")]
    pub local_path_prefix: String,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            local_disk: default_local_disk(),
            local_path_prefix: default_local_path_prefix(),
        }
    }
}

fn default_local_disk() -> String {
    DEFAULT_LOCAL_DISK.to_string()
}
fn default_local_path_prefix() -> String {
    DEFAULT_LOCAL_PREFIX.to_string()
}

/// A named local storage disk: a directory and the public URL it is served
/// under.
#[derive(Debug, Deserialize, Clone)]
pub struct DiskConfig {
    pub root: PathBuf,
    pub url: String,
}

fn default_disks() -> BTreeMap<String, DiskConfig> {
    let mut disks = BTreeMap::new();
    disks.insert(
        DEFAULT_LOCAL_DISK.to_string(),
        DiskConfig {
            root: PathBuf::from("./storage/app/public"),
            url: "http://127.0.0.1:8000/storage".to_string(),
        },
    );
    disks
}

#[derive(Debug, Deserialize, Clone)]
pub struct SyncConfig {
    /// Rows fetched per page while scanning content tables.
    #[serde(default = "default_page_size")]
    pub page_size: i64,
    /// Per-download timeout.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Tables and columns scanned for upload references.
    #[serde(default = "default_sources")]
    pub sources: Vec<SourceTable>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            timeout_secs: default_timeout_secs(),
            sources: default_sources(),
        }
    }
}

fn default_page_size() -> i64 {
    200
}
fn default_timeout_secs() -> u64 {
    60
}

/// One content table and the text columns that may embed upload paths.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct SourceTable {
    pub table: String,
    pub columns: Vec<String>,
}

impl SourceTable {
    pub fn new(table: &str, columns: &[&str]) -> Self {
        Self {
            table: table.to_string(),
            columns: columns.iter().map(|c| c.to_string()).collect(),
        }
    }
}

/// Tables of the legacy CMS that reference uploaded media.
pub fn default_sources() -> Vec<SourceTable> {
    vec![
        SourceTable::new("mg_services", &["image", "content", "description"]),
        SourceTable::new("mg_banner", &["image"]),
        SourceTable::new("mg_news", &["image", "content", "description"]),
        SourceTable::new("mg_attachment", &["url"]),
        SourceTable::new("mg_personal", &["content"]),
        SourceTable::new("mg_team", &["content"]),
    ]
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:8000".to_string()
}

impl Config {
    /// The disk selected by `media.local_disk`.
    pub fn local_disk(&self) -> Result<&DiskConfig> {
        self.disks.get(&self.media.local_disk).with_context(|| {
            format!(
                "media.local_disk '{}' is not a configured disk",
                self.media.local_disk
            )
        })
    }

    /// Media settings handed to the locator and the sync pass.
    pub fn media_settings(&self) -> MediaSettings {
        MediaSettings::new(
            self.media.base_url.as_deref(),
            self.media.local_disk.clone(),
            self.media.local_path_prefix.clone(),
        )
    }
}

/// Read, parse, and validate the configuration file, then apply
/// environment overrides.
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let mut config = parse_config(&content)?;
    apply_base_url_override(&mut config, std::env::var(BASE_URL_ENV).ok());
    Ok(config)
}

/// Parse and validate configuration text.
pub fn parse_config(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

fn apply_base_url_override(config: &mut Config, value: Option<String>) {
    if let Some(url) = value.filter(|v| !v.trim().is_empty()) {
        config.media.base_url = Some(url);
    }
}

fn validate(config: &Config) -> Result<()> {
    if config.sync.page_size < 1 {
        bail!("sync.page_size must be >= 1");
    }
    if config.sync.timeout_secs == 0 {
        bail!("sync.timeout_secs must be > 0");
    }

    config.local_disk()?;

    for source in &config.sync.sources {
        if !is_identifier(&source.table) {
            bail!("sync.sources: invalid table name '{}'", source.table);
        }
        if source.columns.is_empty() {
            bail!("sync.sources: table '{}' lists no columns", source.table);
        }
        if let Some(column) = source.columns.iter().find(|c| !is_identifier(c)) {
            bail!(
                "sync.sources: invalid column name '{}' in table '{}'",
                column,
                source.table
            );
        }
    }

    Ok(())
}

/// Plain SQL identifier: `[A-Za-z_][A-Za-z0-9_]*`.
fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
