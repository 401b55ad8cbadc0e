use crate::storage::QueryLogging;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Database value that selects an in-memory SQLite database
pub const IN_MEMORY: &str = ":memory:";

/// Debug output switches, mirroring the `debug = [...]` config list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DebugFlag {
    /// Log every executed statement
    Query,
    /// Include bound parameters with logged statements
    QueryParams,
    /// Log resolved columns when entities are discovered
    Discovery,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct EmbedmapConfig {
    pub database: Option<String>,
    pub schema: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub debug: Vec<DebugFlag>,
}

impl EmbedmapConfig {
    pub fn in_memory() -> Self {
        Self {
            database: Some(IN_MEMORY.to_string()),
            ..Self::default()
        }
    }

    pub fn with_debug(mut self, flags: &[DebugFlag]) -> Self {
        self.debug.extend_from_slice(flags);
        self
    }

    pub fn is_in_memory(&self) -> bool {
        self.database.as_deref().is_none_or(|db| db == IN_MEMORY)
    }

    pub fn debug_enabled(&self, flag: DebugFlag) -> bool {
        self.debug.contains(&flag)
    }

    pub fn query_logging(&self) -> QueryLogging {
        QueryLogging {
            query: self.debug_enabled(DebugFlag::Query),
            params: self.debug_enabled(DebugFlag::QueryParams),
        }
    }
}

pub fn default_config_path() -> PathBuf {
    PathBuf::from("embedmap.toml")
}

pub fn default_database_path_in(base: &Path) -> PathBuf {
    base.join(".embedmap").join("embedmap.db")
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Option<EmbedmapConfig>> {
    let path = path.map(Path::to_path_buf).unwrap_or_else(default_config_path);
    if !path.exists() {
        return Ok(None);
    }

    let contents = std::fs::read_to_string(&path)?;
    let config: EmbedmapConfig = toml::from_str(&contents)?;
    Ok(Some(config))
}

pub fn write_config(path: &Path, config: &EmbedmapConfig, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        anyhow::bail!("config already exists at {} (use --force to overwrite)", path.display());
    }

    let contents = toml::to_string_pretty(config)?;
    std::fs::write(path, contents)?;
    Ok(())
}

pub fn ensure_db_dir(db_path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}
