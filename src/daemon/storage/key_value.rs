use std::{
    collections::HashMap,
    fmt::Display,
    path::{Path, PathBuf},
};

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Mutex;

use crate::fs::operations::{read_locked, remove_if_exists, write_locked};

pub const WATCH_TIME_STATS_KEY: &str = "watchTimeStats";
pub const DAILY_STATS_KEY: &str = "dailyStats";
pub const SETTINGS_KEY: &str = "settings";

/// Durability scope of a key. Statistics live in the local scope, settings in the synced one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scope {
    Local,
    Synced,
}

impl Scope {
    fn dir_name(&self) -> &'static str {
        match self {
            Scope::Local => "local",
            Scope::Synced => "sync",
        }
    }
}

impl Display for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.dir_name())
    }
}

/// Interface for abstracting the place where documents are kept. Every key holds one json
/// document that is always read and written as a whole.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, scope: Scope, key: &str) -> Result<Option<Value>>;

    async fn set(&self, scope: Scope, key: &str, value: Value) -> Result<()>;

    /// Removes every key of the scope.
    async fn clear(&self, scope: Scope) -> Result<()>;
}

/// The main realization of [KeyValueStore]. Keys are files `<root>/<scope>/<key>.json`.
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new(root: PathBuf) -> Result<Self, std::io::Error> {
        for scope in [Scope::Local, Scope::Synced] {
            std::fs::create_dir_all(root.join(scope.dir_name()))?;
        }
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_of(&self, scope: Scope, key: &str) -> PathBuf {
        self.root
            .join(scope.dir_name())
            .join(format!("{key}.json"))
    }
}

#[async_trait]
impl KeyValueStore for FileStore {
    async fn get(&self, scope: Scope, key: &str) -> Result<Option<Value>> {
        let Some(contents) = read_locked(&self.path_of(scope, key)).await? else {
            return Ok(None);
        };
        if contents.trim().is_empty() {
            return Ok(None);
        }
        Ok(Some(serde_json::from_str(&contents)?))
    }

    async fn set(&self, scope: Scope, key: &str, value: Value) -> Result<()> {
        let contents = serde_json::to_vec(&value)?;
        write_locked(&self.path_of(scope, key), &contents).await?;
        Ok(())
    }

    async fn clear(&self, scope: Scope) -> Result<()> {
        let dir = self.root.join(scope.dir_name());
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(e.into()),
        };
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                remove_if_exists(&path).await?;
            }
        }
        Ok(())
    }
}

/// Keeps documents in memory. Nothing survives the process.
#[derive(Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<(Scope, String), Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, scope: Scope, key: &str) -> Result<Option<Value>> {
        Ok(self.values.lock().await.get(&(scope, key.to_string())).cloned())
    }

    async fn set(&self, scope: Scope, key: &str, value: Value) -> Result<()> {
        self.values
            .lock()
            .await
            .insert((scope, key.to_string()), value);
        Ok(())
    }

    async fn clear(&self, scope: Scope) -> Result<()> {
        self.values.lock().await.retain(|(s, _), _| *s != scope);
        Ok(())
    }
}
