//! JSON file behind the todo verbs.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Environment variable naming the todo file.
pub const STORE_ENV: &str = "VERBWIRE_STORE";
const DEFAULT_STORE: &str = "todo.json";

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("todo {0} already exists")]
    AlreadyExists(String),

    #[error("todo {0} does not exist")]
    NotFound(String),

    #[error("todo file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("todo file {path} is not valid JSON: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TodoItem {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default)]
    pub done: bool,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct TodoFile {
    #[serde(default)]
    items: Vec<TodoItem>,
}

#[derive(Debug, Clone)]
pub struct TodoStore {
    path: PathBuf,
}

impl TodoStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn from_env() -> Self {
        let path = std::env::var_os(STORE_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_STORE));
        Self::new(path)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// A missing file is an empty list.
    pub async fn load(&self) -> Result<Vec<TodoItem>, StoreError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => return Err(self.io_error(source)),
        };
        let file: TodoFile = serde_json::from_slice(&bytes).map_err(|source| StoreError::Json {
            path: self.path.clone(),
            source,
        })?;
        Ok(file.items)
    }

    async fn save(&self, items: Vec<TodoItem>) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec_pretty(&TodoFile { items }).map_err(|source| {
            StoreError::Json {
                path: self.path.clone(),
                source,
            }
        })?;
        tokio::fs::write(&self.path, bytes)
            .await
            .map_err(|source| self.io_error(source))
    }

    pub async fn add(&self, id: &str, title: Option<&str>) -> Result<TodoItem, StoreError> {
        let mut items = self.load().await?;
        if items.iter().any(|item| item.id == id) {
            return Err(StoreError::AlreadyExists(id.to_string()));
        }
        let item = TodoItem {
            id: id.to_string(),
            title: title.map(str::to_string),
            done: false,
        };
        items.push(item.clone());
        self.save(items).await?;
        tracing::debug!(id, path = %self.path.display(), "todo added");
        Ok(item)
    }

    pub async fn complete(&self, id: &str) -> Result<TodoItem, StoreError> {
        let mut items = self.load().await?;
        let item = items
            .iter_mut()
            .find(|item| item.id == id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        item.done = true;
        let completed = item.clone();
        self.save(items).await?;
        tracing::debug!(id, path = %self.path.display(), "todo completed");
        Ok(completed)
    }

    fn io_error(&self, source: std::io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.clone(),
            source,
        }
    }
}
