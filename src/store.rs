use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use tracing::warn;

use crate::models::Recipe;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Failed to access recipe file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to serialize recipes: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Whole-collection persistence. Every save replaces the collection.
#[async_trait]
pub trait RecipeStore: Send + Sync {
    /// Returns the stored collection; unreadable content counts as empty.
    async fn load(&self) -> Result<Vec<Recipe>, StoreError>;

    /// Replaces the stored collection and returns the number of recipes written.
    async fn save(&self, recipes: &[Recipe]) -> Result<usize, StoreError>;
}

/// Collection kept as one pretty-printed JSON array on disk.
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn staging_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "recipes.json".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[async_trait]
impl RecipeStore for JsonFileStore {
    async fn load(&self) -> Result<Vec<Recipe>, StoreError> {
        let data = match tokio::fs::read_to_string(&self.path).await {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        match serde_json::from_str::<Vec<Recipe>>(&data) {
            Ok(recipes) => Ok(recipes),
            Err(e) => {
                warn!(path = %self.path.display(), "recipe file is not a valid collection, treating as empty: {}", e);
                Ok(Vec::new())
            }
        }
    }

    async fn save(&self, recipes: &[Recipe]) -> Result<usize, StoreError> {
        let json = serde_json::to_string_pretty(recipes)?;

        // Readers only ever see the old or the new file, never a partial write.
        let staging = self.staging_path();
        tokio::fs::write(&staging, json).await?;
        if let Err(e) = tokio::fs::rename(&staging, &self.path).await {
            let _ = tokio::fs::remove_file(&staging).await;
            return Err(e.into());
        }

        Ok(recipes.len())
    }
}

/// In-process store, used where a file on disk is not wanted.
#[derive(Default)]
pub struct MemoryStore {
    recipes: Mutex<Vec<Recipe>>,
}

impl MemoryStore {
    pub fn new(recipes: Vec<Recipe>) -> Self {
        Self {
            recipes: Mutex::new(recipes),
        }
    }
}

#[async_trait]
impl RecipeStore for MemoryStore {
    async fn load(&self) -> Result<Vec<Recipe>, StoreError> {
        let guard = self.recipes.lock().unwrap_or_else(|p| p.into_inner());
        Ok(guard.clone())
    }

    async fn save(&self, recipes: &[Recipe]) -> Result<usize, StoreError> {
        let mut guard = self.recipes.lock().unwrap_or_else(|p| p.into_inner());
        *guard = recipes.to_vec();
        Ok(recipes.len())
    }
}
