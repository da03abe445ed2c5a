use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Mutex;

/// Where exported storyboard artifacts end up.
#[async_trait]
pub trait Storage: Send + Sync {
    async fn read(&self, path: &str) -> Result<Vec<u8>>;
    async fn write(&self, path: &str, content: &[u8]) -> Result<()>;
    async fn delete(&self, path: &str) -> Result<()>;
    async fn exists(&self, path: &str) -> Result<bool>;
    async fn list(&self, prefix: &str) -> Result<Vec<String>>;
}

// --- Native Implementation ---

#[derive(Debug, Default)]
pub struct NativeStorage;

impl NativeStorage {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Storage for NativeStorage {
    async fn read(&self, path: &str) -> Result<Vec<u8>> {
        Ok(tokio::fs::read(path).await?)
    }

    async fn write(&self, path: &str, content: &[u8]) -> Result<()> {
        if let Some(parent) = std::path::Path::new(path).parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        tokio::fs::write(path, content).await?;
        Ok(())
    }

    async fn delete(&self, path: &str) -> Result<()> {
        if tokio::fs::try_exists(path).await? {
            if std::path::Path::new(path).is_dir() {
                tokio::fs::remove_dir_all(path).await?;
            } else {
                tokio::fs::remove_file(path).await?;
            }
        }
        Ok(())
    }

    async fn exists(&self, path: &str) -> Result<bool> {
        Ok(tokio::fs::try_exists(path).await?)
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>> {
        let path = std::path::Path::new(prefix);
        let mut entries = Vec::new();

        if path.is_dir() {
            let mut dir = tokio::fs::read_dir(path).await?;
            while let Some(entry) = dir.next_entry().await? {
                entries.push(entry.path().to_string_lossy().to_string());
            }
        } else if path.exists() {
            entries.push(prefix.to_string());
        }

        entries.sort();
        Ok(entries)
    }
}

// --- In-memory Implementation ---

/// Keeps files in a map. Used by tests and dry runs.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    files: Mutex<BTreeMap<String, Vec<u8>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn files(&self) -> Result<std::sync::MutexGuard<'_, BTreeMap<String, Vec<u8>>>> {
        self.files
            .lock()
            .map_err(|_| anyhow!("memory storage lock poisoned"))
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn read(&self, path: &str) -> Result<Vec<u8>> {
        self.files()?
            .get(path)
            .cloned()
            .ok_or_else(|| anyhow!("File not found: {}", path))
    }

    async fn write(&self, path: &str, content: &[u8]) -> Result<()> {
        self.files()?.insert(path.to_string(), content.to_vec());
        Ok(())
    }

    async fn delete(&self, path: &str) -> Result<()> {
        let mut files = self.files()?;
        let nested = format!("{}/", path.trim_end_matches('/'));
        files.retain(|k, _| k != path && !k.starts_with(&nested));
        Ok(())
    }

    async fn exists(&self, path: &str) -> Result<bool> {
        Ok(self.files()?.contains_key(path))
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>> {
        Ok(self
            .files()?
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_native_storage_creates_parents() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("a/b/scene-1.png");
        let path_str = path.to_str().unwrap();

        let storage = NativeStorage::new();
        storage.write(path_str, b"png").await?;
        assert!(storage.exists(path_str).await?);
        assert_eq!(storage.read(path_str).await?, b"png");

        let listed = storage.list(dir.path().join("a/b").to_str().unwrap()).await?;
        assert_eq!(listed, vec![path_str.to_string()]);

        storage.delete(dir.path().join("a").to_str().unwrap()).await?;
        assert!(!storage.exists(path_str).await?);
        Ok(())
    }

    #[tokio::test]
    async fn test_memory_storage() -> Result<()> {
        let storage = MemoryStorage::new();
        storage.write("out/run/scene-1.png", b"1").await?;
        storage.write("out/run/scene-2.png", b"2").await?;
        storage.write("other/x", b"x").await?;

        assert_eq!(storage.list("out/").await?.len(), 2);
        assert!(storage.read("missing").await.is_err());

        storage.delete("out/run").await?;
        assert!(storage.list("out/").await?.is_empty());
        assert!(storage.exists("other/x").await?);
        Ok(())
    }
}
