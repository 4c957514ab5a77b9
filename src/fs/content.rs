use std::{
    io::ErrorKind,
    path::{Component, Path, PathBuf},
};

use crate::{domain::repository::ContentStore, fs::config::Config};
use anyhow::{Context, Result, bail};

/// Text blobs kept as files directly under one directory.
pub struct ContentDir {
    root: PathBuf,
}

impl ContentDir {
    pub fn new(config: Config) -> Self {
        ContentDir {
            root: PathBuf::from(config.storage_dir),
        }
    }

    fn path_of(&self, name: &str) -> Result<PathBuf> {
        let mut components = Path::new(name).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(_)), None) => Ok(self.root.join(name)),
            _ => bail!("invalid content file name '{name}'"),
        }
    }
}

impl ContentStore for ContentDir {
    async fn read(&self, name: &str) -> Result<Option<String>> {
        let path = self.path_of(name)?;
        match tokio::fs::read_to_string(&path).await {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("failed to read {}", path.display())),
        }
    }

    async fn write(&self, name: &str, content: &str) -> Result<()> {
        let path = self.path_of(name)?;
        tokio::fs::create_dir_all(&self.root)
            .await
            .with_context(|| format!("failed to create {}", self.root.display()))?;
        tokio::fs::write(&path, content)
            .await
            .with_context(|| format!("failed to write {}", path.display()))
    }
}
