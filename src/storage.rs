// src/storage.rs
//
// Local-disk store for resource files. Stored names are uuid-prefixed so
// repeated uploads of the same filename never collide.

use std::io;
use std::path::PathBuf;

use uuid::Uuid;

#[derive(Clone)]
pub struct ResourceStore {
    root: PathBuf,
}

pub struct StoredFile {
    pub file_name: String,
    pub web_path: String,
}

impl ResourceStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub async fn save(&self, original_name: &str, bytes: &[u8]) -> io::Result<StoredFile> {
        tokio::fs::create_dir_all(&self.root).await?;

        let file_name = format!("{}_{}", Uuid::new_v4(), sanitize(original_name));
        tokio::fs::write(self.root.join(&file_name), bytes).await?;

        let web_path = format!("/digital-resources/{file_name}");
        Ok(StoredFile {
            file_name,
            web_path,
        })
    }

    /// Returns `None` when the backing file is gone, so callers can report
    /// a broken resource instead of a permission failure.
    pub async fn load(&self, file_name: &str) -> io::Result<Option<Vec<u8>>> {
        match tokio::fs::read(self.root.join(file_name)).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// A file that is already absent is not an error.
    pub async fn remove(&self, file_name: &str) -> io::Result<()> {
        match tokio::fs::remove_file(self.root.join(file_name)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }
}

fn sanitize(filename: &str) -> String {
    filename
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '.' || *c == '_' || *c == '-')
        .collect()
}
