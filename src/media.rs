use std::path::{Component, Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::info;

/// URL prefix under which the media root is published.
pub const PUBLIC_PREFIX: &str = "/recipes/medias";

static UNSAFE_SEGMENT_CHARS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^A-Za-z0-9_-]").unwrap());

#[derive(Debug, thiserror::Error)]
pub enum MediaError {
    #[error("Access denied")]
    AccessDenied,
    #[error("{0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenameOutcome {
    Renamed,
    SourceMissing,
}

/// Owns the folder tree holding recipe images.
///
/// Paths coming from clients are always resolved to an absolute, normalized
/// location first and only then compared against the root, so `..` segments
/// and symlinked directories cannot reach outside of it.
#[derive(Debug, Clone)]
pub struct MediaManager {
    root: PathBuf,
}

impl MediaManager {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let root = std::path::absolute(&root).unwrap_or(root);
        Self {
            root: normalize(&root),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Sanitize a client folder name segment by segment, keeping `/` and `\`
    /// as nesting boundaries. Returns `None` when nothing is left.
    pub fn sanitize_folder(name: &str) -> Option<String> {
        let parts: Vec<String> = name
            .split(['/', '\\'])
            .filter(|p| !p.is_empty())
            .map(|p| UNSAFE_SEGMENT_CHARS.replace_all(p, "_").into_owned())
            .collect();

        if parts.is_empty() {
            None
        } else {
            Some(parts.join("/"))
        }
    }

    /// Public URL of a file stored in the (already sanitized) folder.
    pub fn public_url(folder: Option<&str>, file_name: &str) -> String {
        match folder {
            Some(folder) => format!("{}/{}/{}", PUBLIC_PREFIX, folder, file_name),
            None => format!("{}/{}", PUBLIC_PREFIX, file_name),
        }
    }

    /// Create (if needed) the sanitized upload folder and return its absolute
    /// path together with the sanitized name. No name means the media root.
    pub async fn resolve_upload_folder(
        &self,
        name: Option<&str>,
    ) -> Result<(PathBuf, Option<String>), MediaError> {
        let folder = name.and_then(Self::sanitize_folder);
        let path = match &folder {
            Some(folder) => folder.split('/').fold(self.root.clone(), |p, s| p.join(s)),
            None => self.root.clone(),
        };
        tokio::fs::create_dir_all(&path).await?;
        Ok((path, folder))
    }

    /// Write `bytes` as `file_name` into the upload folder and return the
    /// public URL of the new file.
    pub async fn write_file(
        &self,
        folder: Option<&str>,
        file_name: &str,
        bytes: &[u8],
    ) -> Result<String, MediaError> {
        let (dir, folder) = self.resolve_upload_folder(folder).await?;
        let target = dir.join(file_name);
        if !is_strict_descendant(&normalize(&target), &self.root) {
            return Err(MediaError::AccessDenied);
        }
        tokio::fs::write(&target, bytes).await?;
        info!(path = %target.display(), size = bytes.len(), "stored media file");
        Ok(Self::public_url(folder.as_deref(), file_name))
    }

    /// Lexically resolve a client path against the media root.
    ///
    /// Accepts both root-relative paths (`dinner/pasta.jpg`) and the public
    /// URLs handed out by uploads (`/recipes/medias/dinner/pasta.jpg`).
    pub fn resolve(&self, relative: &str) -> Result<PathBuf, MediaError> {
        let mut segments: Vec<&str> = relative
            .split(['/', '\\'])
            .filter(|s| !s.is_empty())
            .collect();

        let prefix: Vec<&str> = PUBLIC_PREFIX.split('/').filter(|s| !s.is_empty()).collect();
        if segments.starts_with(&prefix) {
            segments.drain(..prefix.len());
        }

        let joined = segments.iter().fold(self.root.clone(), |p, s| p.join(s));
        let resolved = normalize(&joined);

        if !is_strict_descendant(&resolved, &self.root) {
            return Err(MediaError::AccessDenied);
        }
        Ok(resolved)
    }

    /// Resolve a path and, when it exists, confirm that its real location is
    /// still inside the root. `None` means there is nothing at that path.
    async fn locate(&self, relative: &str) -> Result<Option<PathBuf>, MediaError> {
        let path = self.resolve(relative)?;
        match tokio::fs::canonicalize(&path).await {
            Ok(real) => {
                let root = tokio::fs::canonicalize(&self.root).await?;
                if !is_strict_descendant(&real, &root) {
                    return Err(MediaError::AccessDenied);
                }
                Ok(Some(path))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn delete_file(&self, relative: &str) -> Result<(), MediaError> {
        let Some(path) = self.locate(relative).await? else {
            return Ok(());
        };
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                info!(path = %path.display(), "deleted media file");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn delete_folder(&self, relative: &str) -> Result<(), MediaError> {
        let Some(path) = self.locate(relative).await? else {
            return Ok(());
        };
        match tokio::fs::remove_dir_all(&path).await {
            Ok(()) => {
                info!(path = %path.display(), "deleted media folder");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn rename_folder(
        &self,
        old_relative: &str,
        new_relative: &str,
    ) -> Result<RenameOutcome, MediaError> {
        // Both sides are checked before anything touches the disk.
        let new_path = self.resolve(new_relative)?;
        let Some(old_path) = self.locate(old_relative).await? else {
            return Ok(RenameOutcome::SourceMissing);
        };

        if let Some(parent) = new_path.parent() {
            let root = tokio::fs::canonicalize(&self.root).await?;
            if let Some(existing) = nearest_existing_ancestor(parent).await {
                if !existing.starts_with(&root) {
                    return Err(MediaError::AccessDenied);
                }
            }
            tokio::fs::create_dir_all(parent).await?;
        }

        tokio::fs::rename(&old_path, &new_path).await?;
        info!(from = %old_path.display(), to = %new_path.display(), "renamed media folder");
        Ok(RenameOutcome::Renamed)
    }
}

/// Resolve `.` and `..` without touching the filesystem.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

fn is_strict_descendant(path: &Path, root: &Path) -> bool {
    path != root && path.starts_with(root)
}

async fn nearest_existing_ancestor(path: &Path) -> Option<PathBuf> {
    let mut current = Some(path);
    while let Some(dir) = current {
        if let Ok(real) = tokio::fs::canonicalize(dir).await {
            return Some(real);
        }
        current = dir.parent();
    }
    None
}
