use crate::server::MetaError;
use std::io;
use std::path::{Component, Path, PathBuf};

/// Outcome of resolving one request path against the root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPath {
    /// Root with all symlinks resolved
    pub real_root: PathBuf,
    /// Requested file with all symlinks resolved
    pub real_path: PathBuf,
    /// Whether `real_path` is `real_root` or one of its descendants
    pub inside: bool,
}

impl ResolvedPath {
    /// Hand out the real path only if it stayed under the root
    pub fn ensure_inside(self) -> Result<PathBuf, MetaError> {
        if self.inside {
            Ok(self.real_path)
        } else {
            Err(MetaError::AccessDenied {
                path: self.real_path,
            })
        }
    }
}

/// Maps request paths onto a fixed root directory
///
/// Escapes are caught after symlink resolution, so a link inside the root
/// that points elsewhere is refused just like a `..` traversal.
#[derive(Debug, Clone)]
pub struct PathResolver {
    /// Absolute, lexically normalized root (symlinks not yet resolved)
    root: PathBuf,
}

impl PathResolver {
    /// Anchor a resolver at `root`, made absolute against the working directory
    pub fn new(root: impl AsRef<Path>) -> io::Result<Self> {
        let root = std::path::absolute(root.as_ref())?;
        Ok(Self {
            root: normalize_lexically(&root),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Join a decoded request path onto the root without touching the filesystem
    ///
    /// Leading separators are stripped first so `/etc/passwd` cannot replace
    /// the root on join. `..` segments are folded lexically and may still
    /// point outside the root; [`PathResolver::resolve`] catches that.
    pub fn logical_path(&self, request_path: &str) -> PathBuf {
        let relative = request_path.trim_start_matches(['/', '\\']);
        normalize_lexically(&self.root.join(relative))
    }

    /// Canonicalize the root and the requested file and compare them
    ///
    /// Fails with [`MetaError::Resolve`] when either side cannot be
    /// canonicalized, typically because the file does not exist.
    pub async fn resolve(&self, request_path: &str) -> Result<ResolvedPath, MetaError> {
        let logical = self.logical_path(request_path);

        let real_root = tokio::fs::canonicalize(&self.root)
            .await
            .map_err(|source| MetaError::Resolve {
                path: self.root.clone(),
                source,
            })?;
        let real_path = tokio::fs::canonicalize(&logical)
            .await
            .map_err(|source| MetaError::Resolve {
                path: logical.clone(),
                source,
            })?;

        let inside = is_inside(&real_root, &real_path);
        Ok(ResolvedPath {
            real_root,
            real_path,
            inside,
        })
    }
}

/// Whether `path` equals `root` or lies beneath it
///
/// Both paths must already be canonical. Comparison is per component, so
/// `/srv/data-old` is not inside `/srv/data`.
pub fn is_inside(root: &Path, path: &Path) -> bool {
    match path.strip_prefix(root) {
        Ok(relative) => !matches!(
            relative.components().next(),
            Some(Component::ParentDir | Component::RootDir | Component::Prefix(_))
        ),
        Err(_) => false,
    }
}

/// Fold `.` and `..` out of a path without consulting the filesystem
///
/// `..` at the filesystem root stays at the root.
pub fn normalize_lexically(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Prefix(_) | Component::RootDir => normalized.push(component.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            Component::Normal(part) => normalized.push(part),
        }
    }
    normalized
}
