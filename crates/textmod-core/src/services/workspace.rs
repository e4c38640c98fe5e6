use futures_util::future::join_all;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use tokio::fs;

use crate::config::EngineConfig;
use crate::error::{Result, TextModError};
use crate::shared::FileMap;

/// File access confined to one project directory.
#[derive(Debug, Clone)]
pub struct ProjectRoot {
    root: PathBuf,
}

impl ProjectRoot {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    /// Resolves a root-relative path. The path is normalized lexically, then
    /// its deepest existing ancestor is canonicalized so a symlink leading
    /// out of the root is refused as well.
    pub async fn resolve(&self, relative: &str) -> Result<PathBuf> {
        let path = self.root.join(normalize_relative(relative)?);
        let root = fs::canonicalize(&self.root).await?;
        let outside = || TextModError::PathOutsideRoot(relative.to_string());

        let mut existing = path.as_path();
        let real = loop {
            match fs::canonicalize(existing).await {
                Ok(real) => break real,
                Err(e) if e.kind() == ErrorKind::NotFound => {
                    // a dangling symlink would be followed on write
                    if fs::symlink_metadata(existing).await.is_ok() {
                        return Err(outside());
                    }
                    existing = existing.parent().ok_or_else(outside)?;
                }
                Err(e) => return Err(e.into()),
            }
        };

        if !real.starts_with(&root) {
            tracing::warn!(path = %relative, "refusing path that resolves outside the root");
            return Err(outside());
        }
        Ok(path)
    }

    pub async fn read(&self, relative: &str) -> Result<String> {
        let path = self.resolve(relative).await?;
        Ok(fs::read_to_string(&path).await?)
    }

    pub async fn write(&self, relative: &str, content: &str) -> Result<()> {
        let path = self.resolve(relative).await?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&path, content).await?;
        Ok(())
    }

    /// Loads every scannable source file under the root.
    pub async fn load_files(&self, config: &EngineConfig) -> Result<FileMap> {
        let mut pending = vec![PathBuf::new()];
        let mut relative_files = Vec::new();

        while let Some(dir) = pending.pop() {
            let mut entries = fs::read_dir(self.root.join(&dir)).await?;
            while let Some(entry) = entries.next_entry().await? {
                let file_type = entry.file_type().await?;
                let name = entry.file_name();
                let name_str = name.to_string_lossy();
                let relative = dir.join(name_str.as_ref());

                if file_type.is_dir() {
                    if !config.is_excluded_dir(&name_str) {
                        pending.push(relative);
                    }
                } else if file_type.is_file() {
                    if !has_source_extension(&relative, config) {
                        continue;
                    }
                    let metadata = entry.metadata().await?;
                    if metadata.len() as usize > config.max_file_bytes {
                        tracing::debug!(path = %relative.display(), "skipping oversize file");
                        continue;
                    }
                    relative_files.push(relative);
                }
            }
        }

        let reads = relative_files.iter().map(|relative| async move {
            let content = fs::read_to_string(self.root.join(relative)).await;
            (relative, content)
        });

        let mut files = FileMap::new();
        for (relative, content) in join_all(reads).await {
            match content {
                Ok(content) => {
                    files.insert(to_slash_path(relative), content);
                }
                Err(e) => {
                    tracing::warn!(path = %relative.display(), "skipping unreadable file: {}", e)
                }
            }
        }

        tracing::info!(root = %self.root.display(), files = files.len(), "loaded project files");
        Ok(files)
    }
}

pub fn normalize_relative(relative: &str) -> Result<PathBuf> {
    if relative.contains('\0') {
        return Err(TextModError::PathOutsideRoot(relative.replace('\0', "\\0")));
    }

    let mut normalized = PathBuf::new();
    for component in Path::new(&relative.replace('\\', "/")).components() {
        match component {
            Component::Normal(part) => normalized.push(part),
            Component::CurDir => {}
            Component::ParentDir => {
                if !normalized.pop() {
                    return Err(TextModError::PathOutsideRoot(relative.to_string()));
                }
            }
            Component::RootDir | Component::Prefix(_) => {
                return Err(TextModError::PathOutsideRoot(relative.to_string()));
            }
        }
    }

    if normalized.as_os_str().is_empty() {
        return Err(TextModError::PathOutsideRoot(relative.to_string()));
    }
    Ok(normalized)
}

/// True when a project-relative path is a scannable source file outside
/// build and dependency directories.
pub fn is_scannable_path(relative: &str, config: &EngineConfig) -> bool {
    let Ok(normalized) = normalize_relative(relative) else {
        return false;
    };

    let mut components = normalized.components().peekable();
    while let Some(component) = components.next() {
        if components.peek().is_none() {
            break;
        }
        if let Component::Normal(dir) = component {
            if config.is_excluded_dir(&dir.to_string_lossy()) {
                return false;
            }
        }
    }

    has_source_extension(&normalized, config)
}

fn has_source_extension(path: &Path, config: &EngineConfig) -> bool {
    path.extension()
        .map(|ext| config.is_source_extension(&ext.to_string_lossy()))
        .unwrap_or(false)
}

fn to_slash_path(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_normalize_relative() {
        assert_eq!(
            normalize_relative("src/./components/../App.tsx").unwrap(),
            PathBuf::from("src/App.tsx")
        );
        assert!(normalize_relative("../secrets.txt").is_err());
        assert!(normalize_relative("src/../../etc/passwd").is_err());
        assert!(normalize_relative("/etc/passwd").is_err());
        assert!(normalize_relative("").is_err());
        assert!(normalize_relative("bad\0name.tsx").is_err());
    }

    #[test]
    fn test_is_scannable_path() {
        let config = EngineConfig::default();
        assert!(is_scannable_path("src/App.tsx", &config));
        assert!(is_scannable_path("index.html", &config));
        assert!(!is_scannable_path("node_modules/react/index.js", &config));
        assert!(!is_scannable_path("dist/bundle.js", &config));
        assert!(!is_scannable_path("src/logo.png", &config));
        assert!(!is_scannable_path("../outside.tsx", &config));
    }

    #[tokio::test]
    async fn test_load_files_skips_excluded() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        std::fs::create_dir_all(root.join("src/components")).unwrap();
        std::fs::create_dir_all(root.join("node_modules/pkg")).unwrap();
        std::fs::write(root.join("src/App.tsx"), "<h1>Hi</h1>").unwrap();
        std::fs::write(root.join("src/components/Nav.jsx"), "<nav/>").unwrap();
        std::fs::write(root.join("src/logo.svg.bin"), "binary").unwrap();
        std::fs::write(root.join("node_modules/pkg/index.js"), "x").unwrap();

        let files = ProjectRoot::new(root)
            .load_files(&EngineConfig::default())
            .await
            .unwrap();

        assert_eq!(
            files.keys().cloned().collect::<Vec<_>>(),
            vec!["src/App.tsx".to_string(), "src/components/Nav.jsx".to_string()]
        );
    }

    #[tokio::test]
    async fn test_write_creates_parents_and_refuses_escape() {
        let dir = tempfile::tempdir().unwrap();
        let project = ProjectRoot::new(dir.path());

        project.write("src/new/Page.tsx", "content").await.unwrap();
        assert_eq!(project.read("src/new/Page.tsx").await.unwrap(), "content");

        let err = project.write("../escape.tsx", "x").await.unwrap_err();
        assert!(matches!(err, TextModError::PathOutsideRoot(_)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_symlinks_out_of_root_are_refused() {
        let outside = tempfile::tempdir().unwrap();
        std::fs::write(outside.path().join("secret.txt"), "keep").unwrap();

        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        std::fs::create_dir_all(root.join("src")).unwrap();
        std::os::unix::fs::symlink(outside.path().join("secret.txt"), root.join("src/App.tsx"))
            .unwrap();
        std::os::unix::fs::symlink(outside.path(), root.join("linked")).unwrap();
        std::os::unix::fs::symlink(outside.path().join("missing.txt"), root.join("src/Ghost.tsx"))
            .unwrap();
        let project = ProjectRoot::new(root);

        for path in ["src/App.tsx", "linked/New.tsx", "src/Ghost.tsx"] {
            let err = project.write(path, "changed").await.unwrap_err();
            assert!(matches!(err, TextModError::PathOutsideRoot(_)), "{}", path);
        }
        assert!(matches!(
            project.read("src/App.tsx").await.unwrap_err(),
            TextModError::PathOutsideRoot(_)
        ));

        assert_eq!(
            std::fs::read_to_string(outside.path().join("secret.txt")).unwrap(),
            "keep"
        );
        assert!(!outside.path().join("New.tsx").exists());
        assert!(!outside.path().join("missing.txt").exists());

        project.write("src/Real.tsx", "ok").await.unwrap();
        assert_eq!(project.read("src/Real.tsx").await.unwrap(), "ok");
    }
}
