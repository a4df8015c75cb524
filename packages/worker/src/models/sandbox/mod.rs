pub mod error;
pub mod process;
pub mod stream;

use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use common::judge_result::ExecutionResult;
use error::SandboxError;
use tracing::warn;
use uuid::Uuid;

pub use process::ProcessSandboxManager;

/// Scratch directory owned by one judging request.
///
/// The directory and everything in it is removed when the handle is dropped,
/// on success and failure paths alike.
#[derive(Debug)]
pub struct SandboxHandle {
    id: String,
    root: PathBuf,
    path: PathBuf,
}

impl SandboxHandle {
    /// Create a fresh, uniquely named directory under `root`.
    pub async fn create(root: &Path) -> Result<Self, SandboxError> {
        let id = Uuid::new_v4().to_string();
        let path = root.join(format!("judge-sandbox-{id}"));

        tokio::fs::create_dir_all(root)
            .await
            .map_err(|source| SandboxError::Initialization {
                path: root.to_path_buf(),
                source,
            })?;
        tokio::fs::create_dir(&path)
            .await
            .map_err(|source| SandboxError::Initialization {
                path: path.clone(),
                source,
            })?;

        Ok(Self {
            id,
            root: root.to_path_buf(),
            path,
        })
    }

    /// Fresh sibling directory holding a copy of everything in this one.
    ///
    /// Files keep their permission bits and symlinks are recreated as links.
    pub async fn duplicate(&self) -> Result<Self, SandboxError> {
        let copy = Self::create(&self.root).await?;
        copy_tree(&self.path, &copy.path)
            .await
            .map_err(|source| SandboxError::Initialization {
                path: copy.path.clone(),
                source,
            })?;
        Ok(copy)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

async fn copy_tree(from: &Path, to: &Path) -> io::Result<()> {
    let mut pending = vec![(from.to_path_buf(), to.to_path_buf())];
    while let Some((src, dst)) = pending.pop() {
        let mut entries = tokio::fs::read_dir(&src).await?;
        while let Some(entry) = entries.next_entry().await? {
            let target = dst.join(entry.file_name());
            let file_type = entry.file_type().await?;
            if file_type.is_dir() {
                tokio::fs::create_dir(&target).await?;
                pending.push((entry.path(), target));
            } else if file_type.is_symlink() {
                let link = tokio::fs::read_link(entry.path()).await?;
                tokio::fs::symlink(link, &target).await?;
            } else {
                tokio::fs::copy(entry.path(), &target).await?;
            }
        }
    }
    Ok(())
}

impl Drop for SandboxHandle {
    fn drop(&mut self) {
        match std::fs::remove_dir_all(&self.path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(
                sandbox = %self.id,
                path = %self.path.display(),
                error = %e,
                "Failed to remove sandbox directory"
            ),
        }
    }
}

#[async_trait]
pub trait SandboxManager: Send + Sync {
    /// Create a scratch directory and write `source_code` into it.
    async fn create_sandbox(&self, source_code: &str) -> Result<SandboxHandle, SandboxError>;

    /// Run the compile step. `None` when there is nothing to compile.
    async fn compile(
        &self,
        sandbox: &SandboxHandle,
    ) -> Result<Option<ExecutionResult>, SandboxError>;

    /// Run the compiled program once with `stdin` as its standard input.
    async fn execute(
        &self,
        sandbox: &SandboxHandle,
        stdin: &str,
    ) -> Result<ExecutionResult, SandboxError>;

    /// Compile `source_code` in a fresh sandbox and run it once.
    ///
    /// A failed compile is returned as-is with empty stdout.
    async fn compile_and_run(
        &self,
        source_code: &str,
        stdin: &str,
    ) -> Result<ExecutionResult, SandboxError> {
        let sandbox = self.create_sandbox(source_code).await?;
        if let Some(compiled) = self.compile(&sandbox).await? {
            if !compiled.succeeded() {
                return Ok(ExecutionResult {
                    stdout: String::new(),
                    ..compiled
                });
            }
        }
        self.execute(&sandbox, stdin).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_handle_removes_directory_on_drop() {
        let root = tempfile::tempdir().unwrap();
        let handle = SandboxHandle::create(root.path()).await.unwrap();
        let path = handle.path().to_path_buf();
        std::fs::write(path.join("Main.java"), "class Main {}").unwrap();
        assert!(path.is_dir());
        assert!(path.starts_with(root.path()));

        drop(handle);
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_handles_are_unique() {
        let root = tempfile::tempdir().unwrap();
        let a = SandboxHandle::create(root.path()).await.unwrap();
        let b = SandboxHandle::create(root.path()).await.unwrap();
        assert_ne!(a.id(), b.id());
        assert_ne!(a.path(), b.path());
    }

    #[tokio::test]
    async fn test_duplicate_is_an_independent_copy() {
        use std::os::unix::fs::PermissionsExt;

        let root = tempfile::tempdir().unwrap();
        let original = SandboxHandle::create(root.path()).await.unwrap();
        std::fs::write(original.path().join("main.sh"), "echo hi").unwrap();
        std::fs::create_dir_all(original.path().join("out/classes")).unwrap();
        let binary = original.path().join("out/classes/run");
        std::fs::write(&binary, "#!/bin/sh").unwrap();
        std::fs::set_permissions(&binary, std::fs::Permissions::from_mode(0o755)).unwrap();
        std::os::unix::fs::symlink("main.sh", original.path().join("link.sh")).unwrap();

        let copy = original.duplicate().await.unwrap();
        assert_ne!(copy.id(), original.id());
        assert_eq!(copy.path().parent(), original.path().parent());
        assert_eq!(std::fs::read_to_string(copy.path().join("main.sh")).unwrap(), "echo hi");
        let mode = std::fs::metadata(copy.path().join("out/classes/run"))
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(mode & 0o777, 0o755);
        assert_eq!(
            std::fs::read_link(copy.path().join("link.sh")).unwrap(),
            Path::new("main.sh")
        );

        // Writes in the copy never reach the original.
        std::fs::write(copy.path().join("seen"), "").unwrap();
        std::fs::write(copy.path().join("main.sh"), "changed").unwrap();
        assert!(!original.path().join("seen").exists());
        assert_eq!(
            std::fs::read_to_string(original.path().join("main.sh")).unwrap(),
            "echo hi"
        );

        let copy_path = copy.path().to_path_buf();
        drop(copy);
        assert!(!copy_path.exists());
        assert!(original.path().is_dir());
    }

    #[tokio::test]
    async fn test_create_fails_under_a_file() {
        let root = tempfile::tempdir().unwrap();
        let file = root.path().join("not-a-dir");
        std::fs::write(&file, "x").unwrap();

        let err = SandboxHandle::create(&file).await.unwrap_err();
        assert!(matches!(err, SandboxError::Initialization { .. }));
    }
}
