//! Crash-safe file replacement shared by the artifact writer and the ledger.
//!
//! tmp sibling → write → `sync_all` → rename → `sync_all` on the parent
//! directory. The rename is only durable once the directory entry is synced,
//! so an artifact reported as written survives power loss before its ledger
//! entry is recorded.

use std::io;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::warn;

/// Atomically replace `path` with `contents`.
///
/// On failure the tmp sibling is removed and `path` is left as it was.
pub async fn write_atomic(path: &Path, contents: &[u8]) -> io::Result<()> {
    let tmp_path = tmp_sibling(path);
    match replace_via(&tmp_path, path, contents).await {
        Ok(()) => Ok(()),
        Err(e) => {
            if let Err(rm) = tokio::fs::remove_file(&tmp_path).await {
                if rm.kind() != io::ErrorKind::NotFound {
                    warn!("Could not remove {}: {}", tmp_path.display(), rm);
                }
            }
            Err(e)
        }
    }
}

async fn replace_via(tmp_path: &Path, path: &Path, contents: &[u8]) -> io::Result<()> {
    let mut file = tokio::fs::File::create(tmp_path).await?;
    file.write_all(contents).await?;
    file.sync_all().await?;
    drop(file);

    tokio::fs::rename(tmp_path, path).await?;
    sync_parent_dir(path).await
}

/// Flush the directory entry for `path`.
#[cfg(unix)]
async fn sync_parent_dir(path: &Path) -> io::Result<()> {
    let parent = match path.parent().filter(|p| !p.as_os_str().is_empty()) {
        Some(p) => p.to_path_buf(),
        None => PathBuf::from("."),
    };
    tokio::fs::File::open(&parent).await?.sync_all().await
}

/// No portable directory sync outside Unix.
#[cfg(not(unix))]
async fn sync_parent_dir(_path: &Path) -> io::Result<()> {
    Ok(())
}

/// `processed_pdfs.json` → `processed_pdfs.json.tmp`, in the same directory so
/// the rename stays on one filesystem.
pub fn tmp_sibling(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn entries(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[tokio::test]
    async fn replaces_existing_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("定価表.txt");
        write_atomic(&path, b"old").await.unwrap();
        write_atomic(&path, b"new").await.unwrap();

        assert_eq!(std::fs::read(&path).unwrap(), b"new");
        assert_eq!(entries(dir.path()), vec!["定価表.txt"]);
    }

    #[tokio::test]
    async fn failed_rename_removes_tmp() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("定価表.txt");
        std::fs::create_dir(&path).unwrap();
        std::fs::write(path.join("blocker"), "x").unwrap();

        assert!(write_atomic(&path, b"text").await.is_err());
        assert_eq!(entries(dir.path()), vec!["定価表.txt"]);
        assert!(path.is_dir());
    }

    #[tokio::test]
    async fn missing_parent_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nope/a.txt");
        assert!(write_atomic(&path, b"x").await.is_err());
        assert!(entries(dir.path()).is_empty());
    }

    #[test]
    fn tmp_sibling_stays_in_directory() {
        let p = Path::new("/var/lib/monitor/processed_pdfs.json");
        assert_eq!(
            tmp_sibling(p),
            PathBuf::from("/var/lib/monitor/processed_pdfs.json.tmp")
        );
    }
}
