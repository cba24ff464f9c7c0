//! 上传落盘的暂存写入与原子就位。

use std::io;
use std::path::{Path, PathBuf};
use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

/// 在目标目录内暂存写入的上传文件。
///
/// 字节先写进同目录下的隐藏暂存文件，`finalize` 落盘（fsync）后再
/// 重命名到最终文件名。最终名下要么看不到文件，要么是完整文件，
/// 后续的 Range 请求不会读到写了一半的内容。
pub struct StagedFile {
    target: PathBuf,
    temp_path: PathBuf,
    file: File,
}

impl StagedFile {
    /// 在目标路径同目录创建暂存文件。
    pub async fn create(target: &Path) -> io::Result<Self> {
        let parent = target.parent().ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidInput, "target has no parent directory")
        })?;
        let base = target
            .file_name()
            .map(|name| name.to_string_lossy())
            .unwrap_or_else(|| "file".into());
        let temp_path = parent.join(format!(".{base}.part-{}", Uuid::new_v4()));
        let file = File::create(&temp_path).await?;
        Ok(Self {
            target: target.to_path_buf(),
            temp_path,
            file,
        })
    }

    pub async fn write_all(&mut self, chunk: &[u8]) -> io::Result<()> {
        self.file.write_all(chunk).await
    }

    /// 放弃写入并清理暂存文件。
    pub async fn discard(self) {
        let _ = fs::remove_file(&self.temp_path).await;
    }

    /// 同步到持久存储并重命名到最终路径。
    /// 上传响应必须在这一步完成之后才返回。
    pub async fn finalize(self) -> io::Result<()> {
        self.file.sync_all().await?;
        drop(self.file);

        if let Err(err) = fs::rename(&self.temp_path, &self.target).await {
            let _ = fs::remove_file(&self.temp_path).await;
            return Err(err);
        }
        if let Some(parent) = self.target.parent() {
            let _ = sync_dir(parent).await;
        }

        Ok(())
    }
}

async fn sync_dir(path: &Path) -> io::Result<()> {
    let path = path.to_path_buf();
    tokio::task::spawn_blocking(move || {
        let dir = std::fs::File::open(path)?;
        dir.sync_all()
    })
    .await
    .map_err(|err| io::Error::other(err.to_string()))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn finalize_moves_bytes_to_the_target() {
        let temp = tempdir().expect("tempdir");
        let target = temp.path().join("clip-1.mp4");

        let mut staged = StagedFile::create(&target).await.expect("create staged");
        staged.write_all(b"hello").await.expect("write");
        staged.write_all(b" world").await.expect("write");
        staged.finalize().await.expect("finalize");

        let contents = std::fs::read(&target).expect("read target");
        assert_eq!(contents, b"hello world");
    }

    #[tokio::test]
    async fn target_is_invisible_until_finalize() {
        let temp = tempdir().expect("tempdir");
        let target = temp.path().join("clip-2.mp4");

        let mut staged = StagedFile::create(&target).await.expect("create staged");
        staged.write_all(b"partial").await.expect("write");
        assert!(!target.exists());

        staged.finalize().await.expect("finalize");
        assert!(target.exists());
    }

    #[tokio::test]
    async fn discard_leaves_nothing_behind() {
        let temp = tempdir().expect("tempdir");
        let target = temp.path().join("clip-3.mp4");

        let mut staged = StagedFile::create(&target).await.expect("create staged");
        staged.write_all(b"junk").await.expect("write");
        staged.discard().await;

        assert!(!target.exists());
        let leftovers = std::fs::read_dir(temp.path())
            .expect("read dir")
            .count();
        assert_eq!(leftovers, 0);
    }
}
