//! 上传根目录管理、受限路径解析与统计。

use serde::Serialize;
use std::io;
use std::path::{Component, Path, PathBuf};
use tokio::fs;

/// 上传存储根目录。文件一经写入不再修改，删除之外没有任何变更操作，
/// 因此跨请求不需要文件锁。
#[derive(Clone, Debug)]
pub struct Storage {
    root: PathBuf,
}

impl Storage {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root_path(&self) -> &Path {
        &self.root
    }

    pub async fn ensure_root(&self) -> io::Result<()> {
        fs::create_dir_all(&self.root).await
    }

    /// 确保类别子目录存在并返回其路径。
    /// `create_dir_all` 对已存在目录幂等，并发首建不会互相干扰。
    pub async fn ensure_subdir(&self, dir: &str) -> Result<PathBuf, StorageError> {
        let target = self.root.join(dir);
        fs::create_dir_all(&target).await?;
        Ok(target)
    }

    /// 将存储文件名解析到类别子目录内的路径。
    /// 文件名必须是单个普通路径段，任何分隔符或父目录写法都拒绝。
    pub fn resolve_file(&self, dir: &str, name: &str) -> Result<PathBuf, StorageError> {
        if name.is_empty() || name.contains('/') || name.contains('\\') {
            return Err(StorageError::InvalidName);
        }
        let mut components = Path::new(name).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(_)), None) => {}
            _ => return Err(StorageError::InvalidName),
        }
        Ok(self.root.join(dir).join(name))
    }

    /// 删除子目录中的一个存储文件。
    pub async fn delete_file(&self, dir: &str, name: &str) -> Result<(), StorageError> {
        let target = self.resolve_file(dir, name)?;
        fs::remove_file(target).await?;
        Ok(())
    }

    /// 递归统计根目录下的文件数量与总字节数。
    /// 以 `.` 开头的暂存文件不计入。
    pub async fn stats(&self) -> Result<StorageStats, StorageError> {
        let mut stats = StorageStats::default();
        let mut pending = vec![self.root.clone()];

        while let Some(dir) = pending.pop() {
            let mut entries = match fs::read_dir(&dir).await {
                Ok(entries) => entries,
                Err(err) if err.kind() == io::ErrorKind::NotFound => continue,
                Err(err) => return Err(StorageError::Io(err)),
            };
            while let Some(entry) = entries.next_entry().await? {
                let metadata = entry.metadata().await?;
                if metadata.is_dir() {
                    pending.push(entry.path());
                    continue;
                }
                if entry.file_name().to_string_lossy().starts_with('.') {
                    continue;
                }
                stats.file_count += 1;
                stats.total_size += metadata.len();
            }
        }

        Ok(stats)
    }
}

#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageStats {
    pub file_count: u64,
    pub total_size: u64,
}

#[derive(Debug)]
pub enum StorageError {
    InvalidName,
    Io(io::Error),
}

impl From<io::Error> for StorageError {
    fn from(err: io::Error) -> Self {
        StorageError::Io(err)
    }
}
