//! Multipart 上传处理器：分类、命名、暂存落盘。

use axum::extract::{Extension, Multipart};
use axum::response::Json as JsonResponse;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info};

use crate::classify::{Category, MediaTypes, upload_directory};
use crate::config::UPLOAD_FIELD_NAME;
use crate::error::ApiError;
use crate::naming::storage_name;
use crate::staging::StagedFile;
use crate::storage::Storage;

/// 单次上传请求的限制，启动时由配置装配。
#[derive(Debug)]
pub struct UploadLimits {
    pub max_file_size: u64,
    pub max_files: usize,
}

/// 一个已持久化文件的描述，原样返回给客户端。
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredFile {
    pub original_name: String,
    pub stored_name: String,
    pub category: Category,
    pub directory: &'static str,
    pub size: u64,
    pub url: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub success: bool,
    pub data: Vec<StoredFile>,
    pub message: &'static str,
}

/// 接收 multipart 上传，按 MIME 类型分目录持久化每个文件。
///
/// 每个文件在响应返回前已完成 fsync 与重命名就位；
/// 目录创建失败视为该文件的硬错误，不会写到别处。
pub async fn upload_files(
    Extension(storage): Extension<Arc<Storage>>,
    Extension(media_types): Extension<Arc<MediaTypes>>,
    Extension(limits): Extension<Arc<UploadLimits>>,
    mut multipart: Multipart,
) -> Result<JsonResponse<UploadResponse>, ApiError> {
    let mut saved = Vec::new();

    while let Some(mut field) = multipart.next_field().await? {
        if field.name() != Some(UPLOAD_FIELD_NAME) {
            return Err(ApiError::BadRequest("unexpected field name".into()));
        }
        if saved.len() >= limits.max_files {
            return Err(ApiError::BadRequest("too many files uploaded".into()));
        }

        let original_name = field.file_name().unwrap_or_default().to_string();
        let mime = field.content_type().map(str::to_string);

        let category = media_types.classify(mime.as_deref());
        let directory = upload_directory(category);
        let dest_dir = storage.ensure_subdir(directory).await.map_err(|err| {
            ApiError::Internal(format!("failed to create upload directory: {err:?}"))
        })?;

        let stored_name = storage_name(&original_name, mime.as_deref());
        let target = dest_dir.join(&stored_name);

        let mut staged = StagedFile::create(&target)
            .await
            .map_err(|err| ApiError::Internal(err.to_string()))?;
        let mut size: u64 = 0;
        loop {
            let chunk = match field.chunk().await {
                Ok(Some(chunk)) => chunk,
                Ok(None) => break,
                Err(err) => {
                    staged.discard().await;
                    return Err(err.into());
                }
            };
            size += chunk.len() as u64;
            if size > limits.max_file_size {
                staged.discard().await;
                return Err(ApiError::PayloadTooLarge(
                    "file size exceeds the maximum limit".into(),
                ));
            }
            if let Err(err) = staged.write_all(&chunk).await {
                staged.discard().await;
                return Err(ApiError::Internal(err.to_string()));
            }
        }
        staged
            .finalize()
            .await
            .map_err(|err| ApiError::Internal(err.to_string()))?;

        debug!(
            original_name,
            stored_name, directory, size, "upload file saved"
        );
        saved.push(StoredFile {
            original_name,
            url: format!("/uploads/{directory}/{stored_name}"),
            stored_name,
            category,
            directory,
            size,
        });
    }

    if saved.is_empty() {
        return Err(ApiError::BadRequest("no files uploaded".into()));
    }

    info!(count = saved.len(), "upload complete");
    Ok(JsonResponse(UploadResponse {
        success: true,
        data: saved,
        message: "Files uploaded successfully",
    }))
}
