//! 存储文件的流式下载、删除与统计处理器。

use axum::body::Body as AxumBody;
use axum::extract::{Extension, Path as UrlPath};
use axum::http::{HeaderMap, HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Json as JsonResponse, Response};
use httpdate::fmt_http_date;
use serde::Serialize;
use std::io::SeekFrom;
use std::sync::Arc;
use tokio::fs::{self, File};
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio_util::io::ReaderStream;
use tracing::{debug, info};

use crate::config::{IMAGE_DIR, MISC_DIR, STREAM_CHUNK_SIZE, VIDEO_DIR};
use crate::error::ApiError;
use crate::range::{RangePlan, plan_range};
use crate::storage::{Storage, StorageStats};
use crate::upload::UploadLimits;

/// 流式返回一个已存储的视频，支持 Range 请求。
///
/// 无 Range 头返回完整文件（200）；`bytes=<start>-` 形式的开放区间
/// 只返回一个分块，客户端用后续 Range 请求继续；起点越界返回 416，
/// 解析失败返回 400，文件不存在返回 404，均不产生响应体流。
pub async fn stream_video(
    UrlPath(name): UrlPath<String>,
    request_headers: HeaderMap,
    Extension(storage): Extension<Arc<Storage>>,
) -> Result<Response, ApiError> {
    let target = storage.resolve_file(VIDEO_DIR, &name)?;
    let metadata = match fs::metadata(&target).await {
        Ok(metadata) if metadata.is_file() => metadata,
        Ok(_) => return Err(ApiError::NotFound("file not found".into())),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return Err(ApiError::NotFound("file not found".into()));
        }
        Err(err) => return Err(ApiError::Internal(err.to_string())),
    };
    let file_size = metadata.len();

    let range_header = match request_headers.get(header::RANGE) {
        Some(value) => Some(
            value
                .to_str()
                .map_err(|_| ApiError::BadRequest("invalid Range header".into()))?,
        ),
        None => None,
    };
    let plan = plan_range(range_header, file_size, STREAM_CHUNK_SIZE)?;

    let mime = mime_guess::from_path(&target).first_or_octet_stream();
    let mut response_headers = HeaderMap::new();
    response_headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_str(mime.essence_str())
            .map_err(|_| ApiError::Internal("无效的 MIME 类型".into()))?,
    );
    response_headers.insert(header::ACCEPT_RANGES, HeaderValue::from_static("bytes"));
    if let Ok(modified) = metadata.modified() {
        let value = fmt_http_date(modified);
        response_headers.insert(
            header::LAST_MODIFIED,
            HeaderValue::from_str(&value)
                .map_err(|_| ApiError::Internal("响应头构建失败".into()))?,
        );
    }

    let file = File::open(&target)
        .await
        .map_err(|err| ApiError::Internal(err.to_string()))?;

    match plan {
        RangePlan::Partial(window) => {
            let length = window.content_length();
            debug!(
                name,
                start = window.start,
                end = window.end,
                length,
                "video range request accepted"
            );
            let mut file = file;
            file.seek(SeekFrom::Start(window.start))
                .await
                .map_err(|err| ApiError::Internal(err.to_string()))?;
            let stream = ReaderStream::new(file.take(length));
            response_headers.insert(
                header::CONTENT_RANGE,
                HeaderValue::from_str(&format!(
                    "bytes {}-{}/{}",
                    window.start, window.end, window.total
                ))
                .map_err(|_| ApiError::Internal("响应头构建失败".into()))?,
            );
            response_headers.insert(
                header::CONTENT_LENGTH,
                HeaderValue::from_str(&length.to_string())
                    .map_err(|_| ApiError::Internal("响应头构建失败".into()))?,
            );
            Ok((
                StatusCode::PARTIAL_CONTENT,
                response_headers,
                AxumBody::from_stream(stream),
            )
                .into_response())
        }
        RangePlan::Full { total } => {
            info!(name, size = total, "video full download");
            response_headers.insert(
                header::CONTENT_LENGTH,
                HeaderValue::from_str(&total.to_string())
                    .map_err(|_| ApiError::Internal("响应头构建失败".into()))?,
            );
            let stream = ReaderStream::new(file);
            Ok((
                StatusCode::OK,
                response_headers,
                AxumBody::from_stream(stream),
            )
                .into_response())
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteResponse {
    pub success: bool,
    pub message: &'static str,
}

/// 删除一个已存储文件。目录参数限定为三个类别子目录之一。
pub async fn delete_upload(
    UrlPath((dir, name)): UrlPath<(String, String)>,
    Extension(storage): Extension<Arc<Storage>>,
) -> Result<JsonResponse<DeleteResponse>, ApiError> {
    if ![IMAGE_DIR, VIDEO_DIR, MISC_DIR].contains(&dir.as_str()) {
        return Err(ApiError::BadRequest("unknown upload directory".into()));
    }
    storage.delete_file(&dir, &name).await?;
    info!(dir, name, "delete upload");
    Ok(JsonResponse(DeleteResponse {
        success: true,
        message: "File deleted successfully",
    }))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusData {
    #[serde(flatten)]
    pub stats: StorageStats,
    pub max_file_size: u64,
    pub max_files: usize,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub success: bool,
    pub data: StatusData,
}

/// 返回上传目录的文件数量、总字节数与当前限制。
pub async fn storage_status(
    Extension(storage): Extension<Arc<Storage>>,
    Extension(limits): Extension<Arc<UploadLimits>>,
) -> Result<JsonResponse<StatusResponse>, ApiError> {
    let stats = storage.stats().await?;
    Ok(JsonResponse(StatusResponse {
        success: true,
        data: StatusData {
            stats,
            max_file_size: limits.max_file_size,
            max_files: limits.max_files,
        },
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;
    use std::sync::Arc;
    use tempfile::tempdir;

    fn make_storage() -> (tempfile::TempDir, Arc<Storage>) {
        let temp = tempdir().expect("tempdir");
        let root = temp.path().join("uploads");
        std::fs::create_dir_all(root.join("video")).expect("create video dir");
        (temp, Arc::new(Storage::new(root)))
    }

    fn write_video(storage: &Storage, name: &str, bytes: &[u8]) {
        std::fs::write(storage.root_path().join("video").join(name), bytes)
            .expect("write video file");
    }

    fn range_headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::RANGE, HeaderValue::from_str(value).expect("header"));
        headers
    }

    async fn body_bytes(response: Response) -> Vec<u8> {
        response
            .into_body()
            .collect()
            .await
            .expect("collect body")
            .to_bytes()
            .to_vec()
    }

    #[tokio::test]
    async fn no_range_streams_the_whole_file() {
        let (_temp, storage) = make_storage();
        let content: Vec<u8> = (0..1000u32).map(|i| (i % 251) as u8).collect();
        write_video(&storage, "clip.mp4", &content);

        let response = stream_video(
            UrlPath("clip.mp4".to_string()),
            HeaderMap::new(),
            Extension(storage),
        )
        .await
        .unwrap_or_else(|_| panic!("stream failed"));

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CONTENT_LENGTH),
            Some(&HeaderValue::from_static("1000"))
        );
        assert_eq!(
            response.headers().get(header::ACCEPT_RANGES),
            Some(&HeaderValue::from_static("bytes"))
        );
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE),
            Some(&HeaderValue::from_static("video/mp4"))
        );
        assert_eq!(body_bytes(response).await, content);
    }

    #[tokio::test]
    async fn bounded_range_returns_partial_content() {
        let (_temp, storage) = make_storage();
        let content: Vec<u8> = (0..1000u32).map(|i| (i % 251) as u8).collect();
        write_video(&storage, "clip.mp4", &content);

        let response = stream_video(
            UrlPath("clip.mp4".to_string()),
            range_headers("bytes=0-99"),
            Extension(storage),
        )
        .await
        .unwrap_or_else(|_| panic!("stream failed"));

        assert_eq!(response.status(), StatusCode::PARTIAL_CONTENT);
        assert_eq!(
            response.headers().get(header::CONTENT_RANGE),
            Some(&HeaderValue::from_static("bytes 0-99/1000"))
        );
        assert_eq!(
            response.headers().get(header::CONTENT_LENGTH),
            Some(&HeaderValue::from_static("100"))
        );
        assert_eq!(body_bytes(response).await, &content[0..100]);
    }

    #[tokio::test]
    async fn open_ended_range_near_end_returns_last_byte() {
        let (_temp, storage) = make_storage();
        let content = vec![7u8; 1000];
        write_video(&storage, "clip.mp4", &content);

        let response = stream_video(
            UrlPath("clip.mp4".to_string()),
            range_headers("bytes=999-"),
            Extension(storage),
        )
        .await
        .unwrap_or_else(|_| panic!("stream failed"));

        assert_eq!(response.status(), StatusCode::PARTIAL_CONTENT);
        assert_eq!(
            response.headers().get(header::CONTENT_RANGE),
            Some(&HeaderValue::from_static("bytes 999-999/1000"))
        );
        assert_eq!(body_bytes(response).await.len(), 1);
    }

    #[tokio::test]
    async fn start_beyond_size_is_not_satisfiable() {
        let (_temp, storage) = make_storage();
        write_video(&storage, "clip.mp4", &vec![0u8; 1000]);

        let result = stream_video(
            UrlPath("clip.mp4".to_string()),
            range_headers("bytes=2000-"),
            Extension(storage),
        )
        .await;

        assert!(matches!(result, Err(ApiError::RangeNotSatisfiable(1000))));
    }

    #[tokio::test]
    async fn garbage_range_is_a_bad_request() {
        let (_temp, storage) = make_storage();
        write_video(&storage, "clip.mp4", b"abc");

        let result = stream_video(
            UrlPath("clip.mp4".to_string()),
            range_headers("bytes=abc-def"),
            Extension(storage),
        )
        .await;

        assert!(matches!(result, Err(ApiError::BadRequest(_))));
    }

    #[tokio::test]
    async fn missing_file_is_not_found() {
        let (_temp, storage) = make_storage();

        let result = stream_video(
            UrlPath("nope.mp4".to_string()),
            HeaderMap::new(),
            Extension(storage),
        )
        .await;

        assert!(matches!(result, Err(ApiError::NotFound(_))));
    }

    #[tokio::test]
    async fn traversal_name_is_rejected() {
        let (_temp, storage) = make_storage();

        let result = stream_video(
            UrlPath("..".to_string()),
            HeaderMap::new(),
            Extension(storage),
        )
        .await;

        assert!(matches!(result, Err(ApiError::BadRequest(_))));
    }

    #[tokio::test]
    async fn delete_removes_the_file() {
        let (_temp, storage) = make_storage();
        write_video(&storage, "clip.mp4", b"abc");

        delete_upload(
            UrlPath(("video".to_string(), "clip.mp4".to_string())),
            Extension(storage.clone()),
        )
        .await
        .unwrap_or_else(|_| panic!("delete failed"));

        assert!(!storage.root_path().join("video/clip.mp4").exists());
    }

    #[tokio::test]
    async fn delete_rejects_unknown_directory() {
        let (_temp, storage) = make_storage();

        let result = delete_upload(
            UrlPath(("secrets".to_string(), "clip.mp4".to_string())),
            Extension(storage),
        )
        .await;

        assert!(matches!(result, Err(ApiError::BadRequest(_))));
    }

    #[tokio::test]
    async fn status_reports_counts_and_limits() {
        let (_temp, storage) = make_storage();
        write_video(&storage, "clip.mp4", b"12345");
        let limits = Arc::new(UploadLimits {
            max_file_size: 1024,
            max_files: 2,
        });

        let JsonResponse(status) = storage_status(Extension(storage), Extension(limits))
            .await
            .unwrap_or_else(|_| panic!("status failed"));

        assert!(status.success);
        assert_eq!(status.data.stats.file_count, 1);
        assert_eq!(status.data.stats.total_size, 5);
        assert_eq!(status.data.max_files, 2);
    }
}
