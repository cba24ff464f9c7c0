//! 版本信息与健康检查处理器。

use axum::response::Json as JsonResponse;
use chrono::Utc;
use serde::Serialize;
use std::sync::LazyLock;
use std::time::Instant;

use crate::error::ApiError;

static STARTED_AT: LazyLock<Instant> = LazyLock::new(Instant::now);

/// 记录进程启动时间，供 uptime 上报。在 main 中尽早调用一次。
pub fn mark_started() {
    LazyLock::force(&STARTED_AT);
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionInfo {
    version: &'static str,
    build_time: &'static str,
    build_env: String,
}

/// 返回当前版本信息。
pub async fn get_version_info() -> Result<JsonResponse<VersionInfo>, ApiError> {
    let version_info = VersionInfo {
        version: crate::build::PKG_VERSION,
        build_time: crate::build::BUILD_TIME,
        build_env: format!(
            "{},{}",
            crate::build::RUST_VERSION,
            crate::build::RUST_CHANNEL
        ),
    };
    Ok(JsonResponse(version_info))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    status: &'static str,
    timestamp: String,
    uptime: f64,
    version: &'static str,
}

/// 健康检查。
pub async fn health_check() -> Result<JsonResponse<HealthResponse>, ApiError> {
    Ok(JsonResponse(HealthResponse {
        status: "ok",
        timestamp: Utc::now().to_rfc3339(),
        uptime: STARTED_AT.elapsed().as_secs_f64(),
        version: crate::build::PKG_VERSION,
    }))
}
