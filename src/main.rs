//! DropBin server binary.
//!
//! A small file-upload service: accepts multipart uploads, classifies files
//! by MIME type into per-category directories, and serves them back with
//! range-based video streaming. The main entry point builds the Axum router,
//! configures TLS, and starts HTTP/HTTPS listeners.

mod classify;
mod config;
mod error;
mod files;
mod http;
mod logging;
mod naming;
mod range;
mod staging;
mod storage;
mod tls;
mod upload;
mod version;

use axum::Router;
use axum::extract::{DefaultBodyLimit, Extension, connect_info::ConnectInfo};
use axum::http::Request;
use axum::routing::{delete, get, post};
use axum_server::Handle;
use clap::Parser;
use shadow_rs::shadow;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tower_http::services::ServeDir;
use tower_http::trace::{DefaultOnRequest, DefaultOnResponse, TraceLayer};
use tracing::{Level, info, info_span};

use crate::classify::MediaTypes;
use crate::config::{Args, IMAGE_DIR, MISC_DIR, VIDEO_DIR};
use crate::http::build_cors_layer;
use crate::storage::Storage;
use crate::upload::UploadLimits;

shadow!(build);

/// Starts the DropBin server and blocks until shutdown.
#[tokio::main]
async fn main() -> Result<(), std::io::Error> {
    logging::init_logging();
    version::mark_started();

    let args = Args::parse();
    let storage = Arc::new(Storage::new(PathBuf::from(args.uploads_dir.clone())));
    let media_types = Arc::new(MediaTypes::default());
    let limits = Arc::new(UploadLimits {
        max_file_size: args.max_file_size,
        max_files: args.max_files,
    });

    storage.ensure_root().await?;
    for dir in [IMAGE_DIR, VIDEO_DIR, MISC_DIR] {
        storage.ensure_subdir(dir).await.map_err(|err| {
            std::io::Error::other(format!("failed to create upload directory: {err:?}"))
        })?;
    }

    let mut app = Router::new()
        .route(
            "/api/upload-files",
            post(upload::upload_files).layer(DefaultBodyLimit::disable()),
        )
        .route("/api/uploads/{dir}/{name}", delete(files::delete_upload))
        .route("/api/health", get(version::health_check))
        .route("/api/status", get(files::storage_status))
        .route("/api/version", get(version::get_version_info))
        .route("/uploads/video/{name}", get(files::stream_video))
        .nest_service(
            "/uploads/img",
            ServeDir::new(storage.root_path().join(IMAGE_DIR)),
        )
        .nest_service(
            "/uploads/misc",
            ServeDir::new(storage.root_path().join(MISC_DIR)),
        )
        .layer(axum::middleware::from_fn(http::add_security_headers))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &Request<_>| {
                    let forwarded_ip = request
                        .headers()
                        .get("x-forwarded-for")
                        .and_then(|v| v.to_str().ok())
                        .map(|s| s.split(',').next().unwrap_or("").trim().to_string());
                    let connect_ip = request
                        .extensions()
                        .get::<ConnectInfo<SocketAddr>>()
                        .map(|ConnectInfo(addr)| addr.to_string());
                    let client_ip = forwarded_ip
                        .or(connect_ip)
                        .unwrap_or_else(|| "unknown".to_string());

                    info_span!(
                        env!("CARGO_CRATE_NAME"),
                        client_ip,
                        method = ?request.method(),
                        path = ?request.uri().path(),
                    )
                })
                .on_request(DefaultOnRequest::new().level(Level::DEBUG))
                .on_response(DefaultOnResponse::new().level(Level::DEBUG)),
        )
        .layer(Extension(storage))
        .layer(Extension(media_types))
        .layer(Extension(limits));

    if let Some(cors_layer) = build_cors_layer(args.cors_origins.as_deref()) {
        app = app.layer(cors_layer);
    }

    let host = args
        .host
        .parse::<IpAddr>()
        .map_err(|err| std::io::Error::new(std::io::ErrorKind::InvalidInput, err.to_string()))?;
    let http_addr = SocketAddr::new(host, args.http_port);
    let https_addr = SocketAddr::new(host, args.https_port);
    let tls_config = tls::build_rustls_config(&args, host).await?;
    let handle = Handle::new();

    info!("🚀 Starting HTTP server at {}", http_addr);
    info!("🔒 Starting HTTPS server at {}", https_addr);

    let http_server = axum_server::bind(http_addr)
        .handle(handle.clone())
        .serve(app.clone().into_make_service_with_connect_info::<SocketAddr>());
    let https_server = axum_server::bind_rustls(https_addr, tls_config)
        .handle(handle.clone())
        .serve(app.into_make_service_with_connect_info::<SocketAddr>());

    tokio::select! {
        result = http_server => result?,
        result = https_server => result?,
        _ = shutdown_signal(handle) => {}
    }

    Ok(())
}

async fn shutdown_signal(handle: Handle) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Received termination signal shutting down");
    handle.graceful_shutdown(Some(Duration::from_secs(10)));
}
