//! CLI arguments and server configuration defaults.

use clap::Parser;
use shadow_rs::formatcp;

use crate::build;

const VERSION_INFO: &str = formatcp!(
    r#"{}\ncommit_hash: {}\nbuild_time: {}\nbuild_env: {},{}"#,
    build::PKG_VERSION,
    build::SHORT_COMMIT,
    build::BUILD_TIME,
    build::RUST_VERSION,
    build::RUST_CHANNEL
);

pub const DEFAULT_MAX_FILE_SIZE: u64 = 100 * 1024 * 1024;
pub const DEFAULT_MAX_FILES_PER_UPLOAD: usize = 10;
pub const UPLOAD_FIELD_NAME: &str = "files";

/// 开放式 Range 请求单次返回的字节数上限。
pub const STREAM_CHUNK_SIZE: u64 = 1_000_000;

pub const IMAGE_DIR: &str = "img";
pub const VIDEO_DIR: &str = "video";
pub const MISC_DIR: &str = "misc";

pub const FALLBACK_BASENAME: &str = "file";
pub const FALLBACK_EXTENSION: &str = "bin";

pub const IMAGE_MIME_TYPES: &[&str] = &[
    "image/apng",
    "image/avif",
    "image/gif",
    "image/jpeg",
    "image/png",
    "image/svg+xml",
    "image/webp",
];

pub const VIDEO_MIME_TYPES: &[&str] = &[
    "application/vnd.apple.mpegurl",
    "application/x-mpegurl",
    "video/3gpp",
    "video/mp4",
    "video/mpeg",
    "video/ogg",
    "video/quicktime",
    "video/webm",
    "video/x-m4v",
    "video/ms-asf",
    "video/x-ms-wmv",
    "video/x-msvideo",
];

pub const DOCUMENT_MIME_TYPES: &[&str] = &[
    "application/pdf",
    "application/msword",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    "text/plain",
];

/// CLI arguments and environment configuration for the server.
#[derive(Parser, Debug)]
#[command(name = "dropbin", version = VERSION_INFO, about = "DropBin upload server")]
pub struct Args {
    #[arg(
        short = 'u',
        long,
        env = "DROPBIN_UPLOADS_DIR",
        default_value = ".dropbin/uploads",
        help = "Root directory for uploaded files"
    )]
    pub uploads_dir: String,
    #[arg(
        short = 'b',
        long,
        env = "DROPBIN_BIND",
        default_value = "0.0.0.0",
        help = "Bind address for HTTP/HTTPS"
    )]
    pub host: String,
    #[arg(
        short = 'p',
        long,
        env = "DROPBIN_HTTP_PORT",
        default_value_t = 3000,
        help = "HTTP port"
    )]
    pub http_port: u16,
    #[arg(
        short = 'P',
        long,
        env = "DROPBIN_HTTPS_PORT",
        default_value_t = 3001,
        help = "HTTPS port"
    )]
    pub https_port: u16,
    #[arg(short = 'c', long, env = "DROPBIN_TLS_CERT", help = "TLS cert path")]
    pub tls_cert: Option<String>,
    #[arg(short = 'k', long, env = "DROPBIN_TLS_KEY", help = "TLS key path")]
    pub tls_key: Option<String>,
    #[arg(
        long,
        env = "DROPBIN_CORS_ORIGINS",
        help = "Comma separated CORS origins"
    )]
    pub cors_origins: Option<String>,
    #[arg(
        long,
        env = "DROPBIN_MAX_FILE_SIZE",
        default_value_t = DEFAULT_MAX_FILE_SIZE,
        help = "Max size per uploaded file in bytes"
    )]
    pub max_file_size: u64,
    #[arg(
        long,
        env = "DROPBIN_MAX_FILES",
        default_value_t = DEFAULT_MAX_FILES_PER_UPLOAD,
        help = "Max files per upload request"
    )]
    pub max_files: usize,
}
