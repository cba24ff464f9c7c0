//! 防冲突的存储文件名生成。

use uuid::Uuid;

use crate::config::{FALLBACK_BASENAME, FALLBACK_EXTENSION};

/// 清洗原始文件名：路径分隔符替换为下划线，空白折叠为单个空格并去除首尾。
/// 结果为空时退回固定字面量。
pub fn sanitize_filename(name: &str) -> String {
    let replaced: String = name
        .chars()
        .map(|c| if c == '/' || c == '\\' { '_' } else { c })
        .collect();
    let collapsed = replaced.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.is_empty() {
        FALLBACK_BASENAME.to_string()
    } else {
        collapsed
    }
}

/// 生成 `{base}-{token}.{ext}` 形式的存储文件名。
///
/// 扩展名取自最后一个 `.` 之后的部分；没有扩展名时按声明的 MIME 类型
/// 查表，查不到则使用 `bin`。token 为每次调用新生成的 UUID，
/// 并发调用无需协调，相同输入两次调用必然得到不同文件名。
pub fn storage_name(original_name: &str, mime: Option<&str>) -> String {
    let safe = sanitize_filename(original_name);
    // 首字符的 `.` 不算扩展名分隔符（如 `.gitignore`）。
    let (base, ext) = match safe.rfind('.') {
        Some(index) if index > 0 => (safe[..index].to_string(), safe[index + 1..].to_string()),
        _ => (safe, extension_for_mime(mime)),
    };
    let token = Uuid::new_v4();
    format!("{base}-{token}.{ext}")
}

fn extension_for_mime(mime: Option<&str>) -> String {
    mime.and_then(mime_guess::get_mime_extensions_str)
        .and_then(|exts| exts.first())
        .unwrap_or(&FALLBACK_EXTENSION)
        .to_string()
}
