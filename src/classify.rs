//! 按声明的 MIME 类型对上传文件分类。

use serde::Serialize;

use crate::config::{
    DOCUMENT_MIME_TYPES, IMAGE_DIR, IMAGE_MIME_TYPES, MISC_DIR, VIDEO_DIR, VIDEO_MIME_TYPES,
};

/// 上传文件的语义类别。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Image,
    Video,
    Document,
    Other,
}

/// 进程启动时加载一次的 MIME 类型配置，之后只读。
#[derive(Debug)]
pub struct MediaTypes {
    images: Vec<String>,
    videos: Vec<String>,
    documents: Vec<String>,
}

impl Default for MediaTypes {
    fn default() -> Self {
        let to_owned = |set: &[&str]| set.iter().map(|s| s.to_string()).collect();
        Self {
            images: to_owned(IMAGE_MIME_TYPES),
            videos: to_owned(VIDEO_MIME_TYPES),
            documents: to_owned(DOCUMENT_MIME_TYPES),
        }
    }
}

impl MediaTypes {
    /// 判定类别：规则自上而下逐条求值，首个命中生效。
    pub fn classify(&self, mime: Option<&str>) -> Category {
        let Some(mime) = mime.filter(|value| !value.is_empty()) else {
            return Category::Other;
        };

        let rules = [
            (self.is_image(mime), Category::Image),
            (self.is_video(mime), Category::Video),
            (self.is_document(mime), Category::Document),
        ];
        rules
            .into_iter()
            .find_map(|(matched, category)| matched.then_some(category))
            .unwrap_or(Category::Other)
    }

    fn is_image(&self, mime: &str) -> bool {
        self.images.iter().any(|m| m == mime) || mime.contains("image")
    }

    fn is_video(&self, mime: &str) -> bool {
        self.videos.iter().any(|m| m == mime) || mime.contains("video")
    }

    // 子串规则对任意 application/* 类型都命中，范围刻意宽松。
    fn is_document(&self, mime: &str) -> bool {
        self.documents.iter().any(|m| m == mime)
            || mime.contains("text")
            || mime.contains("application")
    }
}

/// 类别到存储子目录的映射（Document 与 Other 共用 misc）。
pub fn upload_directory(category: Category) -> &'static str {
    match category {
        Category::Image => IMAGE_DIR,
        Category::Video => VIDEO_DIR,
        Category::Document | Category::Other => MISC_DIR,
    }
}
