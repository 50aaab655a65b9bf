// ==========================================
// 校园服务工单系统 - 图片存储
// ==========================================
// 职责: 校验上传图片, 保存到 media_root 下的子目录, 删除被驳回的完工照片
// 存储: <media_root>/request_images/<uuid>.<ext>
//       <media_root>/completion_images/<uuid>.<ext>
// 数据库只保存相对路径
// ==========================================

use std::path::{Component, Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MediaError {
    #[error("图片为空")]
    Empty,

    #[error("文件不是可识别的图片格式")]
    NotAnImage,

    #[error("图片过大: {size} 字节 (上限 {limit} 字节)")]
    TooLarge { size: u64, limit: u64 },

    #[error("非法的图片路径: {0}")]
    InvalidPath(String),

    #[error("图片读写失败: {0}")]
    Io(#[from] std::io::Error),
}

pub type MediaResult<T> = Result<T, MediaError>;

/// 图片子目录
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaFolder {
    RequestImages,
    CompletionImages,
}

impl MediaFolder {
    pub fn dir_name(&self) -> &'static str {
        match self {
            MediaFolder::RequestImages => "request_images",
            MediaFolder::CompletionImages => "completion_images",
        }
    }
}

/// 支持的图片格式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    Png,
    Jpeg,
    Gif,
    Webp,
    Bmp,
}

impl ImageKind {
    /// 按文件头识别
    pub fn detect(bytes: &[u8]) -> Option<Self> {
        if bytes.starts_with(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]) {
            Some(ImageKind::Png)
        } else if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
            Some(ImageKind::Jpeg)
        } else if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
            Some(ImageKind::Gif)
        } else if bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
            Some(ImageKind::Webp)
        } else if bytes.len() >= 14 && bytes.starts_with(b"BM") {
            Some(ImageKind::Bmp)
        } else {
            None
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ImageKind::Png => "png",
            ImageKind::Jpeg => "jpg",
            ImageKind::Gif => "gif",
            ImageKind::Webp => "webp",
            ImageKind::Bmp => "bmp",
        }
    }
}

/// 校验图片内容与大小
pub fn validate_image(bytes: &[u8], max_bytes: u64) -> MediaResult<ImageKind> {
    if bytes.is_empty() {
        return Err(MediaError::Empty);
    }
    let size = bytes.len() as u64;
    if size > max_bytes {
        return Err(MediaError::TooLarge {
            size,
            limit: max_bytes,
        });
    }
    ImageKind::detect(bytes).ok_or(MediaError::NotAnImage)
}

// ==========================================
// MediaStore - 图片存储
// ==========================================
pub struct MediaStore {
    root: PathBuf,
}

impl MediaStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// 校验并保存图片
    ///
    /// # 返回
    /// 相对 media_root 的路径（写入工单字段）
    pub fn save(&self, folder: MediaFolder, bytes: &[u8], max_bytes: u64) -> MediaResult<String> {
        let kind = validate_image(bytes, max_bytes)?;

        let dir = self.root.join(folder.dir_name());
        std::fs::create_dir_all(&dir)?;

        let file_name = format!("{}.{}", uuid::Uuid::new_v4(), kind.extension());
        std::fs::write(dir.join(&file_name), bytes)?;

        let relative = format!("{}/{}", folder.dir_name(), file_name);
        tracing::debug!(path = %relative, size = bytes.len(), "图片已保存");
        Ok(relative)
    }

    /// 相对路径 → 绝对路径（拒绝越出 media_root）
    pub fn resolve(&self, relative: &str) -> MediaResult<PathBuf> {
        let path = Path::new(relative);
        let safe = !relative.is_empty()
            && path
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        if !safe {
            return Err(MediaError::InvalidPath(relative.to_string()));
        }
        Ok(self.root.join(path))
    }

    /// 删除图片
    ///
    /// # 返回
    /// - `Ok(false)`: 文件本就不存在
    pub fn delete(&self, relative: &str) -> MediaResult<bool> {
        let path = self.resolve(relative)?;
        match std::fs::remove_file(&path) {
            Ok(()) => {
                tracing::debug!(path = %relative, "图片已删除");
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

/// 测试用最小 PNG 文件头
pub const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_formats() {
        assert_eq!(ImageKind::detect(&PNG_SIGNATURE), Some(ImageKind::Png));
        assert_eq!(ImageKind::detect(&[0xFF, 0xD8, 0xFF, 0xE0]), Some(ImageKind::Jpeg));
        assert_eq!(ImageKind::detect(b"GIF89a...."), Some(ImageKind::Gif));
        assert_eq!(ImageKind::detect(b"RIFF\0\0\0\0WEBPVP8 "), Some(ImageKind::Webp));
        assert_eq!(ImageKind::detect(b"%PDF-1.7"), None);
    }

    #[test]
    fn test_validate_size_and_content() {
        assert!(matches!(validate_image(&[], 10), Err(MediaError::Empty)));
        assert!(matches!(
            validate_image(&PNG_SIGNATURE, 4),
            Err(MediaError::TooLarge { size: 8, limit: 4 })
        ));
        assert!(matches!(validate_image(b"plain text", 100), Err(MediaError::NotAnImage)));
    }

    #[test]
    fn test_save_resolve_delete() {
        let dir = tempfile::tempdir().unwrap();
        let store = MediaStore::new(dir.path());

        let rel = store
            .save(MediaFolder::CompletionImages, &PNG_SIGNATURE, 1024)
            .unwrap();
        assert!(rel.starts_with("completion_images/"));
        assert!(rel.ends_with(".png"));
        assert!(store.resolve(&rel).unwrap().exists());

        assert!(store.delete(&rel).unwrap());
        assert!(!store.delete(&rel).unwrap());
    }

    #[test]
    fn test_resolve_rejects_traversal() {
        let store = MediaStore::new("/tmp/media");
        assert!(store.resolve("../etc/passwd").is_err());
        assert!(store.resolve("/etc/passwd").is_err());
        assert!(store.resolve("").is_err());
    }
}
