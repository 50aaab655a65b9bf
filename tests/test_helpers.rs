// ==========================================
// 测试辅助函数
// ==========================================
// 职责: 提供测试所需的临时数据库、图片目录与测试图片
// ==========================================

use std::error::Error;
use tempfile::{NamedTempFile, TempDir};

/// 创建临时测试数据库并初始化 schema
///
/// # 返回
/// - NamedTempFile: 临时数据库文件（需要保持存活）
/// - String: 数据库文件路径
pub fn create_test_db() -> Result<(NamedTempFile, String), Box<dyn Error>> {
    let temp_file = NamedTempFile::new()?;
    let db_path = temp_file
        .path()
        .to_str()
        .ok_or("临时文件路径不是 UTF-8")?
        .to_string();

    let conn = cleanify::db::open_sqlite_connection(&db_path)?;
    cleanify::db::init_schema(&conn)?;

    Ok((temp_file, db_path))
}

/// 创建临时图片目录
pub fn create_media_dir() -> Result<TempDir, Box<dyn Error>> {
    Ok(tempfile::tempdir()?)
}

/// 最小 PNG 测试图片（文件头 + 填充）
pub fn png_bytes() -> Vec<u8> {
    let mut bytes = cleanify::media::PNG_SIGNATURE.to_vec();
    bytes.extend_from_slice(&[0u8; 24]);
    bytes
}

/// 最小 JPEG 测试图片
pub fn jpeg_bytes() -> Vec<u8> {
    vec![0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, b'J', b'F', b'I', b'F', 0x00]
}
