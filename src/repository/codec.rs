// ==========================================
// 校园服务工单系统 - 行映射辅助
// ==========================================
// 职责: 数据库文本列 ↔ 领域枚举 / 时间戳
// 说明: 解析失败统一转为 FromSqlConversionFailure, 由调用方转 RepositoryError
// ==========================================

use crate::db::parse_ts;
use crate::domain::types::{Category, Rating, RequestStatus, Role};
use chrono::NaiveDateTime;
use rusqlite::types::Type;
use rusqlite::Row;

fn conversion_error(idx: usize, msg: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, msg.into())
}

pub(crate) fn get_ts(row: &Row<'_>, idx: usize) -> rusqlite::Result<NaiveDateTime> {
    let raw: String = row.get(idx)?;
    parse_ts(&raw).ok_or_else(|| conversion_error(idx, format!("invalid timestamp: {}", raw)))
}

pub(crate) fn get_opt_ts(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<NaiveDateTime>> {
    let raw: Option<String> = row.get(idx)?;
    match raw {
        None => Ok(None),
        Some(s) => parse_ts(&s)
            .map(Some)
            .ok_or_else(|| conversion_error(idx, format!("invalid timestamp: {}", s))),
    }
}

pub(crate) fn get_role(row: &Row<'_>, idx: usize) -> rusqlite::Result<Role> {
    let raw: String = row.get(idx)?;
    Role::parse(&raw).ok_or_else(|| conversion_error(idx, format!("invalid role: {}", raw)))
}

pub(crate) fn get_category(row: &Row<'_>, idx: usize) -> rusqlite::Result<Category> {
    let raw: String = row.get(idx)?;
    Category::parse(&raw).ok_or_else(|| conversion_error(idx, format!("invalid category: {}", raw)))
}

pub(crate) fn get_opt_category(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<Category>> {
    let raw: Option<String> = row.get(idx)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => Category::parse(s)
            .map(Some)
            .ok_or_else(|| conversion_error(idx, format!("invalid category: {}", s))),
    }
}

pub(crate) fn get_status(row: &Row<'_>, idx: usize) -> rusqlite::Result<RequestStatus> {
    let raw: String = row.get(idx)?;
    RequestStatus::parse(&raw).ok_or_else(|| conversion_error(idx, format!("invalid status: {}", raw)))
}

pub(crate) fn get_opt_rating(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<Rating>> {
    let raw: Option<u8> = row.get(idx)?;
    match raw {
        None => Ok(None),
        Some(v) => Rating::new(v)
            .map(Some)
            .ok_or_else(|| conversion_error(idx, format!("invalid rating: {}", v))),
    }
}

pub(crate) fn get_rating(row: &Row<'_>, idx: usize) -> rusqlite::Result<Rating> {
    let v: u8 = row.get(idx)?;
    Rating::new(v).ok_or_else(|| conversion_error(idx, format!("invalid rating: {}", v)))
}
