// ==========================================
// 校园服务工单系统 - 评分记录数据仓储
// ==========================================
// 对齐: worker_rating 表
// 说明: 每次确认/驳回都追加一条, 驳回清空工单上的维修工后评分仍可追溯
// ==========================================

use crate::db::{format_ts, SharedConnection};
use crate::domain::request::RatingRecord;
use crate::domain::types::Rating;
use crate::repository::codec::{get_rating, get_ts};
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::NaiveDateTime;
use rusqlite::{params, Connection, Result as SqliteResult, Row};

pub struct RatingRepository {
    conn: SharedConnection,
}

impl RatingRepository {
    pub fn new(conn: SharedConnection) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 某维修工的评分记录（最新在前）
    pub fn list_by_worker(&self, worker_id: i64) -> RepositoryResult<Vec<RatingRecord>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT rating_id, request_id, worker_id, requestee_id, rating, approved, created_at
            FROM worker_rating
            WHERE worker_id = ?1
            ORDER BY created_at DESC, rating_id DESC
            "#,
        )?;
        let records = stmt
            .query_map(params![worker_id], map_record)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(records)
    }
}

fn map_record(row: &Row<'_>) -> SqliteResult<RatingRecord> {
    Ok(RatingRecord {
        rating_id: row.get(0)?,
        request_id: row.get(1)?,
        worker_id: row.get(2)?,
        requestee_id: row.get(3)?,
        rating: get_rating(row, 4)?,
        approved: row.get(5)?,
        created_at: get_ts(row, 6)?,
    })
}

/// 在工单确认事务内追加评分记录
pub(crate) fn insert_rating_with_conn(
    conn: &Connection,
    request_id: i64,
    worker_id: i64,
    requestee_id: i64,
    rating: Rating,
    approved: bool,
    at: NaiveDateTime,
) -> RepositoryResult<i64> {
    conn.execute(
        r#"
        INSERT INTO worker_rating (request_id, worker_id, requestee_id, rating, approved, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        "#,
        params![request_id, worker_id, requestee_id, rating.value(), approved, format_ts(&at)],
    )?;
    Ok(conn.last_insert_rowid())
}
