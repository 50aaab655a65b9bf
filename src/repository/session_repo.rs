// ==========================================
// 校园服务工单系统 - 登录会话数据仓储
// ==========================================
// 对齐: user_session 表
// ==========================================

use crate::db::{format_ts, SharedConnection};
use crate::repository::codec::get_ts;
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::NaiveDateTime;
use rusqlite::{params, Connection};

/// 会话记录
#[derive(Debug, Clone)]
pub struct SessionRecord {
    pub token: String,
    pub user_id: i64,
    pub created_at: NaiveDateTime,
    pub expires_at: NaiveDateTime,
}

pub struct SessionRepository {
    conn: SharedConnection,
}

impl SessionRepository {
    pub fn new(conn: SharedConnection) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    pub fn insert(&self, record: &SessionRecord) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            "INSERT INTO user_session (token, user_id, created_at, expires_at) VALUES (?1, ?2, ?3, ?4)",
            params![
                record.token,
                record.user_id,
                format_ts(&record.created_at),
                format_ts(&record.expires_at),
            ],
        )?;
        Ok(())
    }

    /// 查询未过期的会话
    pub fn find_active(&self, token: &str, now: NaiveDateTime) -> RepositoryResult<Option<SessionRecord>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT token, user_id, created_at, expires_at
            FROM user_session
            WHERE token = ?1 AND expires_at > ?2
            "#,
        )?;

        match stmt.query_row(params![token, format_ts(&now)], |row| {
            Ok(SessionRecord {
                token: row.get(0)?,
                user_id: row.get(1)?,
                created_at: get_ts(row, 2)?,
                expires_at: get_ts(row, 3)?,
            })
        }) {
            Ok(record) => Ok(Some(record)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// 删除会话（不存在时返回 false）
    pub fn delete(&self, token: &str) -> RepositoryResult<bool> {
        let conn = self.get_conn()?;
        let rows = conn.execute("DELETE FROM user_session WHERE token = ?1", params![token])?;
        Ok(rows > 0)
    }

    /// 删除某用户的全部会话（停用账号时）
    pub fn delete_for_user(&self, user_id: i64) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let rows = conn.execute("DELETE FROM user_session WHERE user_id = ?1", params![user_id])?;
        Ok(rows)
    }

    /// 清理过期会话
    pub fn purge_expired(&self, now: NaiveDateTime) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let rows = conn.execute(
            "DELETE FROM user_session WHERE expires_at <= ?1",
            params![format_ts(&now)],
        )?;
        Ok(rows)
    }
}
