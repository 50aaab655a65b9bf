// ==========================================
// 校园服务工单系统 - 用户数据仓储
// ==========================================
// 职责: user_account / user_profile 表的读写
// 红线: Repository 不含业务逻辑, 档案规范化由调用方完成
// ==========================================

use crate::db::{format_ts, now_utc, SharedConnection};
use crate::domain::types::{Category, Role};
use crate::domain::user::{NewUserAccount, UserAccount, UserProfile};
use crate::repository::codec::{get_opt_category, get_opt_ts, get_role, get_ts};
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::NaiveDateTime;
use rusqlite::{params, Connection, OptionalExtension, Result as SqliteResult, Row};
use serde::{Deserialize, Serialize};

const ACCOUNT_COLUMNS: &str = r#"
    a.user_id, a.username, a.email, a.first_name, a.last_name, a.password_hash,
    a.is_active, a.is_staff, a.date_joined, a.last_login
"#;

const PROFILE_COLUMNS: &str = "p.user_id, p.role, p.category, p.average_rating, p.is_busy";

// ==========================================
// 读模型
// ==========================================

/// 账号 + 档案（管理员列表 / 派单候选）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserWithProfile {
    pub account: UserAccount,
    pub profile: UserProfile,
}

/// 派单候选维修工
#[derive(Debug, Clone)]
pub struct WorkerCandidate {
    pub user_id: i64,
    pub username: String,
    pub last_assigned_at: Option<NaiveDateTime>,
}

/// 用户列表过滤条件
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserFilter {
    pub role: Option<Role>,
    pub category: Option<Category>,
    pub active_only: bool,
}

// ==========================================
// UserRepository
// ==========================================
pub struct UserRepository {
    conn: SharedConnection,
}

impl UserRepository {
    pub fn new(conn: SharedConnection) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    fn map_account(row: &Row<'_>, offset: usize) -> SqliteResult<UserAccount> {
        Ok(UserAccount {
            user_id: row.get(offset)?,
            username: row.get(offset + 1)?,
            email: row.get(offset + 2)?,
            first_name: row.get(offset + 3)?,
            last_name: row.get(offset + 4)?,
            password_hash: row.get(offset + 5)?,
            is_active: row.get(offset + 6)?,
            is_staff: row.get(offset + 7)?,
            date_joined: get_ts(row, offset + 8)?,
            last_login: get_opt_ts(row, offset + 9)?,
        })
    }

    fn map_profile(row: &Row<'_>, offset: usize) -> SqliteResult<UserProfile> {
        Ok(UserProfile {
            user_id: row.get(offset)?,
            role: get_role(row, offset + 1)?,
            category: get_opt_category(row, offset + 2)?,
            average_rating: row.get(offset + 3)?,
            is_busy: row.get(offset + 4)?,
        })
    }

    fn map_user_with_profile(row: &Row<'_>) -> SqliteResult<UserWithProfile> {
        Ok(UserWithProfile {
            account: Self::map_account(row, 0)?,
            profile: Self::map_profile(row, 10)?,
        })
    }

    // ==========================================
    // 写入操作
    // ==========================================

    /// 创建账号与档案（同一事务）
    ///
    /// # 返回
    /// - `Ok(user_id)`: 新用户ID
    /// - `Err(UniqueConstraintViolation)`: 用户名重复
    pub fn create_user(&self, account: &NewUserAccount, profile_role: Role, category: Option<Category>) -> RepositoryResult<i64> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;

        tx.execute(
            r#"
            INSERT INTO user_account (
                username, email, first_name, last_name, password_hash,
                is_active, is_staff, date_joined
            ) VALUES (?1, ?2, ?3, ?4, ?5, 1, ?6, ?7)
            "#,
            params![
                account.username,
                account.email,
                account.first_name,
                account.last_name,
                account.password_hash,
                account.is_staff,
                format_ts(&now_utc()),
            ],
        )?;
        let user_id = tx.last_insert_rowid();

        let profile = UserProfile::new(user_id, profile_role, category);
        tx.execute(
            r#"
            INSERT INTO user_profile (user_id, role, category, average_rating, is_busy)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![
                profile.user_id,
                profile.role.to_db_str(),
                profile.category.map(|c| c.to_db_str()),
                profile.average_rating,
                profile.is_busy,
            ],
        )?;

        tx.commit()?;
        Ok(user_id)
    }

    /// 整体写回档案
    pub fn save_profile(&self, profile: &UserProfile) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let rows = conn.execute(
            r#"
            UPDATE user_profile
            SET role = ?2, category = ?3, average_rating = ?4, is_busy = ?5
            WHERE user_id = ?1
            "#,
            params![
                profile.user_id,
                profile.role.to_db_str(),
                profile.category.map(|c| c.to_db_str()),
                profile.average_rating,
                profile.is_busy,
            ],
        )?;
        if rows == 0 {
            return Err(RepositoryError::not_found("UserProfile", profile.user_id));
        }
        Ok(())
    }

    /// 更新忙碌标记
    ///
    /// # 返回
    /// 受影响行数（0 表示用户不存在）
    pub fn set_busy(&self, user_id: i64, is_busy: bool) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let rows = conn.execute(
            "UPDATE user_profile SET is_busy = ?2 WHERE user_id = ?1",
            params![user_id, is_busy],
        )?;
        Ok(rows)
    }

    pub fn set_average_rating(&self, user_id: i64, average: Option<f64>) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            "UPDATE user_profile SET average_rating = ?2 WHERE user_id = ?1",
            params![user_id, average],
        )?;
        Ok(())
    }

    pub fn set_active(&self, user_id: i64, is_active: bool) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let rows = conn.execute(
            "UPDATE user_account SET is_active = ?2 WHERE user_id = ?1",
            params![user_id, is_active],
        )?;
        if rows == 0 {
            return Err(RepositoryError::not_found("UserAccount", user_id));
        }
        Ok(())
    }

    pub fn set_staff(&self, user_id: i64, is_staff: bool) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let rows = conn.execute(
            "UPDATE user_account SET is_staff = ?2 WHERE user_id = ?1",
            params![user_id, is_staff],
        )?;
        if rows == 0 {
            return Err(RepositoryError::not_found("UserAccount", user_id));
        }
        Ok(())
    }

    pub fn touch_last_login(&self, user_id: i64, at: NaiveDateTime) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            "UPDATE user_account SET last_login = ?2 WHERE user_id = ?1",
            params![user_id, format_ts(&at)],
        )?;
        Ok(())
    }

    // ==========================================
    // 查询操作
    // ==========================================

    pub fn find_by_id(&self, user_id: i64) -> RepositoryResult<Option<UserAccount>> {
        let conn = self.get_conn()?;
        let sql = format!("SELECT {} FROM user_account a WHERE a.user_id = ?1", ACCOUNT_COLUMNS);
        let account = conn
            .query_row(&sql, params![user_id], |row| Self::map_account(row, 0))
            .optional()?;
        Ok(account)
    }

    pub fn find_by_username(&self, username: &str) -> RepositoryResult<Option<UserAccount>> {
        let conn = self.get_conn()?;
        let sql = format!("SELECT {} FROM user_account a WHERE a.username = ?1", ACCOUNT_COLUMNS);
        let account = conn
            .query_row(&sql, params![username], |row| Self::map_account(row, 0))
            .optional()?;
        Ok(account)
    }

    pub fn username_exists(&self, username: &str) -> RepositoryResult<bool> {
        let conn = self.get_conn()?;
        let exists: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM user_account WHERE username = ?1)",
            params![username],
            |row| row.get(0),
        )?;
        Ok(exists)
    }

    /// 邮箱是否已存在（大小写不敏感）
    pub fn email_exists(&self, email: &str) -> RepositoryResult<bool> {
        let conn = self.get_conn()?;
        let exists: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM user_account WHERE email = ?1 COLLATE NOCASE)",
            params![email.trim()],
            |row| row.get(0),
        )?;
        Ok(exists)
    }

    pub fn find_profile(&self, user_id: i64) -> RepositoryResult<Option<UserProfile>> {
        let conn = self.get_conn()?;
        let sql = format!("SELECT {} FROM user_profile p WHERE p.user_id = ?1", PROFILE_COLUMNS);
        let profile = conn
            .query_row(&sql, params![user_id], |row| Self::map_profile(row, 0))
            .optional()?;
        Ok(profile)
    }

    pub fn find_with_profile(&self, user_id: i64) -> RepositoryResult<Option<UserWithProfile>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {}, {} FROM user_account a JOIN user_profile p ON p.user_id = a.user_id WHERE a.user_id = ?1",
            ACCOUNT_COLUMNS, PROFILE_COLUMNS
        );
        let user = conn
            .query_row(&sql, params![user_id], Self::map_user_with_profile)
            .optional()?;
        Ok(user)
    }

    /// 查询可派单的维修工
    ///
    /// 条件: 角色 Worker、类别匹配、未忙碌、账号启用
    /// 排序: user_id 升序（选择策略由引擎决定）
    pub fn list_free_workers(&self, category: Category) -> RepositoryResult<Vec<WorkerCandidate>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT a.user_id, a.username,
                   (SELECT MAX(r.assigned_at) FROM service_request r
                     WHERE r.assigned_worker_id = a.user_id) AS last_assigned_at
            FROM user_account a
            JOIN user_profile p ON p.user_id = a.user_id
            WHERE p.role = 'Worker'
              AND p.category = ?1
              AND p.is_busy = 0
              AND a.is_active = 1
            ORDER BY a.user_id ASC
            "#,
        )?;

        let rows = stmt
            .query_map(params![category.to_db_str()], |row| {
                Ok(WorkerCandidate {
                    user_id: row.get(0)?,
                    username: row.get(1)?,
                    last_assigned_at: get_opt_ts(row, 2)?,
                })
            })?
            .collect::<SqliteResult<Vec<_>>>()?;

        Ok(rows)
    }

    /// 按条件列出用户（管理员用户列表）
    pub fn list_users(&self, filter: &UserFilter) -> RepositoryResult<Vec<UserWithProfile>> {
        let conn = self.get_conn()?;
        let sql = format!(
            r#"
            SELECT {}, {}
            FROM user_account a
            JOIN user_profile p ON p.user_id = a.user_id
            WHERE (?1 IS NULL OR p.role = ?1)
              AND (?2 IS NULL OR p.category = ?2)
              AND (?3 = 0 OR a.is_active = 1)
            ORDER BY a.username ASC
            "#,
            ACCOUNT_COLUMNS, PROFILE_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(
                params![
                    filter.role.map(|r| r.to_db_str()),
                    filter.category.map(|c| c.to_db_str()),
                    filter.active_only,
                ],
                Self::map_user_with_profile,
            )?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(rows)
    }

    /// 维修工空闲/忙碌人数（仅启用账号）
    ///
    /// # 返回
    /// (free, busy)
    pub fn count_workers_by_busy(&self) -> RepositoryResult<(i64, i64)> {
        let conn = self.get_conn()?;
        let counts = conn.query_row(
            r#"
            SELECT
                COALESCE(SUM(CASE WHEN p.is_busy = 0 THEN 1 ELSE 0 END), 0),
                COALESCE(SUM(CASE WHEN p.is_busy = 1 THEN 1 ELSE 0 END), 0)
            FROM user_profile p
            JOIN user_account a ON a.user_id = p.user_id
            WHERE p.role = 'Worker' AND a.is_active = 1
            "#,
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        Ok(counts)
    }
}
