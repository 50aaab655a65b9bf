// ==========================================
// 校园服务工单系统 - 命令耗时统计
// ==========================================
// 每条命令持有一个 PerfGuard, 结束时输出一条 target="perf" 日志
// 字段: 命令名 / 会话用户 / 工单ID / 耗时 / SQL 语句数
// SQL 语句数依赖 install_statement_counter 安装的 trace 回调
// ==========================================

use rusqlite::Connection;
use std::cell::Cell;
use std::time::Instant;

/// SQL 计数开关（Debug 默认开启）
pub const ENV_PERF_SQL: &str = "CLEANIFY_PERF_SQL";

thread_local! {
    static SQL_COUNT: Cell<u64> = Cell::new(0);
}

fn count_statement(_sql: &str) {
    SQL_COUNT.with(|c| c.set(c.get().saturating_add(1)));
}

fn counter_enabled(raw: Option<&str>) -> bool {
    match raw {
        Some(v) => matches!(v.trim().to_lowercase().as_str(), "1" | "true" | "on"),
        None => cfg!(debug_assertions),
    }
}

/// 在连接上安装语句计数回调
pub fn install_statement_counter(conn: &mut Connection) {
    let raw = std::env::var(ENV_PERF_SQL).ok();
    let enabled = counter_enabled(raw.as_deref());
    conn.trace(if enabled { Some(count_statement) } else { None });
    tracing::debug!(enabled, "SQL 语句计数");
}

pub struct PerfGuard {
    command: &'static str,
    user_id: Option<i64>,
    request_id: Option<i64>,
    start: Instant,
    sql_start: u64,
}

impl PerfGuard {
    pub fn new(command: &'static str) -> Self {
        Self {
            command,
            user_id: None,
            request_id: None,
            start: Instant::now(),
            sql_start: SQL_COUNT.with(|c| c.get()),
        }
    }

    /// 标记命令操作的工单
    pub fn for_request(mut self, request_id: i64) -> Self {
        self.request_id = Some(request_id);
        self
    }

    /// 会话解析成功后记下操作人
    pub fn set_user(&mut self, user_id: i64) {
        self.user_id = Some(user_id);
    }

    /// 自创建以来本线程执行的 SQL 语句数
    pub fn sql_count(&self) -> u64 {
        SQL_COUNT.with(|c| c.get()).saturating_sub(self.sql_start)
    }
}

impl Drop for PerfGuard {
    fn drop(&mut self) {
        tracing::debug!(
            target: "perf",
            command = self.command,
            user_id = ?self.user_id,
            request_id = ?self.request_id,
            elapsed_ms = self.start.elapsed().as_millis() as u64,
            sql_count = self.sql_count(),
            "命令完成"
        );
    }
}
