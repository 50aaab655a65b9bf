// ==========================================
// 校园服务工单系统 - 操作日志领域模型
// ==========================================
// 红线: 所有状态写入必须记录
// 用途: 审计追踪 (谁在何时对哪张工单做了什么)
// 对齐: action_log 表
// ==========================================

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;

// ==========================================
// ActionLog - 操作日志
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionLog {
    pub action_id: String,                 // UUID
    pub action_type: ActionType,
    pub action_ts: NaiveDateTime,
    pub actor: String,                     // 操作人用户名 ("system" 表示自动派单)
    pub request_id: Option<i64>,           // 关联工单
    pub target_user_id: Option<i64>,       // 关联用户 (维修工 / 被编辑用户)
    pub payload_json: Option<JsonValue>,   // 操作参数
    pub detail: Option<String>,            // 描述
}

impl ActionLog {
    /// 创建新的操作日志（action_id / action_ts 自动生成）
    pub fn new(action_type: ActionType, actor: &str) -> Self {
        Self {
            action_id: uuid::Uuid::new_v4().to_string(),
            action_type,
            action_ts: chrono::Utc::now().naive_utc(),
            actor: actor.to_string(),
            request_id: None,
            target_user_id: None,
            payload_json: None,
            detail: None,
        }
    }

    pub fn with_request(mut self, request_id: i64) -> Self {
        self.request_id = Some(request_id);
        self
    }

    pub fn with_target_user(mut self, user_id: i64) -> Self {
        self.target_user_id = Some(user_id);
        self
    }

    pub fn with_payload(mut self, payload: JsonValue) -> Self {
        self.payload_json = Some(payload);
        self
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

// ==========================================
// ActionType - 操作类型
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionType {
    Signup,           // 注册
    CreateRequest,    // 提交工单
    AutoAssign,       // 自动派单
    NoWorkerFree,     // 无空闲维修工
    SubmitCompletion, // 维修工提交完工
    Approve,          // 报修人确认
    Reject,           // 报修人驳回
    ManualAssign,     // 管理员手动派单
    ProfileUpdate,    // 管理员编辑档案
    AccountUpdate,    // 管理员启停账号 / 授权
    ConfigUpdate,     // 配置变更
}

impl ActionType {
    pub fn to_db_str(&self) -> &'static str {
        match self {
            ActionType::Signup => "SIGNUP",
            ActionType::CreateRequest => "CREATE_REQUEST",
            ActionType::AutoAssign => "AUTO_ASSIGN",
            ActionType::NoWorkerFree => "NO_WORKER_FREE",
            ActionType::SubmitCompletion => "SUBMIT_COMPLETION",
            ActionType::Approve => "APPROVE",
            ActionType::Reject => "REJECT",
            ActionType::ManualAssign => "MANUAL_ASSIGN",
            ActionType::ProfileUpdate => "PROFILE_UPDATE",
            ActionType::AccountUpdate => "ACCOUNT_UPDATE",
            ActionType::ConfigUpdate => "CONFIG_UPDATE",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        let all = [
            ActionType::Signup,
            ActionType::CreateRequest,
            ActionType::AutoAssign,
            ActionType::NoWorkerFree,
            ActionType::SubmitCompletion,
            ActionType::Approve,
            ActionType::Reject,
            ActionType::ManualAssign,
            ActionType::ProfileUpdate,
            ActionType::AccountUpdate,
            ActionType::ConfigUpdate,
        ];
        all.into_iter().find(|t| t.to_db_str().eq_ignore_ascii_case(s.trim()))
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_db_str())
    }
}
