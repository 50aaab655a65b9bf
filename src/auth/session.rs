// ==========================================
// 校园服务工单系统 - 会话与角色守卫
// ==========================================
// 管理员 = is_staff 账号, 与业务角色 (报修人 / 维修工) 独立
// ==========================================

use crate::auth::error::{AuthError, AuthResult};
use crate::domain::types::Role;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::NaiveDateTime;
use rand::RngCore;
use serde::{Deserialize, Serialize};

/// 已认证会话
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub token: String,
    pub user_id: i64,
    pub username: String,
    pub role: Role,
    pub is_staff: bool,
    pub expires_at: NaiveDateTime,
}

/// 登录后跳转的工作台
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DashboardKind {
    Admin,
    Requestee,
    Worker,
}

impl Session {
    pub fn require_requestee(&self) -> AuthResult<()> {
        if self.role == Role::Requestee {
            Ok(())
        } else {
            Err(AuthError::PermissionDenied(format!("{} 不是报修人", self.username)))
        }
    }

    pub fn require_worker(&self) -> AuthResult<()> {
        if self.role == Role::Worker {
            Ok(())
        } else {
            Err(AuthError::PermissionDenied(format!("{} 不是维修工", self.username)))
        }
    }

    pub fn require_admin(&self) -> AuthResult<()> {
        if self.is_staff {
            Ok(())
        } else {
            Err(AuthError::PermissionDenied(format!("{} 不是管理员", self.username)))
        }
    }

    /// 管理员优先, 其余按角色
    pub fn dashboard_redirect(&self) -> DashboardKind {
        if self.is_staff {
            return DashboardKind::Admin;
        }
        match self.role {
            Role::Requestee => DashboardKind::Requestee,
            Role::Worker => DashboardKind::Worker,
        }
    }
}

/// 生成会话令牌（32 字节随机数, URL 安全 base64）
pub fn generate_token() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(role: Role, is_staff: bool) -> Session {
        Session {
            token: generate_token(),
            user_id: 1,
            username: "u".to_string(),
            role,
            is_staff,
            expires_at: chrono::Utc::now().naive_utc(),
        }
    }

    #[test]
    fn test_guards() {
        let requestee = session(Role::Requestee, false);
        assert!(requestee.require_requestee().is_ok());
        assert!(requestee.require_worker().is_err());
        assert!(requestee.require_admin().is_err());

        let worker = session(Role::Worker, false);
        assert!(worker.require_worker().is_ok());
        assert!(matches!(
            worker.require_requestee(),
            Err(AuthError::PermissionDenied(_))
        ));
    }

    #[test]
    fn test_dashboard_redirect() {
        assert_eq!(session(Role::Requestee, true).dashboard_redirect(), DashboardKind::Admin);
        assert_eq!(session(Role::Worker, false).dashboard_redirect(), DashboardKind::Worker);
        assert_eq!(session(Role::Requestee, false).dashboard_redirect(), DashboardKind::Requestee);
    }

    #[test]
    fn test_tokens_are_unique() {
        let a = generate_token();
        assert_eq!(a.len(), 43);
        assert_ne!(a, generate_token());
    }
}
