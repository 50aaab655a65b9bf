// ==========================================
// 校园服务工单系统 - 用户领域模型
// ==========================================
// 职责: 账号 (UserAccount) 与业务档案 (UserProfile)
// 对齐: user_account / user_profile 表 (1:1)
// ==========================================

use crate::domain::types::{Category, Role};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

// ==========================================
// UserAccount - 登录账号
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserAccount {
    pub user_id: i64,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub is_active: bool,
    pub is_staff: bool, // 管理员标记
    pub date_joined: NaiveDateTime,
    pub last_login: Option<NaiveDateTime>,
}

impl UserAccount {
    /// 展示名: "名 姓"，为空时退回用户名
    pub fn display_name(&self) -> String {
        let full = format!("{} {}", self.first_name.trim(), self.last_name.trim());
        let full = full.trim();
        if full.is_empty() {
            self.username.clone()
        } else {
            full.to_string()
        }
    }
}

// ==========================================
// NewUserAccount - 待创建账号
// ==========================================
#[derive(Debug, Clone)]
pub struct NewUserAccount {
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub password_hash: String,
    pub is_staff: bool,
}

// ==========================================
// UserProfile - 业务档案
// ==========================================
// 红线: 非维修工档案 category / average_rating 为空, is_busy = false
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub user_id: i64,
    pub role: Role,
    pub category: Option<Category>,     // 仅维修工
    pub average_rating: Option<f64>,    // 仅维修工, 两位小数
    pub is_busy: bool,                  // 仅维修工, 存在 Assigned 工单时为 true
}

impl UserProfile {
    pub fn new(user_id: i64, role: Role, category: Option<Category>) -> Self {
        let mut profile = Self {
            user_id,
            role,
            category,
            average_rating: None,
            is_busy: false,
        };
        profile.normalize();
        profile
    }

    pub fn is_worker(&self) -> bool {
        self.role == Role::Worker
    }

    /// 档案规范化
    ///
    /// # 返回
    /// - `true`: 维修工缺少类别（仍可保存，但不会被自动派单）
    /// - `false`: 档案完整
    pub fn normalize(&mut self) -> bool {
        if self.role != Role::Worker {
            self.category = None;
            self.average_rating = None;
            self.is_busy = false;
            return false;
        }
        self.category.is_none()
    }

    /// 评分展示
    pub fn rating_display(&self) -> Option<String> {
        self.average_rating.map(|r| format!("{:.2} / 5.00", r))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_clears_worker_fields_for_requestee() {
        let mut profile = UserProfile {
            user_id: 1,
            role: Role::Requestee,
            category: Some(Category::WaterLeakage),
            average_rating: Some(4.0),
            is_busy: true,
        };
        let missing_category = profile.normalize();

        assert!(!missing_category);
        assert_eq!(profile.category, None);
        assert_eq!(profile.average_rating, None);
        assert!(!profile.is_busy);
    }

    #[test]
    fn test_normalize_flags_worker_without_category() {
        let mut profile = UserProfile::new(2, Role::Worker, None);
        assert!(profile.normalize());

        let mut ok = UserProfile::new(3, Role::Worker, Some(Category::ElectricityIssue));
        assert!(!ok.normalize());
        assert_eq!(ok.category, Some(Category::ElectricityIssue));
    }

    #[test]
    fn test_rating_display() {
        let mut profile = UserProfile::new(4, Role::Worker, Some(Category::GarbageCollection));
        assert_eq!(profile.rating_display(), None);
        profile.average_rating = Some(4.5);
        assert_eq!(profile.rating_display().as_deref(), Some("4.50 / 5.00"));
    }
}
