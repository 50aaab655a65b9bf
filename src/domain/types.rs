// ==========================================
// 校园服务工单系统 - 领域类型定义
// ==========================================
// 职责: 角色 / 服务类别 / 工单状态 / 评分等级
// 存储格式: 与数据库、前端展示一致的英文标签
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 用户角色 (Role)
// ==========================================
// 管理员不是角色, 由账号上的 is_staff 标记决定
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    Requestee, // 报修人
    Worker,    // 维修工
}

impl Role {
    pub const ALL: [Role; 2] = [Role::Requestee, Role::Worker];

    /// 从字符串解析角色（大小写不敏感）
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "requestee" => Some(Role::Requestee),
            "worker" => Some(Role::Worker),
            _ => None,
        }
    }

    /// 转换为数据库存储的字符串
    pub fn to_db_str(&self) -> &'static str {
        match self {
            Role::Requestee => "Requestee",
            Role::Worker => "Worker",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_db_str())
    }
}

// ==========================================
// 服务类别 (Category)
// ==========================================
// 维修工只接单自己类别的工单
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Category {
    GarbageCollection, // 垃圾清运
    WaterLeakage,      // 漏水
    WashroomCleaning,  // 卫生间保洁
    ElectricityIssue,  // 电力故障
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::GarbageCollection,
        Category::WaterLeakage,
        Category::WashroomCleaning,
        Category::ElectricityIssue,
    ];

    /// 从字符串解析类别
    ///
    /// 同时接受展示标签 ("Water Leakage") 与短名 ("water-leakage" / "leakage")
    pub fn parse(s: &str) -> Option<Self> {
        let normalized: String = s
            .trim()
            .to_lowercase()
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect();

        match normalized.as_str() {
            "garbagecollection" | "garbage" => Some(Category::GarbageCollection),
            "waterleakage" | "leakage" => Some(Category::WaterLeakage),
            "washroomcleaning" | "cleaning" => Some(Category::WashroomCleaning),
            "electricityissue" | "electrical" | "electricity" => Some(Category::ElectricityIssue),
            _ => None,
        }
    }

    /// 转换为数据库存储的字符串
    pub fn to_db_str(&self) -> &'static str {
        match self {
            Category::GarbageCollection => "Garbage Collection",
            Category::WaterLeakage => "Water Leakage",
            Category::WashroomCleaning => "Washroom Cleaning",
            Category::ElectricityIssue => "Electricity Issue",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_db_str())
    }
}

// ==========================================
// 工单状态 (Request Status)
// ==========================================
// 生命周期: Pending → Assigned → Pending Approval → Completed
// 驳回: Pending Approval → Pending (重新进入派单队列)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RequestStatus {
    Pending,         // 待派单
    Assigned,        // 已派单
    PendingApproval, // 待报修人确认
    Completed,       // 已完成
}

impl RequestStatus {
    pub const ALL: [RequestStatus; 4] = [
        RequestStatus::Pending,
        RequestStatus::Assigned,
        RequestStatus::PendingApproval,
        RequestStatus::Completed,
    ];

    /// 从字符串解析状态
    pub fn parse(s: &str) -> Option<Self> {
        let normalized: String = s
            .trim()
            .to_lowercase()
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect();

        match normalized.as_str() {
            "pending" => Some(RequestStatus::Pending),
            "assigned" => Some(RequestStatus::Assigned),
            "pendingapproval" => Some(RequestStatus::PendingApproval),
            "completed" => Some(RequestStatus::Completed),
            _ => None,
        }
    }

    /// 转换为数据库存储的字符串
    pub fn to_db_str(&self) -> &'static str {
        match self {
            RequestStatus::Pending => "Pending",
            RequestStatus::Assigned => "Assigned",
            RequestStatus::PendingApproval => "Pending Approval",
            RequestStatus::Completed => "Completed",
        }
    }

    /// 判断状态转换是否合法
    pub fn can_transition_to(&self, next: RequestStatus) -> bool {
        matches!(
            (self, next),
            (RequestStatus::Pending, RequestStatus::Assigned)
                | (RequestStatus::Assigned, RequestStatus::PendingApproval)
                | (RequestStatus::PendingApproval, RequestStatus::Completed)
                | (RequestStatus::PendingApproval, RequestStatus::Pending)
        )
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_db_str())
    }
}

// ==========================================
// 评分 (Rating)
// ==========================================
// 取值范围 1..=5, 由报修人在确认/驳回时给出
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Rating(u8);

impl Rating {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 5;

    pub fn new(value: u8) -> Option<Self> {
        if (Self::MIN..=Self::MAX).contains(&value) {
            Some(Self(value))
        } else {
            None
        }
    }

    pub fn value(&self) -> u8 {
        self.0
    }

    /// 评分展示标签
    pub fn label(&self) -> &'static str {
        match self.0 {
            1 => "1 - Poor",
            2 => "2 - Fair",
            3 => "3 - Good",
            4 => "4 - Very Good",
            _ => "5 - Excellent",
        }
    }
}

impl TryFrom<u8> for Rating {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Rating::new(value).ok_or_else(|| format!("rating must be 1-5, got {}", value))
    }
}

impl From<Rating> for u8 {
    fn from(r: Rating) -> Self {
        r.0
    }
}

impl fmt::Display for Rating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
