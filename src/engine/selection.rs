// ==========================================
// 校园服务工单系统 - 维修工选择策略
// ==========================================
// 职责: 决定候选维修工的尝试顺序
// 输入: 空闲且类别匹配的候选列表 (按 user_id 升序)
// 输出: 尝试顺序 (首位写入失败时依次尝试后续)
// ==========================================

use crate::repository::user_repo::WorkerCandidate;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkerSelection {
    /// 随机
    #[default]
    Random,
    /// user_id 最小者优先
    FirstFree,
    /// 最近一次派单最早者优先, 从未派单者最先
    LongestIdle,
}

impl WorkerSelection {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "RANDOM" => Some(WorkerSelection::Random),
            "FIRST_FREE" => Some(WorkerSelection::FirstFree),
            "LONGEST_IDLE" => Some(WorkerSelection::LongestIdle),
            _ => None,
        }
    }

    pub fn to_db_str(&self) -> &'static str {
        match self {
            WorkerSelection::Random => "RANDOM",
            WorkerSelection::FirstFree => "FIRST_FREE",
            WorkerSelection::LongestIdle => "LONGEST_IDLE",
        }
    }

    /// 按策略排列候选
    pub fn order(&self, mut candidates: Vec<WorkerCandidate>) -> Vec<WorkerCandidate> {
        match self {
            WorkerSelection::Random => {
                candidates.shuffle(&mut rand::thread_rng());
            }
            WorkerSelection::FirstFree => {
                candidates.sort_by_key(|c| c.user_id);
            }
            WorkerSelection::LongestIdle => {
                // None < Some(_), 从未派单者排在最前
                candidates.sort_by(|a, b| {
                    a.last_assigned_at
                        .cmp(&b.last_assigned_at)
                        .then(a.user_id.cmp(&b.user_id))
                });
            }
        }
        candidates
    }
}

impl fmt::Display for WorkerSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_db_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDateTime;

    fn candidate(user_id: i64, last: Option<&str>) -> WorkerCandidate {
        WorkerCandidate {
            user_id,
            username: format!("w{}", user_id),
            last_assigned_at: last
                .map(|s| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").unwrap()),
        }
    }

    #[test]
    fn test_parse() {
        assert_eq!(WorkerSelection::parse("first_free"), Some(WorkerSelection::FirstFree));
        assert_eq!(WorkerSelection::parse(" LONGEST_IDLE "), Some(WorkerSelection::LongestIdle));
        assert_eq!(WorkerSelection::parse("round_robin"), None);
        assert_eq!(WorkerSelection::default(), WorkerSelection::Random);
    }

    #[test]
    fn test_first_free_orders_by_id() {
        let ordered = WorkerSelection::FirstFree.order(vec![candidate(9, None), candidate(3, None)]);
        assert_eq!(ordered.iter().map(|c| c.user_id).collect::<Vec<_>>(), vec![3, 9]);
    }

    #[test]
    fn test_longest_idle_prefers_never_assigned() {
        let ordered = WorkerSelection::LongestIdle.order(vec![
            candidate(1, Some("2026-05-02 10:00:00")),
            candidate(2, Some("2026-05-01 10:00:00")),
            candidate(3, None),
        ]);
        assert_eq!(ordered.iter().map(|c| c.user_id).collect::<Vec<_>>(), vec![3, 2, 1]);
    }

    #[test]
    fn test_random_keeps_all_candidates() {
        let mut ordered = WorkerSelection::Random.order((1..=5).map(|i| candidate(i, None)).collect());
        ordered.sort_by_key(|c| c.user_id);
        assert_eq!(ordered.len(), 5);
        assert_eq!(ordered[4].user_id, 5);
    }
}
