use crate::models::{AssignmentId, AttemptId, PersistedAnswer};
use serde::{Deserialize, Serialize};

/// 作答状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AttemptStatus {
    InProgress,
    Submitted,
    AutoSubmitted,
}

impl AttemptStatus {
    /// 是否已经结束（结束后不可再修改）
    pub fn is_terminal(self) -> bool {
        !matches!(self, AttemptStatus::InProgress)
    }
}

/// 一次限时作答
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attempt {
    pub id: AttemptId,
    pub assignment_id: AssignmentId,
    pub status: AttemptStatus,
    /// 加载时服务端给出的剩余秒数
    #[serde(default)]
    pub remaining_time_seconds: u64,
    #[serde(default)]
    pub answers: Vec<PersistedAnswer>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_points: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submitted_at: Option<String>,
}
