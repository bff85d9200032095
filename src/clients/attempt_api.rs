//! 作答服务接口
//!
//! 会话只通过这个 trait 访问远程服务，测试中可以换成内存实现

use crate::error::ApiError;
use crate::models::{AnswerPayload, Assignment, AssignmentId, Attempt, AttemptId, PersistedAnswer};
use async_trait::async_trait;

pub type ApiResult<T> = Result<T, ApiError>;

#[async_trait]
pub trait AttemptApi: Send + Sync {
    /// 读取作答
    async fn get_attempt_by_id(&self, attempt_id: AttemptId) -> ApiResult<Attempt>;

    /// 读取试卷（题干和选项）
    async fn get_assignment_by_id(&self, assignment_id: AssignmentId) -> ApiResult<Assignment>;

    /// 保存单题作答，请求体是该题的完整状态
    async fn submit_answer(&self, attempt_id: AttemptId, answer: &AnswerPayload) -> ApiResult<()>;

    /// 交卷
    async fn submit_attempt(&self, attempt_id: AttemptId) -> ApiResult<()>;

    /// 开始一次新的作答
    async fn start_attempt(&self, assignment_id: AssignmentId) -> ApiResult<Attempt>;

    /// 某试卷下的全部作答
    async fn get_attempts_by_assignment(&self, assignment_id: AssignmentId) -> ApiResult<Vec<Attempt>>;

    /// 某次作答已保存的答案
    async fn get_answers_by_attempt(&self, attempt_id: AttemptId) -> ApiResult<Vec<PersistedAnswer>>;
}
