use crate::models::{AnswerState, AttemptId, Question};
use crate::session::ledger::QuestionStatus;

/// 交给宿主渲染的只读快照
#[derive(Debug, Clone)]
pub struct SessionView<'a> {
    pub attempt_id: AttemptId,
    pub assignment_name: &'a str,
    pub question: &'a Question,
    /// 当前题目下标，从 0 开始
    pub question_index: usize,
    pub question_count: usize,
    pub current_answer: AnswerState,
    /// 按题目顺序的答题卡
    pub palette: Vec<QuestionStatus>,
    pub answered_count: usize,
    pub unanswered_count: usize,
    pub review_count: usize,
    pub remaining_seconds: u64,
    pub remaining_display: String,
    pub time_low: bool,
    pub expired: bool,
    pub awaiting_confirmation: bool,
    pub submitting: bool,
    pub submit_error: Option<&'a str>,
}

impl SessionView<'_> {
    pub fn is_first(&self) -> bool {
        self.question_index == 0
    }

    pub fn is_last(&self) -> bool {
        self.question_index + 1 >= self.question_count
    }
}
