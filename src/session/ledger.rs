//! 本地作答记录
//!
//! 用户操作先同步改这里，再异步写到服务端；提交前以本地为准

use crate::models::{AnswerOption, AnswerState, PersistedAnswer, QuestionId};
use std::collections::HashMap;

/// 答题卡上每道题的状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuestionStatus {
    Answered,
    Review,
    Unanswered,
}

impl QuestionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            QuestionStatus::Answered => "answered",
            QuestionStatus::Review => "review",
            QuestionStatus::Unanswered => "unanswered",
        }
    }
}

/// 每道题最多一条记录，首次操作时创建
#[derive(Debug, Clone, Default)]
pub struct AnswerLedger {
    entries: HashMap<QuestionId, AnswerState>,
}

impl AnswerLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// 用服务端已保存的答案初始化；同一题出现多次时以最后一条为准
    pub fn from_persisted<'a>(answers: impl IntoIterator<Item = &'a PersistedAnswer>) -> Self {
        let entries = answers
            .into_iter()
            .map(|answer| (answer.question_id, AnswerState::from(answer)))
            .collect();
        Self { entries }
    }

    pub fn get(&self, question_id: QuestionId) -> Option<&AnswerState> {
        self.entries.get(&question_id)
    }

    /// 未操作过的题目返回默认状态
    pub fn state_of(&self, question_id: QuestionId) -> AnswerState {
        self.get(question_id).copied().unwrap_or_default()
    }

    /// 选择选项，返回该题的新状态
    pub fn select(&mut self, question_id: QuestionId, option: AnswerOption) -> AnswerState {
        let entry = self.entries.entry(question_id).or_default();
        entry.selected_answer = Some(option);
        *entry
    }

    /// 切换"标记复查"，返回该题的新状态
    pub fn toggle_review(&mut self, question_id: QuestionId) -> AnswerState {
        let entry = self.entries.entry(question_id).or_default();
        entry.marked_for_review = !entry.marked_for_review;
        *entry
    }

    pub fn answered_count(&self) -> usize {
        self.entries
            .values()
            .filter(|a| a.selected_answer.is_some())
            .count()
    }

    pub fn review_count(&self) -> usize {
        self.entries.values().filter(|a| a.marked_for_review).count()
    }

    /// 标记复查优先于已作答
    pub fn status_of(&self, question_id: QuestionId) -> QuestionStatus {
        match self.get(question_id) {
            Some(answer) if answer.marked_for_review => QuestionStatus::Review,
            Some(answer) if answer.selected_answer.is_some() => QuestionStatus::Answered,
            _ => QuestionStatus::Unanswered,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
