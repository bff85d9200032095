use crate::error::SessionError;
use crate::models::QuestionId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// 选项，线上格式为 1-4
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum AnswerOption {
    A = 1,
    B = 2,
    C = 3,
    D = 4,
}

impl AnswerOption {
    pub const ALL: [AnswerOption; 4] = [
        AnswerOption::A,
        AnswerOption::B,
        AnswerOption::C,
        AnswerOption::D,
    ];

    pub fn value(self) -> u8 {
        self as u8
    }

    pub fn label(self) -> char {
        match self {
            AnswerOption::A => 'A',
            AnswerOption::B => 'B',
            AnswerOption::C => 'C',
            AnswerOption::D => 'D',
        }
    }
}

impl TryFrom<u8> for AnswerOption {
    type Error = SessionError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(AnswerOption::A),
            2 => Ok(AnswerOption::B),
            3 => Ok(AnswerOption::C),
            4 => Ok(AnswerOption::D),
            other => Err(SessionError::InvalidOption(other)),
        }
    }
}

impl From<AnswerOption> for u8 {
    fn from(option: AnswerOption) -> Self {
        option.value()
    }
}

impl fmt::Display for AnswerOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// 服务端保存的作答记录
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedAnswer {
    pub question_id: QuestionId,
    #[serde(default)]
    pub selected_answer: Option<AnswerOption>,
    #[serde(default)]
    pub marked_for_review: bool,
}

/// 本地作答状态（未作答时 `selected_answer` 为 `None`）
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AnswerState {
    pub selected_answer: Option<AnswerOption>,
    pub marked_for_review: bool,
}

/// `submitAnswer` 请求体
///
/// 每次都携带该题的完整状态，而不是增量
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerPayload {
    pub question_id: QuestionId,
    pub selected_answer: Option<AnswerOption>,
    pub marked_for_review: bool,
}

impl AnswerPayload {
    pub fn snapshot(question_id: QuestionId, state: AnswerState) -> Self {
        Self {
            question_id,
            selected_answer: state.selected_answer,
            marked_for_review: state.marked_for_review,
        }
    }

    pub fn state(&self) -> AnswerState {
        AnswerState {
            selected_answer: self.selected_answer,
            marked_for_review: self.marked_for_review,
        }
    }
}

impl From<&PersistedAnswer> for AnswerState {
    fn from(answer: &PersistedAnswer) -> Self {
        AnswerState {
            selected_answer: answer.selected_answer,
            marked_for_review: answer.marked_for_review,
        }
    }
}
