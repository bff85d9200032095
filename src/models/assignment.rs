use crate::models::{AnswerOption, AssignmentId, QuestionId};
use serde::{Deserialize, Serialize};

/// 题目难度
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

/// 单选题
///
/// `correct_option` 随试卷一起下发，但作答过程中不能用于本地判分
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub id: QuestionId,
    pub text: String,
    pub option_a: String,
    pub option_b: String,
    pub option_c: String,
    pub option_d: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correct_option: Option<AnswerOption>,
    pub difficulty: Difficulty,
    pub points: u32,
}

impl Question {
    pub fn option_text(&self, option: AnswerOption) -> &str {
        match option {
            AnswerOption::A => &self.option_a,
            AnswerOption::B => &self.option_b,
            AnswerOption::C => &self.option_c,
            AnswerOption::D => &self.option_d,
        }
    }
}

/// 试卷（只读）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Assignment {
    pub id: AssignmentId,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// 时长（分钟）
    #[serde(default)]
    pub duration: u32,
    #[serde(default)]
    pub start_time: Option<String>,
    #[serde(default)]
    pub end_time: Option<String>,
    #[serde(default)]
    pub questions: Vec<Question>,
}

impl Assignment {
    pub fn question_index(&self, question_id: QuestionId) -> Option<usize> {
        self.questions.iter().position(|q| q.id == question_id)
    }

    pub fn total_points(&self) -> u32 {
        self.questions.iter().map(|q| q.points).sum()
    }
}
