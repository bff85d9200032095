pub mod answer;
pub mod assignment;
pub mod attempt;
pub mod ids;

pub use answer::{AnswerOption, AnswerPayload, AnswerState, PersistedAnswer};
pub use assignment::{Assignment, Difficulty, Question};
pub use attempt::{Attempt, AttemptStatus};
pub use ids::{AssignmentId, AttemptId, QuestionId};
