//! 限时作答会话
//!
//! - `clock`: 剩余时间倒计时
//! - `ledger`: 本地作答记录
//! - `sync`: 按题目串行化的答案写入
//! - `guard`: 交卷闸门，保证最多提交一次
//! - `controller`: 组合以上部件的事件循环

pub mod clock;
pub mod controller;
pub mod guard;
pub mod host;
pub mod ledger;
pub mod sync;
pub mod view;

pub use clock::{format_remaining, ClockStart, ClockTick, RemainingClock};
pub use controller::{AttemptSession, SessionEntry, SessionOutcome};
pub use guard::{ClosingPhase, GuardDecision, GuardState, SubmissionGuard, SubmitTrigger};
pub use host::{results_route, SessionCommand, SessionHost};
pub use ledger::{AnswerLedger, QuestionStatus};
pub use sync::AnswerSync;
pub use view::SessionView;
