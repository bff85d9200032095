//! 会话与宿主视图之间的边界
//!
//! 宿主通过 `SessionCommand` 驱动会话，会话通过 `SessionHost` 回调宿主。
//! 回调都在会话事件循环所在的任务里同步执行。

use crate::models::{AnswerOption, AttemptId, QuestionId};
use crate::session::view::SessionView;

/// 宿主发给会话的指令
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionCommand {
    SelectOption {
        question_id: QuestionId,
        option: AnswerOption,
    },
    ToggleReview {
        question_id: QuestionId,
    },
    Navigate(usize),
    /// 手动交卷
    Submit,
    /// 答复交卷确认
    ConfirmSubmit(bool),
    /// 离开会话
    Teardown,
}

pub trait SessionHost: Send {
    /// 会话状态变化后调用
    fn render(&mut self, view: &SessionView<'_>);

    fn show_loading(&mut self) {}

    /// 加载失败，会话不会开始
    fn show_load_error(&mut self, message: &str);

    /// 请求用户确认交卷，答复以 `SessionCommand::ConfirmSubmit` 送回
    fn request_confirmation(&mut self);

    /// 时间到，即将自动交卷（每次会话最多一次）
    fn notify_time_expired(&mut self);

    fn notify_submit_failed(&mut self, reason: &str);

    /// 跳转到成绩页
    fn show_results(&mut self, attempt_id: AttemptId);
}

/// 成绩页路由
pub fn results_route(attempt_id: AttemptId) -> String {
    format!("/results/{}", attempt_id)
}
