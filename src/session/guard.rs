//! 交卷闸门
//!
//! 状态机 `Open -> Closing -> Closed`。手动交卷和到时自动交卷两个入口都经过这里，
//! 检查和关闭在同一次调用内完成，先到者获胜，后到者只会得到 `Rejected`。

/// 交卷来源
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitTrigger {
    /// 用户点击交卷
    Manual,
    /// 倒计时到期
    Automatic,
}

/// 关闭中的阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClosingPhase {
    /// 等待用户确认
    AwaitingConfirmation,
    /// 已确定交卷，正在等待答案写完或交卷请求返回
    Proceeding(SubmitTrigger),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardState {
    Open,
    Closing(ClosingPhase),
    Closed,
}

/// 闸门给出的决定
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardDecision {
    /// 无需任何动作
    Rejected,
    /// 需要向用户确认
    AwaitConfirmation,
    /// 继续交卷
    Proceed(SubmitTrigger),
}

#[derive(Debug, Clone)]
pub struct SubmissionGuard {
    state: GuardState,
}

impl SubmissionGuard {
    pub fn new() -> Self {
        Self {
            state: GuardState::Open,
        }
    }

    pub fn state(&self) -> GuardState {
        self.state
    }

    pub fn is_open(&self) -> bool {
        self.state == GuardState::Open
    }

    pub fn is_proceeding(&self) -> bool {
        matches!(self.state, GuardState::Closing(ClosingPhase::Proceeding(_)))
    }

    /// 正在交卷时返回交卷来源
    pub fn proceeding_trigger(&self) -> Option<SubmitTrigger> {
        match self.state {
            GuardState::Closing(ClosingPhase::Proceeding(trigger)) => Some(trigger),
            _ => None,
        }
    }

    pub fn is_awaiting_confirmation(&self) -> bool {
        self.state == GuardState::Closing(ClosingPhase::AwaitingConfirmation)
    }

    /// 请求交卷
    ///
    /// 到时交卷可以打断尚未答复的手动确认
    pub fn request(&mut self, trigger: SubmitTrigger) -> GuardDecision {
        match (self.state, trigger) {
            (GuardState::Open, SubmitTrigger::Manual) => {
                self.state = GuardState::Closing(ClosingPhase::AwaitingConfirmation);
                GuardDecision::AwaitConfirmation
            }
            (GuardState::Open, SubmitTrigger::Automatic)
            | (
                GuardState::Closing(ClosingPhase::AwaitingConfirmation),
                SubmitTrigger::Automatic,
            ) => self.proceed(SubmitTrigger::Automatic),
            _ => GuardDecision::Rejected,
        }
    }

    /// 用户答复确认框；拒绝后闸门重新打开
    pub fn confirm(&mut self, accepted: bool) -> GuardDecision {
        if !self.is_awaiting_confirmation() {
            return GuardDecision::Rejected;
        }
        if accepted {
            self.proceed(SubmitTrigger::Manual)
        } else {
            self.state = GuardState::Open;
            GuardDecision::Rejected
        }
    }

    /// 交卷请求失败，重新打开以便手动重试
    pub fn reopen(&mut self) {
        if self.is_proceeding() {
            self.state = GuardState::Open;
        }
    }

    /// 交卷成功，永久关闭
    pub fn finish(&mut self) {
        self.state = GuardState::Closed;
    }

    fn proceed(&mut self, trigger: SubmitTrigger) -> GuardDecision {
        self.state = GuardState::Closing(ClosingPhase::Proceeding(trigger));
        GuardDecision::Proceed(trigger)
    }
}

impl Default for SubmissionGuard {
    fn default() -> Self {
        Self::new()
    }
}
