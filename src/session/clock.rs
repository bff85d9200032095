//! 剩余时间倒计时
//!
//! 只维护状态，不持有定时器；由会话事件循环每个周期调用一次 `tick()`

/// `start()` 的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockStart {
    /// 开始计时
    Started,
    /// 剩余时间为 0，立即到期
    ExpiredImmediately,
    /// 已经在计时，不会重复启动
    AlreadyRunning,
    /// 已经到期或被停止过，不再启动
    Latched,
}

/// 一次 tick 的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockTick {
    /// 减 1 秒，返回剩余秒数
    Decremented(u64),
    /// 最后一秒，剩余时间归零并到期
    Expired,
    /// 未在计时（停止后残留的 tick）
    Idle,
}

/// 剩余时间
#[derive(Debug, Clone)]
pub struct RemainingClock {
    remaining: u64,
    running: bool,
    expired: bool,
    stopped: bool,
}

impl RemainingClock {
    pub fn new(remaining_seconds: u64) -> Self {
        Self {
            remaining: remaining_seconds,
            running: false,
            expired: false,
            stopped: false,
        }
    }

    /// 启动倒计时，整个生命周期内只会成功一次
    pub fn start(&mut self) -> ClockStart {
        if self.expired || self.stopped {
            return ClockStart::Latched;
        }
        if self.running {
            return ClockStart::AlreadyRunning;
        }
        if self.remaining == 0 {
            self.expired = true;
            return ClockStart::ExpiredImmediately;
        }
        self.running = true;
        ClockStart::Started
    }

    pub fn tick(&mut self) -> ClockTick {
        if !self.running {
            return ClockTick::Idle;
        }
        if self.remaining <= 1 {
            // 到期是单向的，之后不再恢复
            self.expired = true;
            self.running = false;
            self.remaining = 0;
            return ClockTick::Expired;
        }
        self.remaining -= 1;
        ClockTick::Decremented(self.remaining)
    }

    /// 永久停止（交卷或离开会话）
    pub fn stop(&mut self) {
        self.running = false;
        self.stopped = true;
    }

    pub fn remaining(&self) -> u64 {
        self.remaining
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn is_expired(&self) -> bool {
        self.expired
    }

    pub fn display(&self) -> String {
        format_remaining(self.remaining)
    }
}

/// 格式化剩余时间：不足一小时为 `M:SS`，否则为 `H:MM:SS`
pub fn format_remaining(seconds: u64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;

    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, secs)
    } else {
        format!("{}:{:02}", minutes, secs)
    }
}
