//! 限时作答会话 - 流程层
//!
//! 核心职责：把倒计时、本地作答记录和交卷闸门组合成一个状态机
//!
//! 运行方式：
//! 1. `open()` 加载作答和试卷；作答已结束时直接跳转成绩页
//! 2. `run()` 在单个任务里循环处理三类事件：宿主指令、倒计时 tick、后台网络请求结果
//! 3. 交卷成功、收到 `Teardown` 或指令通道关闭时退出循环；
//!    退出即丢弃定时器和 `JoinSet`，未完成的请求随之取消

use crate::clients::AttemptApi;
use crate::config::Config;
use crate::error::{ApiError, AppError, AppResult, SessionError};
use crate::models::{
    AnswerOption, AnswerPayload, AnswerState, Assignment, Attempt, AttemptId, AttemptStatus,
    QuestionId,
};
use crate::session::clock::{ClockStart, ClockTick, RemainingClock};
use crate::session::guard::{GuardDecision, GuardState, SubmissionGuard, SubmitTrigger};
use crate::session::host::{results_route, SessionCommand, SessionHost};
use crate::session::ledger::AnswerLedger;
use crate::session::sync::AnswerSync;
use crate::session::view::SessionView;
use futures::FutureExt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinSet};
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

/// `open()` 的结果
pub enum SessionEntry<H: SessionHost> {
    /// 作答进行中，可以开始
    Ready(AttemptSession<H>),
    /// 作答已结束，已跳转成绩页
    Finished {
        attempt_id: AttemptId,
        status: AttemptStatus,
    },
}

/// 会话结束方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOutcome {
    Submitted {
        attempt_id: AttemptId,
        trigger: SubmitTrigger,
    },
    Abandoned {
        attempt_id: AttemptId,
    },
}

/// 后台请求的结果，回到事件循环里处理
enum TaskOutput {
    AnswerSaved {
        payload: AnswerPayload,
        result: Result<(), ApiError>,
    },
    AttemptSubmitted(Result<(), ApiError>),
}

/// 会话状态（不含宿主和后台任务）
struct SessionState {
    attempt_id: AttemptId,
    assignment: Assignment,
    clock: RemainingClock,
    ledger: AnswerLedger,
    sync: AnswerSync,
    guard: SubmissionGuard,
    cursor: usize,
    submit_in_flight: bool,
    submit_error: Option<String>,
    low_time_threshold: u64,
}

impl SessionState {
    fn view(&self) -> SessionView<'_> {
        let questions = &self.assignment.questions;
        let question_count = questions.len();
        let answered_count = self.ledger.answered_count();
        let remaining = self.clock.remaining();

        SessionView {
            attempt_id: self.attempt_id,
            assignment_name: &self.assignment.name,
            question: &questions[self.cursor],
            question_index: self.cursor,
            question_count,
            current_answer: self.ledger.state_of(questions[self.cursor].id),
            palette: questions
                .iter()
                .map(|q| self.ledger.status_of(q.id))
                .collect(),
            answered_count,
            unanswered_count: question_count.saturating_sub(answered_count),
            review_count: self.ledger.review_count(),
            remaining_seconds: remaining,
            remaining_display: self.clock.display(),
            time_low: remaining < self.low_time_threshold,
            expired: self.clock.is_expired(),
            awaiting_confirmation: self.guard.is_awaiting_confirmation(),
            submitting: self.guard.is_proceeding(),
            submit_error: self.submit_error.as_deref(),
        }
    }

    fn ensure_known(&self, question_id: QuestionId) -> Result<(), SessionError> {
        match self.assignment.question_index(question_id) {
            Some(_) => Ok(()),
            None => Err(SessionError::UnknownQuestion(question_id)),
        }
    }

    fn ensure_unlocked(&self) -> Result<(), SessionError> {
        if self.guard.is_open() {
            Ok(())
        } else {
            Err(SessionError::AnswersLocked)
        }
    }
}

/// 限时作答会话
///
/// 一个实例只对应一个作答，由宿主独占
pub struct AttemptSession<H: SessionHost> {
    api: Arc<dyn AttemptApi>,
    host: H,
    state: SessionState,
    tasks: JoinSet<TaskOutput>,
    tick_interval: Duration,
    outcome: Option<SessionOutcome>,
}

impl<H: SessionHost> AttemptSession<H> {
    /// 加载作答并准备会话
    ///
    /// 加载失败时宿主会收到 `show_load_error`，会话不会开始，也不会重试
    pub async fn open(
        api: Arc<dyn AttemptApi>,
        mut host: H,
        attempt_id: AttemptId,
        config: &Config,
    ) -> AppResult<SessionEntry<H>> {
        host.show_loading();
        info!("[作答 {}] 正在加载...", attempt_id);

        let (attempt, assignment) = match load(api.as_ref(), attempt_id).await {
            Ok(Loaded::Active(attempt, assignment)) => (attempt, assignment),
            Ok(Loaded::Finished(status)) => {
                info!(
                    "[作答 {}] 作答已结束 ({:?})，跳转 {}",
                    attempt_id,
                    status,
                    results_route(attempt_id)
                );
                host.show_results(attempt_id);
                return Ok(SessionEntry::Finished { attempt_id, status });
            }
            Err(e) => {
                error!("[作答 {}] ❌ 加载失败: {}", attempt_id, e);
                host.show_load_error(&e.to_string());
                return Err(e);
            }
        };

        let ledger = hydrate_ledger(&attempt, &assignment);
        info!(
            "[作答 {}] ✓ 加载完成: {} | {} 道题 | 满分 {} | 已答 {} | 剩余 {} 秒",
            attempt_id,
            assignment.name,
            assignment.questions.len(),
            assignment.total_points(),
            ledger.answered_count(),
            attempt.remaining_time_seconds
        );

        Ok(SessionEntry::Ready(Self {
            api,
            host,
            state: SessionState {
                attempt_id,
                assignment,
                clock: RemainingClock::new(attempt.remaining_time_seconds),
                ledger,
                sync: AnswerSync::new(),
                guard: SubmissionGuard::new(),
                cursor: 0,
                submit_in_flight: false,
                submit_error: None,
                low_time_threshold: config.low_time_threshold_secs,
            },
            tasks: JoinSet::new(),
            tick_interval: config.tick_interval(),
            outcome: None,
        }))
    }

    /// 运行事件循环直到交卷成功或离开
    pub async fn run(mut self, mut commands: mpsc::UnboundedReceiver<SessionCommand>) -> SessionOutcome {
        let period = self.tick_interval;
        let mut ticker = time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        self.start_clock();
        self.render();

        loop {
            if let Some(outcome) = self.outcome.take() {
                self.teardown();
                return outcome;
            }

            tokio::select! {
                command = commands.recv() => match command {
                    Some(SessionCommand::Teardown) | None => {
                        self.teardown();
                        return SessionOutcome::Abandoned {
                            attempt_id: self.state.attempt_id,
                        };
                    }
                    Some(command) => self.handle_command(command),
                },
                _ = ticker.tick(), if self.state.clock.is_running() => self.on_tick(),
                Some(joined) = self.tasks.join_next() => self.on_task_finished(joined),
            }

            // 已跳转成绩页后不再渲染题目
            if self.outcome.is_none() {
                self.render();
            }
        }
    }

    // ========== 对宿主开放的操作 ==========

    /// 选择选项：本地立即生效，随后异步保存
    pub fn select_option(
        &mut self,
        question_id: QuestionId,
        option: AnswerOption,
    ) -> Result<AnswerState, SessionError> {
        self.state.ensure_known(question_id)?;
        self.state.ensure_unlocked()?;
        let answer = self.state.ledger.select(question_id, option);
        self.persist(AnswerPayload::snapshot(question_id, answer));
        Ok(answer)
    }

    /// 切换标记复查：本地立即生效，随后异步保存
    pub fn toggle_review(&mut self, question_id: QuestionId) -> Result<AnswerState, SessionError> {
        self.state.ensure_known(question_id)?;
        self.state.ensure_unlocked()?;
        let answer = self.state.ledger.toggle_review(question_id);
        self.persist(AnswerPayload::snapshot(question_id, answer));
        Ok(answer)
    }

    /// 跳转题目，超出范围时取边界
    pub fn navigate(&mut self, index: usize) -> usize {
        let last = self.state.assignment.questions.len().saturating_sub(1);
        self.state.cursor = index.min(last);
        self.state.cursor
    }

    /// 交卷，手动和自动两个入口都经过闸门
    pub fn submit(&mut self, trigger: SubmitTrigger) {
        match self.state.guard.request(trigger) {
            GuardDecision::Rejected => {
                debug!(
                    "[作答 {}] 交卷已在进行，忽略重复请求 ({:?})",
                    self.state.attempt_id, trigger
                );
            }
            GuardDecision::AwaitConfirmation => self.host.request_confirmation(),
            GuardDecision::Proceed(trigger) => self.proceed(trigger),
        }
    }

    /// 处理交卷确认的答复
    pub fn confirm_submit(&mut self, accepted: bool) {
        match self.state.guard.confirm(accepted) {
            GuardDecision::Proceed(trigger) => self.proceed(trigger),
            _ if !accepted => info!("[作答 {}] 用户取消交卷", self.state.attempt_id),
            _ => debug!("[作答 {}] 没有待确认的交卷", self.state.attempt_id),
        }
    }

    // ========== 只读访问 ==========

    pub fn attempt_id(&self) -> AttemptId {
        self.state.attempt_id
    }

    pub fn assignment(&self) -> &Assignment {
        &self.state.assignment
    }

    pub fn ledger(&self) -> &AnswerLedger {
        &self.state.ledger
    }

    pub fn cursor(&self) -> usize {
        self.state.cursor
    }

    pub fn remaining_seconds(&self) -> u64 {
        self.state.clock.remaining()
    }

    pub fn guard_state(&self) -> GuardState {
        self.state.guard.state()
    }

    pub fn view(&self) -> SessionView<'_> {
        self.state.view()
    }

    // ========== 事件处理 ==========

    fn handle_command(&mut self, command: SessionCommand) {
        let result = match command {
            SessionCommand::SelectOption {
                question_id,
                option,
            } => self.select_option(question_id, option).map(|_| ()),
            SessionCommand::ToggleReview { question_id } => {
                self.toggle_review(question_id).map(|_| ())
            }
            SessionCommand::Navigate(index) => {
                self.navigate(index);
                Ok(())
            }
            SessionCommand::Submit => {
                self.submit(SubmitTrigger::Manual);
                Ok(())
            }
            SessionCommand::ConfirmSubmit(accepted) => {
                self.confirm_submit(accepted);
                Ok(())
            }
            // 在事件循环中处理
            SessionCommand::Teardown => Ok(()),
        };

        if let Err(e) = result {
            debug!("[作答 {}] 忽略指令 {:?}: {}", self.state.attempt_id, command, e);
        }
    }

    fn start_clock(&mut self) {
        match self.state.clock.start() {
            ClockStart::Started => debug!(
                "[作答 {}] ⏱ 开始计时，剩余 {}",
                self.state.attempt_id,
                self.state.clock.display()
            ),
            ClockStart::ExpiredImmediately => {
                warn!("[作答 {}] ⏰ 剩余时间为 0，立即交卷", self.state.attempt_id);
                self.submit(SubmitTrigger::Automatic);
            }
            ClockStart::AlreadyRunning | ClockStart::Latched => {}
        }
    }

    fn on_tick(&mut self) {
        match self.state.clock.tick() {
            ClockTick::Decremented(_) => {}
            ClockTick::Expired => {
                warn!("[作答 {}] ⏰ 时间到，自动交卷", self.state.attempt_id);
                self.submit(SubmitTrigger::Automatic);
            }
            ClockTick::Idle => debug!("[作答 {}] 忽略停止后的 tick", self.state.attempt_id),
        }
    }

    fn on_task_finished(&mut self, joined: Result<TaskOutput, JoinError>) {
        match joined {
            Ok(TaskOutput::AnswerSaved { payload, result }) => self.on_answer_saved(payload, result),
            Ok(TaskOutput::AttemptSubmitted(result)) => self.on_attempt_submitted(result),
            Err(e) if e.is_cancelled() => debug!("后台任务已取消"),
            Err(e) => error!("后台任务异常结束: {}", e),
        }
    }

    fn on_answer_saved(&mut self, payload: AnswerPayload, result: Result<(), ApiError>) {
        let attempt_id = self.state.attempt_id;
        match result {
            Ok(()) => debug!("[作答 {}] ✓ 题目 {} 已保存", attempt_id, payload.question_id),
            // 不提示用户也不重试；本地记录仍然有效，下一次写入会带上完整状态
            Err(e) => warn!(
                "[作答 {}] ⚠️ 题目 {} 保存失败: {}",
                attempt_id, payload.question_id, e
            ),
        }

        if let Some(next) = self.state.sync.complete(payload.question_id) {
            self.spawn_answer_write(next);
        }
        self.issue_submit_if_ready();
    }

    fn on_attempt_submitted(&mut self, result: Result<(), ApiError>) {
        self.state.submit_in_flight = false;
        let attempt_id = self.state.attempt_id;

        match result {
            Ok(()) => {
                let trigger = self
                    .state
                    .guard
                    .proceeding_trigger()
                    .unwrap_or(SubmitTrigger::Manual);
                self.state.guard.finish();
                self.state.clock.stop();
                info!("[作答 {}] ✅ 交卷成功 ({:?})", attempt_id, trigger);
                self.host.show_results(attempt_id);
                self.outcome = Some(SessionOutcome::Submitted {
                    attempt_id,
                    trigger,
                });
            }
            Err(e) => {
                // 闸门重新打开，由用户手动重试；到时交卷不会自动重试
                self.state.guard.reopen();
                let reason = e.user_message("交卷失败，请重试");
                error!("[作答 {}] ❌ 交卷失败: {}", attempt_id, e);
                self.host.notify_submit_failed(&reason);
                self.state.submit_error = Some(reason);
            }
        }
    }

    // ========== 内部辅助 ==========

    fn proceed(&mut self, trigger: SubmitTrigger) {
        if trigger == SubmitTrigger::Automatic {
            self.host.notify_time_expired();
        }
        self.state.submit_error = None;
        info!("[作答 {}] 📋 开始交卷 ({:?})", self.state.attempt_id, trigger);
        self.issue_submit_if_ready();
    }

    /// 交卷前等待在途的答案写入全部结束
    fn issue_submit_if_ready(&mut self) {
        if !self.state.guard.is_proceeding() || self.state.submit_in_flight {
            return;
        }
        if !self.state.sync.is_idle() {
            debug!(
                "[作答 {}] 等待 {} 道题的答案保存完成后交卷",
                self.state.attempt_id,
                self.state.sync.in_flight_count()
            );
            return;
        }

        self.state.submit_in_flight = true;
        let api = Arc::clone(&self.api);
        let attempt_id = self.state.attempt_id;
        info!("[作答 {}] 📤 正在提交...", attempt_id);
        self.tasks.spawn(async move {
            let result = catch_panic("submit_attempt", api.submit_attempt(attempt_id)).await;
            TaskOutput::AttemptSubmitted(result)
        });
    }

    fn persist(&mut self, payload: AnswerPayload) {
        if let Some(payload) = self.state.sync.enqueue(payload) {
            self.spawn_answer_write(payload);
        } else {
            debug!(
                "[作答 {}] 题目 {} 有写入在途，合并为待发快照",
                self.state.attempt_id, payload.question_id
            );
        }
    }

    fn spawn_answer_write(&mut self, payload: AnswerPayload) {
        let api = Arc::clone(&self.api);
        let attempt_id = self.state.attempt_id;
        self.tasks.spawn(async move {
            let result = catch_panic("submit_answer", api.submit_answer(attempt_id, &payload)).await;
            TaskOutput::AnswerSaved { payload, result }
        });
    }

    fn render(&mut self) {
        let view = self.state.view();
        self.host.render(&view);
    }

    fn teardown(&mut self) {
        self.state.clock.stop();
        if !self.tasks.is_empty() {
            debug!(
                "[作答 {}] 离开会话，取消 {} 个未完成的请求",
                self.state.attempt_id,
                self.tasks.len()
            );
        }
        self.tasks.abort_all();
    }
}

enum Loaded {
    Active(Attempt, Assignment),
    Finished(AttemptStatus),
}

async fn load(api: &dyn AttemptApi, attempt_id: AttemptId) -> AppResult<Loaded> {
    let attempt = api
        .get_attempt_by_id(attempt_id)
        .await
        .map_err(|e| AppError::load_failed(attempt_id, e))?;

    if attempt.status.is_terminal() {
        return Ok(Loaded::Finished(attempt.status));
    }

    let assignment = api
        .get_assignment_by_id(attempt.assignment_id)
        .await
        .map_err(|e| AppError::load_failed(attempt_id, e))?;

    if assignment.questions.is_empty() {
        return Err(SessionError::EmptyAssignment {
            assignment_id: assignment.id,
        }
        .into());
    }

    Ok(Loaded::Active(attempt, assignment))
}

/// 只保留属于本试卷的已保存答案
fn hydrate_ledger(attempt: &Attempt, assignment: &Assignment) -> AnswerLedger {
    let (known, unknown): (Vec<_>, Vec<_>) = attempt
        .answers
        .iter()
        .partition(|answer| assignment.question_index(answer.question_id).is_some());

    if !unknown.is_empty() {
        warn!(
            "[作答 {}] ⚠️ 忽略 {} 条不属于试卷 {} 的答案",
            attempt.id,
            unknown.len(),
            assignment.id
        );
    }

    AnswerLedger::from_persisted(known)
}

/// 请求中途 panic 时按网络错误处理，保证写入队列和闸门能继续推进
async fn catch_panic<F>(endpoint: &'static str, call: F) -> Result<(), ApiError>
where
    F: Future<Output = Result<(), ApiError>>,
{
    AssertUnwindSafe(call).catch_unwind().await.unwrap_or_else(|_| {
        Err(ApiError::network(
            endpoint,
            std::io::Error::new(std::io::ErrorKind::Other, "请求任务异常终止"),
        ))
    })
}
