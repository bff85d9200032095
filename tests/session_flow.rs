use async_trait::async_trait;
use quiz_session::clients::{ApiResult, AttemptApi};
use quiz_session::error::{ApiError, AppError, SessionError};
use quiz_session::models::{
    AnswerOption, AnswerPayload, AnswerState, Assignment, AssignmentId, Attempt, AttemptId,
    AttemptStatus, Difficulty, PersistedAnswer, Question, QuestionId,
};
use quiz_session::session::{
    results_route, AttemptSession, ClosingPhase, GuardState, SessionCommand, SessionEntry, SessionHost,
    SessionOutcome, SessionView, SubmitTrigger,
};
use quiz_session::Config;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{sleep, Instant};
use tokio_test::{assert_err, assert_ok};

const ATTEMPT: AttemptId = AttemptId(7);
const ASSIGNMENT: AssignmentId = AssignmentId(3);

// ========== 内存版作答服务 ==========

#[derive(Debug, Clone, PartialEq)]
enum ApiCall {
    GetAttempt,
    GetAssignment,
    SubmitAnswer(AnswerPayload),
    SubmitAttempt,
}

struct MockApi {
    attempt: Attempt,
    assignment: Assignment,
    attempt_missing: bool,
    answer_delay: Duration,
    submit_delay: Duration,
    /// 接下来多少次保存答案返回失败
    failing_answers: AtomicUsize,
    /// 接下来多少次交卷返回失败
    failing_submits: AtomicUsize,
    remote: Mutex<HashMap<QuestionId, AnswerState>>,
    calls: Mutex<Vec<ApiCall>>,
}

impl MockApi {
    fn new(remaining: u64) -> Self {
        Self {
            attempt: attempt(remaining, AttemptStatus::InProgress),
            assignment: assignment(3),
            attempt_missing: false,
            answer_delay: Duration::from_millis(50),
            submit_delay: Duration::from_millis(10),
            failing_answers: AtomicUsize::new(0),
            failing_submits: AtomicUsize::new(0),
            remote: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    fn record(&self, call: ApiCall) {
        self.calls.lock().unwrap().push(call);
    }

    fn calls(&self) -> Vec<ApiCall> {
        self.calls.lock().unwrap().clone()
    }

    fn submit_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|call| **call == ApiCall::SubmitAttempt)
            .count()
    }

    fn answer_writes(&self, question_id: QuestionId) -> Vec<AnswerState> {
        self.calls()
            .iter()
            .filter_map(|call| match call {
                ApiCall::SubmitAnswer(payload) if payload.question_id == question_id => {
                    Some(payload.state())
                }
                _ => None,
            })
            .collect()
    }

    fn call_index(&self, call: &ApiCall) -> Option<usize> {
        self.calls().iter().position(|c| c == call)
    }

    fn remote(&self, question_id: QuestionId) -> Option<AnswerState> {
        self.remote.lock().unwrap().get(&question_id).copied()
    }
}

#[async_trait]
impl AttemptApi for MockApi {
    async fn get_attempt_by_id(&self, attempt_id: AttemptId) -> ApiResult<Attempt> {
        self.record(ApiCall::GetAttempt);
        if self.attempt_missing {
            return Err(ApiError::NotFound {
                endpoint: format!("/attempts/{}", attempt_id),
            });
        }
        Ok(self.attempt.clone())
    }

    async fn get_assignment_by_id(&self, _assignment_id: AssignmentId) -> ApiResult<Assignment> {
        self.record(ApiCall::GetAssignment);
        Ok(self.assignment.clone())
    }

    async fn submit_answer(&self, attempt_id: AttemptId, answer: &AnswerPayload) -> ApiResult<()> {
        self.record(ApiCall::SubmitAnswer(*answer));
        sleep(self.answer_delay).await;
        let failing = self
            .failing_answers
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(ApiError::network(
                format!("/attempts/{}/answer", attempt_id),
                std::io::Error::new(std::io::ErrorKind::ConnectionReset, "连接被重置"),
            ));
        }
        self.remote
            .lock()
            .unwrap()
            .insert(answer.question_id, answer.state());
        Ok(())
    }

    async fn submit_attempt(&self, attempt_id: AttemptId) -> ApiResult<()> {
        self.record(ApiCall::SubmitAttempt);
        sleep(self.submit_delay).await;
        let failing = self
            .failing_submits
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(ApiError::validation(
                format!("/attempts/{}/submit", attempt_id),
                "服务暂时不可用",
            ));
        }
        Ok(())
    }

    async fn start_attempt(&self, _assignment_id: AssignmentId) -> ApiResult<Attempt> {
        Ok(self.attempt.clone())
    }

    async fn get_attempts_by_assignment(&self, _assignment_id: AssignmentId) -> ApiResult<Vec<Attempt>> {
        Ok(vec![self.attempt.clone()])
    }

    async fn get_answers_by_attempt(&self, _attempt_id: AttemptId) -> ApiResult<Vec<PersistedAnswer>> {
        Ok(self.attempt.answers.clone())
    }
}

// ========== 记录回调的宿主 ==========

#[derive(Debug, Clone, PartialEq)]
enum HostEvent {
    Loading,
    LoadError(String),
    Render {
        cursor: usize,
        remaining: u64,
        answered: usize,
        current: AnswerState,
        submitting: bool,
        submit_error: Option<String>,
    },
    Confirm,
    TimeExpired,
    SubmitFailed(String),
    Results(AttemptId),
}

#[derive(Clone, Default)]
struct RecordingHost {
    events: Arc<Mutex<Vec<HostEvent>>>,
}

impl RecordingHost {
    fn events(&self) -> Vec<HostEvent> {
        self.events.lock().unwrap().clone()
    }

    fn count(&self, matcher: impl Fn(&HostEvent) -> bool) -> usize {
        self.events().iter().filter(|e| matcher(e)).count()
    }

    fn remaining_seen(&self) -> Vec<u64> {
        let mut seen: Vec<u64> = self
            .events()
            .iter()
            .filter_map(|e| match e {
                HostEvent::Render { remaining, .. } => Some(*remaining),
                _ => None,
            })
            .collect();
        seen.dedup();
        seen
    }

    fn last_event(&self) -> Option<HostEvent> {
        self.events().last().cloned()
    }

    fn last_render(&self) -> Option<HostEvent> {
        self.events()
            .into_iter()
            .rev()
            .find(|e| matches!(e, HostEvent::Render { .. }))
    }

    fn push(&self, event: HostEvent) {
        self.events.lock().unwrap().push(event);
    }
}

impl SessionHost for RecordingHost {
    fn render(&mut self, view: &SessionView<'_>) {
        self.push(HostEvent::Render {
            cursor: view.question_index,
            remaining: view.remaining_seconds,
            answered: view.answered_count,
            current: view.current_answer,
            submitting: view.submitting,
            submit_error: view.submit_error.map(str::to_string),
        });
    }

    fn show_loading(&mut self) {
        self.push(HostEvent::Loading);
    }

    fn show_load_error(&mut self, message: &str) {
        self.push(HostEvent::LoadError(message.to_string()));
    }

    fn request_confirmation(&mut self) {
        self.push(HostEvent::Confirm);
    }

    fn notify_time_expired(&mut self) {
        self.push(HostEvent::TimeExpired);
    }

    fn notify_submit_failed(&mut self, reason: &str) {
        self.push(HostEvent::SubmitFailed(reason.to_string()));
    }

    fn show_results(&mut self, attempt_id: AttemptId) {
        self.push(HostEvent::Results(attempt_id));
    }
}

// ========== 辅助函数 ==========

fn question(id: i64) -> Question {
    Question {
        id: QuestionId(id),
        text: format!("第 {} 题", id),
        option_a: "甲".to_string(),
        option_b: "乙".to_string(),
        option_c: "丙".to_string(),
        option_d: "丁".to_string(),
        correct_option: Some(AnswerOption::A),
        difficulty: Difficulty::Medium,
        points: 5,
    }
}

fn assignment(question_count: i64) -> Assignment {
    Assignment {
        id: ASSIGNMENT,
        name: "单元测验".to_string(),
        description: None,
        duration: 30,
        start_time: None,
        end_time: None,
        questions: (1..=question_count).map(question).collect(),
    }
}

fn attempt(remaining: u64, status: AttemptStatus) -> Attempt {
    Attempt {
        id: ATTEMPT,
        assignment_id: ASSIGNMENT,
        status,
        remaining_time_seconds: remaining,
        answers: Vec::new(),
        score: None,
        total_points: None,
        started_at: None,
        submitted_at: None,
    }
}

fn config() -> Config {
    Config {
        tick_interval_ms: 1000,
        low_time_threshold_secs: 300,
        ..Config::default()
    }
}

async fn open(api: &Arc<MockApi>, host: &RecordingHost) -> AttemptSession<RecordingHost> {
    let api: Arc<dyn AttemptApi> = api.clone();
    match AttemptSession::open(api, host.clone(), ATTEMPT, &config()).await {
        Ok(SessionEntry::Ready(session)) => session,
        Ok(SessionEntry::Finished { status, .. }) => panic!("作答不应已结束: {:?}", status),
        Err(e) => panic!("加载失败: {}", e),
    }
}

fn spawn_run(
    session: AttemptSession<RecordingHost>,
) -> (mpsc::UnboundedSender<SessionCommand>, JoinHandle<SessionOutcome>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (tx, tokio::spawn(session.run(rx)))
}

// ========== 加载 ==========

#[tokio::test(start_paused = true)]
async fn test_finished_attempt_redirects_without_clock() {
    let mut mock = MockApi::new(600);
    mock.attempt.status = AttemptStatus::Submitted;
    let api = Arc::new(mock);
    let host = RecordingHost::default();

    let dyn_api: Arc<dyn AttemptApi> = api.clone();
    let entry = assert_ok!(AttemptSession::open(dyn_api, host.clone(), ATTEMPT, &config()).await);
    assert!(matches!(
        entry,
        SessionEntry::Finished {
            attempt_id: ATTEMPT,
            status: AttemptStatus::Submitted
        }
    ));

    sleep(Duration::from_secs(5)).await;
    assert_eq!(host.events(), vec![HostEvent::Loading, HostEvent::Results(ATTEMPT)]);
    assert_eq!(api.calls(), vec![ApiCall::GetAttempt]);
    assert_eq!(results_route(ATTEMPT), "/results/7");
}

#[tokio::test(start_paused = true)]
async fn test_load_error_is_reported_and_not_retried() {
    let mut mock = MockApi::new(600);
    mock.attempt_missing = true;
    let api = Arc::new(mock);
    let host = RecordingHost::default();

    let dyn_api: Arc<dyn AttemptApi> = api.clone();
    let result = AttemptSession::open(dyn_api, host.clone(), ATTEMPT, &config()).await;
    let Err(err) = result else {
        panic!("加载应当失败");
    };
    assert!(matches!(
        err,
        AppError::Session(SessionError::LoadFailed {
            attempt_id: ATTEMPT,
            source: ApiError::NotFound { .. }
        })
    ));

    sleep(Duration::from_secs(5)).await;
    let events = host.events();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0], HostEvent::Loading);
    assert!(matches!(&events[1], HostEvent::LoadError(message) if message.contains("7")));
    assert_eq!(api.calls(), vec![ApiCall::GetAttempt]);
}

#[tokio::test(start_paused = true)]
async fn test_empty_assignment_is_load_error() {
    let mut mock = MockApi::new(600);
    mock.assignment.questions.clear();
    let api: Arc<dyn AttemptApi> = Arc::new(mock);
    let host = RecordingHost::default();

    let result = AttemptSession::open(api, host.clone(), ATTEMPT, &config()).await;
    assert!(matches!(
        result,
        Err(AppError::Session(SessionError::EmptyAssignment { .. }))
    ));
    assert_eq!(host.count(|e| matches!(e, HostEvent::LoadError(_))), 1);
}

#[tokio::test(start_paused = true)]
async fn test_persisted_answers_hydrate_ledger() {
    let mut mock = MockApi::new(299);
    mock.attempt.answers = vec![
        PersistedAnswer {
            question_id: QuestionId(2),
            selected_answer: Some(AnswerOption::B),
            marked_for_review: false,
        },
        PersistedAnswer {
            question_id: QuestionId(3),
            selected_answer: None,
            marked_for_review: true,
        },
        PersistedAnswer {
            question_id: QuestionId(99),
            selected_answer: Some(AnswerOption::D),
            marked_for_review: false,
        },
    ];
    let api = Arc::new(mock);
    let host = RecordingHost::default();
    let session = open(&api, &host).await;

    let view = session.view();
    assert_eq!(view.question_count, 3);
    assert_eq!(view.answered_count, 1);
    assert_eq!(view.unanswered_count, 2);
    assert_eq!(view.review_count, 1);
    assert!(view.time_low);
    assert_eq!(view.remaining_display, "4:59");
    assert!(session.ledger().get(QuestionId(99)).is_none());
}

// ========== 倒计时和自动交卷 ==========

#[tokio::test(start_paused = true)]
async fn test_expiry_auto_submits_once_and_shows_results() {
    let api = Arc::new(MockApi::new(2));
    let host = RecordingHost::default();
    let session = open(&api, &host).await;

    let started = Instant::now();
    let (_tx, handle) = spawn_run(session);
    let outcome = handle.await.unwrap();

    assert_eq!(
        outcome,
        SessionOutcome::Submitted {
            attempt_id: ATTEMPT,
            trigger: SubmitTrigger::Automatic
        }
    );
    assert!(started.elapsed() >= Duration::from_secs(2));
    assert_eq!(host.remaining_seen(), vec![2, 1, 0]);
    assert_eq!(host.count(|e| *e == HostEvent::TimeExpired), 1);
    assert_eq!(host.count(|e| *e == HostEvent::Results(ATTEMPT)), 1);
    // 跳转成绩页之后不再渲染题目
    assert_eq!(host.last_event(), Some(HostEvent::Results(ATTEMPT)));
    assert_eq!(api.submit_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_zero_remaining_expires_without_decrement() {
    let api = Arc::new(MockApi::new(0));
    let host = RecordingHost::default();
    let session = open(&api, &host).await;

    let started = Instant::now();
    let (_tx, handle) = spawn_run(session);
    let outcome = handle.await.unwrap();

    assert!(matches!(
        outcome,
        SessionOutcome::Submitted {
            trigger: SubmitTrigger::Automatic,
            ..
        }
    ));
    assert!(started.elapsed() < Duration::from_secs(1));
    assert_eq!(host.remaining_seen(), vec![0]);
    assert_eq!(host.count(|e| *e == HostEvent::TimeExpired), 1);
    assert_eq!(api.submit_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_failed_auto_submit_is_not_retried() {
    let api = Arc::new(MockApi::new(1));
    api.failing_submits.store(1, Ordering::SeqCst);
    let host = RecordingHost::default();
    let session = open(&api, &host).await;

    let (tx, handle) = spawn_run(session);
    sleep(Duration::from_secs(10)).await;

    assert_eq!(api.submit_count(), 1);
    assert_eq!(
        host.count(|e| *e == HostEvent::SubmitFailed("服务暂时不可用".to_string())),
        1
    );
    assert_eq!(host.count(|e| matches!(e, HostEvent::Results(_))), 0);

    tx.send(SessionCommand::Teardown).unwrap();
    assert_eq!(
        handle.await.unwrap(),
        SessionOutcome::Abandoned { attempt_id: ATTEMPT }
    );
}

// ========== 交卷闸门 ==========

#[tokio::test(start_paused = true)]
async fn test_repeated_submit_requests_call_remote_once() {
    let api = Arc::new(MockApi::new(600));
    let host = RecordingHost::default();
    let session = open(&api, &host).await;

    let (tx, handle) = spawn_run(session);
    tx.send(SessionCommand::Submit).unwrap();
    tx.send(SessionCommand::Submit).unwrap();
    tx.send(SessionCommand::ConfirmSubmit(true)).unwrap();
    tx.send(SessionCommand::Submit).unwrap();
    tx.send(SessionCommand::ConfirmSubmit(true)).unwrap();
    tx.send(SessionCommand::Submit).unwrap();

    let outcome = handle.await.unwrap();
    assert_eq!(
        outcome,
        SessionOutcome::Submitted {
            attempt_id: ATTEMPT,
            trigger: SubmitTrigger::Manual
        }
    );
    assert_eq!(api.submit_count(), 1);
    assert_eq!(host.count(|e| *e == HostEvent::Confirm), 1);
    assert_eq!(host.count(|e| *e == HostEvent::TimeExpired), 0);
    assert_eq!(host.last_event(), Some(HostEvent::Results(ATTEMPT)));
}

#[tokio::test(start_paused = true)]
async fn test_declined_confirmation_then_expiry_submits_once() {
    let api = Arc::new(MockApi::new(2));
    let host = RecordingHost::default();
    let session = open(&api, &host).await;

    let (tx, handle) = spawn_run(session);
    tx.send(SessionCommand::Submit).unwrap();
    tx.send(SessionCommand::ConfirmSubmit(false)).unwrap();

    let outcome = handle.await.unwrap();
    assert!(matches!(
        outcome,
        SessionOutcome::Submitted {
            trigger: SubmitTrigger::Automatic,
            ..
        }
    ));
    assert_eq!(api.submit_count(), 1);
    assert_eq!(host.count(|e| *e == HostEvent::Confirm), 1);
    assert_eq!(host.count(|e| *e == HostEvent::TimeExpired), 1);
}

#[tokio::test(start_paused = true)]
async fn test_expiry_preempts_pending_confirmation() {
    let api = Arc::new(MockApi::new(1));
    let host = RecordingHost::default();
    let mut session = open(&api, &host).await;

    session.submit(SubmitTrigger::Manual);
    assert_eq!(
        session.guard_state(),
        GuardState::Closing(ClosingPhase::AwaitingConfirmation)
    );

    let (tx, handle) = spawn_run(session);
    let outcome = handle.await.unwrap();
    assert!(matches!(
        outcome,
        SessionOutcome::Submitted {
            trigger: SubmitTrigger::Automatic,
            ..
        }
    ));
    // 会话结束后再确认不会产生第二次交卷
    assert!(tx.send(SessionCommand::ConfirmSubmit(true)).is_err());
    assert_eq!(api.submit_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_submit_failure_reopens_for_manual_retry() {
    let api = Arc::new(MockApi::new(600));
    api.failing_submits.store(1, Ordering::SeqCst);
    let host = RecordingHost::default();
    let session = open(&api, &host).await;

    let (tx, handle) = spawn_run(session);
    tx.send(SessionCommand::Submit).unwrap();
    tx.send(SessionCommand::ConfirmSubmit(true)).unwrap();
    sleep(Duration::from_millis(100)).await;

    assert_eq!(api.submit_count(), 1);
    assert_eq!(
        host.count(|e| *e == HostEvent::SubmitFailed("服务暂时不可用".to_string())),
        1
    );
    assert!(host.count(|e| matches!(
        e,
        HostEvent::Render { submit_error: Some(reason), submitting: false, .. } if reason == "服务暂时不可用"
    )) >= 1);

    // 闸门重新打开，答案可以继续修改
    tx.send(SessionCommand::SelectOption {
        question_id: QuestionId(1),
        option: AnswerOption::A,
    })
    .unwrap();
    tx.send(SessionCommand::Submit).unwrap();
    tx.send(SessionCommand::ConfirmSubmit(true)).unwrap();

    let outcome = handle.await.unwrap();
    assert!(matches!(
        outcome,
        SessionOutcome::Submitted {
            trigger: SubmitTrigger::Manual,
            ..
        }
    ));
    assert_eq!(api.submit_count(), 2);
    assert_eq!(host.count(|e| *e == HostEvent::Confirm), 2);
    assert_eq!(
        api.remote(QuestionId(1)).and_then(|a| a.selected_answer),
        Some(AnswerOption::A)
    );
}

// ========== 作答记录 ==========

#[tokio::test(start_paused = true)]
async fn test_selection_is_visible_before_remote_write() {
    let api = Arc::new(MockApi::new(600));
    let host = RecordingHost::default();
    let mut session = open(&api, &host).await;

    let state = assert_ok!(session.select_option(QuestionId(2), AnswerOption::C));
    assert_eq!(state.selected_answer, Some(AnswerOption::C));
    assert_eq!(
        session.ledger().state_of(QuestionId(2)).selected_answer,
        Some(AnswerOption::C)
    );
    assert_eq!(session.view().answered_count, 1);
    assert_eq!(api.remote(QuestionId(2)), None);
}

#[tokio::test(start_paused = true)]
async fn test_select_then_toggle_persists_both() {
    let api = Arc::new(MockApi::new(600));
    let host = RecordingHost::default();
    let session = open(&api, &host).await;

    let (tx, handle) = spawn_run(session);
    tx.send(SessionCommand::SelectOption {
        question_id: QuestionId(1),
        option: AnswerOption::C,
    })
    .unwrap();
    tx.send(SessionCommand::ToggleReview {
        question_id: QuestionId(1),
    })
    .unwrap();
    tx.send(SessionCommand::Submit).unwrap();
    tx.send(SessionCommand::ConfirmSubmit(true)).unwrap();
    handle.await.unwrap();

    let expected = AnswerState {
        selected_answer: Some(AnswerOption::C),
        marked_for_review: true,
    };
    assert_eq!(api.remote(QuestionId(1)), Some(expected));
    // 交卷请求在所有答案写入之后发出
    assert_eq!(api.calls().last(), Some(&ApiCall::SubmitAttempt));
}

#[tokio::test(start_paused = true)]
async fn test_failed_answer_write_is_silent_and_does_not_block_submit() {
    let api = Arc::new(MockApi::new(600));
    api.failing_answers.store(1, Ordering::SeqCst);
    let host = RecordingHost::default();
    let session = open(&api, &host).await;

    let (tx, handle) = spawn_run(session);
    tx.send(SessionCommand::SelectOption {
        question_id: QuestionId(1),
        option: AnswerOption::D,
    })
    .unwrap();
    tx.send(SessionCommand::ToggleReview {
        question_id: QuestionId(1),
    })
    .unwrap();
    sleep(Duration::from_millis(20)).await;
    tx.send(SessionCommand::Submit).unwrap();
    tx.send(SessionCommand::ConfirmSubmit(true)).unwrap();

    let outcome = handle.await.unwrap();
    assert_eq!(
        outcome,
        SessionOutcome::Submitted {
            attempt_id: ATTEMPT,
            trigger: SubmitTrigger::Manual
        }
    );

    // 保存失败只记日志，不提示用户
    assert_eq!(host.count(|e| matches!(e, HostEvent::SubmitFailed(_))), 0);
    assert_eq!(host.count(|e| matches!(e, HostEvent::LoadError(_))), 0);

    // 本地记录保持最新值
    let expected = AnswerState {
        selected_answer: Some(AnswerOption::D),
        marked_for_review: true,
    };
    assert!(matches!(
        host.last_render(),
        Some(HostEvent::Render { answered: 1, current, .. }) if current == expected
    ));

    // 失败的写入之后仍会发出待发快照，且在交卷之前
    assert_eq!(
        api.answer_writes(QuestionId(1)),
        vec![
            AnswerState {
                selected_answer: Some(AnswerOption::D),
                marked_for_review: false,
            },
            expected,
        ]
    );
    assert_eq!(api.remote(QuestionId(1)), Some(expected));
    let pending_write = api
        .call_index(&ApiCall::SubmitAnswer(AnswerPayload::snapshot(QuestionId(1), expected)))
        .unwrap();
    let submit = api.call_index(&ApiCall::SubmitAttempt).unwrap();
    assert!(pending_write < submit);
    assert_eq!(api.submit_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_rapid_changes_coalesce_to_latest() {
    let api = Arc::new(MockApi::new(600));
    let host = RecordingHost::default();
    let mut session = open(&api, &host).await;

    assert_ok!(session.select_option(QuestionId(1), AnswerOption::A));
    assert_ok!(session.select_option(QuestionId(1), AnswerOption::B));
    assert_ok!(session.select_option(QuestionId(1), AnswerOption::D));
    assert_ok!(session.toggle_review(QuestionId(1)));
    assert_ok!(session.select_option(QuestionId(2), AnswerOption::A));

    let (tx, handle) = spawn_run(session);
    sleep(Duration::from_millis(500)).await;
    tx.send(SessionCommand::Teardown).unwrap();
    handle.await.unwrap();

    assert_eq!(
        api.answer_writes(QuestionId(1)),
        vec![
            AnswerState {
                selected_answer: Some(AnswerOption::A),
                marked_for_review: false,
            },
            AnswerState {
                selected_answer: Some(AnswerOption::D),
                marked_for_review: true,
            },
        ]
    );
    assert_eq!(api.answer_writes(QuestionId(2)).len(), 1);
    assert_eq!(
        api.remote(QuestionId(1)),
        Some(AnswerState {
            selected_answer: Some(AnswerOption::D),
            marked_for_review: true,
        })
    );
}

#[tokio::test(start_paused = true)]
async fn test_invalid_mutations_leave_ledger_unchanged() {
    let api = Arc::new(MockApi::new(600));
    let host = RecordingHost::default();
    let mut session = open(&api, &host).await;

    let err = assert_err!(session.select_option(QuestionId(99), AnswerOption::A));
    assert!(matches!(err, SessionError::UnknownQuestion(QuestionId(99))));
    assert_err!(AnswerOption::try_from(5u8));

    session.submit(SubmitTrigger::Automatic);
    let err = assert_err!(session.toggle_review(QuestionId(1)));
    assert!(matches!(err, SessionError::AnswersLocked));

    assert!(session.ledger().is_empty());
    assert_eq!(session.navigate(10), 2);
    assert_eq!(session.cursor(), 2);
}

// ========== 离开 ==========

#[tokio::test(start_paused = true)]
async fn test_teardown_stops_clock_and_cancels_writes() {
    let mut mock = MockApi::new(600);
    mock.answer_delay = Duration::from_secs(5);
    let api = Arc::new(mock);
    let host = RecordingHost::default();
    let session = open(&api, &host).await;

    let (tx, handle) = spawn_run(session);
    sleep(Duration::from_millis(3500)).await;
    tx.send(SessionCommand::SelectOption {
        question_id: QuestionId(1),
        option: AnswerOption::B,
    })
    .unwrap();
    sleep(Duration::from_millis(100)).await;
    tx.send(SessionCommand::Teardown).unwrap();

    assert_eq!(
        handle.await.unwrap(),
        SessionOutcome::Abandoned { attempt_id: ATTEMPT }
    );
    let renders = host.count(|e| matches!(e, HostEvent::Render { .. }));
    assert_eq!(host.remaining_seen(), vec![600, 599, 598, 597]);

    sleep(Duration::from_secs(10)).await;
    assert_eq!(host.count(|e| matches!(e, HostEvent::Render { .. })), renders);
    assert_eq!(api.answer_writes(QuestionId(1)).len(), 1);
    assert_eq!(api.remote(QuestionId(1)), None);
    assert_eq!(api.submit_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_closed_command_channel_abandons_session() {
    let api = Arc::new(MockApi::new(600));
    let host = RecordingHost::default();
    let session = open(&api, &host).await;

    let (tx, handle) = spawn_run(session);
    drop(tx);

    assert_eq!(
        handle.await.unwrap(),
        SessionOutcome::Abandoned { attempt_id: ATTEMPT }
    );
    assert_eq!(api.submit_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_navigation_renders_new_cursor() {
    let api = Arc::new(MockApi::new(600));
    let host = RecordingHost::default();
    let session = open(&api, &host).await;

    let (tx, handle) = spawn_run(session);
    tx.send(SessionCommand::Navigate(2)).unwrap();
    tx.send(SessionCommand::Navigate(7)).unwrap();
    tx.send(SessionCommand::Navigate(1)).unwrap();
    sleep(Duration::from_millis(10)).await;
    tx.send(SessionCommand::Teardown).unwrap();
    handle.await.unwrap();

    let cursors: Vec<usize> = host
        .events()
        .iter()
        .filter_map(|e| match e {
            HostEvent::Render { cursor, .. } => Some(*cursor),
            _ => None,
        })
        .collect();
    assert_eq!(cursors, vec![0, 2, 2, 1]);
}
