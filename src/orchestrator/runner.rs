//! 控制台作答流程 - 编排层
//!
//! 1. 创建 REST 客户端
//! 2. 打开会话（已结束的作答直接打印成绩页）
//! 3. 启动读输入线程，把每行输入转换为会话指令
//! 4. 运行会话直到交卷或离开

use crate::clients::{AttemptApi, RestClient};
use crate::config::Config;
use crate::models::{AssignmentId, AttemptId, AttemptStatus};
use crate::orchestrator::console::{parse_command, ConsoleHost, ConsoleInput, Cursor, HELP};
use crate::session::{results_route, AttemptSession, SessionCommand, SessionEntry, SessionOutcome};
use anyhow::{Context, Result};
use std::io::BufRead;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tracing::{info, warn};

/// 继续一次作答
///
/// 作答已结束时返回 `None`
pub async fn run_attempt(config: &Config, attempt_id: AttemptId) -> Result<Option<SessionOutcome>> {
    let api: Arc<dyn AttemptApi> = Arc::new(RestClient::new(config)?);
    run_with_api(api, config, attempt_id).await
}

/// 开始试卷：已有进行中的作答时继续它，否则新建
pub async fn start_and_run(
    config: &Config,
    assignment_id: AssignmentId,
) -> Result<Option<SessionOutcome>> {
    let api: Arc<dyn AttemptApi> = Arc::new(RestClient::new(config)?);

    let existing = api
        .get_attempts_by_assignment(assignment_id)
        .await
        .with_context(|| format!("获取试卷 {} 的作答记录失败", assignment_id))?;

    let attempt_id = match existing
        .iter()
        .find(|attempt| attempt.status == AttemptStatus::InProgress)
    {
        Some(attempt) => {
            info!("📋 试卷 {} 已有进行中的作答 {}，继续作答", assignment_id, attempt.id);
            attempt.id
        }
        None => {
            let attempt = api
                .start_attempt(assignment_id)
                .await
                .with_context(|| format!("开始试卷 {} 失败", assignment_id))?;
            info!("✓ 已开始作答 {} (试卷 {})", attempt.id, assignment_id);
            attempt.id
        }
    };

    run_with_api(api, config, attempt_id).await
}

async fn run_with_api(
    api: Arc<dyn AttemptApi>,
    config: &Config,
    attempt_id: AttemptId,
) -> Result<Option<SessionOutcome>> {
    let (host, cursor) = ConsoleHost::new();

    let session = match AttemptSession::open(Arc::clone(&api), host, attempt_id, config).await? {
        SessionEntry::Ready(session) => session,
        SessionEntry::Finished { attempt_id, status } => {
            print_saved_answers(api.as_ref(), attempt_id, status).await;
            return Ok(None);
        }
    };

    println!("{}", HELP);
    let (commands_tx, commands_rx) = mpsc::unbounded_channel();
    spawn_input_reader(commands_tx, cursor);

    Ok(Some(session.run(commands_rx).await))
}

async fn print_saved_answers(api: &dyn AttemptApi, attempt_id: AttemptId, status: AttemptStatus) {
    match api.get_answers_by_attempt(attempt_id).await {
        Ok(answers) => {
            let answered = answers
                .iter()
                .filter(|answer| answer.selected_answer.is_some())
                .count();
            println!(
                "作答 {} 已结束 ({:?})，共保存 {} 道题的答案: {}",
                attempt_id,
                status,
                answered,
                results_route(attempt_id)
            );
        }
        Err(e) => warn!("⚠️ 获取作答 {} 的答案失败: {}", attempt_id, e),
    }
}

/// 读 stdin 的专用线程
///
/// 阻塞读取放在运行时之外，程序退出时不需要等它结束
fn spawn_input_reader(
    commands: mpsc::UnboundedSender<SessionCommand>,
    cursor: watch::Receiver<Option<Cursor>>,
) {
    std::thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else {
                break;
            };
            let current = *cursor.borrow();
            match parse_command(&line, current) {
                ConsoleInput::Command(command) => {
                    if commands.send(command).is_err() {
                        break;
                    }
                }
                ConsoleInput::Help => println!("{}", HELP),
                ConsoleInput::Empty => {}
                ConsoleInput::Invalid(message) => println!("{}", message),
            }
        }
        // 输入结束时由通道关闭触发离开
    });
}
