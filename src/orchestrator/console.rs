//! 控制台宿主
//!
//! 按行读取指令，把会话状态打印到 stdout。
//! 读线程需要知道当前题目，由 `render` 通过 watch 通道发布。

use crate::models::{AnswerOption, AttemptId, QuestionId};
use crate::session::{results_route, QuestionStatus, SessionCommand, SessionHost, SessionView};
use crate::utils::logging::truncate_text;
use tokio::sync::watch;
use tracing::{debug, info};

/// 当前题目位置
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cursor {
    pub question_id: QuestionId,
    pub index: usize,
    pub count: usize,
}

/// 控制台输入解析结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleInput {
    Command(SessionCommand),
    Help,
    Empty,
    Invalid(String),
}

pub struct ConsoleHost {
    cursor: watch::Sender<Option<Cursor>>,
    /// 除剩余时间外的画面内容，相同时不重复打印整道题
    last_frame: Option<String>,
    last_remaining: Option<u64>,
}

impl ConsoleHost {
    pub fn new() -> (Self, watch::Receiver<Option<Cursor>>) {
        let (cursor, rx) = watch::channel(None);
        (
            Self {
                cursor,
                last_frame: None,
                last_remaining: None,
            },
            rx,
        )
    }

    fn print_question(view: &SessionView<'_>) {
        let question = view.question;
        println!();
        println!("{}", "=".repeat(60));
        println!(
            "{} | 第 {}/{} 题 | {:?} | {} 分",
            view.assignment_name,
            view.question_index + 1,
            view.question_count,
            question.difficulty,
            question.points
        );
        println!("{}", "-".repeat(60));
        println!("{}", question.text);
        for option in AnswerOption::ALL {
            let chosen = view.current_answer.selected_answer == Some(option);
            println!(
                " {} {}. {}",
                if chosen { "●" } else { "○" },
                option.label(),
                question.option_text(option)
            );
        }
        if view.current_answer.marked_for_review {
            println!(" 🚩 已标记复查");
        }
        println!("{}", "-".repeat(60));
        println!("答题卡: {}", palette_line(&view.palette));
        println!(
            "已答 {} | 未答 {} | 复查 {} | 剩余 {}{}",
            view.answered_count,
            view.unanswered_count,
            view.review_count,
            view.remaining_display,
            if view.time_low { " ⚠️" } else { "" }
        );
        if let Some(reason) = view.submit_error {
            println!("❌ {}", reason);
        }
        if view.submitting {
            println!("📤 正在交卷...");
        }
        println!("{}", nav_hint(view.is_first(), view.is_last()));
    }
}

impl SessionHost for ConsoleHost {
    fn render(&mut self, view: &SessionView<'_>) {
        // 输入线程退出后没有接收方，send_replace 不关心这一点
        self.cursor.send_replace(Some(Cursor {
            question_id: view.question.id,
            index: view.question_index,
            count: view.question_count,
        }));

        let frame = frame_key(view);
        if self.last_frame.as_deref() != Some(frame.as_str()) {
            debug!(
                "渲染第 {} 题: {}",
                view.question_index + 1,
                truncate_text(&view.question.text, 30)
            );
            Self::print_question(view);
            self.last_frame = Some(frame);
        } else if self.last_remaining != Some(view.remaining_seconds)
            && (view.remaining_seconds % 60 == 0 || view.remaining_seconds <= 10)
        {
            println!("⏱ 剩余 {}", view.remaining_display);
        }
        self.last_remaining = Some(view.remaining_seconds);
    }

    fn show_loading(&mut self) {
        println!("加载中...");
    }

    fn show_load_error(&mut self, message: &str) {
        println!("❌ 加载失败: {}", message);
    }

    fn request_confirmation(&mut self) {
        println!("确认交卷吗？交卷后不能修改答案 (yes/no)");
    }

    fn notify_time_expired(&mut self) {
        println!("⏰ 时间到，正在自动交卷");
    }

    fn notify_submit_failed(&mut self, reason: &str) {
        println!("❌ 交卷失败: {}，输入 s 重试", reason);
    }

    fn show_results(&mut self, attempt_id: AttemptId) {
        info!("跳转成绩页 {}", results_route(attempt_id));
        println!("✅ 查看成绩: {}", results_route(attempt_id));
    }
}

/// 帮助信息
pub const HELP: &str = "指令: 1-4/a-d 选择 | r 标记复查 | n 下一题 | p 上一题 | g <题号> 跳转 | s 交卷 | yes/no 确认 | q 离开";

/// 解析一行输入
///
/// 需要当前题目的指令在尚未渲染时返回 `Invalid`
pub fn parse_command(line: &str, cursor: Option<Cursor>) -> ConsoleInput {
    let line = line.trim().to_lowercase();
    let mut parts = line.split_whitespace();
    let Some(head) = parts.next() else {
        return ConsoleInput::Empty;
    };

    let command = match head {
        "h" | "help" | "?" => return ConsoleInput::Help,
        "q" | "quit" => SessionCommand::Teardown,
        "s" | "submit" => SessionCommand::Submit,
        "yes" | "y" => SessionCommand::ConfirmSubmit(true),
        "no" => SessionCommand::ConfirmSubmit(false),
        "r" | "n" | "p" | "g" | "1" | "2" | "3" | "4" | "a" | "b" | "c" | "d" => {
            let Some(cursor) = cursor else {
                return ConsoleInput::Invalid("题目尚未加载".to_string());
            };
            match head {
                "r" => SessionCommand::ToggleReview {
                    question_id: cursor.question_id,
                },
                "n" => SessionCommand::Navigate(cursor.index + 1),
                "p" => SessionCommand::Navigate(cursor.index.saturating_sub(1)),
                "g" => match parts.next().and_then(|k| k.parse::<usize>().ok()) {
                    Some(number) if number >= 1 && number <= cursor.count => {
                        SessionCommand::Navigate(number - 1)
                    }
                    _ => {
                        return ConsoleInput::Invalid(format!("题号应为 1-{}", cursor.count));
                    }
                },
                choice => match parse_option(choice) {
                    Some(option) => SessionCommand::SelectOption {
                        question_id: cursor.question_id,
                        option,
                    },
                    None => return ConsoleInput::Invalid(format!("无效的选项: {}", choice)),
                },
            }
        }
        other => return ConsoleInput::Invalid(format!("未知指令: {}", other)),
    };

    ConsoleInput::Command(command)
}

// ========== 辅助函数 ==========

fn parse_option(input: &str) -> Option<AnswerOption> {
    match input {
        "a" => Some(AnswerOption::A),
        "b" => Some(AnswerOption::B),
        "c" => Some(AnswerOption::C),
        "d" => Some(AnswerOption::D),
        digits => digits
            .parse::<u8>()
            .ok()
            .and_then(|value| AnswerOption::try_from(value).ok()),
    }
}

fn nav_hint(is_first: bool, is_last: bool) -> &'static str {
    match (is_first, is_last) {
        (true, true) => "仅此一题 | s 交卷",
        (true, false) => "第一题 | n 下一题",
        (false, true) => "最后一题 | p 上一题 | s 交卷",
        (false, false) => "n 下一题 | p 上一题",
    }
}

fn palette_line(palette: &[QuestionStatus]) -> String {
    palette
        .iter()
        .enumerate()
        .map(|(i, status)| {
            let mark = match status {
                QuestionStatus::Answered => "✓",
                QuestionStatus::Review => "?",
                QuestionStatus::Unanswered => "·",
            };
            format!("{}{}", i + 1, mark)
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn frame_key(view: &SessionView<'_>) -> String {
    format!(
        "{}|{:?}|{:?}|{}|{}|{}|{:?}",
        view.question_index,
        view.current_answer,
        view.palette,
        view.awaiting_confirmation,
        view.submitting,
        view.expired,
        view.submit_error
    )
}
