//! 日志工具模块
//!
//! 控制台用来显示题目，日志默认只写入文件；开启详细日志时同时输出到 stderr

use crate::session::SessionOutcome;
use anyhow::{Context, Result};
use std::fs::{self, OpenOptions};
use std::sync::Mutex;
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// 初始化 tracing
///
/// `RUST_LOG` 优先；否则默认 info，详细模式为 debug
pub fn init(verbose: bool, log_file_path: &str) -> Result<()> {
    init_log_file(log_file_path)?;

    let file = OpenOptions::new()
        .append(true)
        .open(log_file_path)
        .with_context(|| format!("无法打开日志文件: {}", log_file_path))?;

    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let stderr_layer = verbose.then(|| {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(Mutex::new(file)).with_ansi(false))
        .with(stderr_layer)
        .try_init()
        .context("日志系统已初始化")?;

    Ok(())
}

/// 创建日志文件并写入表头（覆盖旧文件）
pub fn init_log_file(log_file_path: &str) -> Result<()> {
    let log_header = format!(
        "{}\n作答会话日志 - {}\n{}\n\n",
        "=".repeat(60),
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
        "=".repeat(60)
    );
    fs::write(log_file_path, log_header)
        .with_context(|| format!("无法写入日志文件: {}", log_file_path))?;
    Ok(())
}

/// 记录程序启动信息
pub fn log_startup(api_base_url: &str, target: &str) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - 限时作答模式");
    info!("🌐 服务地址: {}", api_base_url);
    info!("📄 目标: {}", target);
    info!("{}", "=".repeat(60));
}

/// 记录会话结束信息
pub fn log_outcome(outcome: &SessionOutcome, log_file_path: &str) {
    info!("\n{}", "=".repeat(60));
    match outcome {
        SessionOutcome::Submitted {
            attempt_id,
            trigger,
        } => info!("✅ 作答 {} 已交卷 ({:?})", attempt_id, trigger),
        SessionOutcome::Abandoned { attempt_id } => {
            info!("👋 已离开作答 {}，未交卷", attempt_id)
        }
    }
    info!(
        "结束时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    info!("日志已保存至: {}", log_file_path);
}

/// 截断长文本用于日志显示
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}
