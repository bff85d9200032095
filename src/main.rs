use anyhow::{bail, Context, Result};
use quiz_session::orchestrator::{run_attempt, start_and_run};
use quiz_session::utils::logging;
use quiz_session::Config;

const USAGE: &str = "用法: quiz-session <attemptId> | quiz-session start <assignmentId>";

#[tokio::main]
async fn main() -> Result<()> {
    // 加载配置
    let config = Config::load()?;

    // 初始化日志
    logging::init(config.verbose_logging, &config.output_log_file)?;

    let args: Vec<String> = std::env::args().skip(1).collect();
    let outcome = match args.as_slice() {
        [command, id] if command == "start" => {
            logging::log_startup(&config.api_base_url, &format!("试卷 {}", id));
            let assignment_id = id.parse().with_context(|| format!("无效的试卷 ID: {}", id))?;
            start_and_run(&config, assignment_id).await?
        }
        [id] => {
            logging::log_startup(&config.api_base_url, &format!("作答 {}", id));
            let attempt_id = id.parse().with_context(|| format!("无效的作答 ID: {}", id))?;
            run_attempt(&config, attempt_id).await?
        }
        _ => bail!(USAGE),
    };

    if let Some(outcome) = outcome {
        logging::log_outcome(&outcome, &config.output_log_file);
    }

    Ok(())
}
