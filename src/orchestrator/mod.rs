//! 编排层（Orchestration Layer）
//!
//! ## 模块划分
//!
//! ### `runner` - 控制台作答流程
//! - 创建 REST 客户端
//! - 开始或继续作答
//! - 连接 stdin 和会话指令通道
//!
//! ### `console` - 控制台宿主
//! - 实现 `SessionHost`，把会话状态打印到 stdout
//! - 解析控制台指令
//!
//! ## 层次关系
//!
//! ```text
//! runner (stdin / 进程生命周期)
//!     ↓
//! session::AttemptSession (倒计时 / 作答记录 / 交卷闸门)
//!     ↓
//! clients (AttemptApi / RestClient)
//! ```

pub mod console;
pub mod runner;

pub use console::{parse_command, ConsoleHost, ConsoleInput, Cursor};
pub use runner::{run_attempt, start_and_run};
