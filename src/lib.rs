//! # Quiz Session
//!
//! 限时单选题作答会话：倒计时、逐题保存、最多一次交卷
//!
//! ## 架构设计
//!
//! ### ① 远程服务层（Clients）
//! - `clients/` - 作答服务的 REST 接口
//! - `AttemptApi` - 会话依赖的 trait，测试中可替换
//! - `RestClient` - 基于 reqwest 的实现
//!
//! ### ② 会话层（Session）
//! - `session/` - 一次作答的完整状态机
//! - `RemainingClock` - 剩余时间倒计时，到 0 锁定
//! - `AnswerLedger` - 本地作答记录，界面以它为准
//! - `AnswerSync` - 同一道题的写入串行化，后写覆盖先写
//! - `SubmissionGuard` - 交卷闸门，手动和自动交卷合计最多一次
//! - `AttemptSession` - 事件循环，组合以上部件
//!
//! ### ③ 编排层（Orchestration）
//! - `orchestrator/runner` - 控制台作答流程
//! - `orchestrator/console` - 控制台宿主和指令解析
//!
//! ## 模块结构

pub mod clients;
pub mod config;
pub mod error;
pub mod models;
pub mod orchestrator;
pub mod session;
pub mod utils;

// 重新导出常用类型
pub use clients::{AttemptApi, RestClient};
pub use config::Config;
pub use error::{ApiError, AppError, AppResult, SessionError};
pub use models::{AnswerOption, Assignment, Attempt, AttemptId, AttemptStatus, Question};
pub use session::{AttemptSession, SessionCommand, SessionEntry, SessionHost, SessionOutcome};
