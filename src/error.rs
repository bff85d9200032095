use crate::models::{AssignmentId, AttemptId, QuestionId};
use thiserror::Error;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// 应用程序错误类型
#[derive(Debug, Error)]
pub enum AppError {
    /// 远程服务调用错误
    #[error("API错误: {0}")]
    Api(#[from] ApiError),
    /// 答题会话错误
    #[error("会话错误: {0}")]
    Session(#[from] SessionError),
    /// 配置错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),
}

/// 远程服务调用错误
///
/// 按照调用方需要的处理方式分类：找不到、被服务端拒绝、网络失败、意外响应
#[derive(Debug, Error)]
pub enum ApiError {
    /// 资源不存在 (404)
    #[error("资源不存在: {endpoint}")]
    NotFound { endpoint: String },
    /// 服务端拒绝请求，例如作答已经结束
    #[error("请求被拒绝 ({endpoint}): {message}")]
    Validation { endpoint: String, message: String },
    /// 网络请求失败
    #[error("网络请求失败 ({endpoint}): {source}")]
    Network {
        endpoint: String,
        #[source]
        source: BoxError,
    },
    /// API 返回意外的状态码
    #[error("API返回错误响应 ({endpoint}): status={status}, message={message:?}")]
    BadResponse {
        endpoint: String,
        status: u16,
        message: Option<String>,
    },
    /// JSON 解析失败
    #[error("JSON解析失败 ({endpoint}): {source}")]
    JsonParseFailed {
        endpoint: String,
        #[source]
        source: BoxError,
    },
}

impl ApiError {
    /// 创建网络错误
    pub fn network(endpoint: impl Into<String>, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        ApiError::Network {
            endpoint: endpoint.into(),
            source: Box::new(source),
        }
    }

    /// 创建校验错误
    pub fn validation(endpoint: impl Into<String>, message: impl Into<String>) -> Self {
        ApiError::Validation {
            endpoint: endpoint.into(),
            message: message.into(),
        }
    }

    /// 展示给用户的错误信息，优先使用服务端返回的 message
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            ApiError::Validation { message, .. } => message.clone(),
            ApiError::BadResponse {
                message: Some(message),
                ..
            } => message.clone(),
            _ => fallback.to_string(),
        }
    }
}

/// 答题会话错误
#[derive(Debug, Error)]
pub enum SessionError {
    /// 加载作答或试卷失败，会话无法开始
    #[error("加载作答 {attempt_id} 失败: {source}")]
    LoadFailed {
        attempt_id: AttemptId,
        #[source]
        source: ApiError,
    },
    /// 试卷中没有题目
    #[error("试卷 {assignment_id} 没有题目")]
    EmptyAssignment { assignment_id: AssignmentId },
    /// 题目不属于当前试卷
    #[error("题目 {0} 不属于当前试卷")]
    UnknownQuestion(QuestionId),
    /// 选项超出 1-4
    #[error("无效的选项: {0}")]
    InvalidOption(u8),
    /// 交卷流程已开始，不能再修改答案
    #[error("正在交卷，答案已锁定")]
    AnswersLocked,
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 环境变量解析失败
    #[error("环境变量 {var_name} 解析失败: 值 '{value}' 无法转换为 {expected_type}")]
    EnvVarParseFailed {
        var_name: String,
        value: String,
        expected_type: String,
    },
    /// 读取配置文件失败
    #[error("读取配置文件失败 ({path}): {source}")]
    FileReadFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// TOML 解析失败
    #[error("TOML解析失败 ({path}): {source}")]
    TomlParseFailed {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}

// ========== 便捷构造函数 ==========

impl AppError {
    /// 创建加载失败错误
    pub fn load_failed(attempt_id: AttemptId, source: ApiError) -> Self {
        AppError::Session(SessionError::LoadFailed { attempt_id, source })
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;
