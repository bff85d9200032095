/// REST 客户端
///
/// 封装所有与作答服务相关的 HTTP 调用
use crate::clients::attempt_api::{ApiResult, AttemptApi};
use crate::config::Config;
use crate::error::ApiError;
use crate::models::{AnswerPayload, Assignment, AssignmentId, Attempt, AttemptId, PersistedAnswer};
use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

/// 作答服务 REST 客户端
#[derive(Clone)]
pub struct RestClient {
    http: Client,
    base_url: String,
}

impl RestClient {
    /// 创建新的客户端
    pub fn new(config: &Config) -> Result<Self, ApiError> {
        let http = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| ApiError::network(&config.api_base_url, e))?;

        Ok(Self {
            http,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}{}", self.base_url, endpoint)
    }

    async fn get_json<T: DeserializeOwned>(&self, endpoint: &str) -> ApiResult<T> {
        debug!("GET {}", endpoint);
        let response = self
            .http
            .get(self.url(endpoint))
            .send()
            .await
            .map_err(|e| ApiError::network(endpoint, e))?;
        decode(endpoint, check_status(endpoint, response).await?).await
    }

    async fn post<B: Serialize + ?Sized>(&self, endpoint: &str, body: Option<&B>) -> ApiResult<Response> {
        debug!("POST {}", endpoint);
        let mut request = self.http.post(self.url(endpoint));
        if let Some(body) = body {
            request = request.json(body);
        }
        let response = request
            .send()
            .await
            .map_err(|e| ApiError::network(endpoint, e))?;
        check_status(endpoint, response).await
    }
}

#[async_trait]
impl AttemptApi for RestClient {
    async fn get_attempt_by_id(&self, attempt_id: AttemptId) -> ApiResult<Attempt> {
        self.get_json(&format!("/attempts/{}", attempt_id)).await
    }

    async fn get_assignment_by_id(&self, assignment_id: AssignmentId) -> ApiResult<Assignment> {
        self.get_json(&format!("/assignments/{}", assignment_id)).await
    }

    async fn submit_answer(&self, attempt_id: AttemptId, answer: &AnswerPayload) -> ApiResult<()> {
        self.post(&format!("/attempts/{}/answer", attempt_id), Some(answer))
            .await?;
        Ok(())
    }

    async fn submit_attempt(&self, attempt_id: AttemptId) -> ApiResult<()> {
        self.post::<Value>(&format!("/attempts/{}/submit", attempt_id), None)
            .await?;
        Ok(())
    }

    async fn start_attempt(&self, assignment_id: AssignmentId) -> ApiResult<Attempt> {
        let endpoint = format!("/attempts/start/{}", assignment_id);
        let response = self.post::<Value>(&endpoint, None).await?;
        decode(&endpoint, response).await
    }

    async fn get_attempts_by_assignment(&self, assignment_id: AssignmentId) -> ApiResult<Vec<Attempt>> {
        self.get_json(&format!("/attempts/assignment/{}", assignment_id))
            .await
    }

    async fn get_answers_by_attempt(&self, attempt_id: AttemptId) -> ApiResult<Vec<PersistedAnswer>> {
        self.get_json(&format!("/attempts/{}/answers", attempt_id))
            .await
    }
}

// ========== 辅助函数 ==========

/// 非 2xx 响应转换为 ApiError
async fn check_status(endpoint: &str, response: Response) -> ApiResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    // 错误响应体读取失败时只保留状态码
    let body = response.text().await.unwrap_or_default();
    Err(classify_status(endpoint, status, &body))
}

/// 按状态码分类错误
fn classify_status(endpoint: &str, status: StatusCode, body: &str) -> ApiError {
    let message = extract_message(body);
    match status {
        StatusCode::NOT_FOUND => ApiError::NotFound {
            endpoint: endpoint.to_string(),
        },
        StatusCode::BAD_REQUEST | StatusCode::CONFLICT | StatusCode::UNPROCESSABLE_ENTITY => {
            ApiError::Validation {
                endpoint: endpoint.to_string(),
                message: message.unwrap_or_else(|| status.to_string()),
            }
        }
        _ => ApiError::BadResponse {
            endpoint: endpoint.to_string(),
            status: status.as_u16(),
            message,
        },
    }
}

/// 提取响应体中的 `message` 字段
fn extract_message(body: &str) -> Option<String> {
    serde_json::from_str::<Value>(body)
        .ok()?
        .get("message")
        .and_then(|v| v.as_str())
        .map(str::to_string)
}

async fn decode<T: DeserializeOwned>(endpoint: &str, response: Response) -> ApiResult<T> {
    let bytes = response
        .bytes()
        .await
        .map_err(|e| ApiError::network(endpoint, e))?;
    serde_json::from_slice(&bytes).map_err(|e| ApiError::JsonParseFailed {
        endpoint: endpoint.to_string(),
        source: Box::new(e),
    })
}
