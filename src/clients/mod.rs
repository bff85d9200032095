pub mod attempt_api;
pub mod rest_client;

pub use attempt_api::{ApiResult, AttemptApi};
pub use rest_client::RestClient;
