use async_trait::async_trait;
use slurprs::domain::services::untappd_api::{ApiError, ApiResponse, UntappdApi};
use std::collections::VecDeque;
use std::sync::Mutex;

/// Recorded page fetch call
#[derive(Debug, Clone, PartialEq)]
pub struct FetchCall {
    pub user: String,
    pub max_id: Option<i64>,
    pub min_id: Option<i64>,
}

/// Scripted API double
///
/// Responses are served in the order they were pushed, one per call.
/// A call with no scripted response fails as transient.
pub struct MockUntappdApi {
    responses: Mutex<VecDeque<Result<ApiResponse, ApiError>>>,
    details: Mutex<VecDeque<Result<ApiResponse, ApiError>>>,
    calls: Mutex<Vec<FetchCall>>,
    detail_calls: Mutex<Vec<i64>>,
}

impl MockUntappdApi {
    pub fn new() -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            details: Mutex::new(VecDeque::new()),
            calls: Mutex::new(Vec::new()),
            detail_calls: Mutex::new(Vec::new()),
        }
    }

    pub fn push_response(&self, response: Result<ApiResponse, ApiError>) {
        self.responses.lock().unwrap().push_back(response);
    }

    pub fn push_detail(&self, response: Result<ApiResponse, ApiError>) {
        self.details.lock().unwrap().push_back(response);
    }

    pub fn calls(&self) -> Vec<FetchCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn detail_calls(&self) -> Vec<i64> {
        self.detail_calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl UntappdApi for MockUntappdApi {
    async fn fetch_checkins(
        &self,
        user: &str,
        max_id: Option<i64>,
        min_id: Option<i64>,
        _limit: usize,
    ) -> Result<ApiResponse, ApiError> {
        self.calls.lock().unwrap().push(FetchCall {
            user: user.to_string(),
            max_id,
            min_id,
        });

        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ApiError::Transient("no scripted response".to_string())))
    }

    async fn fetch_checkin_detail(&self, checkin_id: i64) -> Result<ApiResponse, ApiError> {
        self.detail_calls.lock().unwrap().push(checkin_id);

        self.details
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ApiError::Transient("no scripted detail".to_string())))
    }
}
