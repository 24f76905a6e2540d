//! Scripted in-memory API client for tests and demos.

use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;

use super::{ApiClient, ApiError, Method};

type Response = Result<Value, ApiError>;

/// One request the mock received.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub method: Method,
    pub path: String,
    pub params: Vec<(String, String)>,
    pub body: Option<Value>,
}

#[derive(Default)]
struct Route {
    queued: VecDeque<Response>,
    standing: Option<Response>,
}

/// Answers requests from scripted responses keyed by method and path.
///
/// Queued responses are served first, in order; after that the standing
/// response repeats. Unscripted requests fail with `NotFound`.
#[derive(Default)]
pub struct MockApiClient {
    routes: Mutex<HashMap<(Method, String), Route>>,
    calls: Mutex<Vec<RecordedCall>>,
    delay: Option<Duration>,
}

impl MockApiClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sleeps before answering, so concurrent callers overlap.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Sets the response repeated for `method path`.
    pub fn on(&self, method: Method, path: &str, response: Response) -> &Self {
        self.routes
            .lock()
            .entry((method, path.to_string()))
            .or_default()
            .standing = Some(response);
        self
    }

    pub fn on_get(&self, path: &str, value: Value) -> &Self {
        self.on(Method::GET, path, Ok(value))
    }

    /// Queues a response served once before the standing one.
    pub fn once(&self, method: Method, path: &str, response: Response) -> &Self {
        self.routes
            .lock()
            .entry((method, path.to_string()))
            .or_default()
            .queued
            .push_back(response);
        self
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self, method: Method, path: &str) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|c| c.method == method && c.path == path)
            .count()
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().len()
    }

    async fn respond(&self, call: RecordedCall) -> Response {
        let key = (call.method.clone(), call.path.clone());
        self.calls.lock().push(call);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let mut routes = self.routes.lock();
        let scripted = routes
            .get_mut(&key)
            .and_then(|route| route.queued.pop_front().or_else(|| route.standing.clone()));
        scripted.unwrap_or_else(|| Err(unscripted(&key.0, &key.1)))
    }
}

fn unscripted(method: &Method, path: &str) -> ApiError {
    ApiError::NotFound(format!("no mock response for {} {}", method, path))
}

#[async_trait]
impl ApiClient for MockApiClient {
    async fn get(&self, path: &str, params: &[(&str, String)]) -> Result<Value, ApiError> {
        self.respond(RecordedCall {
            method: Method::GET,
            path: path.to_string(),
            params: params
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect(),
            body: None,
        })
        .await
    }

    async fn send(&self, method: Method, path: &str, body: Option<Value>) -> Result<Value, ApiError> {
        self.respond(RecordedCall {
            method,
            path: path.to_string(),
            params: Vec::new(),
            body,
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_queued_then_standing_responses() {
        let mock = MockApiClient::new();
        mock.on_get("/hospitals", json!([1]))
            .once(Method::GET, "/hospitals", Ok(json!([0])));

        assert_eq!(mock.get("/hospitals", &[]).await.unwrap(), json!([0]));
        assert_eq!(mock.get("/hospitals", &[]).await.unwrap(), json!([1]));
        assert_eq!(mock.get("/hospitals", &[]).await.unwrap(), json!([1]));
        assert_eq!(mock.call_count(Method::GET, "/hospitals"), 3);
    }

    #[tokio::test]
    async fn test_unscripted_request_fails() {
        let mock = MockApiClient::new();
        let err = mock.send(Method::POST, "/nowhere", None).await.unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_exhausted_queue_without_standing_response_fails() {
        let mock = MockApiClient::new();
        mock.once(Method::PATCH, "/road-blockades/3/remove", Ok(json!({"ok": true})));

        assert!(mock.send(Method::PATCH, "/road-blockades/3/remove", None).await.is_ok());
        let err = mock
            .send(Method::PATCH, "/road-blockades/3/remove", None)
            .await
            .unwrap_err();
        assert_eq!(
            err,
            ApiError::NotFound("no mock response for PATCH /road-blockades/3/remove".to_string())
        );
    }

    #[tokio::test]
    async fn test_records_params_and_body() {
        let mock = MockApiClient::new();
        mock.on(Method::POST, "/messages", Ok(json!({"id": 1})));

        mock.get("/messages", &[("incident_id", "7".to_string())]).await.ok();
        mock.send(Method::POST, "/messages", Some(json!({"text": "hi"})))
            .await
            .unwrap();

        let calls = mock.calls();
        assert_eq!(calls[0].params, vec![("incident_id".to_string(), "7".to_string())]);
        assert_eq!(calls[1].body, Some(json!({"text": "hi"})));
        assert_eq!(mock.total_calls(), 2);
    }
}
