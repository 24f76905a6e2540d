//! Hospital-to-hospital transfers.
//!
//! Lists are cached per filter, details and history pages per transfer.
//! Every workflow step invalidates the lists plus that transfer's detail and
//! history, and realtime pushes are merged in place.

use std::time::Duration;

use serde::Deserialize;
use serde_json::{json, Value};

use super::{data_field, merge_fields, upsert_by_id, ServiceContext, ServiceResult};
use crate::cache::{CacheKey, Fetched, KeyPattern};
use crate::client::{ApiError, Method};

const TRANSFERS_TTL: Duration = Duration::from_secs(15);
const TRANSFER_DETAIL_TTL: Duration = Duration::from_secs(10);
const RESPONDERS_TTL: Duration = Duration::from_secs(60);
const TRANSFERS_PATH: &str = "/transfers";
const NAMESPACE: &str = "transfers";

fn lists_key() -> CacheKey {
    CacheKey::new(NAMESPACE).with("list")
}

fn list_key(active_only: bool) -> CacheKey {
    lists_key().with(if active_only { "active" } else { "all" })
}

fn detail_key(id: u64) -> CacheKey {
    CacheKey::new(NAMESPACE).with(id)
}

fn history_key(id: u64) -> CacheKey {
    detail_key(id).with("history")
}

fn responders_key() -> CacheKey {
    CacheKey::new(NAMESPACE).with("responders")
}

/// A workflow step on an existing transfer.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum TransferAction {
    Approve { notes: Option<String> },
    Reject { reason: String },
    Dispatch { details: Value },
    Pickup { details: Value },
    Arrive { details: Value },
    Complete { notes: Option<String> },
    Cancel { reason: String },
    AddNote { notes: String },
}

impl TransferAction {
    fn path_segment(&self) -> &'static str {
        match self {
            TransferAction::Approve { .. } => "approve",
            TransferAction::Reject { .. } => "reject",
            TransferAction::Dispatch { .. } => "dispatch",
            TransferAction::Pickup { .. } => "pickup",
            TransferAction::Arrive { .. } => "arrive",
            TransferAction::Complete { .. } => "complete",
            TransferAction::Cancel { .. } => "cancel",
            TransferAction::AddNote { .. } => "notes",
        }
    }

    fn body(&self) -> Value {
        match self {
            TransferAction::Approve { notes } | TransferAction::Complete { notes } => {
                json!({ "notes": notes })
            }
            TransferAction::Reject { reason } => json!({ "rejection_reason": reason }),
            TransferAction::Cancel { reason } => json!({ "cancellation_reason": reason }),
            TransferAction::AddNote { notes } => json!({ "notes": notes }),
            TransferAction::Dispatch { details }
            | TransferAction::Pickup { details }
            | TransferAction::Arrive { details } => details.clone(),
        }
    }
}

#[derive(Clone)]
pub struct TransferService {
    context: ServiceContext,
}

impl TransferService {
    pub fn new(context: ServiceContext) -> Self {
        Self { context }
    }

    /// Transfer list, optionally only those still in progress.
    pub async fn fetch_transfers(&self, active_only: bool, force_refresh: bool) -> ServiceResult<Fetched<Value>> {
        let params = if active_only {
            vec![("active", "true".to_string())]
        } else {
            Vec::new()
        };
        let producer = self
            .context
            .get_producer(TRANSFERS_PATH.to_string(), params);
        self.context
            .read(&list_key(active_only), producer, TRANSFERS_TTL, force_refresh)
            .await
    }

    pub async fn fetch_active_transfers(&self, force_refresh: bool) -> ServiceResult<Fetched<Value>> {
        self.fetch_transfers(true, force_refresh).await
    }

    /// One transfer, unwrapped from its `data` envelope.
    pub async fn fetch_transfer(&self, id: u64, force_refresh: bool) -> ServiceResult<Fetched<Value>> {
        let producer = self
            .context
            .get_producer(format!("{}/{}", TRANSFERS_PATH, id), Vec::new());
        let fetched = self
            .context
            .read(&detail_key(id), producer, TRANSFER_DETAIL_TTL, force_refresh)
            .await?;
        Ok(fetched.map(data_field))
    }

    /// One page of a transfer's audit trail.
    pub async fn fetch_history(&self, id: u64, page: u32, force_refresh: bool) -> ServiceResult<Fetched<Value>> {
        let producer = self.context.get_producer(
            format!("{}/{}/history", TRANSFERS_PATH, id),
            vec![("page", page.to_string())],
        );
        self.context
            .read(&history_key(id).with(page), producer, TRANSFER_DETAIL_TTL, force_refresh)
            .await
    }

    pub async fn fetch_available_responders(&self, force_refresh: bool) -> ServiceResult<Fetched<Value>> {
        let producer = self
            .context
            .get_producer(format!("{}/available-responders", TRANSFERS_PATH), Vec::new());
        let fetched = self
            .context
            .read(&responders_key(), producer, RESPONDERS_TTL, force_refresh)
            .await?;
        Ok(fetched.map(|raw| match data_field(raw) {
            Value::Null => Value::Array(Vec::new()),
            data => data,
        }))
    }

    pub async fn create(&self, body: Value) -> Result<Value, ApiError> {
        self.context
            .mutate(Method::POST, TRANSFERS_PATH, Some(body), &[lists_key().prefix()])
            .await
    }

    /// Runs a workflow step and drops everything cached about the transfer.
    pub async fn perform(&self, id: u64, action: TransferAction) -> Result<Value, ApiError> {
        let path = format!("{}/{}/{}", TRANSFERS_PATH, id, action.path_segment());
        let patterns: [KeyPattern; 3] = [
            lists_key().prefix(),
            detail_key(id).exact(),
            history_key(id).prefix(),
        ];
        self.context
            .mutate(Method::POST, &path, Some(action.body()), &patterns)
            .await
    }

    /// Cached list items without fetching.
    pub fn cached_transfers(&self, active_only: bool) -> Option<Value> {
        self.context
            .cache
            .get_cached(&list_key(active_only))
            .map(data_field)
            .filter(Value::is_array)
    }

    /// Folds a pushed transfer into every cached list and its cached detail.
    ///
    /// Returns how many entries were updated.
    pub fn merge_transfer(&self, transfer: &Value) -> usize {
        let Some(id) = transfer["id"].as_u64() else {
            return 0;
        };
        let cache = &self.context.cache;
        let mut updated = 0;

        for active_only in [false, true] {
            let key = list_key(active_only);
            let Some(Value::Object(mut envelope)) = cache.get_cached(&key) else {
                continue;
            };
            let Some(items) = envelope.get("data").and_then(Value::as_array) else {
                continue;
            };
            let items = upsert_by_id(items, transfer);
            envelope.insert("data".to_string(), Value::Array(items));
            cache.set_cached(key, Value::Object(envelope), Some(TRANSFERS_TTL));
            updated += 1;
        }

        if let Some(detail) = cache.get_cached(&detail_key(id)) {
            let current = &detail["data"];
            let merged = json!({ "data": merge_fields(current, transfer) });
            cache.set_cached(
                detail_key(id),
                merge_fields(&detail, &merged),
                Some(TRANSFER_DETAIL_TTL),
            );
            updated += 1;
        }

        updated
    }
}
