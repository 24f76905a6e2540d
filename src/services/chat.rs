//! Chat conversations and messages.

use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;

use super::{data_field, list_or_empty, upsert_by_id, ServiceContext, ServiceResult};
use crate::cache::{CacheKey, Fetched};
use crate::client::{ApiError, Method};

const CONVERSATIONS_TTL: Duration = Duration::from_secs(15);
const CONVERSATIONS_PATH: &str = "/chat/conversations";
const MESSAGES_PATH: &str = "/chat/messages";

fn conversations_key() -> CacheKey {
    CacheKey::new("chat").with("conversations")
}

/// Narrows a message thread.
///
/// With an incident id the API returns only that incident's messages, so
/// closed incidents never leak into a new conversation between the same
/// two users.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct MessageFilter {
    pub incident_id: Option<u64>,
    pub conversation_id: Option<u64>,
}

impl MessageFilter {
    fn query(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        if let Some(id) = self.incident_id {
            params.push(("incident_id", id.to_string()));
        }
        if let Some(id) = self.conversation_id {
            params.push(("conversation_id", id.to_string()));
        }
        params
    }
}

#[derive(Clone)]
pub struct ChatService {
    context: ServiceContext,
}

impl ChatService {
    pub fn new(context: ServiceContext) -> Self {
        Self { context }
    }

    pub async fn get_conversations(&self, force_refresh: bool) -> ServiceResult<Fetched<Value>> {
        let producer = self
            .context
            .get_producer(CONVERSATIONS_PATH.to_string(), Vec::new());
        let fetched = self
            .context
            .read(&conversations_key(), producer, CONVERSATIONS_TTL, force_refresh)
            .await?;
        Ok(fetched.map(|raw| list_or_empty(data_field(raw))))
    }

    /// Messages exchanged with `other_user_id`. Never cached.
    pub async fn get_messages(&self, other_user_id: u64, filter: MessageFilter) -> Result<Value, ApiError> {
        let raw = self
            .context
            .client
            .get(&format!("{}/{}", MESSAGES_PATH, other_user_id), &filter.query())
            .await?;
        Ok(list_or_empty(data_field(raw)))
    }

    /// Sends a message; the conversation list is refetched on next read.
    pub async fn send_message(&self, payload: Value) -> Result<Value, ApiError> {
        let raw = self
            .context
            .mutate(
                Method::POST,
                MESSAGES_PATH,
                Some(payload),
                &[conversations_key().exact()],
            )
            .await?;
        Ok(data_field(raw))
    }

    /// Folds a pushed conversation into the cached list, if there is one.
    pub fn merge_conversation(&self, conversation: &Value) -> bool {
        if conversation["id"].is_null() {
            return false;
        }
        let key = conversations_key();
        let Some(raw) = self.context.cache.get_cached(&key) else {
            return false;
        };

        let merged = match raw {
            Value::Object(mut envelope) => match envelope.get("data").and_then(Value::as_array) {
                Some(items) => {
                    let updated = upsert_by_id(items, conversation);
                    envelope.insert("data".to_string(), Value::Array(updated));
                    Value::Object(envelope)
                }
                None => return false,
            },
            Value::Array(items) => Value::Array(upsert_by_id(&items, conversation)),
            _ => return false,
        };
        self.context
            .cache
            .set_cached(key, merged, Some(CONVERSATIONS_TTL));
        true
    }

    pub fn preload_conversations(&self) -> bool {
        let producer = self
            .context
            .get_producer(CONVERSATIONS_PATH.to_string(), Vec::new());
        self.context
            .cache
            .preload(conversations_key(), producer, Some(CONVERSATIONS_TTL))
    }
}
