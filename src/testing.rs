//! In-memory policy and chat doubles that record every call.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use crate::services::chat::{ChatClient, ChatError, PostMessage};
use crate::services::policy::{PolicyClient, PolicyError, defined_or_empty};

#[derive(Debug, Default)]
pub struct RecordingPolicy {
    responses: HashMap<String, Value>,
    fail: bool,
    calls: Mutex<Vec<(String, Value)>>,
}

impl RecordingPolicy {
    /// Every query is undefined unless a response is registered.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn respond(mut self, query: &str, output: Value) -> Self {
        self.responses.insert(query.to_string(), output);
        self
    }

    pub fn calls(&self) -> Vec<(String, Value)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn queries(&self) -> Vec<String> {
        self.calls().into_iter().map(|(q, _)| q).collect()
    }
}

#[async_trait]
impl PolicyClient for RecordingPolicy {
    async fn query(&self, query: &str, input: &Value) -> Result<Value, PolicyError> {
        self.calls
            .lock()
            .unwrap()
            .push((query.to_string(), input.clone()));

        if self.fail {
            return Err(PolicyError::Eval {
                query: query.to_string(),
                reason: "engine unavailable".into(),
            });
        }
        Ok(defined_or_empty(
            self.responses.get(query).cloned().unwrap_or(Value::Null),
        ))
    }
}

#[derive(Debug, Default)]
pub struct RecordingChat {
    fail_at: Option<usize>,
    attempts: Mutex<usize>,
    sent: Mutex<Vec<PostMessage>>,
}

impl RecordingChat {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fails the post with the given zero-based index.
    pub fn failing_at(index: usize) -> Self {
        Self {
            fail_at: Some(index),
            ..Self::default()
        }
    }

    pub fn sent(&self) -> Vec<PostMessage> {
        self.sent.lock().unwrap().clone()
    }

    pub fn channels(&self) -> Vec<String> {
        self.sent().into_iter().map(|m| m.channel).collect()
    }

    pub fn attempts(&self) -> usize {
        *self.attempts.lock().unwrap()
    }
}

#[async_trait]
impl ChatClient for RecordingChat {
    async fn post_message(&self, message: &PostMessage) -> Result<(), ChatError> {
        let attempt = {
            let mut attempts = self.attempts.lock().unwrap();
            *attempts += 1;
            *attempts - 1
        };
        if self.fail_at == Some(attempt) {
            return Err(ChatError::Api("channel_not_found".into()));
        }
        self.sent.lock().unwrap().push(message.clone());
        Ok(())
    }
}
