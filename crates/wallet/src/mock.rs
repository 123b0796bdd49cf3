//! Scripted provider for adapter tests.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use quaiscope_common::error::RpcError;
use serde_json::Value;

use crate::rpc::ProviderRpc;

type Reply = Result<Value, RpcError>;

#[derive(Default)]
struct Script {
    replies: HashMap<String, VecDeque<Reply>>,
    calls: Vec<(String, Value)>,
}

/// Provider that answers each method from a queue of scripted replies.
///
/// The last reply queued for a method repeats forever. Unscripted methods
/// fail with JSON-RPC "method not found".
#[derive(Clone)]
pub struct MockProvider {
    markers: Vec<String>,
    script: Arc<Mutex<Script>>,
}

impl MockProvider {
    pub fn new(markers: &[&str]) -> Self {
        Self {
            markers: markers.iter().map(|m| m.to_string()).collect(),
            script: Arc::new(Mutex::new(Script::default())),
        }
    }

    pub fn reply(self, method: &str, value: Value) -> Self {
        self.push(method, Ok(value));
        self
    }

    pub fn fail(self, method: &str, code: i64, message: &str) -> Self {
        self.push(method, Err(RpcError::new(code, message)));
        self
    }

    fn push(&self, method: &str, reply: Reply) {
        self.script
            .lock()
            .unwrap()
            .replies
            .entry(method.to_string())
            .or_default()
            .push_back(reply);
    }

    pub fn shared(&self) -> Arc<dyn ProviderRpc> {
        Arc::new(self.clone())
    }

    pub fn calls(&self) -> Vec<(String, Value)> {
        self.script.lock().unwrap().calls.clone()
    }

    pub fn called(&self, method: &str) -> bool {
        self.calls().iter().any(|(m, _)| m == method)
    }
}

#[async_trait]
impl ProviderRpc for MockProvider {
    fn has_marker(&self, marker: &str) -> bool {
        self.markers.iter().any(|m| m == marker)
    }

    async fn request(&self, method: &str, params: Value) -> Result<Value, RpcError> {
        let mut script = self.script.lock().unwrap();
        script.calls.push((method.to_string(), params));

        match script.replies.get_mut(method) {
            Some(queue) if queue.len() > 1 => queue.pop_front().unwrap(),
            Some(queue) if !queue.is_empty() => queue[0].clone(),
            _ => Err(RpcError::new(-32601, format!("method not found: {method}"))),
        }
    }
}
