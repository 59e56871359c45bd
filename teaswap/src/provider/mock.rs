//! Scripted provider for tests.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, PoisonError};

use alloy::primitives::TxHash;
use async_trait::async_trait;
use serde_json::{Value, json};
use tokio::sync::Notify;

use super::{
    Eip1193Provider, EventKind, Listener, ListenerId, ListenerRegistry, ProviderEvent, RpcRequest,
};
use crate::error::{ProviderError, ProviderResult};

type Reply = ProviderResult<Value>;

/// A provider that answers from a script and records every request.
///
/// Replies queued with [`push`](Self::push) are consumed first; afterwards
/// the per-method default set by [`respond`](Self::respond) or
/// [`fail`](Self::fail) is returned. Unscripted methods fail with `4200`.
#[derive(Default)]
pub(crate) struct MockProvider {
    calls: Mutex<Vec<RpcRequest>>,
    queued: Mutex<HashMap<String, VecDeque<Reply>>>,
    defaults: Mutex<HashMap<String, Reply>>,
    gates: Mutex<HashMap<String, Arc<Notify>>>,
    listeners: ListenerRegistry,
}

impl MockProvider {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Default success reply for `method`.
    pub(crate) fn respond(&self, method: &str, value: Value) {
        lock(&self.defaults).insert(method.to_owned(), Ok(value));
    }

    /// Default error reply for `method`.
    pub(crate) fn fail(&self, method: &str, error: ProviderError) {
        lock(&self.defaults).insert(method.to_owned(), Err(error));
    }

    /// One-shot reply for `method`, used before the default.
    pub(crate) fn push(&self, method: &str, reply: Reply) {
        lock(&self.queued)
            .entry(method.to_owned())
            .or_default()
            .push_back(reply);
    }

    /// Make requests to `method` wait until the returned handle is notified.
    pub(crate) fn hold(&self, method: &str) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        lock(&self.gates).insert(method.to_owned(), Arc::clone(&gate));
        gate
    }

    /// Every request received, in order.
    pub(crate) fn calls(&self) -> Vec<RpcRequest> {
        lock(&self.calls).clone()
    }

    /// Requests received for `method`.
    pub(crate) fn calls_to(&self, method: &str) -> Vec<RpcRequest> {
        self.calls()
            .into_iter()
            .filter(|call| call.method == method)
            .collect()
    }

    /// Number of requests received for `method`.
    pub(crate) fn count(&self, method: &str) -> usize {
        self.calls_to(method).len()
    }

    /// Names of the methods received, in order.
    pub(crate) fn methods(&self) -> Vec<String> {
        self.calls().into_iter().map(|call| call.method).collect()
    }

    /// Forget recorded requests.
    pub(crate) fn clear_calls(&self) {
        lock(&self.calls).clear();
    }

    /// Push an event to registered listeners.
    pub(crate) fn emit(&self, event: &ProviderEvent) {
        self.listeners.emit(event);
    }

    /// Number of registered listeners.
    pub(crate) fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    fn reply(&self, method: &str) -> Reply {
        if let Some(reply) = lock(&self.queued)
            .get_mut(method)
            .and_then(VecDeque::pop_front)
        {
            return reply;
        }
        lock(&self.defaults)
            .get(method)
            .cloned()
            .unwrap_or_else(|| Err(ProviderError::unsupported_method(method)))
    }
}

#[async_trait]
impl Eip1193Provider for MockProvider {
    async fn request(&self, request: RpcRequest) -> ProviderResult<Value> {
        let method = request.method.clone();
        lock(&self.calls).push(request);

        let gate = lock(&self.gates).get(&method).cloned();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        self.reply(&method)
    }

    fn on(&self, kind: EventKind, listener: Listener) -> ListenerId {
        self.listeners.add(kind, listener)
    }

    fn remove_listener(&self, id: ListenerId) {
        self.listeners.remove(id);
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A mined receipt payload.
pub(crate) fn receipt(hash: TxHash, success: bool) -> Value {
    json!({
        "transactionHash": hash,
        "blockNumber": "0x10",
        "status": if success { "0x1" } else { "0x0" },
    })
}
