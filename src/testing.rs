/// In-memory fakes for the platform seams
use crate::api::{HttpResponse, HttpTransport, TransportError};
use crate::config::KeyValueStore;
use crate::error::LinkResult;
use crate::session::Clock;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde_json::{Map, Value};
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;

/// Build a three-segment token around the given payload
pub fn make_token(payload: Value) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"RS256","typ":"JWT"}"#);
    let body = URL_SAFE_NO_PAD.encode(payload.to_string());
    format!("{}.{}.signature", header, body)
}

/// Shared map standing in for chrome.storage.sync. Clones see the same data.
#[derive(Clone, Default)]
pub struct MemoryStore {
    data: Rc<RefCell<Map<String, Value>>>,
    writes: Rc<Cell<usize>>,
    removes: Rc<Cell<usize>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore::default()
    }

    pub fn with(initial: Value) -> Self {
        let store = MemoryStore::new();
        if let Value::Object(map) = initial {
            *store.data.borrow_mut() = map;
        }
        store
    }

    pub fn snapshot(&self) -> Map<String, Value> {
        self.data.borrow().clone()
    }

    pub fn writes(&self) -> usize {
        self.writes.get()
    }

    pub fn removes(&self) -> usize {
        self.removes.get()
    }
}

impl KeyValueStore for MemoryStore {
    async fn get(&self, keys: &[&str]) -> LinkResult<Map<String, Value>> {
        let data = self.data.borrow();
        Ok(keys
            .iter()
            .filter_map(|key| data.get(*key).map(|value| (key.to_string(), value.clone())))
            .collect())
    }

    async fn set(&self, values: Map<String, Value>) -> LinkResult<()> {
        self.writes.set(self.writes.get() + 1);
        self.data.borrow_mut().extend(values);
        Ok(())
    }

    async fn remove(&self, keys: &[&str]) -> LinkResult<()> {
        self.removes.set(self.removes.get() + 1);
        let mut data = self.data.borrow_mut();
        for key in keys {
            data.remove(*key);
        }
        Ok(())
    }
}

pub struct FixedClock {
    now: Cell<i64>,
}

impl FixedClock {
    pub fn new(now: i64) -> Self {
        FixedClock { now: Cell::new(now) }
    }
}

impl Clock for FixedClock {
    fn now_ms(&self) -> i64 {
        self.now.get()
    }
}

/// A request seen by `RecordingTransport`
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub url: String,
    pub bearer: String,
    pub body: Value,
}

/// Replays queued responses and records every request
#[derive(Clone, Default)]
pub struct RecordingTransport {
    responses: Rc<RefCell<VecDeque<Result<HttpResponse, TransportError>>>>,
    requests: Rc<RefCell<Vec<RecordedRequest>>>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        RecordingTransport::default()
    }

    pub fn respond(self, status: u16, status_text: &str, body: &str) -> Self {
        self.responses.borrow_mut().push_back(Ok(HttpResponse {
            status,
            status_text: status_text.to_string(),
            body: body.to_string(),
        }));
        self
    }

    pub fn fail(self, message: &str) -> Self {
        self.responses
            .borrow_mut()
            .push_back(Err(TransportError(message.to_string())));
        self
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.borrow().clone()
    }
}

impl HttpTransport for RecordingTransport {
    async fn post_json(&self, url: &str, bearer: &str, body: String) -> Result<HttpResponse, TransportError> {
        self.requests.borrow_mut().push(RecordedRequest {
            url: url.to_string(),
            bearer: bearer.to_string(),
            body: serde_json::from_str(&body).unwrap_or(Value::Null),
        });
        self.responses
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| Err(TransportError("no response queued".to_string())))
    }
}
