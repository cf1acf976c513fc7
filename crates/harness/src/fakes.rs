use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;

use serde_json::Value;
use storefront_engine::backend::{
    ApiClient, CheckoutGateway, CheckoutRequest, CheckoutSession, HttpResponse, TransportError,
};
use storefront_engine::host::{Clipboard, Clock, HostError};

/// Test-controlled time.
#[derive(Clone, Default)]
pub struct ManualClock {
    now: Rc<Cell<u64>>,
}

impl ManualClock {
    pub fn new(start_ms: u64) -> Self {
        Self { now: Rc::new(Cell::new(start_ms)) }
    }

    pub fn advance(&self, ms: u64) {
        self.now.set(self.now.get() + ms);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.now.get()
    }
}

/// Backend with scripted responses. An empty script behaves as offline.
#[derive(Clone, Default)]
pub struct FakeApi {
    responses: Rc<RefCell<VecDeque<HttpResponse>>>,
    requests: Rc<RefCell<Vec<(String, Value)>>>,
}

impl FakeApi {
    pub fn respond(&self, status: u16, body: Value) {
        self.responses.borrow_mut().push_back(HttpResponse::new(status, body));
    }

    pub fn requests(&self) -> Vec<(String, Value)> {
        self.requests.borrow().clone()
    }
}

impl ApiClient for FakeApi {
    fn post_json(&mut self, path: &str, body: &Value) -> Result<HttpResponse, TransportError> {
        self.requests.borrow_mut().push((path.to_string(), body.clone()));
        self.responses
            .borrow_mut()
            .pop_front()
            .ok_or_else(|| TransportError::Unreachable("no scripted response".into()))
    }
}

#[derive(Clone, Default)]
pub struct FakeClipboard {
    fail: Rc<Cell<bool>>,
    written: Rc<RefCell<Vec<String>>>,
}

impl FakeClipboard {
    pub fn deny(&self) {
        self.fail.set(true);
    }

    pub fn written(&self) -> Vec<String> {
        self.written.borrow().clone()
    }
}

impl Clipboard for FakeClipboard {
    fn write_text(&mut self, text: &str) -> Result<(), HostError> {
        if self.fail.get() {
            return Err(HostError::PermissionDenied("clipboard-write".into()));
        }
        self.written.borrow_mut().push(text.to_string());
        Ok(())
    }
}

/// Hosted checkout that hands out sequential sessions, or fails when told to.
#[derive(Clone, Default)]
pub struct FakeGateway {
    offline: Rc<Cell<bool>>,
    requests: Rc<RefCell<Vec<CheckoutRequest>>>,
}

impl FakeGateway {
    pub fn go_offline(&self) {
        self.offline.set(true);
    }

    pub fn requests(&self) -> Vec<CheckoutRequest> {
        self.requests.borrow().clone()
    }
}

impl CheckoutGateway for FakeGateway {
    fn create_session(&mut self, request: &CheckoutRequest) -> Result<CheckoutSession, TransportError> {
        if self.offline.get() {
            return Err(TransportError::Timeout);
        }
        let mut requests = self.requests.borrow_mut();
        requests.push(request.clone());
        let id = format!("cs_test_{}", requests.len());
        Ok(CheckoutSession {
            url: format!("https://checkout.example.com/pay/{id}"),
            id,
        })
    }
}
