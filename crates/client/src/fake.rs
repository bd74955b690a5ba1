//! Scripted in-memory transport for tests.

use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use reqwest::{Method, Url};
use tokio::time::Instant;

use crate::transport::{HttpRequest, HttpResponse, Transport, TransportError};

/// What the fake answers to one request.
#[derive(Debug, Clone)]
pub struct FakeReply {
    pub delay: Duration,
    pub result: Result<HttpResponse, TransportError>,
}

impl FakeReply {
    pub fn json(status: u16, body: serde_json::Value) -> Self {
        Self {
            delay: Duration::ZERO,
            result: Ok(HttpResponse::new(status, body.to_string())),
        }
    }

    pub fn raw(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            delay: Duration::ZERO,
            result: Ok(HttpResponse::new(status, body)),
        }
    }

    pub fn connection_refused() -> Self {
        Self {
            delay: Duration::ZERO,
            result: Err(TransportError::Connection("connection refused".into())),
        }
    }

    /// Answer only after `delay` of (tokio) time.
    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

/// A request as the fake saw it.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub method: Method,
    pub url: Url,
    pub body: Option<serde_json::Value>,
    pub at: Instant,
}

type Handler = dyn Fn(&HttpRequest) -> FakeReply + Send + Sync;

/// Transport that answers from a handler and records every call.
pub struct FakeTransport {
    handler: Box<Handler>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl FakeTransport {
    pub fn new(handler: impl Fn(&HttpRequest) -> FakeReply + Send + Sync + 'static) -> Self {
        Self {
            handler: Box::new(handler),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Give the same reply to every request.
    pub fn always(reply: FakeReply) -> Self {
        Self::new(move |_| reply.clone())
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

impl Transport for FakeTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        {
            let mut calls = self.calls.lock().unwrap_or_else(PoisonError::into_inner);
            calls.push(RecordedCall {
                method: request.method.clone(),
                url: request.url.clone(),
                body: request.body.clone(),
                at: Instant::now(),
            });
        }

        let reply = (self.handler)(&request);
        if !reply.delay.is_zero() {
            tokio::time::sleep(reply.delay).await;
        }
        reply.result
    }

    fn name(&self) -> &'static str {
        "fake"
    }
}
