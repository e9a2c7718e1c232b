//! Mutable response record shared along a dispatch chain.
//!
//! # Design Decisions
//! - Status and body only; headers and content type are decided when the
//!   sink is rendered (`text/plain` for string bodies, JSON otherwise)
//! - Cheap to clone: every clone writes to the same record
//! - Last write wins

use std::sync::{Arc, Mutex, MutexGuard};

use serde_json::Value;

/// Snapshot of a response's status and body.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseParts {
    pub status: u16,
    pub body: Value,
}

impl Default for ResponseParts {
    fn default() -> Self {
        Self {
            status: 200,
            body: Value::String(String::new()),
        }
    }
}

/// Handle to the response being built for one request.
#[derive(Debug, Clone, Default)]
pub struct ResponseSink {
    parts: Arc<Mutex<ResponseParts>>,
}

impl ResponseSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the status code.
    pub fn status(&self, code: u16) -> &Self {
        self.lock().status = code;
        self
    }

    /// Replaces the body.
    pub fn send(&self, body: impl Into<Value>) -> &Self {
        self.lock().body = body.into();
        self
    }

    pub fn status_code(&self) -> u16 {
        self.lock().status
    }

    pub fn body(&self) -> Value {
        self.lock().body.clone()
    }

    pub fn snapshot(&self) -> ResponseParts {
        self.lock().clone()
    }

    // A handler that panicked mid-write leaves a complete record behind, so
    // a poisoned lock is still safe to read.
    fn lock(&self) -> MutexGuard<'_, ResponseParts> {
        self.parts.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
