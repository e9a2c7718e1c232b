//! Handler faults and the built-in last-resort error handler.

use std::any::Any;
use std::error::Error as StdError;
use std::fmt;
use std::time::Duration;

use serde_json::{json, Value};

use crate::http::request::RequestView;
use crate::http::response::ResponseSink;

/// A failure raised by a route or error handler.
///
/// Any `std::error::Error` converts into it, so handlers can use `?`.
/// A fault is either exception-like (name, message, stack) or an arbitrary
/// thrown value; only the former is written into the response by the
/// default error handler.
pub struct HandlerError {
    repr: Repr,
}

enum Repr {
    Exception {
        name: String,
        message: String,
        stack: String,
        source: Option<Box<dyn StdError + Send + Sync>>,
    },
    Value(Value),
}

impl HandlerError {
    pub fn new(name: impl Into<String>, message: impl Into<String>) -> Self {
        let name = name.into();
        let message = message.into();
        let stack = format!("{name}: {message}");
        Self {
            repr: Repr::Exception {
                name,
                message,
                stack,
                source: None,
            },
        }
    }

    /// An exception named `Error`.
    pub fn msg(message: impl Into<String>) -> Self {
        Self::new("Error", message)
    }

    /// A fault carrying a plain value rather than an error.
    pub fn value(value: impl Into<Value>) -> Self {
        Self {
            repr: Repr::Value(value.into()),
        }
    }

    pub fn timeout(limit: Duration) -> Self {
        Self::new(
            "TimeoutError",
            format!("handler did not finish within {}ms", limit.as_millis()),
        )
    }

    pub fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "handler panicked".to_string()
        };
        Self::new("panic", message)
    }

    pub fn name(&self) -> &str {
        match &self.repr {
            Repr::Exception { name, .. } => name,
            Repr::Value(_) => "value",
        }
    }

    pub fn message(&self) -> String {
        match &self.repr {
            Repr::Exception { message, .. } => message.clone(),
            Repr::Value(value) => value.to_string(),
        }
    }

    /// The error followed by its `source()` chain, one per line.
    pub fn stack(&self) -> Option<&str> {
        match &self.repr {
            Repr::Exception { stack, .. } => Some(stack),
            Repr::Value(_) => None,
        }
    }

    pub fn thrown_value(&self) -> Option<&Value> {
        match &self.repr {
            Repr::Value(value) => Some(value),
            Repr::Exception { .. } => None,
        }
    }

    pub fn downcast_ref<E: StdError + 'static>(&self) -> Option<&E> {
        match &self.repr {
            Repr::Exception {
                source: Some(source),
                ..
            } => source.downcast_ref::<E>(),
            _ => None,
        }
    }

    /// `{name, message, stack}` for exception-like faults.
    pub fn to_json(&self) -> Option<Value> {
        match &self.repr {
            Repr::Exception {
                name,
                message,
                stack,
                ..
            } => Some(json!({
                "name": name,
                "message": message,
                "stack": stack,
            })),
            Repr::Value(_) => None,
        }
    }
}

impl<E> From<E> for HandlerError
where
    E: StdError + Send + Sync + 'static,
{
    fn from(error: E) -> Self {
        let name = short_type_name::<E>().to_string();
        let message = error.to_string();

        let mut stack = format!("{name}: {message}");
        let mut cause = error.source();
        while let Some(inner) = cause {
            stack.push_str("\n    caused by: ");
            stack.push_str(&inner.to_string());
            cause = inner.source();
        }

        Self {
            repr: Repr::Exception {
                name,
                message,
                stack,
                source: Some(Box::new(error)),
            },
        }
    }
}

impl fmt::Display for HandlerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.repr {
            Repr::Exception { name, message, .. } => write!(f, "{name}: {message}"),
            Repr::Value(value) => write!(f, "thrown value: {value}"),
        }
    }
}

impl fmt::Debug for HandlerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.repr {
            Repr::Exception { stack, .. } => f.write_str(stack),
            Repr::Value(value) => f.debug_tuple("HandlerError::Value").field(value).finish(),
        }
    }
}

fn short_type_name<E>() -> &'static str {
    let full = std::any::type_name::<E>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}

/// Final link of every error chain. Never fails.
pub(crate) fn default_error_handler(error: &HandlerError, request: &RequestView, response: &ResponseSink) {
    tracing::error!(
        method = %request.method(),
        path = %request.path(),
        error = ?error,
        "Unhandled handler error"
    );

    if let Some(body) = error.to_json() {
        response.status(500).send(body);
    }
}
