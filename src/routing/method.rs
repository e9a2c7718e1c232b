//! Route method filter.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The method a route is registered for.
///
/// `Any` is the `*` wildcard and accepts every request method, including
/// extension methods outside the fixed set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Options,
    Head,
    Connect,
    Trace,
    #[serde(rename = "*")]
    Any,
}

impl Method {
    pub const ALL: [Method; 10] = [
        Method::Get,
        Method::Post,
        Method::Put,
        Method::Patch,
        Method::Delete,
        Method::Options,
        Method::Head,
        Method::Connect,
        Method::Trace,
        Method::Any,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
            Method::Options => "OPTIONS",
            Method::Head => "HEAD",
            Method::Connect => "CONNECT",
            Method::Trace => "TRACE",
            Method::Any => "*",
        }
    }

    /// Returns true if a request carrying `request_method` satisfies this filter.
    ///
    /// Comparison is exact string equality, so `get` does not match `GET`.
    pub fn accepts(&self, request_method: &str) -> bool {
        matches!(self, Method::Any) || self.as_str() == request_method
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a string is not one of the known route methods.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown route method: {0}")]
pub struct UnknownMethod(pub String);

impl FromStr for Method {
    type Err = UnknownMethod;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Method::ALL
            .iter()
            .copied()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| UnknownMethod(s.to_string()))
    }
}
