// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use reqwest::StatusCode;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(
        "cannot reach {url} -- check [api].base_url and that the leads service is running ({source})"
    )]
    Connect {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("request to {url} timed out after {}ms", .after.as_millis())]
    Timeout { url: String, after: Duration },
    #[error("request to {url} aborted after {}ms", .after.as_millis())]
    Aborted { url: String, after: Duration },
    #[error("request to {url} was cancelled")]
    Cancelled { url: String },
    #[error("server error ({status}): {message}")]
    Status { status: u16, message: String },
    #[error("read response body from {url}")]
    Body {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("encode {what}")]
    Encode {
        what: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error("decode {what}")]
    Decode {
        what: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error("start request worker for {url}")]
    Spawn {
        url: String,
        #[source]
        source: std::io::Error,
    },
    #[error("request worker for {url} stopped without a result")]
    WorkerLost { url: String },
}

impl ApiError {
    /// True when the caller gave up through its `CancelToken`. Hitting the
    /// abort deadline is a failure, not a cancellation.
    pub const fn is_cancellation(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }
}

pub(crate) fn transport_error(url: &str, timeout: Duration, error: reqwest::Error) -> ApiError {
    if error.is_timeout() {
        return ApiError::Timeout {
            url: url.to_owned(),
            after: timeout,
        };
    }
    ApiError::Connect {
        url: url.to_owned(),
        source: error,
    }
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    message: Option<String>,
    error: Option<String>,
}

pub(crate) fn status_error(status: StatusCode, body: &str) -> ApiError {
    let status_code = status.as_u16();
    let trimmed = body.trim();

    if let Ok(parsed) = serde_json::from_str::<ErrorEnvelope>(trimmed) {
        let message = parsed
            .message
            .filter(|message| !message.is_empty())
            .or(parsed.error.filter(|error| !error.is_empty()));
        if let Some(message) = message {
            return ApiError::Status {
                status: status_code,
                message,
            };
        }
    }

    let message = if !trimmed.is_empty() && trimmed.len() < 100 && !trimmed.contains('{') {
        trimmed.to_owned()
    } else {
        status
            .canonical_reason()
            .unwrap_or("unexpected status")
            .to_owned()
    };
    ApiError::Status {
        status: status_code,
        message,
    }
}
