// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

mod cancel;
mod error;

pub use cancel::{CancelToken, run_with_deadline};
pub use error::ApiError;

use anyhow::{Context, Result, bail};
use reqwest::blocking::Client as HttpClient;
use reqwest::header::CONTENT_TYPE;
use sendur_app::Lead;
use std::time::Duration;
use tracing::debug;
use url::Url;

pub const FIND_ALL_PATH: &str = "sendur/api/leads/find-all";
pub const APPROVE_LEAD_EMAILS_PATH: &str = "sendur/api/leads/approve-lead-emails";

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_millis(3000);
pub const DEFAULT_ABORT_TIMEOUT: Duration = Duration::from_millis(6000);

/// `request` bounds a single HTTP exchange; `abort` is the hard deadline
/// after which a cancellable fetch stops waiting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub request: Duration,
    pub abort: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            request: DEFAULT_REQUEST_TIMEOUT,
            abort: DEFAULT_ABORT_TIMEOUT,
        }
    }
}

/// A successful read-all: the body exactly as received plus its decoded
/// form. The raw text is what goes into the session cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedLeads {
    pub raw: String,
    pub leads: Vec<Lead>,
}

impl FetchedLeads {
    pub fn parse(raw: String) -> Result<Self, ApiError> {
        let leads = serde_json::from_str(&raw).map_err(|source| ApiError::Decode {
            what: "lead collection",
            source,
        })?;
        Ok(Self { raw, leads })
    }
}

/// Response of the approve endpoint. The backend answers with a JSON list of
/// webhook receipts, but nothing beyond logging depends on its shape.
#[derive(Debug, Clone, PartialEq)]
pub struct Approval {
    pub status: u16,
    pub body: serde_json::Value,
}

impl Approval {
    pub fn receipt_count(&self) -> Option<usize> {
        self.body.as_array().map(Vec::len)
    }
}

/// Read-all seam so the loader can run against something other than HTTP.
pub trait LeadSource {
    fn fetch_all(&self, cancel: &CancelToken) -> Result<FetchedLeads, ApiError>;
}

/// Write seam for the bulk send.
pub trait ApprovalSink {
    fn approve_lead_emails(&self, leads: &[Lead]) -> Result<Approval, ApiError>;
}

#[derive(Debug, Clone)]
pub struct Client {
    base_url: Url,
    find_all_url: Url,
    approve_url: Url,
    timeouts: Timeouts,
    http: HttpClient,
}

impl Client {
    pub fn new(base_url: &str, timeouts: Timeouts) -> Result<Self> {
        let trimmed = base_url.trim().trim_end_matches('/');
        if trimmed.is_empty() {
            bail!("api.base_url must not be empty");
        }
        let base_url = Url::parse(&format!("{trimmed}/"))
            .with_context(|| format!("api.base_url {base_url:?} is not a valid URL"))?;
        if !matches!(base_url.scheme(), "http" | "https") {
            bail!(
                "api.base_url {:?} must use http or https, got {}",
                trimmed,
                base_url.scheme()
            );
        }
        if timeouts.request.is_zero() || timeouts.abort.is_zero() {
            bail!("api timeouts must be positive");
        }
        if timeouts.abort < timeouts.request {
            bail!(
                "api.abort_timeout ({}ms) must not be shorter than api.request_timeout ({}ms)",
                timeouts.abort.as_millis(),
                timeouts.request.as_millis()
            );
        }

        let find_all_url = base_url
            .join(FIND_ALL_PATH)
            .context("build find-all endpoint URL")?;
        let approve_url = base_url
            .join(APPROVE_LEAD_EMAILS_PATH)
            .context("build approve endpoint URL")?;

        let http = HttpClient::builder()
            .timeout(timeouts.request)
            .build()
            .context("build HTTP client")?;

        Ok(Self {
            base_url,
            find_all_url,
            approve_url,
            timeouts,
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_str().trim_end_matches('/')
    }

    pub fn find_all_url(&self) -> &str {
        self.find_all_url.as_str()
    }

    pub fn approve_url(&self) -> &str {
        self.approve_url.as_str()
    }

    pub const fn timeouts(&self) -> Timeouts {
        self.timeouts
    }

    /// Blocking read-all bounded by the request timeout only.
    pub fn find_all(&self) -> Result<FetchedLeads, ApiError> {
        let url = self.find_all_url.as_str();
        debug!(url, "fetching leads");
        let response = self
            .http
            .get(self.find_all_url.clone())
            .send()
            .map_err(|source| error::transport_error(url, self.timeouts.request, source))?;

        let status = response.status();
        let body = response.text().map_err(|source| ApiError::Body {
            url: url.to_owned(),
            source,
        })?;
        if !status.is_success() {
            return Err(error::status_error(status, &body));
        }
        FetchedLeads::parse(body)
    }

    /// Read-all on a worker thread, given up on at the abort deadline or when
    /// `cancel` fires.
    pub fn find_all_cancellable(&self, cancel: &CancelToken) -> Result<FetchedLeads, ApiError> {
        let client = self.clone();
        run_with_deadline(
            self.find_all_url.as_str(),
            self.timeouts.abort,
            cancel,
            move || client.find_all(),
        )
    }

    pub fn approve_lead_emails(&self, leads: &[Lead]) -> Result<Approval, ApiError> {
        let url = self.approve_url.as_str();
        let payload = serde_json::to_vec(leads).map_err(|source| ApiError::Encode {
            what: "selected leads",
            source,
        })?;
        debug!(url, count = leads.len(), "posting approved leads");

        let response = self
            .http
            .post(self.approve_url.clone())
            .header(CONTENT_TYPE, "application/json")
            .body(payload)
            .send()
            .map_err(|source| error::transport_error(url, self.timeouts.request, source))?;

        let status = response.status();
        let body = response.text().map_err(|source| ApiError::Body {
            url: url.to_owned(),
            source,
        })?;
        if !status.is_success() {
            return Err(error::status_error(status, &body));
        }

        Ok(Approval {
            status: status.as_u16(),
            body: parse_loose_body(&body),
        })
    }
}

impl LeadSource for Client {
    fn fetch_all(&self, cancel: &CancelToken) -> Result<FetchedLeads, ApiError> {
        self.find_all_cancellable(cancel)
    }
}

impl ApprovalSink for Client {
    fn approve_lead_emails(&self, leads: &[Lead]) -> Result<Approval, ApiError> {
        Client::approve_lead_emails(self, leads)
    }
}

fn parse_loose_body(body: &str) -> serde_json::Value {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return serde_json::Value::Null;
    }
    serde_json::from_str(trimmed).unwrap_or_else(|_| serde_json::Value::String(trimmed.to_owned()))
}
