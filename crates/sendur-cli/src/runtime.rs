// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result};
use sendur_api::{ApiError, ApprovalSink, CancelToken, Client, FetchedLeads, LeadSource};
use sendur_app::Lead;
use sendur_store::{SessionCache, read_cached_leads, write_cached_leads};
use sendur_tui::{AppRuntime, InternalEvent, LeadsPayload};
use std::sync::mpsc::Sender;
use std::thread;
use tracing::{debug, info};

/// Wires the HTTP client and the session cache into the event loop. Network
/// work runs on named worker threads; the cache stays on the loop thread.
pub struct LeadRuntime {
    client: Client,
    cache: Box<dyn SessionCache>,
    cancel: CancelToken,
}

impl LeadRuntime {
    pub fn new(client: Client, cache: Box<dyn SessionCache>) -> Self {
        Self {
            client,
            cache,
            cancel: CancelToken::new(),
        }
    }
}

impl AppRuntime for LeadRuntime {
    fn load_cached_leads(&mut self) -> Option<Vec<Lead>> {
        read_cached_leads(self.cache.as_ref())
    }

    fn cache_leads(&mut self, raw: &str) -> Result<()> {
        write_cached_leads(self.cache.as_mut(), raw)
    }

    fn fetch_leads(&mut self) -> Result<LeadsPayload> {
        Ok(fetch_leads(&self.client, &self.cancel)?)
    }

    fn send_selection(&mut self, request_id: u64, leads: &[Lead]) -> Result<String> {
        approve_leads(&self.client, request_id, leads)
    }

    fn spawn_fetch_leads(&mut self, tx: Sender<InternalEvent>) -> Result<()> {
        let client = self.client.clone();
        let cancel = self.cancel.clone();
        thread::Builder::new()
            .name("sendur-load".to_owned())
            .spawn(move || {
                let event = match fetch_leads(&client, &cancel) {
                    Ok(LeadsPayload { raw, leads }) => InternalEvent::LeadsFetched { raw, leads },
                    Err(error) => InternalEvent::FetchFailed {
                        cancelled: error.is_cancellation(),
                        error: format!("{:#}", anyhow::Error::new(error)),
                    },
                };
                let _ = tx.send(event);
            })
            .context("spawn lead loader thread")?;
        Ok(())
    }

    fn spawn_send_selection(
        &mut self,
        request_id: u64,
        leads: Vec<Lead>,
        tx: Sender<InternalEvent>,
    ) -> Result<()> {
        let client = self.client.clone();
        thread::Builder::new()
            .name(format!("sendur-send-{request_id}"))
            .spawn(move || {
                let event = match approve_leads(&client, request_id, &leads) {
                    Ok(summary) => InternalEvent::SendCompleted {
                        request_id,
                        summary,
                    },
                    Err(error) => InternalEvent::SendFailed {
                        request_id,
                        error: format!("{error:#}"),
                    },
                };
                let _ = tx.send(event);
            })
            .context("spawn send thread")?;
        Ok(())
    }

    fn cancel_fetch(&mut self) {
        debug!("cancelling outstanding lead fetch");
        self.cancel.cancel();
    }
}

fn fetch_leads<S: LeadSource>(
    source: &S,
    cancel: &CancelToken,
) -> std::result::Result<LeadsPayload, ApiError> {
    let FetchedLeads { raw, leads } = source.fetch_all(cancel)?;
    Ok(LeadsPayload { raw, leads })
}

fn approve_leads<A: ApprovalSink>(sink: &A, request_id: u64, leads: &[Lead]) -> Result<String> {
    debug!(request_id, count = leads.len(), "sending selected leads");
    let approval = sink.approve_lead_emails(leads)?;
    info!(
        request_id,
        status = approval.status,
        body = %approval.body,
        "leads sent for approval"
    );
    Ok(match approval.receipt_count() {
        Some(receipts) => format!("approved {} leads ({receipts} receipts)", leads.len()),
        None => format!("approved {} leads", leads.len()),
    })
}

#[cfg(test)]
mod tests {
    use super::LeadRuntime;
    use anyhow::Result;
    use sendur_api::{Client, Timeouts};
    use sendur_app::Lead;
    use sendur_store::{FileSessionCache, MemorySessionCache, SessionCache};
    use sendur_testkit::{MockResponse, MockServer, leads_json, sample_leads, temp_dir};
    use sendur_tui::{AppRuntime, InternalEvent};
    use std::sync::mpsc;
    use std::time::Duration;

    const EVENT_WAIT: Duration = Duration::from_secs(5);

    fn client_for(server: &MockServer) -> Result<Client> {
        Client::new(
            server.base_url(),
            Timeouts {
                request: Duration::from_secs(2),
                abort: Duration::from_secs(3),
            },
        )
    }

    fn memory_runtime(server: &MockServer) -> Result<LeadRuntime> {
        Ok(LeadRuntime::new(
            client_for(server)?,
            Box::new(MemorySessionCache::new()),
        ))
    }

    #[test]
    fn cached_session_is_served_without_network() -> Result<()> {
        let leads = sample_leads(8);
        let mut cache = MemorySessionCache::new();
        cache.set(sendur_store::LEADS_CACHE_KEY, &leads_json(&leads)?)?;

        let server = MockServer::start(Vec::new())?;
        let mut runtime = LeadRuntime::new(client_for(&server)?, Box::new(cache));
        assert_eq!(runtime.load_cached_leads(), Some(leads));

        let requests = server.finish()?;
        assert!(requests.is_empty(), "unexpected requests: {requests:?}");
        Ok(())
    }

    #[test]
    fn spawned_fetch_reports_leads_and_raw_body_is_cacheable() -> Result<()> {
        let leads = sample_leads(5);
        let raw = leads_json(&leads)?;
        let server = MockServer::start(vec![MockResponse::json(raw.clone())])?;
        let mut runtime = memory_runtime(&server)?;
        assert_eq!(runtime.load_cached_leads(), None);

        let (tx, rx) = mpsc::channel();
        runtime.spawn_fetch_leads(tx)?;
        let event = rx.recv_timeout(EVENT_WAIT)?;
        let InternalEvent::LeadsFetched {
            raw: fetched_raw,
            leads: fetched,
        } = event
        else {
            panic!("expected fetched leads, got {event:?}");
        };
        assert_eq!(fetched, leads);
        assert_eq!(fetched_raw, raw);

        runtime.cache_leads(&fetched_raw)?;
        assert_eq!(runtime.load_cached_leads(), Some(leads));
        assert_eq!(server.finish()?.len(), 1);
        Ok(())
    }

    #[test]
    fn spawned_fetch_reports_server_failures() -> Result<()> {
        let server = MockServer::start(vec![MockResponse::status(
            500,
            r#"{"status":500,"error":"Internal Server Error"}"#,
        )])?;
        let mut runtime = memory_runtime(&server)?;

        let (tx, rx) = mpsc::channel();
        runtime.spawn_fetch_leads(tx)?;
        match rx.recv_timeout(EVENT_WAIT)? {
            InternalEvent::FetchFailed { error, cancelled } => {
                assert!(error.contains("server error (500)"), "got {error}");
                assert!(!cancelled);
            }
            other => panic!("expected failure, got {other:?}"),
        }
        assert_eq!(runtime.load_cached_leads(), None);
        server.finish()?;
        Ok(())
    }

    #[test]
    fn cancel_stops_waiting_for_a_slow_fetch() -> Result<()> {
        let server = MockServer::start(vec![
            MockResponse::json("[]").delayed(Duration::from_millis(1500)),
        ])?;
        let mut runtime = memory_runtime(&server)?;

        let (tx, rx) = mpsc::channel();
        runtime.spawn_fetch_leads(tx)?;
        std::thread::sleep(Duration::from_millis(100));
        runtime.cancel_fetch();

        match rx.recv_timeout(Duration::from_secs(1))? {
            InternalEvent::FetchFailed { error, cancelled } => {
                assert!(error.contains("was cancelled"), "got {error}");
                assert!(cancelled);
            }
            other => panic!("expected cancellation, got {other:?}"),
        }
        server.finish()?;
        Ok(())
    }

    #[test]
    fn spawned_send_posts_selection_and_summarizes_receipts() -> Result<()> {
        let selection = sample_leads(3);
        let server = MockServer::start(vec![MockResponse::json(
            r#"[{"messageId":"a"},{"messageId":"b"},{"messageId":"c"}]"#,
        )])?;
        let mut runtime = memory_runtime(&server)?;

        let (tx, rx) = mpsc::channel();
        runtime.spawn_send_selection(7, selection.clone(), tx)?;
        assert_eq!(
            rx.recv_timeout(EVENT_WAIT)?,
            InternalEvent::SendCompleted {
                request_id: 7,
                summary: "approved 3 leads (3 receipts)".to_owned(),
            }
        );

        let requests = server.finish()?;
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].method, "POST");
        assert_eq!(requests[0].url, "/sendur/api/leads/approve-lead-emails");
        let posted: Vec<Lead> = serde_json::from_str(&requests[0].body)?;
        assert_eq!(posted, selection);
        Ok(())
    }

    #[test]
    fn repeated_sends_each_reach_the_server() -> Result<()> {
        let selection = sample_leads(2);
        let server = MockServer::start(vec![
            MockResponse::json("[]").delayed(Duration::from_millis(200)),
            MockResponse::json("[]"),
        ])?;
        let mut runtime = memory_runtime(&server)?;

        let (tx, rx) = mpsc::channel();
        runtime.spawn_send_selection(1, selection.clone(), tx.clone())?;
        runtime.spawn_send_selection(2, selection, tx)?;

        let mut finished = Vec::new();
        for _ in 0..2 {
            match rx.recv_timeout(EVENT_WAIT)? {
                InternalEvent::SendCompleted { request_id, .. } => finished.push(request_id),
                other => panic!("expected completion, got {other:?}"),
            }
        }
        finished.sort_unstable();
        assert_eq!(finished, vec![1, 2]);
        assert_eq!(server.finish()?.len(), 2);
        Ok(())
    }

    #[test]
    fn failed_send_is_reported_with_its_request_id() -> Result<()> {
        let server = MockServer::start(vec![MockResponse::status(400, "Webhook call failed")])?;
        let mut runtime = memory_runtime(&server)?;

        let (tx, rx) = mpsc::channel();
        runtime.spawn_send_selection(4, sample_leads(1), tx)?;
        assert_eq!(
            rx.recv_timeout(EVENT_WAIT)?,
            InternalEvent::SendFailed {
                request_id: 4,
                error: "server error (400): Webhook call failed".to_owned(),
            }
        );
        server.finish()?;
        Ok(())
    }

    #[test]
    fn file_session_is_shared_by_later_launches() -> Result<()> {
        let root = temp_dir()?;
        let leads = sample_leads(4);
        let raw = leads_json(&leads)?;

        let first_server = MockServer::start(vec![MockResponse::json(raw.clone())])?;
        let mut first = LeadRuntime::new(
            client_for(&first_server)?,
            Box::new(FileSessionCache::open(root.path(), "ppid-77")?),
        );
        let payload = first.fetch_leads()?;
        first.cache_leads(&payload.raw)?;
        assert_eq!(first_server.finish()?.len(), 1);

        let second_server = MockServer::start(Vec::new())?;
        let mut second = LeadRuntime::new(
            client_for(&second_server)?,
            Box::new(FileSessionCache::open(root.path(), "ppid-77")?),
        );
        assert_eq!(second.load_cached_leads(), Some(leads));
        assert!(second_server.finish()?.is_empty());
        Ok(())
    }
}
