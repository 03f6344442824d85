// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

use crate::ApiError;

const POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Shared flag a caller flips to give up on an outstanding request.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Runs `work` on a worker thread and waits for it until `abort` elapses or
/// `cancel` is flipped, whichever comes first. A worker that finishes after
/// the caller gave up has its result dropped.
pub fn run_with_deadline<T, F>(
    url: &str,
    abort: Duration,
    cancel: &CancelToken,
    work: F,
) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, ApiError> + Send + 'static,
{
    if cancel.is_cancelled() {
        return Err(ApiError::Cancelled {
            url: url.to_owned(),
        });
    }

    let (tx, rx) = mpsc::channel();
    thread::Builder::new()
        .name("sendur-request".to_owned())
        .spawn(move || {
            let _ = tx.send(work());
        })
        .map_err(|source| ApiError::Spawn {
            url: url.to_owned(),
            source,
        })?;

    let deadline = Instant::now() + abort;
    loop {
        if cancel.is_cancelled() {
            return Err(ApiError::Cancelled {
                url: url.to_owned(),
            });
        }
        let now = Instant::now();
        if now >= deadline {
            return Err(ApiError::Aborted {
                url: url.to_owned(),
                after: abort,
            });
        }

        match rx.recv_timeout((deadline - now).min(POLL_INTERVAL)) {
            Ok(result) => return result,
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => {
                return Err(ApiError::WorkerLost {
                    url: url.to_owned(),
                });
            }
        }
    }
}
