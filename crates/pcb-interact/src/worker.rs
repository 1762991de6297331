//! Connectivity computed off the interaction thread.
//!
//! Requests carry a monotonically increasing id. Only the response to the
//! newest request is handed back; responses to superseded requests are
//! dropped when they arrive. If the worker thread cannot be started, or
//! goes away, requests are computed inline instead.

use std::collections::VecDeque;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::mpsc::{channel, Receiver, Sender, TryRecvError};
use std::thread::{self, JoinHandle};

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::connectivity::{compute_connectivity, ConnectivityMap};
use crate::error::WorkerError;
use crate::types::AnyCircuitElement;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectivityRequest {
    pub id: u64,
    pub elements: Vec<AnyCircuitElement>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectivityResponse {
    pub id: u64,
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<ConnectivityMap>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ConnectivityResponse {
    pub fn into_result(self) -> Result<ConnectivityMap, WorkerError> {
        match (self.ok, self.result) {
            (true, Some(map)) => Ok(map),
            _ => Err(WorkerError::Failed(
                self.error.unwrap_or_else(|| "no result".to_string()),
            )),
        }
    }
}

/// Answer one request. A panic inside the computation becomes an error
/// response rather than taking the worker down.
pub fn handle_request(request: ConnectivityRequest) -> ConnectivityResponse {
    let ConnectivityRequest { id, elements } = request;
    match catch_unwind(AssertUnwindSafe(|| compute_connectivity(&elements))) {
        Ok(map) => ConnectivityResponse {
            id,
            ok: true,
            result: Some(map),
            error: None,
        },
        Err(panic) => {
            let message = panic
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "connectivity computation panicked".to_string());
            ConnectivityResponse {
                id,
                ok: false,
                result: None,
                error: Some(message),
            }
        }
    }
}

fn worker_loop(requests: Receiver<ConnectivityRequest>, responses: Sender<ConnectivityResponse>) {
    for request in requests {
        if responses.send(handle_request(request)).is_err() {
            break;
        }
    }
}

enum Backend {
    Thread {
        requests: Option<Sender<ConnectivityRequest>>,
        responses: Receiver<ConnectivityResponse>,
        handle: Option<JoinHandle<()>>,
    },
    Inline {
        ready: VecDeque<ConnectivityResponse>,
    },
}

pub struct ConnectivityClient {
    backend: Backend,
    next_id: u64,
    latest: Option<u64>,
}

impl Default for ConnectivityClient {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectivityClient {
    pub fn new() -> Self {
        let (request_tx, request_rx) = channel();
        let (response_tx, response_rx) = channel();
        let spawned = thread::Builder::new()
            .name("connectivity".to_string())
            .spawn(move || worker_loop(request_rx, response_tx));
        let backend = match spawned {
            Ok(handle) => Backend::Thread {
                requests: Some(request_tx),
                responses: response_rx,
                handle: Some(handle),
            },
            Err(e) => {
                warn!("connectivity worker unavailable, computing inline: {e}");
                Backend::Inline {
                    ready: VecDeque::new(),
                }
            }
        };
        Self {
            backend,
            next_id: 0,
            latest: None,
        }
    }

    /// A client that always computes on the calling thread.
    pub fn inline() -> Self {
        Self {
            backend: Backend::Inline {
                ready: VecDeque::new(),
            },
            next_id: 0,
            latest: None,
        }
    }

    pub fn is_inline(&self) -> bool {
        matches!(self.backend, Backend::Inline { .. })
    }

    /// Queue a computation; earlier outstanding requests become stale.
    pub fn request(&mut self, elements: Vec<AnyCircuitElement>) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.latest = Some(id);
        let request = ConnectivityRequest { id, elements };

        let request = match &self.backend {
            Backend::Thread {
                requests: Some(tx), ..
            } => match tx.send(request) {
                Ok(()) => return id,
                Err(e) => {
                    warn!("connectivity worker gone, computing inline");
                    e.0
                }
            },
            _ => request,
        };
        self.fall_back_inline();
        if let Backend::Inline { ready } = &mut self.backend {
            ready.push_back(handle_request(request));
        }
        id
    }

    fn fall_back_inline(&mut self) {
        if !self.is_inline() {
            self.backend = Backend::Inline {
                ready: VecDeque::new(),
            };
        }
    }

    /// Keep `response` if it answers the newest request.
    fn accept(&mut self, response: ConnectivityResponse) -> Option<Result<ConnectivityMap, WorkerError>> {
        if Some(response.id) != self.latest {
            debug!("dropping stale connectivity response {}", response.id);
            return None;
        }
        self.latest = None;
        Some(response.into_result())
    }

    /// Non-blocking: the newest result if it has arrived.
    pub fn poll(&mut self) -> Option<Result<ConnectivityMap, WorkerError>> {
        loop {
            let next = match &mut self.backend {
                Backend::Thread { responses, .. } => match responses.try_recv() {
                    Ok(response) => response,
                    Err(TryRecvError::Empty) => return None,
                    Err(TryRecvError::Disconnected) => {
                        self.fall_back_inline();
                        return self.latest.take().map(|_| Err(WorkerError::Disconnected));
                    }
                },
                Backend::Inline { ready } => ready.pop_front()?,
            };
            if let Some(result) = self.accept(next) {
                return Some(result);
            }
        }
    }

    /// Block until the newest request is answered.
    pub fn wait(&mut self) -> Result<ConnectivityMap, WorkerError> {
        if self.latest.is_none() {
            return Err(WorkerError::Failed("no outstanding request".to_string()));
        }
        loop {
            let next = match &mut self.backend {
                Backend::Thread { responses, .. } => match responses.recv() {
                    Ok(response) => response,
                    Err(_) => {
                        self.fall_back_inline();
                        self.latest = None;
                        return Err(WorkerError::Disconnected);
                    }
                },
                Backend::Inline { ready } => ready.pop_front().ok_or(WorkerError::Disconnected)?,
            };
            if let Some(result) = self.accept(next) {
                return result;
            }
        }
    }
}

impl Drop for ConnectivityClient {
    fn drop(&mut self) {
        if let Backend::Thread {
            requests, handle, ..
        } = &mut self.backend
        {
            // closing the channel ends the worker loop
            requests.take();
            if let Some(handle) = handle.take() {
                if handle.join().is_err() {
                    warn!("connectivity worker panicked");
                }
            }
        }
    }
}
