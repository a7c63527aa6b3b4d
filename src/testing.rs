//! In-memory [`Transport`] for exercising the client without a server.
//!
//! ```rust,ignore
//! let transport = ScriptedTransport::new();
//! transport.reply(Method::Get, "/projects", Reply::status(403));
//! transport.reply(Method::Post, "/auth/refresh", Reply::json(200, json!({"accessToken": "T2"})));
//! transport.reply(Method::Get, "/projects", Reply::json(200, json!([])));
//! ```

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::Value as JsonValue;

use crate::error::Error;
use crate::transport::{Method, OutboundRequest, RawResponse, Transport};

/// A canned reaction to one call.
#[derive(Debug, Clone)]
pub struct Reply {
    outcome: Result<RawResponse, String>,
    delay: Option<Duration>,
}

impl Reply {
    /// Empty body with `status`.
    #[must_use]
    pub fn status(status: u16) -> Self {
        Self::text(status, "")
    }

    #[must_use]
    pub fn json(status: u16, body: JsonValue) -> Self {
        Self::text(status, body.to_string())
    }

    #[must_use]
    pub fn text(status: u16, body: impl Into<String>) -> Self {
        Self {
            outcome: Ok(RawResponse {
                status,
                body: body.into(),
            }),
            delay: None,
        }
    }

    /// No response at all.
    #[must_use]
    pub fn network_failure(message: impl Into<String>) -> Self {
        Self {
            outcome: Err(message.into()),
            delay: None,
        }
    }

    /// Hold the reply back for `delay` before delivering it.
    #[must_use]
    pub fn after(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

type Responder = Arc<dyn Fn(&OutboundRequest) -> Reply + Send + Sync>;

#[derive(Default)]
struct Script {
    queued: HashMap<(Method, String), VecDeque<Reply>>,
    responders: HashMap<(Method, String), Responder>,
    calls: Vec<OutboundRequest>,
}

/// Transport that answers from per-route scripts and records every call.
///
/// Queued replies for a route are consumed in order; once exhausted, a
/// responder registered with [`respond_with`](Self::respond_with) is used;
/// otherwise the call gets a 404.
#[derive(Clone, Default)]
pub struct ScriptedTransport {
    script: Arc<Mutex<Script>>,
}

impl ScriptedTransport {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `reply` for the next call to `method path`.
    pub fn reply(&self, method: Method, path: &str, reply: Reply) -> &Self {
        self.lock()
            .queued
            .entry((method, path.to_owned()))
            .or_default()
            .push_back(reply);
        self
    }

    /// Answer every otherwise-unscripted call to `method path` with `responder`.
    pub fn respond_with<F>(&self, method: Method, path: &str, responder: F) -> &Self
    where
        F: Fn(&OutboundRequest) -> Reply + Send + Sync + 'static,
    {
        self.lock()
            .responders
            .insert((method, path.to_owned()), Arc::new(responder));
        self
    }

    /// Every call received so far, in arrival order.
    #[must_use]
    pub fn calls(&self) -> Vec<OutboundRequest> {
        self.lock().calls.clone()
    }

    /// Calls received for `method path`.
    #[must_use]
    pub fn calls_to(&self, method: Method, path: &str) -> Vec<OutboundRequest> {
        self.lock()
            .calls
            .iter()
            .filter(|c| c.method == method && c.path == path)
            .cloned()
            .collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Script> {
        // A panicking test thread must not hide the calls recorded so far.
        self.script.lock().unwrap_or_else(|p| p.into_inner())
    }

    fn next_reply(&self, request: &OutboundRequest) -> Reply {
        let mut script = self.lock();
        script.calls.push(request.clone());
        let key = (request.method, request.path.clone());
        if let Some(reply) = script.queued.get_mut(&key).and_then(VecDeque::pop_front) {
            return reply;
        }
        match script.responders.get(&key).cloned() {
            Some(responder) => {
                drop(script);
                responder(request)
            }
            None => Reply::json(404, serde_json::json!({ "message": "no scripted reply" })),
        }
    }
}

impl Transport for ScriptedTransport {
    async fn send(&self, request: OutboundRequest) -> Result<RawResponse, Error> {
        let reply = self.next_reply(&request);
        if let Some(delay) = reply.delay {
            tokio::time::sleep(delay).await;
        }
        reply.outcome.map_err(Error::Network)
    }
}
