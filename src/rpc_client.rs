use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, OnceLock};
use std::task::{Context, Poll};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_inline_default::serde_inline_default;
use tokio::sync::oneshot;
use tokio::time::Instant;
use uuid::Uuid;

use crate::builder::UMessageBuilder;
use crate::callback::{ListenCallback, ListenHandle};
use crate::error::{Result, UCode, UStatus};
use crate::expire::ExpireWorker;
use crate::message::{UMessage, UPriority};
use crate::payload::{UPayload, UPayloadFormat};
use crate::pending::{CompletionSlot, Outcome, RequestTable};
use crate::transport::UTransport;
use crate::uri::UUri;

/// Policy applied to every request a client sends.
#[serde_inline_default]
#[derive(Deserialize, Serialize, Debug, PartialEq, Eq, Clone)]
pub struct RpcClientOptions {
    #[serde_inline_default(Duration::from_secs(10))]
    #[serde(with = "humantime_serde")]
    pub ttl: Duration,
    #[serde_inline_default(UPriority::Cs4)]
    pub priority: UPriority,
    #[serde_inline_default(None)]
    pub payload_format: Option<UPayloadFormat>,
    #[serde_inline_default(None)]
    pub permission_level: Option<u32>,
    #[serde_inline_default(None)]
    pub token: Option<String>,
}

impl Default for RpcClientOptions {
    fn default() -> Self {
        serde_json::from_value(serde_json::Value::Object(serde_json::Map::default())).unwrap()
    }
}

/// Client for invoking one RPC method over a [`UTransport`].
///
/// Every invocation sends a request envelope, records a pending entry keyed
/// by the request id, and resolves through exactly one of: a correlated
/// response, ttl expiration (`DeadlineExceeded`), or client drop
/// (`Cancelled`). Send and registration failures arrive through the same
/// completion channel, so callers handle every outcome in one place.
///
/// The response listener is registered lazily on the first invocation and
/// shared by all of the client's requests. Dropping the client cancels its
/// own pending requests only; the transport may be shared freely.
pub struct RpcClient {
    transport: Arc<dyn UTransport>,
    builder: UMessageBuilder,
    method: UUri,
    reply_to: UUri,
    ttl: Duration,
    table: Arc<RequestTable>,
    worker: ExpireWorker,
    registration: OnceLock<Result<ListenHandle>>,
}

/// Resolves to the invocation's outcome.
///
/// Dropping the future abandons the result but does not cancel the request;
/// the pending entry is still completed and removed by whichever of
/// response, expiration, or client drop happens first.
#[derive(Debug)]
pub struct InvokeFuture {
    reqid: Uuid,
    rx: oneshot::Receiver<Outcome>,
}

/// Handle for a callback-based invocation. Dropping it does not cancel the
/// request.
#[derive(Clone, Copy, Debug)]
pub struct InvokeHandle {
    reqid: Uuid,
}

impl RpcClient {
    /// Creates a client bound to `transport` that invokes `method`.
    ///
    /// The transport's local uri becomes the reply-to source of every
    /// request. Must be called within a tokio runtime, which hosts the
    /// client's expiration worker.
    ///
    /// # Errors
    ///
    /// Fails with `InvalidArgument` for an invalid method or reply-to uri or
    /// a zero ttl, and `OutOfRange` for a priority below CS4.
    pub fn new(
        transport: Arc<dyn UTransport>,
        method: UUri,
        options: RpcClientOptions,
    ) -> Result<Self> {
        let reply_to = transport.local_uri().clone();
        let mut builder = UMessageBuilder::request(method.clone(), reply_to.clone(), options.ttl)?
            .with_priority(options.priority)?;
        if let Some(format) = options.payload_format {
            builder = builder.with_payload_format(format);
        }
        if let Some(level) = options.permission_level {
            builder = builder.with_permission_level(level);
        }
        if let Some(token) = options.token {
            builder = builder.with_token(token);
        }

        let table = Arc::new(RequestTable::default());
        let worker = ExpireWorker::spawn(table.clone());
        Ok(Self {
            transport,
            builder,
            method,
            reply_to,
            ttl: options.ttl,
            table,
            worker,
            registration: OnceLock::new(),
        })
    }

    /// Invokes the method, resolving through the returned future.
    ///
    /// # Errors
    ///
    /// Fails synchronously, with nothing sent and nothing pending, when the
    /// payload's format does not match the configured expected format.
    pub fn invoke(&self, payload: Option<UPayload>) -> Result<InvokeFuture> {
        let request = self.build_request(payload)?;
        let reqid = request.attributes.id;
        let (tx, rx) = oneshot::channel();
        self.dispatch(request, CompletionSlot::Promise(tx));
        Ok(InvokeFuture { reqid, rx })
    }

    /// Invokes the method, delivering the outcome to `callback` exactly
    /// once. The callback may run on the transport's delivery context, the
    /// expiration worker, or the thread dropping the client.
    ///
    /// # Errors
    ///
    /// Same synchronous failures as [`RpcClient::invoke`].
    pub fn invoke_with_callback(
        &self,
        payload: Option<UPayload>,
        callback: impl FnOnce(Outcome) + Send + 'static,
    ) -> Result<InvokeHandle> {
        let request = self.build_request(payload)?;
        let reqid = request.attributes.id;
        self.dispatch(request, CompletionSlot::Callback(Box::new(callback)));
        Ok(InvokeHandle { reqid })
    }

    fn build_request(&self, payload: Option<UPayload>) -> Result<UMessage> {
        match payload {
            Some(payload) => self.builder.build_with_payload(payload),
            None => self.builder.build(),
        }
    }

    fn dispatch(&self, request: UMessage, slot: CompletionSlot) {
        // A failed registration is replayed to every invocation; the
        // transport is never touched again.
        if let Err(status) = self.ensure_registered() {
            slot.complete(Err(status));
            return;
        }

        let reqid = request.attributes.id;
        let ttl = request.attributes.ttl.unwrap_or(self.ttl);
        let deadline = Instant::now() + ttl;

        // Ids are UUIDv7, so a collision here means something upstream is
        // broken; report it instead of clobbering the live entry.
        if let Err(slot) = self.table.try_insert(reqid, deadline, slot) {
            slot.complete(Err(UStatus::new(
                UCode::Internal,
                format!("duplicate request id: {reqid}"),
            )));
            return;
        }

        if let Err(status) = self.transport.send(&request) {
            self.table.complete(reqid, Err(status));
        }
    }

    /// Registers the shared response listener exactly once, on first use.
    fn ensure_registered(&self) -> Result<()> {
        let registration = self.registration.get_or_init(|| {
            let table = self.table.clone();
            let listener: ListenCallback = Arc::new(move |message: UMessage| {
                let Some(reqid) = message.attributes.reqid else {
                    tracing::warn!("dropping response without a request id");
                    return;
                };
                let outcome = interpret(message);
                if !table.complete(reqid, outcome) {
                    tracing::debug!("dropping response with no pending request: {reqid}");
                }
            });
            self.transport
                .register_listener(&self.method, Some(&self.reply_to), listener)
        });
        match registration {
            Ok(_) => Ok(()),
            Err(status) => Err(status.clone()),
        }
    }
}

/// Maps a response envelope into an invocation outcome: a non-OK
/// `commstatus` is an error from the far side, everything else is the
/// response itself.
fn interpret(message: UMessage) -> Outcome {
    match message.attributes.commstatus {
        Some(code) if code != UCode::Ok => Err(UStatus::new(
            code,
            "received response with non-OK commstatus",
        )),
        _ => Ok(message),
    }
}

impl Drop for RpcClient {
    fn drop(&mut self) {
        self.worker.stop();
        self.table.cancel_all(UStatus::new(
            UCode::Cancelled,
            "rpc client for this request was discarded",
        ));
    }
}

impl std::fmt::Debug for RpcClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RpcClient")
            .field("method", &self.method)
            .field("reply_to", &self.reply_to)
            .field("ttl", &self.ttl)
            .field("pending", &self.table.len())
            .finish()
    }
}

impl InvokeFuture {
    /// Correlation id of the request this future resolves.
    #[must_use]
    pub fn request_id(&self) -> Uuid {
        self.reqid
    }
}

impl Future for InvokeFuture {
    type Output = Outcome;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.get_mut().rx).poll(cx).map(|received| {
            received.unwrap_or_else(|_| {
                Err(UStatus::new(
                    UCode::Unknown,
                    "completion channel closed without an outcome",
                ))
            })
        })
    }
}

impl InvokeHandle {
    /// Correlation id of the in-flight request.
    #[must_use]
    pub fn request_id(&self) -> Uuid {
        self.reqid
    }
}
