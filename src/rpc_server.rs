use std::sync::Arc;
use std::time::Duration;

use crate::builder::UMessageBuilder;
use crate::callback::ListenHandle;
use crate::error::{Result, UCode, UStatus};
use crate::message::UMessage;
use crate::payload::{UPayload, UPayloadFormat};
use crate::transport::UTransport;
use crate::uri::UUri;
use crate::validator;

/// Handler implementing an RPC method.
///
/// Returns the response payload (or `None` for an empty response). An error
/// is reported back to the requester as a `commstatus` on the response.
pub type RpcCallback =
    Arc<dyn Fn(&UMessage) -> Result<Option<UPayload>> + Send + Sync + 'static>;

/// Serving half of the RPC model: listens for requests addressed to one
/// method uri and answers each with a response built from the handler's
/// output.
///
/// Dropping the server deregisters its listener; requests already handed to
/// the handler still get their response.
pub struct RpcServer {
    method: UUri,
    _registration: ListenHandle,
}

impl RpcServer {
    /// Registers a server for `method` on `transport`.
    ///
    /// When `expected_format` is set, requests carrying any other payload
    /// format are rejected with a `commstatus` of `InvalidArgument` instead
    /// of reaching the handler. `ttl`, when set, bounds the validity of each
    /// response.
    ///
    /// # Errors
    ///
    /// Fails with `InvalidArgument` if `method` is not a valid RPC method
    /// uri, or with the transport's status if registration fails.
    pub fn create(
        transport: Arc<dyn UTransport>,
        method: UUri,
        callback: RpcCallback,
        expected_format: Option<UPayloadFormat>,
        ttl: Option<Duration>,
    ) -> Result<Self> {
        if !method.is_rpc_method() {
            return Err(UStatus::new(
                UCode::InvalidArgument,
                "method is not a valid rpc method uri",
            ));
        }

        let listener_transport = transport.clone();
        let listener = Arc::new(move |request: UMessage| {
            if let Err(status) = validator::validate_rpc_request(&request) {
                tracing::warn!("dropping invalid rpc request: {status}");
                return;
            }
            match respond(&request, &callback, expected_format, ttl) {
                Ok(response) => {
                    if let Err(status) = listener_transport.send(&response) {
                        tracing::error!("failed to send rpc response: {status}");
                    }
                }
                Err(status) => {
                    tracing::error!("failed to build rpc response: {status}");
                }
            }
        });

        // Requests for this method can originate anywhere.
        let registration = transport.register_listener(&UUri::any(), Some(&method), listener)?;
        Ok(Self {
            method,
            _registration: registration,
        })
    }

    #[must_use]
    pub fn method(&self) -> &UUri {
        &self.method
    }
}

fn respond(
    request: &UMessage,
    callback: &RpcCallback,
    expected_format: Option<UPayloadFormat>,
    ttl: Option<Duration>,
) -> Result<UMessage> {
    let mut builder = UMessageBuilder::response_to(request)?;
    if let Some(ttl) = ttl {
        builder = builder.with_ttl(ttl)?;
    }

    if let Some(expected) = expected_format {
        if request.attributes.payload_format != expected {
            return builder.with_commstatus(UCode::InvalidArgument).build();
        }
    }

    match callback(request) {
        Ok(Some(payload)) => builder.build_with_payload(payload),
        Ok(None) => builder.build(),
        Err(status) => builder.with_commstatus(status.code).build(),
    }
}

impl std::fmt::Debug for RpcServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RpcServer")
            .field("method", &self.method)
            .finish()
    }
}
