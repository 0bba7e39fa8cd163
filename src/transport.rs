use crate::callback::{establish, CallableConn, ListenCallback, ListenHandle};
use crate::error::{Result, UCode, UStatus};
use crate::message::UMessage;
use crate::uri::UUri;
use crate::validator;

/// Pluggable message transport (the uProtocol L1 interface).
///
/// Implementations provide [`UTransport::do_send`] and
/// [`UTransport::do_register_listener`]; the public [`UTransport::send`] and
/// [`UTransport::register_listener`] wrappers validate inputs first so every
/// transport gets the same input-rejection behavior. Both entry points may
/// be called concurrently, and listeners may be invoked from any transport
/// thread.
pub trait UTransport: Send + Sync {
    /// URI of the local uEntity, used as the reply-to source of requests.
    fn local_uri(&self) -> &UUri;

    /// Hands a validated message to the transport. Called by
    /// [`UTransport::send`].
    ///
    /// # Errors
    fn do_send(&self, message: &UMessage) -> Result<()>;

    /// Wires a validated listener registration into the transport. The
    /// `listener` becomes a no-op once the caller drops its
    /// [`ListenHandle`]. Called by [`UTransport::register_listener`].
    ///
    /// # Errors
    fn do_register_listener(
        &self,
        source_filter: &UUri,
        sink_filter: Option<&UUri>,
        listener: CallableConn,
    ) -> Result<()>;

    /// Validates and sends a message.
    ///
    /// # Errors
    ///
    /// Fails with `InvalidArgument` for a malformed message, or with the
    /// transport's own status on delivery failure.
    fn send(&self, message: &UMessage) -> Result<()> {
        validator::validate(message)?;
        self.do_send(message)
    }

    /// Registers `listener` for messages matching the given filters.
    ///
    /// The returned handle deregisters on drop.
    ///
    /// # Errors
    fn register_listener(
        &self,
        source_filter: &UUri,
        sink_filter: Option<&UUri>,
        listener: ListenCallback,
    ) -> Result<ListenHandle> {
        if source_filter.is_empty() {
            return Err(UStatus::new(
                UCode::InvalidArgument,
                "source filter must not be empty",
            ));
        }
        if let Some(sink) = sink_filter {
            if sink.is_empty() {
                return Err(UStatus::new(
                    UCode::InvalidArgument,
                    "sink filter must not be empty",
                ));
            }
        }

        let (handle, callable) = establish(listener);
        self.do_register_listener(source_filter, sink_filter, callable)?;
        Ok(handle)
    }
}
