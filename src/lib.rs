#![forbid(unsafe_code)]

mod error;
pub use error::{Result, UCode, UStatus};

mod uri;
pub use uri::UUri;

mod payload;
pub use payload::{UPayload, UPayloadFormat};

mod message;
pub use message::{UAttributes, UMessage, UMessageType, UPriority};

pub mod validator;

mod builder;
pub use builder::UMessageBuilder;

mod callback;
pub use callback::{establish, CallableConn, ListenCallback, ListenHandle};

mod transport;
pub use transport::UTransport;

mod pending;
pub use pending::{CompletionSlot, Outcome, RequestTable};

mod expire;
pub use expire::ExpireWorker;

mod rpc_client;
pub use rpc_client::{InvokeFuture, InvokeHandle, RpcClient, RpcClientOptions};

mod rpc_server;
pub use rpc_server::{RpcCallback, RpcServer};

mod publisher;
pub use publisher::Publisher;

mod subscriber;
pub use subscriber::Subscriber;

mod notifier;
pub use notifier::{NotificationSink, NotificationSource};
