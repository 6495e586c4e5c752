//! Connection manager for the Courier message socket.
//!
//! Owns one logical WebSocket connection to the message server: debounced
//! connects, backoff reconnects, health checks, an outbound queue that is
//! replayed on reconnect, and listener registries for messages and
//! connection-state changes.

pub mod config;
pub mod credentials;
pub mod endpoint;
mod latency;
pub mod manager;
mod pumps;
mod queue;
pub(crate) mod reconnection;
mod registry;
mod socket;
mod timers;
pub mod transport;
pub mod types;

pub use config::ManagerConfig;
pub use credentials::{CredentialProvider, TokenSlot};
pub use endpoint::{EndpointError, Environment, SocketEndpoint};
pub use manager::ConnectionManager;
pub use registry::{ConnectionListener, MessageListener};
pub use transport::{Connector, Transport, TransportError, TungsteniteConnector};
pub use types::{ConnectionEvent, ConnectionInfo, ConnectionState, SendOutcome};

pub use courier_protocol::Envelope;
