//! Outbound tunnel to a remote proxy.
//!
//! [`Connector`] performs a single attempt: dial, optional pre-flight hook,
//! then a [`Session`] that owns the connection until it ends.
//! [`Supervisor`] wraps one attempt with failure logging and a fixed pause;
//! looping forever is left to the caller.

pub mod authorizer;
pub mod connector;
pub mod dialer;
pub mod error;
pub mod hook;
pub mod session;
pub mod status;
pub mod supervisor;
pub mod target;

pub use authorizer::{AllowAll, AllowList, ConnectAuthorizer, DenyAll};
pub use connector::Connector;
pub use dialer::{Dial, HandshakeResponse, WsConnection, WsDialer};
pub use error::{ConnectError, DialError, SessionError};
pub use hook::OnConnect;
pub use session::{PassiveSession, PassiveSessionFactory, Session, SessionFactory, Termination};
pub use status::StatusReporter;
pub use supervisor::{DEFAULT_RETRY_DELAY, Supervisor};
pub use target::ProxyTarget;
